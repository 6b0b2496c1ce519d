use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::model::Gender;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("could not determine a config directory; pass --config explicitly")]
    NoConfigDir,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("unknown template variable '{0}' in path.template_variable_removal_order")]
    UnknownRemovalToken(String),
    #[error("path.duplicate_suffix_template must contain a {{num}} placeholder: '{0}'")]
    SuffixMissingNum(String),
}

/// Application configuration loaded from a TOML file. The schema is strict:
/// unrecognized keys are rejected rather than silently ignored.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// When true (the default), report intended renames without mutating the
    /// filesystem or the catalog database.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    /// Catalog GraphQL endpoint, e.g. "http://localhost:9999/graphql".
    pub api_url: String,
    /// Path to the catalog's SQLite database.
    pub database_path: PathBuf,
    /// Ordered file-name template configurations; first match wins.
    #[serde(default)]
    pub file_name_templates: Vec<FileNameTemplate>,
    /// Ordered directory template configurations; first match wins.
    #[serde(default)]
    pub file_dir_templates: Vec<FileDirTemplate>,
    #[serde(default)]
    pub template_variables: TemplateVariables,
    #[serde(default)]
    pub path: PathConfig,
}

fn default_dry_run() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileNameTemplate {
    pub template: String,
    #[serde(default)]
    pub matches_studio: Option<String>,
    #[serde(default)]
    pub matches_part_of_studio: Option<String>,
    #[serde(default)]
    pub matches_all_tags: Option<Vec<String>>,
    #[serde(default)]
    pub matches_any_tags: Option<Vec<String>>,
    #[serde(default)]
    pub matches_organized_value: Option<bool>,
    #[serde(default)]
    pub matches_scene_with_no_performers: Option<bool>,
}

/// Like [`FileNameTemplate`] with an additional source-path-prefix filter.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileDirTemplate {
    pub template: String,
    #[serde(default)]
    pub matches_src: Option<PathBuf>,
    #[serde(default)]
    pub matches_studio: Option<String>,
    #[serde(default)]
    pub matches_part_of_studio: Option<String>,
    #[serde(default)]
    pub matches_all_tags: Option<Vec<String>>,
    #[serde(default)]
    pub matches_any_tags: Option<Vec<String>>,
    #[serde(default)]
    pub matches_organized_value: Option<bool>,
    #[serde(default)]
    pub matches_scene_with_no_performers: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateVariables {
    #[serde(default)]
    pub performers: PerformersConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PerformersConfig {
    /// Separator between performers in the expanded list.
    pub separator: String,
    /// Keep at most this many performers (applied after ordering).
    pub limit: Option<usize>,
    /// Genders dropped from the list before ordering.
    pub exclude_genders: Vec<Gender>,
    pub order_by: PerformerOrder,
    /// Fallback text when the scene has literally zero performers. A nonzero
    /// list filtered down to nothing expands to an empty string instead.
    pub no_performer_name: String,
}

impl Default for PerformersConfig {
    fn default() -> Self {
        Self {
            separator: ", ".to_string(),
            limit: None,
            exclude_genders: Vec::new(),
            order_by: PerformerOrder::Id,
            no_performer_name: "No Performers".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformerOrder {
    Id,
    Name,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PathConfig {
    /// Maximum total path length in characters. Unset disables the check.
    pub max_path_length: Option<usize>,
    /// Suffix inserted before the extension to avoid collisions; `{num}` is
    /// replaced by 1, 2, 3, ...
    pub duplicate_suffix_template: String,
    /// File-name template variables stripped, in order, when the generated
    /// path exceeds the length budget.
    pub template_variable_removal_order: Vec<String>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            max_path_length: None,
            duplicate_suffix_template: " ({num})".to_string(),
            template_variable_removal_order: Vec::new(),
        }
    }
}

impl Config {
    /// Load config from an explicit path, or from
    /// `~/.config/reelname/config.toml` when none is given. Unlike a purely
    /// optional config this one is required: it carries the templates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        config.validate()?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Structural checks beyond the serde schema.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.path.duplicate_suffix_template.contains("{num}") {
            return Err(ConfigError::SuffixMissingNum(
                self.path.duplicate_suffix_template.clone(),
            ));
        }
        for token in &self.path.template_variable_removal_order {
            if !crate::template::is_known_token(token) {
                return Err(ConfigError::UnknownRemovalToken(token.clone()));
            }
        }
        Ok(())
    }
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("", "", crate::APP_NAME)
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .ok_or(ConfigError::NoConfigDir)
}
