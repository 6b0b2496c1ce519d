//! Template filter engine: decides which template configuration applies to a
//! scene/file pair. Every configured predicate must hold (AND semantics);
//! absent predicates do not constrain. Configurations are tried in list
//! order and the first full match wins.

use std::path::Path;

use thiserror::Error;

use crate::config::{FileDirTemplate, FileNameTemplate};
use crate::model::{Scene, SceneFile, Studio};
use crate::studios::{self, StudioError};

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("unknown studio name in {filter} filter: '{name}'")]
    UnknownStudio { filter: &'static str, name: String },
    #[error("blank studio name in matches_part_of_studio filter")]
    BlankStudioName,
    #[error("blank tag name in {0} filter")]
    BlankTagName(&'static str),
    #[error(transparent)]
    Studio(#[from] StudioError),
}

/// A template configuration that can be matched against a scene/file pair.
pub trait TemplateRule {
    fn template(&self) -> &str;
    fn matches(
        &self,
        scene: &Scene,
        studios: &[Studio],
        file: &SceneFile,
    ) -> Result<bool, FilterError>;
}

/// First matching configuration's template, or `None` when nothing matches
/// (the caller skips the file).
pub fn find_matching_template<'a, T: TemplateRule>(
    scene: &Scene,
    studios: &[Studio],
    file: &SceneFile,
    configs: &'a [T],
) -> Result<Option<&'a str>, FilterError> {
    for (idx, config) in configs.iter().enumerate() {
        log::debug!("Checking template {}: '{}'", idx + 1, config.template());
        if config.matches(scene, studios, file)? {
            return Ok(Some(config.template()));
        }
    }
    Ok(None)
}

impl TemplateRule for FileNameTemplate {
    fn template(&self) -> &str {
        &self.template
    }

    fn matches(
        &self,
        scene: &Scene,
        studios: &[Studio],
        _file: &SceneFile,
    ) -> Result<bool, FilterError> {
        Ok(matches_studio(self.matches_studio.as_deref(), scene, studios)?
            && matches_part_of_studio(self.matches_part_of_studio.as_deref(), scene, studios)?
            && matches_all_tags(self.matches_all_tags.as_deref(), scene)?
            && matches_any_tags(self.matches_any_tags.as_deref(), scene)?
            && matches_organized_value(self.matches_organized_value, scene)
            && matches_scene_with_no_performers(self.matches_scene_with_no_performers, scene))
    }
}

impl TemplateRule for FileDirTemplate {
    fn template(&self) -> &str {
        &self.template
    }

    fn matches(
        &self,
        scene: &Scene,
        studios: &[Studio],
        file: &SceneFile,
    ) -> Result<bool, FilterError> {
        Ok(matches_studio(self.matches_studio.as_deref(), scene, studios)?
            && matches_part_of_studio(self.matches_part_of_studio.as_deref(), scene, studios)?
            && matches_all_tags(self.matches_all_tags.as_deref(), scene)?
            && matches_any_tags(self.matches_any_tags.as_deref(), scene)?
            && matches_organized_value(self.matches_organized_value, scene)
            && matches_scene_with_no_performers(self.matches_scene_with_no_performers, scene)
            && matches_src(self.matches_src.as_deref(), file))
    }
}

/// True iff the scene's studio is exactly the named studio. A scene without a
/// studio never matches; an unresolvable name is a configuration error.
fn matches_studio(
    filter: Option<&str>,
    scene: &Scene,
    studios: &[Studio],
) -> Result<bool, FilterError> {
    let Some(name) = filter else { return Ok(true) };
    let Some(scene_studio) = &scene.studio else {
        return Ok(false);
    };
    let target = studios::find_by_name(name, studios).ok_or_else(|| {
        FilterError::UnknownStudio {
            filter: "matches_studio",
            name: name.to_string(),
        }
    })?;
    Ok(target.id == scene_studio.id)
}

/// True iff the scene's studio is the named studio or nested under it.
fn matches_part_of_studio(
    filter: Option<&str>,
    scene: &Scene,
    studios: &[Studio],
) -> Result<bool, FilterError> {
    let Some(name) = filter else { return Ok(true) };
    let Some(scene_studio) = &scene.studio else {
        return Ok(false);
    };
    if name.trim().is_empty() {
        return Err(FilterError::BlankStudioName);
    }
    let target = studios::find_by_name(name, studios).ok_or_else(|| {
        FilterError::UnknownStudio {
            filter: "matches_part_of_studio",
            name: name.to_string(),
        }
    })?;
    Ok(studios::is_descendant_of(scene_studio, target, studios)?)
}

/// True iff every named tag is present among the scene's tags (exact,
/// case-sensitive). An empty list always matches; blank entries are a
/// configuration error.
fn matches_all_tags(filter: Option<&[String]>, scene: &Scene) -> Result<bool, FilterError> {
    let Some(tag_names) = filter else {
        return Ok(true);
    };
    if tag_names.is_empty() {
        return Ok(true);
    }
    check_no_blank_tags(tag_names, "matches_all_tags")?;
    Ok(tag_names
        .iter()
        .all(|name| scene.tags.iter().any(|t| t.name == name.trim())))
}

/// True iff at least one named tag is present among the scene's tags.
fn matches_any_tags(filter: Option<&[String]>, scene: &Scene) -> Result<bool, FilterError> {
    let Some(tag_names) = filter else {
        return Ok(true);
    };
    if tag_names.is_empty() {
        return Ok(true);
    }
    check_no_blank_tags(tag_names, "matches_any_tags")?;
    Ok(tag_names
        .iter()
        .any(|name| scene.tags.iter().any(|t| t.name == name.trim())))
}

fn check_no_blank_tags(tag_names: &[String], filter: &'static str) -> Result<(), FilterError> {
    if tag_names.iter().any(|name| name.trim().is_empty()) {
        return Err(FilterError::BlankTagName(filter));
    }
    Ok(())
}

fn matches_organized_value(filter: Option<bool>, scene: &Scene) -> bool {
    filter.is_none_or(|value| scene.organized == value)
}

fn matches_scene_with_no_performers(filter: Option<bool>, scene: &Scene) -> bool {
    filter.is_none_or(|value| scene.performers.is_empty() == value)
}

/// True iff the file's current path equals or is nested under the given path.
fn matches_src(filter: Option<&Path>, file: &SceneFile) -> bool {
    filter.is_none_or(|prefix| file.path.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{self, studio, studio_with_parent};
    use std::path::PathBuf;

    fn name_template(template: &str) -> FileNameTemplate {
        FileNameTemplate {
            template: template.to_string(),
            matches_studio: None,
            matches_part_of_studio: None,
            matches_all_tags: None,
            matches_any_tags: None,
            matches_organized_value: None,
            matches_scene_with_no_performers: None,
        }
    }

    fn dir_template(template: &str) -> FileDirTemplate {
        FileDirTemplate {
            template: template.to_string(),
            matches_src: None,
            matches_studio: None,
            matches_part_of_studio: None,
            matches_all_tags: None,
            matches_any_tags: None,
            matches_organized_value: None,
            matches_scene_with_no_performers: None,
        }
    }

    #[test]
    fn test_unconstrained_config_always_matches() {
        let (scene, studios, _) = testutil::fixture();
        let configs = [name_template("{title}")];
        let found =
            find_matching_template(&scene, &studios, &scene.files[0], &configs).unwrap();
        assert_eq!(found, Some("{title}"));
    }

    #[test]
    fn test_first_match_wins() {
        let (scene, studios, _) = testutil::fixture();
        let mut unmatched = name_template("never");
        unmatched.matches_organized_value = Some(true); // fixture scene is unorganized
        let configs = [unmatched, name_template("first"), name_template("second")];
        let found =
            find_matching_template(&scene, &studios, &scene.files[0], &configs).unwrap();
        assert_eq!(found, Some("first"));
    }

    #[test]
    fn test_no_match_yields_none() {
        let (scene, studios, _) = testutil::fixture();
        let mut config = name_template("never");
        config.matches_studio = Some("Parent Studio".to_string());
        let configs = [config];
        let found =
            find_matching_template(&scene, &studios, &scene.files[0], &configs).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_matches_studio() {
        let (scene, studios, _) = testutil::fixture();
        let file = &scene.files[0];

        let mut config = name_template("t");
        config.matches_studio = Some("studio a".to_string()); // case-insensitive
        assert!(config.matches(&scene, &studios, file).unwrap());

        config.matches_studio = Some("Parent Studio".to_string());
        assert!(!config.matches(&scene, &studios, file).unwrap());

        config.matches_studio = Some("Nobody".to_string());
        assert!(matches!(
            config.matches(&scene, &studios, file),
            Err(FilterError::UnknownStudio { .. })
        ));
    }

    #[test]
    fn test_matches_studio_without_scene_studio() {
        let (mut scene, studios, _) = testutil::fixture();
        scene.studio = None;
        let file = scene.files[0].clone();

        let mut config = name_template("t");
        config.matches_studio = Some("Studio A".to_string());
        assert!(!config.matches(&scene, &studios, &file).unwrap());

        let mut config = name_template("t");
        config.matches_part_of_studio = Some("Studio A".to_string());
        assert!(!config.matches(&scene, &studios, &file).unwrap());
    }

    #[test]
    fn test_matches_part_of_studio() {
        let (mut scene, _, _) = testutil::fixture();
        let studios = vec![
            studio("1", "Family"),
            studio_with_parent("2", "Imprint", "1"),
            studio_with_parent("3", "Label", "2"),
        ];
        scene.studio = Some(studios[2].clone());
        let file = scene.files[0].clone();

        let mut config = name_template("t");
        config.matches_part_of_studio = Some("Family".to_string());
        assert!(config.matches(&scene, &studios, &file).unwrap());

        config.matches_part_of_studio = Some("Label".to_string());
        assert!(config.matches(&scene, &studios, &file).unwrap());

        scene.studio = Some(studios[0].clone());
        config.matches_part_of_studio = Some("Label".to_string());
        assert!(!config.matches(&scene, &studios, &file).unwrap());

        config.matches_part_of_studio = Some("  ".to_string());
        assert!(matches!(
            config.matches(&scene, &studios, &file),
            Err(FilterError::BlankStudioName)
        ));
    }

    #[test]
    fn test_matches_all_tags() {
        let (scene, studios, _) = testutil::fixture(); // tags: Tag 1, Tag 2, Tag 3
        let file = &scene.files[0];

        let mut config = name_template("t");
        config.matches_all_tags = Some(vec!["Tag 1".to_string(), "Tag 3".to_string()]);
        assert!(config.matches(&scene, &studios, file).unwrap());

        config.matches_all_tags = Some(vec!["Tag 1".to_string(), "Tag 9".to_string()]);
        assert!(!config.matches(&scene, &studios, file).unwrap());

        // Entries are trimmed before comparison
        config.matches_all_tags = Some(vec![" Tag 1 ".to_string()]);
        assert!(config.matches(&scene, &studios, file).unwrap());

        // Exact case-sensitive match
        config.matches_all_tags = Some(vec!["tag 1".to_string()]);
        assert!(!config.matches(&scene, &studios, file).unwrap());

        config.matches_all_tags = Some(vec![]);
        assert!(config.matches(&scene, &studios, file).unwrap());

        config.matches_all_tags = Some(vec!["".to_string()]);
        assert!(matches!(
            config.matches(&scene, &studios, file),
            Err(FilterError::BlankTagName("matches_all_tags"))
        ));
    }

    #[test]
    fn test_matches_any_tags() {
        let (scene, studios, _) = testutil::fixture();
        let file = &scene.files[0];

        let mut config = name_template("t");
        config.matches_any_tags = Some(vec!["Tag 9".to_string(), "Tag 2".to_string()]);
        assert!(config.matches(&scene, &studios, file).unwrap());

        config.matches_any_tags = Some(vec!["Tag 8".to_string(), "Tag 9".to_string()]);
        assert!(!config.matches(&scene, &studios, file).unwrap());

        config.matches_any_tags = Some(vec![]);
        assert!(config.matches(&scene, &studios, file).unwrap());
    }

    #[test]
    fn test_matches_organized_and_no_performers() {
        let (mut scene, studios, _) = testutil::fixture();
        let file = scene.files[0].clone();

        let mut config = name_template("t");
        config.matches_organized_value = Some(false);
        assert!(config.matches(&scene, &studios, &file).unwrap());
        config.matches_organized_value = Some(true);
        assert!(!config.matches(&scene, &studios, &file).unwrap());

        let mut config = name_template("t");
        config.matches_scene_with_no_performers = Some(false);
        assert!(config.matches(&scene, &studios, &file).unwrap());
        scene.performers.clear();
        assert!(!config.matches(&scene, &studios, &file).unwrap());
        config.matches_scene_with_no_performers = Some(true);
        assert!(config.matches(&scene, &studios, &file).unwrap());
    }

    #[test]
    fn test_matches_src() {
        let (mut scene, studios, _) = testutil::fixture();
        scene.files[0].path = PathBuf::from("/library/incoming/file1.mp4");
        let file = scene.files[0].clone();

        let mut config = dir_template("t");
        config.matches_src = Some(PathBuf::from("/library/incoming"));
        assert!(config.matches(&scene, &studios, &file).unwrap());

        config.matches_src = Some(PathBuf::from("/library/incoming/file1.mp4"));
        assert!(config.matches(&scene, &studios, &file).unwrap());

        config.matches_src = Some(PathBuf::from("/library/sorted"));
        assert!(!config.matches(&scene, &studios, &file).unwrap());

        // Component-wise prefix, not string prefix
        config.matches_src = Some(PathBuf::from("/library/inc"));
        assert!(!config.matches(&scene, &studios, &file).unwrap());
    }
}
