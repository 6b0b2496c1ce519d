//! Template variable engine: expands `{token}` placeholders (with an optional
//! `:{format}` sub-syntax for date/duration tokens) into sanitized text.
//!
//! Substitution is one pass per token pattern, in a fixed table order.
//! Unrecognized `{...}` sequences are not tokens and stay verbatim. After all
//! replacements, whitespace runs collapse to a single space and the result is
//! trimmed.

pub mod filters;
pub mod performers;

use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use thiserror::Error;

use crate::config::{PerformersConfig, TemplateVariables};
use crate::model::{Performer, Scene, SceneFile, Studio};
use crate::studios::{self, StudioError};

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error(transparent)]
    Studio(#[from] StudioError),
    #[error("invalid format '{format}' for template variable {token}")]
    BadFormat { token: &'static str, format: String },
}

/// Read-only inputs shared by every token rule. The same context fills both
/// file-name and directory templates.
pub struct TemplateContext<'a> {
    pub scene: &'a Scene,
    pub studios: &'a [Studio],
    pub file: &'a SceneFile,
    pub variables: &'a TemplateVariables,
}

const SIMPLE_TOKENS: &[&str] = &[
    "{title}",
    "{studio}",
    "{parent_studio}",
    "{studio_family}",
    "{performers}",
    "{resolution}",
    "{resolution_name}",
    "{bit_rate_mbps}",
    "{tags}",
    "{video_codec}",
    "{audio_codec}",
    "{movie_scene_number}",
    "{movie_name}",
    "{scene_stash_id}",
    "{performers_stash_ids}",
    "{studio_code}",
    "{oshash}",
    "{phash}",
    "{src}",
    "{rating}",
    "{studio_hierarchy}",
];

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{date(?::([^{}]+?))?\}").unwrap());
static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{duration(?::([^{}]+?))?\}").unwrap());
static MOVIE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{movie_date(?::([^{}]+?))?\}").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// True iff `text` is exactly one recognized token (used to validate the
/// configured variable removal order).
pub fn is_known_token(text: &str) -> bool {
    if SIMPLE_TOKENS.contains(&text) {
        return true;
    }
    [&*DATE_RE, &*DURATION_RE, &*MOVIE_DATE_RE].iter().any(|re| {
        re.find(text)
            .is_some_and(|m| m.start() == 0 && m.end() == text.len())
    })
}

/// Expand all recognized tokens in `template` against the context.
pub fn fill_template(template: &str, ctx: &TemplateContext) -> Result<String, TemplateError> {
    let scene = ctx.scene;
    let file = ctx.file;
    let performers_config = &ctx.variables.performers;

    let mut out = template.to_string();

    out = simple(out, "{title}", || {
        Ok(scene.title.clone().unwrap_or_default())
    })?;
    out = simple(out, "{studio}", || {
        Ok(scene
            .studio
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_default())
    })?;
    out = simple(out, "{parent_studio}", || match &scene.studio {
        Some(s) => Ok(studios::parent_of(s, ctx.studios)?.name.clone()),
        None => Ok(String::new()),
    })?;
    out = simple(out, "{studio_family}", || match &scene.studio {
        Some(s) => Ok(studios::family_of(s, ctx.studios)?.name.clone()),
        None => Ok(String::new()),
    })?;
    out = simple(out, "{performers}", || {
        Ok(expand_performers(scene, performers_config, |p| {
            p.name.clone()
        }))
    })?;
    out = formatted(
        out,
        &DATE_RE,
        "{date}",
        "%Y-%m-%d",
        scene.date.map(Formattable::Date),
    )?;
    out = simple(out, "{resolution}", || Ok(file.resolution()))?;
    out = simple(out, "{resolution_name}", || Ok(file.resolution_name()))?;
    out = formatted(
        out,
        &DURATION_RE,
        "{duration}",
        "%H.%M.%S",
        file.duration_time().map(Formattable::Time),
    )?;
    out = simple(out, "{bit_rate_mbps}", || Ok(file.bit_rate_mbps()))?;
    out = simple(out, "{tags}", || {
        Ok(scene
            .tags
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", "))
    })?;
    out = simple(out, "{video_codec}", || Ok(file.video_codec.clone()))?;
    out = simple(out, "{audio_codec}", || Ok(file.audio_codec.clone()))?;
    out = simple(out, "{movie_scene_number}", || {
        Ok(scene
            .movie_scene_number()
            .map(|n| n.to_string())
            .unwrap_or_default())
    })?;
    out = simple(out, "{movie_name}", || {
        Ok(scene.movie_name().unwrap_or_default().to_string())
    })?;
    out = formatted(
        out,
        &MOVIE_DATE_RE,
        "{movie_date}",
        "%Y-%m-%d",
        scene.movie_date().map(Formattable::Date),
    )?;
    out = simple(out, "{scene_stash_id}", || {
        Ok(scene.stash_id().unwrap_or_default().to_string())
    })?;
    out = simple(out, "{performers_stash_ids}", || {
        Ok(expand_performers(scene, performers_config, |p| {
            p.stash_id().unwrap_or_default().to_string()
        }))
    })?;
    out = simple(out, "{studio_code}", || {
        Ok(scene.studio_code().unwrap_or_default().to_string())
    })?;
    out = simple(out, "{oshash}", || {
        Ok(file.oshash().unwrap_or_default().to_string())
    })?;
    out = simple(out, "{phash}", || {
        Ok(file.phash().unwrap_or_default().to_string())
    })?;
    // {src} legitimately contains path separators, so it skips sanitization
    out = raw(out, "{src}", || {
        Ok(file
            .path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default())
    })?;
    out = simple(out, "{rating}", || {
        Ok(scene.rating().map(|r| r.to_string()).unwrap_or_default())
    })?;
    out = raw(out, "{studio_hierarchy}", || {
        expand_studio_hierarchy(scene, ctx.studios)
    })?;

    let out = WS_RE.replace_all(&out, " ");
    Ok(out.trim().to_string())
}

/// Replace a fixed-string token with its sanitized value. The value rule only
/// runs when the token occurs, so a rule that can fail (studio lookups) does
/// not fail templates that never use it.
fn simple(
    text: String,
    token: &str,
    value: impl FnOnce() -> Result<String, TemplateError>,
) -> Result<String, TemplateError> {
    if !text.contains(token) {
        return Ok(text);
    }
    let v = sanitize(&value()?);
    Ok(text.replace(token, &v))
}

/// Like [`simple`] but without the sanitization step, for tokens whose values
/// legitimately contain path separators.
fn raw(
    text: String,
    token: &str,
    value: impl FnOnce() -> Result<String, TemplateError>,
) -> Result<String, TemplateError> {
    if !text.contains(token) {
        return Ok(text);
    }
    let v = value()?;
    Ok(text.replace(token, &v))
}

enum Formattable {
    Date(NaiveDate),
    Time(NaiveTime),
}

impl Formattable {
    /// Render with a strftime-style format. chrono surfaces unknown
    /// directives as a fmt error rather than bad output.
    fn render(&self, fmt: &str) -> Result<String, std::fmt::Error> {
        let mut s = String::new();
        match self {
            Self::Date(d) => write!(s, "{}", d.format(fmt))?,
            Self::Time(t) => write!(s, "{}", t.format(fmt))?,
        }
        Ok(s)
    }
}

/// Replace every `{token}` / `{token:fmt}` occurrence. An absent value yields
/// an empty string regardless of the format specifier.
fn formatted(
    text: String,
    re: &Regex,
    token: &'static str,
    default_fmt: &str,
    value: Option<Formattable>,
) -> Result<String, TemplateError> {
    if !re.is_match(&text) {
        return Ok(text);
    }
    let Some(value) = value else {
        return Ok(re.replace_all(&text, "").into_owned());
    };

    let mut bad_format = None;
    let out = re.replace_all(&text, |caps: &regex::Captures| {
        let fmt = caps.get(1).map_or(default_fmt, |m| m.as_str());
        match value.render(fmt) {
            Ok(v) => sanitize(&v),
            Err(_) => {
                bad_format = Some(fmt.to_string());
                String::new()
            }
        }
    });

    if let Some(format) = bad_format {
        return Err(TemplateError::BadFormat { token, format });
    }
    Ok(out.into_owned())
}

fn expand_performers(
    scene: &Scene,
    config: &PerformersConfig,
    render: impl Fn(&Performer) -> String,
) -> String {
    // The fallback applies only to a scene with literally zero performers; a
    // list filtered down to nothing yields an empty string.
    if scene.performers.is_empty() {
        return config.no_performer_name.clone();
    }
    performers::shape(&scene.performers, config)
        .into_iter()
        .map(render)
        .collect::<Vec<_>>()
        .join(&config.separator)
}

fn expand_studio_hierarchy(scene: &Scene, studios: &[Studio]) -> Result<String, TemplateError> {
    let Some(studio) = &scene.studio else {
        return Ok(String::new());
    };
    let chain = crate::studios::hierarchy_of(studio, studios)?;
    let sep = std::path::MAIN_SEPARATOR.to_string();
    Ok(chain
        .iter()
        .map(|s| sanitize(&s.name))
        .collect::<Vec<_>>()
        .join(&sep))
}

/// Make produced text safe for portable file names: typographic quote
/// variants become a plain apostrophe (a run collapses to one), then the
/// characters illegal in Windows file names are stripped.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_quote = false;
    for ch in text.chars() {
        match ch {
            '\u{2019}' | '\u{2018}' | '\u{201D}' | '\u{201C}' => {
                if !prev_quote {
                    out.push('\'');
                }
                prev_quote = true;
            }
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => prev_quote = false,
            _ => {
                prev_quote = false;
                out.push(ch);
            }
        }
    }
    out
}
