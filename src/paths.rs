//! Path construction: fills the file-name and directory templates, resolves
//! collisions with a duplicate suffix, and progressively strips variables
//! from the file-name template when the result exceeds the length budget.
//!
//! Order is fixed: each fill attempt fully resolves collisions for that exact
//! filled text, then checks length. A length retry restarts the fill from
//! scratch, discarding any suffix accumulated on the previous attempt.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::config::PathConfig;
use crate::template::{self, TemplateContext, TemplateError};

#[derive(Error, Debug)]
pub enum PathError {
    /// The generated path equals the file's current path. Not a failure;
    /// the caller logs and skips the file.
    #[error("no changes to file path: {0}")]
    NoChange(PathBuf),
    /// The removal order is exhausted and the path still exceeds the budget.
    /// Carries the last attempted path for diagnostics.
    #[error("file path too long: {0}")]
    TooLong(PathBuf),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Build the new absolute path for the context's file. `exists` probes for a
/// file at a candidate path; tests inject a fake, production passes a real
/// filesystem check.
pub fn build_new_path(
    ctx: &TemplateContext,
    path_config: &PathConfig,
    file_name_template: &str,
    file_dir_template: &str,
    exists: &dyn Fn(&Path) -> bool,
) -> Result<PathBuf, PathError> {
    // Only the file-name template is ever degraded; the directory template
    // stays untouched.
    let mut name_template = file_name_template.to_string();
    let mut removal_order = path_config.template_variable_removal_order.iter();

    loop {
        let file_name = template::fill_template(&name_template, ctx)?;
        let file_dir = template::fill_template(file_dir_template, ctx)?;

        let base = absolutize(
            &Path::new(&file_dir).join(format!("{file_name}.{}", ctx.file.extension())),
        );
        log::debug!("Generated new file path: '{}'", base.display());

        if base == ctx.file.path {
            return Err(PathError::NoChange(base));
        }

        let mut candidate = base.clone();
        let mut suffixes = DuplicateSuffixes::new(&base, &path_config.duplicate_suffix_template);
        while exists(&candidate) {
            candidate = suffixes.next_path();
            log::debug!(
                "File exists at generated path, trying '{}'",
                candidate.display()
            );
            // A suffix can coincidentally reproduce the original path
            if candidate == ctx.file.path {
                return Err(PathError::NoChange(candidate));
            }
        }

        if let Some(max_len) = path_config.max_path_length {
            if path_len(&candidate) > max_len {
                let Some(token) = removal_order.next() else {
                    return Err(PathError::TooLong(candidate));
                };
                log::debug!(
                    "Path too long ({} chars), removing '{}' from file name template",
                    path_len(&candidate),
                    token
                );
                name_template = name_template.replace(token.as_str(), "");
                continue;
            }
        }

        log::debug!("Final new file path: '{}'", candidate.display());
        return Ok(candidate);
    }
}

/// Restartable lazy sequence of collision-avoidance candidates: the base path
/// with `{num}` = 1, 2, 3, ... substituted into the suffix template before
/// the extension.
struct DuplicateSuffixes<'a> {
    base: &'a Path,
    template: &'a str,
    num: u32,
}

impl<'a> DuplicateSuffixes<'a> {
    fn new(base: &'a Path, template: &'a str) -> Self {
        Self {
            base,
            template,
            num: 0,
        }
    }

    fn next_path(&mut self) -> PathBuf {
        self.num += 1;
        let suffix = self.template.replace("{num}", &self.num.to_string());
        let stem = self
            .base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = match self.base.extension() {
            Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
            None => format!("{stem}{suffix}"),
        };
        self.base.with_file_name(file_name)
    }
}

/// Absolute, lexically normalized form: resolves against the current
/// directory when relative, drops `.` components and folds `..` ones. No
/// filesystem access, so nonexistent destinations normalize fine.
pub fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            c => out.push(c.as_os_str()),
        }
    }
    out
}

/// Length in characters, matching how the budget is configured.
fn path_len(path: &Path) -> usize {
    path.to_string_lossy().chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use std::cell::Cell;

    fn path_config() -> PathConfig {
        PathConfig::default()
    }

    /// An existence probe that reports "taken" for the first `n` queries.
    fn taken_n(n: usize) -> impl Fn(&Path) -> bool {
        let remaining = Cell::new(n);
        move |_: &Path| {
            if remaining.get() > 0 {
                remaining.set(remaining.get() - 1);
                true
            } else {
                false
            }
        }
    }

    #[test]
    fn test_simple_fill() {
        let (scene, studios, variables) = testutil::fixture();
        let ctx = testutil::ctx(&scene, &studios, &variables);
        let path = build_new_path(
            &ctx,
            &path_config(),
            "{studio} - {title}",
            "/library/{studio}",
            &|_| false,
        )
        .unwrap();
        assert_eq!(
            path,
            PathBuf::from("/library/Studio A/Studio A - Scene Title.mp4")
        );
    }

    #[test]
    fn test_duplicate_suffixes() {
        let (scene, studios, variables) = testutil::fixture();
        let ctx = testutil::ctx(&scene, &studios, &variables);

        for suffix_template in ["_({num})", "__({num})", "({num})", " {num}"] {
            for count in [1usize, 2, 3, 13] {
                let mut config = path_config();
                config.duplicate_suffix_template = suffix_template.to_string();
                let path = build_new_path(
                    &ctx,
                    &config,
                    "{title}",
                    "/library",
                    &taken_n(count),
                )
                .unwrap();
                let expected_suffix = suffix_template.replace("{num}", &count.to_string());
                assert_eq!(
                    path,
                    PathBuf::from(format!("/library/Scene Title{expected_suffix}.mp4")),
                    "suffix '{suffix_template}' x{count}"
                );
            }
        }
    }

    #[test]
    fn test_no_change_on_first_fill() {
        let (mut scene, studios, variables) = testutil::fixture();
        scene.files[0].path = PathBuf::from("/library/Scene Title.mp4");
        let ctx = testutil::ctx(&scene, &studios, &variables);
        let result = build_new_path(&ctx, &path_config(), "{title}", "/library", &|_| false);
        assert!(matches!(result, Err(PathError::NoChange(_))));
    }

    #[test]
    fn test_no_change_via_coincidental_suffix() {
        let (mut scene, studios, variables) = testutil::fixture();
        scene.files[0].path = PathBuf::from("/library/Scene Title (2).mp4");
        let ctx = testutil::ctx(&scene, &studios, &variables);
        // Two collisions: (1), then (2) which is the file's current path
        let result = build_new_path(&ctx, &path_config(), "{title}", "/library", &taken_n(2));
        assert!(matches!(result, Err(PathError::NoChange(_))));
    }

    #[test]
    fn test_length_degrade_strips_token() {
        let (scene, studios, variables) = testutil::fixture();
        let ctx = testutil::ctx(&scene, &studios, &variables);
        let mut config = path_config();
        // The un-degraded path is 42 chars; stripping {studio} from the file
        // name brings it under the budget
        config.max_path_length = Some(40);
        config.template_variable_removal_order = vec!["{studio}".to_string()];
        let path = build_new_path(
            &ctx,
            &config,
            "{studio} {title}",
            "/library/{studio}",
            &|_| false,
        )
        .unwrap();
        // Token text removed entirely; whitespace collapse eats the gap, and
        // the directory template is never degraded
        assert_eq!(path, PathBuf::from("/library/Studio A/Scene Title.mp4"));
    }

    #[test]
    fn test_length_exhaustion_reports_last_path() {
        let (scene, studios, variables) = testutil::fixture();
        let ctx = testutil::ctx(&scene, &studios, &variables);
        let mut config = path_config();
        config.max_path_length = Some(10);
        config.template_variable_removal_order = vec!["{studio}".to_string()];
        let result = build_new_path(
            &ctx,
            &config,
            "{studio} {title}",
            "/library/{studio}",
            &|_| false,
        );
        match result {
            Err(PathError::TooLong(path)) => {
                assert_eq!(path, PathBuf::from("/library/Studio A/Scene Title.mp4"));
            }
            other => panic!("expected TooLong, got {other:?}"),
        }
    }

    #[test]
    fn test_length_retry_resets_suffix_counter() {
        let (scene, studios, variables) = testutil::fixture();
        let ctx = testutil::ctx(&scene, &studios, &variables);
        let mut config = path_config();
        config.max_path_length = Some(40);
        config.template_variable_removal_order = vec!["{studio}".to_string()];
        // First attempt collides once, overruns the budget, second attempt
        // (degraded) collides once again: the suffix restarts at 1.
        let calls = Cell::new(0usize);
        let exists = |p: &Path| {
            calls.set(calls.get() + 1);
            // Only the un-suffixed candidates are "taken"
            !p.to_string_lossy().contains('(')
        };
        let path = build_new_path(
            &ctx,
            &config,
            "{studio} {title}",
            "/library/{studio}",
            &exists,
        )
        .unwrap();
        assert_eq!(
            path,
            PathBuf::from("/library/Studio A/Scene Title (1).mp4")
        );
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert!(absolutize(Path::new("relative/x")).is_absolute());
    }
}
