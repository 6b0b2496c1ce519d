//! Rename pipeline: for each scene file, pick templates, build the new path,
//! move the file on disk and update the catalog database. Per-file failures
//! are logged and counted; only configuration errors and a desynchronized
//! catalog abort the run.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

use crate::config::Config;
use crate::db::{CatalogDb, DbError};
use crate::model::{Scene, SceneFile, Studio};
use crate::paths::{self, PathError};
use crate::template::filters::{self, FilterError};
use crate::template::{TemplateContext, TemplateError};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Db(#[from] DbError),
}

#[derive(Error, Debug)]
pub enum RenameError {
    #[error("source file does not exist: {0}")]
    SourceMissing(PathBuf),
    #[error("a file already exists at the destination: {0}")]
    DestinationExists(PathBuf),
    #[error("source and destination are not both regular files: {src} -> {dst}")]
    TypeMismatch { src: PathBuf, dst: PathBuf },
    #[error("permission denied renaming {src} -> {dst}")]
    PermissionDenied { src: PathBuf, dst: PathBuf },
    #[error("failed to rename {src} -> {dst}: {source}")]
    Io {
        src: PathBuf,
        dst: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RenameStats {
    /// Files considered (scenes with no files are not counted).
    pub files: usize,
    pub renamed: usize,
    /// No matching template, no change, or path too long.
    pub skipped: usize,
    pub errors: usize,
}

/// Run the rename pipeline over `scenes`. Respects `config.dry_run`: in a dry
/// run neither the filesystem nor the catalog database is touched, and the
/// database is never even opened.
pub fn process_scenes(
    config: &Config,
    scenes: &[Scene],
    studios: &[Studio],
) -> Result<RenameStats, ProcessError> {
    let db = if config.dry_run {
        None
    } else {
        Some(CatalogDb::open(&config.database_path)?)
    };

    let mut stats = RenameStats::default();

    let pb = ProgressBar::new(scenes.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} scenes ({eta}) {msg}",
        )
        .unwrap()
        .progress_chars("#>-"),
    );

    for scene in scenes {
        pb.set_message(scene.title.clone().unwrap_or_default());
        if scene.files.is_empty() {
            log::info!("Scene {} has no files, skipping", scene.id);
            pb.inc(1);
            continue;
        }
        for file in &scene.files {
            stats.files += 1;
            process_file(config, db.as_ref(), scene, studios, file, &mut stats)?;
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(stats)
}

fn process_file(
    config: &Config,
    db: Option<&CatalogDb>,
    scene: &Scene,
    studios: &[Studio],
    file: &SceneFile,
    stats: &mut RenameStats,
) -> Result<(), ProcessError> {
    let Some(name_template) =
        filters::find_matching_template(scene, studios, file, &config.file_name_templates)?
    else {
        log::info!(
            "No file name template matches '{}', skipping",
            file.path.display()
        );
        stats.skipped += 1;
        return Ok(());
    };
    let Some(dir_template) =
        filters::find_matching_template(scene, studios, file, &config.file_dir_templates)?
    else {
        log::info!(
            "No directory template matches '{}', skipping",
            file.path.display()
        );
        stats.skipped += 1;
        return Ok(());
    };

    let ctx = TemplateContext {
        scene,
        studios,
        file,
        variables: &config.template_variables,
    };
    let new_path = match paths::build_new_path(
        &ctx,
        &config.path,
        name_template,
        dir_template,
        &|p: &Path| p.is_file(),
    ) {
        Ok(path) => path,
        Err(PathError::NoChange(path)) => {
            log::info!("'{}' is already named correctly, skipping", path.display());
            stats.skipped += 1;
            return Ok(());
        }
        Err(PathError::TooLong(path)) => {
            log::warn!(
                "Could not build a short enough path for '{}' (last attempt: '{}'), skipping",
                file.path.display(),
                path.display()
            );
            stats.skipped += 1;
            return Ok(());
        }
        Err(PathError::Template(err)) => return Err(err.into()),
    };

    if let Err(err) = rename_file(&file.path, &new_path, config.dry_run) {
        log::error!("{err}");
        stats.errors += 1;
        return Ok(());
    }

    if let Some(db) = db {
        if let Err(err) = db.rename_file(file, &new_path) {
            log::error!(
                "Catalog update failed for '{}': {err}; rolling back rename",
                new_path.display()
            );
            if let Err(rollback_err) = rename_file(&new_path, &file.path, false) {
                log::error!("Rollback failed, file left at new path: {rollback_err}");
            }
            // A missing library root will fail for every file; stop here
            if matches!(err, DbError::LibraryRootMissing(_)) {
                return Err(err.into());
            }
            stats.errors += 1;
            return Ok(());
        }
    }

    stats.renamed += 1;
    Ok(())
}

/// Move a file on disk, creating the destination directory as needed. In a
/// dry run only logs what would happen.
pub fn rename_file(src: &Path, dst: &Path, dry_run: bool) -> Result<(), RenameError> {
    if dry_run {
        log::info!(
            "[DRYRUN] [RENAME] '{}' --> '{}'",
            src.display(),
            dst.display()
        );
        return Ok(());
    }

    if !src.is_file() {
        return Err(RenameError::SourceMissing(src.to_path_buf()));
    }
    if dst.exists() {
        return Err(RenameError::DestinationExists(dst.to_path_buf()));
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|source| RenameError::Io {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            source,
        })?;
    }

    fs::rename(src, dst).map_err(|source| match source.kind() {
        ErrorKind::PermissionDenied => RenameError::PermissionDenied {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        },
        ErrorKind::IsADirectory | ErrorKind::NotADirectory => RenameError::TypeMismatch {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        },
        _ => RenameError::Io {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            source,
        },
    })?;

    log::info!("[RENAME] '{}' --> '{}'", src.display(), dst.display());
    Ok(())
}
