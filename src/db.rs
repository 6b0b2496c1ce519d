//! Catalog database access. The catalog stores the library tree in SQLite:
//! a `folders` table (id, path, parent_folder_id, timestamps) and a `files`
//! table (id, basename, parent_folder_id, mod_time, ...). After a rename on
//! disk, the file's row must point at the folder record for its new parent
//! directory, creating missing folder records down from the nearest known
//! ancestor.

use std::path::{Path, PathBuf};

use chrono::{Local, SecondsFormat};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use thiserror::Error;

use crate::model::SceneFile;
use crate::paths::absolutize;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// No ancestor of the destination directory has a folder record. The
    /// library root was never scanned by the catalog; renaming into it would
    /// desynchronize catalog and disk, so this stops the run.
    #[error(
        "no ancestor of '{0}' is registered in the catalog; add the destination \
         to a catalog library and scan it first"
    )]
    LibraryRootMissing(PathBuf),
}

pub struct CatalogDb {
    conn: Connection,
}

impl CatalogDb {
    /// Open the catalog database read-write. The database must already exist;
    /// this tool never creates or migrates a catalog.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Point the file's catalog record at its new location: resolve (or
    /// create) the folder record for the new parent directory, then update
    /// basename, parent folder and mod time.
    pub fn rename_file(&self, file: &SceneFile, new_path: &Path) -> Result<(), DbError> {
        log::debug!(
            "[catalog] renaming file (id={}): '{}' --> '{}'",
            file.id,
            file.path.display(),
            new_path.display()
        );

        let parent = new_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| new_path.to_path_buf());
        let folder_id = self.folder_id_or_create(&parent)?;

        let basename = new_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.conn.execute(
            "UPDATE files SET basename = ?1, parent_folder_id = ?2, mod_time = ?3 WHERE id = ?4",
            params![basename, folder_id, current_time(), file.id],
        )?;
        Ok(())
    }

    /// Folder record id for `path`, creating missing records as needed: walk
    /// up until an existing folder is found, then insert the missing chain
    /// downward, each new folder pointing at the previous as parent.
    fn folder_id_or_create(&self, path: &Path) -> Result<i64, DbError> {
        let path = absolutize(path);

        if let Some(id) = self.find_folder_id(&path)? {
            log::debug!("[catalog] found folder (id={id}): '{}'", path.display());
            return Ok(id);
        }

        let mut missing = vec![path.clone()];
        let mut cursor = path.clone();
        let mut parent_id = loop {
            let Some(parent) = cursor.parent().map(Path::to_path_buf) else {
                return Err(DbError::LibraryRootMissing(path));
            };
            if let Some(id) = self.find_folder_id(&parent)? {
                log::debug!(
                    "[catalog] found ancestor folder (id={id}): '{}'",
                    parent.display()
                );
                break id;
            }
            missing.push(parent.clone());
            cursor = parent;
        };

        // Missing chain is target-first; insert top-down
        for folder in missing.iter().rev() {
            parent_id = self.insert_folder(folder, parent_id)?;
        }
        Ok(parent_id)
    }

    fn find_folder_id(&self, path: &Path) -> Result<Option<i64>, DbError> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM folders WHERE path = ?1",
                [path.to_string_lossy()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn insert_folder(&self, path: &Path, parent_folder_id: i64) -> Result<i64, DbError> {
        let now = current_time();
        self.conn.execute(
            "INSERT INTO folders (path, parent_folder_id, mod_time, created_at, updated_at, zip_file_id)
             VALUES (?1, ?2, ?3, ?3, ?3, NULL)",
            params![path.to_string_lossy(), parent_folder_id, now],
        )?;
        let id = self.conn.last_insert_rowid();
        log::debug!(
            "[catalog] created folder (id={id}) (parent_folder_id={parent_folder_id}): '{}'",
            path.display()
        );
        Ok(id)
    }
}

/// Local time, RFC 3339, seconds precision: the catalog's timestamp format.
fn current_time() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

#[cfg(test)]
pub(crate) fn create_catalog_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE folders (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            path            TEXT NOT NULL UNIQUE,
            parent_folder_id INTEGER,
            mod_time        TEXT,
            created_at      TEXT,
            updated_at      TEXT,
            zip_file_id     INTEGER
        );

        CREATE TABLE files (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            basename        TEXT NOT NULL,
            parent_folder_id INTEGER NOT NULL,
            mod_time        TEXT
        );
        ",
    )
}
