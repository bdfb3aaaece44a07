//! Persisted project state: the settings singleton, the four drawable
//! variant tables and their child point tables.
//!
//! Every public store operation is one discrete transaction; nothing holds
//! a transaction open across calls, so the interactive thread and the
//! export worker can share a project file through separate connections.

pub mod frames;
pub mod objects;
pub mod schema;
pub mod settings;

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::{CelError, CelResult};
use frames::FrameManager;
use objects::ObjectStore;
use settings::SettingsStore;

/// One connection to a project file.
pub struct ProjectDb {
    conn: Connection,
    path: PathBuf,
}

impl std::fmt::Debug for ProjectDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectDb")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ProjectDb {
    /// Open an existing project file. Fails if the settings row is absent.
    pub fn open(path: impl AsRef<Path>) -> CelResult<Self> {
        let db = Self::connect(path.as_ref())?;
        // Opening a file that was never populated is a storage error, not
        // an invitation to guess defaults.
        db.settings().load()?;
        Ok(db)
    }

    /// Create and populate a new project file. Refuses to clobber.
    pub fn create(path: impl AsRef<Path>) -> CelResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(CelError::validation(format!(
                "project file already exists: {}",
                path.display()
            )));
        }
        let db = Self::connect(path)?;
        schema::populate(&db.conn)?;
        log::info!("created project {}", path.display());
        Ok(db)
    }

    /// In-memory project with defaults, used by tests and previews.
    pub fn open_in_memory() -> CelResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::bootstrap(&conn)?;
        schema::populate(&conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    fn connect(path: &Path) -> CelResult<Self> {
        log::debug!("opening project store {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        schema::bootstrap(&conn)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> SettingsStore<'_> {
        SettingsStore::new(&self.conn)
    }

    pub fn objects(&self) -> ObjectStore<'_> {
        ObjectStore::new(&self.conn)
    }

    pub fn frames(&self) -> FrameManager<'_> {
        FrameManager::new(&self.conn)
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.sqlite");
        {
            let db = ProjectDb::create(&path).unwrap();
            assert_eq!(db.settings().load().unwrap().fps, 16);
        }
        let db = ProjectDb::open(&path).unwrap();
        assert_eq!(db.settings().load().unwrap().count_of_frames, 1);
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.sqlite");
        ProjectDb::create(&path).unwrap();
        assert!(matches!(
            ProjectDb::create(&path),
            Err(CelError::Validation(_))
        ));
    }

    #[test]
    fn test_open_unpopulated_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.sqlite");
        // An empty database file: schema gets bootstrapped on open, but
        // the settings row was never inserted.
        drop(Connection::open(&path).unwrap());
        assert!(matches!(ProjectDb::open(&path), Err(CelError::Storage(_))));
    }
}
