use std::path::Path;

use tracing::debug;

use super::Cache;

use crate::errors::OxyfloatErr;

impl Cache {
    const TABLE: &'static str = "frames";

    /// Open a cache file, creating it and any missing parent directories if needed.
    ///
    /// The file handle is released before this returns; every later operation reopens it.
    pub fn open(path: &dyn AsRef<Path>) -> Result<Self, OxyfloatErr> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let cache = Cache { path };
        cache.connect()?;

        Ok(cache)
    }

    /// Retrieve the path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a short lived connection for a single operation.
    pub(crate) fn connect(&self) -> Result<rusqlite::Connection, OxyfloatErr> {
        debug!("opening {}", self.path.display());

        let db_conn = rusqlite::Connection::open_with_flags(
            &self.path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE | rusqlite::OpenFlags::SQLITE_OPEN_CREATE,
        )?;

        Self::validate_db_structure(&db_conn)?;
        db_conn.execute_batch(include_str!("root/create_cache.sql"))?;

        Ok(db_conn)
    }

    /// Validate the database holds nothing but the cache table. An empty database is valid.
    fn validate_db_structure(db_conn: &rusqlite::Connection) -> Result<(), OxyfloatErr> {
        let mut stmt = db_conn.prepare("SELECT name FROM sqlite_master WHERE type='table'")?;

        let iter = stmt.query_map([], |row: &rusqlite::Row| {
            let name: String = row.get(0)?;
            Ok(name == Cache::TABLE)
        })?;

        for valid in iter {
            match valid {
                Ok(true) => {}
                Ok(false) => return Err(OxyfloatErr::InvalidSchema),
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }
}
