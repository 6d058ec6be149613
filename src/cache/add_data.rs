use std::io::Write;

use serde::Serialize;
use tracing::debug;

use super::{Cache, Metadata};

use crate::errors::OxyfloatErr;

impl Cache {
    /// Store a table under `key`, replacing anything already stored under that exact key.
    pub fn put<T>(&self, key: &str, table: &T, metadata: Option<&Metadata>) -> Result<(), OxyfloatErr>
    where
        T: Serialize + ?Sized,
    {
        debug!("saving \"{}\" to {}", key, self.path.display());

        let mut encoder = flate2::write::GzEncoder::new(vec![], flate2::Compression::default());
        serde_json::to_writer(&mut encoder, table)?;
        encoder.flush()?;
        let data = encoder.finish()?;

        let metadata = metadata.map(serde_json::to_string).transpose()?;

        let db_conn = self.connect()?;
        db_conn.execute(
            "INSERT OR REPLACE INTO frames (key, data, metadata) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, data, metadata],
        )?;

        Ok(())
    }

    /// Remove an entry from the cache. Removing a missing key is not an error.
    pub fn remove(&self, key: &str) -> Result<(), OxyfloatErr> {
        debug!("removing \"{}\" from {}", key, self.path.display());

        let db_conn = self.connect()?;
        db_conn.execute("DELETE FROM frames WHERE key = ?1", [key])?;

        Ok(())
    }
}
