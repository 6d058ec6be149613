//! Offline maintenance of the cache file.

use tracing::{debug, info};

use super::Cache;

use crate::errors::OxyfloatErr;

impl Cache {
    /// Rewrite the backing file densely.
    ///
    /// Entries and their order are untouched, so this can run after every float and as often as
    /// wanted.
    pub fn compact(&self) -> Result<(), OxyfloatErr> {
        let size_before = std::fs::metadata(&self.path).map(|md| md.len()).ok();

        let db_conn = self.connect()?;
        info!("compacting cache file {}", self.path.display());
        db_conn.execute_batch("VACUUM")?;
        drop(db_conn);

        let size_after = std::fs::metadata(&self.path).map(|md| md.len()).ok();
        debug!("cache file size {:?} -> {:?} bytes", size_before, size_after);

        Ok(())
    }
}
