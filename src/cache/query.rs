use serde::de::DeserializeOwned;
use tracing::debug;

use super::{Cache, Metadata};

use crate::errors::OxyfloatErr;

impl Cache {
    /// Retrieve the table stored under `key`.
    ///
    /// A missing key is `OxyfloatErr::NotInCache`, anything else is a real failure.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, OxyfloatErr> {
        debug!("getting \"{}\" from {}", key, self.path.display());

        let db_conn = self.connect()?;
        let data: Result<Vec<u8>, _> =
            db_conn.query_row("SELECT data FROM frames WHERE key = ?1", [key], |row| {
                row.get(0)
            });

        let data = match data {
            Ok(data) => data,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(OxyfloatErr::NotInCache(key.to_owned()))
            }
            Err(x) => return Err(OxyfloatErr::Database(x)),
        };

        let decoder = flate2::read::GzDecoder::new(&data[..]);
        Ok(serde_json::from_reader(decoder)?)
    }

    /// Retrieve the metadata stored alongside `key`, if any was stored.
    pub fn metadata(&self, key: &str) -> Result<Option<Metadata>, OxyfloatErr> {
        let db_conn = self.connect()?;
        let metadata: Result<Option<String>, _> = db_conn.query_row(
            "SELECT metadata FROM frames WHERE key = ?1",
            [key],
            |row| row.get(0),
        );

        match metadata {
            Ok(Some(text)) => Ok(Some(serde_json::from_str(&text)?)),
            Ok(None) => Ok(None),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(OxyfloatErr::NotInCache(key.to_owned())),
            Err(x) => Err(OxyfloatErr::Database(x)),
        }
    }

    /// Check whether anything is stored under `key`.
    pub fn contains(&self, key: &str) -> Result<bool, OxyfloatErr> {
        let db_conn = self.connect()?;
        let num_records: i64 = db_conn.query_row(
            "SELECT COUNT(*) FROM frames WHERE key = ?1",
            [key],
            |row| row.get(0),
        )?;

        Ok(num_records == 1)
    }

    /// All keys in the order they were last written.
    pub fn keys(&self) -> Result<Vec<String>, OxyfloatErr> {
        let db_conn = self.connect()?;
        let mut stmt = db_conn.prepare("SELECT key FROM frames ORDER BY seq")?;

        let vals: Result<Vec<String>, OxyfloatErr> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|res| res.map_err(OxyfloatErr::Database))
            .collect();

        vals
    }
}
