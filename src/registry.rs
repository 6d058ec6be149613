//! Reference tables: which floats carry oxygen sensors, and where their data lives.
//!
//! Both tables are fetched once and then served from the cache forever. If the upstream feeds
//! change (a float is greylisted, say) the cache will not notice until the `status` or
//! `global_meta` entry is removed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    cache::{Cache, Metadata},
    config::Config,
    errors::OxyfloatErr,
    transport::Transport,
};

/// Cache key of the float status table.
pub const STATUS_KEY: &str = "status";
/// Cache key of the global index table.
pub const GLOBAL_META_KEY: &str = "global_meta";

const CATALOG_SUFFIX: &str = "/profiles/catalog.xml";

/// One row of the float status feed.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatRecord {
    pub wmo: String,
    pub oxygen: bool,
    pub greylist: bool,
    pub age: i64,
}

impl FloatRecord {
    /// True if this float should be used for oxygen work at `age_threshold`.
    pub fn qualifies(&self, age_threshold: i64) -> bool {
        self.oxygen && !self.greylist && self.age != 0 && self.age >= age_threshold
    }
}

// The columns of the status feed this crate uses, everything else is ignored.
#[derive(Debug, Deserialize)]
struct StatusRow {
    #[serde(rename = "WMO")]
    wmo: String,
    #[serde(rename = "OXYGEN", default, deserialize_with = "csv::invalid_option")]
    oxygen: Option<i64>,
    #[serde(rename = "GREYLIST", default, deserialize_with = "csv::invalid_option")]
    greylist: Option<i64>,
    #[serde(rename = "AGE", default, deserialize_with = "csv::invalid_option")]
    age: Option<i64>,
}

impl From<StatusRow> for FloatRecord {
    fn from(row: StatusRow) -> Self {
        FloatRecord {
            wmo: row.wmo,
            oxygen: row.oxygen.unwrap_or(0) == 1,
            greylist: row.greylist.unwrap_or(0) != 0,
            age: row.age.unwrap_or(0),
        }
    }
}

/// One row of the global index, `file` looks like `<dac>/<wmo>/<wmo>_meta.nc`.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub file: String,
    #[serde(default)]
    pub profiler_type: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub date_update: Option<String>,
}

impl RegistryEntry {
    /// The float identifier embedded in the path.
    pub fn wmo(&self) -> Option<&str> {
        self.file.split('/').nth(1)
    }

    /// The `<dac>/<wmo>` part of the path.
    pub fn dac_path(&self) -> String {
        self.file.split('/').take(2).collect::<Vec<_>>().join("/")
    }
}

/// Where to find the profile catalog for one float.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogUrl {
    pub wmo: String,
    pub url: String,
}

/// Decode the UTF-16LE status payload and drop its leading marker.
pub fn decode_status_text(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));

    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .skip(1)
        .collect()
}

/// Parse the decoded status feed.
pub fn parse_status(text: &str) -> Result<Vec<FloatRecord>, OxyfloatErr> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    reader
        .deserialize::<StatusRow>()
        .map(|row| row.map(FloatRecord::from).map_err(OxyfloatErr::from))
        .collect()
}

/// Parse the global index, skipping `#` comment lines.
pub fn parse_global_index(bytes: &[u8]) -> Result<Vec<RegistryEntry>, OxyfloatErr> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    reader
        .deserialize::<RegistryEntry>()
        .map(|row| row.map_err(OxyfloatErr::from))
        .collect()
}

/// Build the catalog url for a `<dac>/<wmo>` path under the server root.
pub fn catalog_url(thredds_url: &str, dac_path: &str) -> String {
    format!(
        "{}/{}{}",
        thredds_url.trim_end_matches('/'),
        dac_path.trim_start_matches('/'),
        CATALOG_SUFFIX
    )
}

/// Cache-first access to the reference tables.
pub struct Registry<'a> {
    cache: &'a Cache,
    transport: &'a dyn Transport,
    config: &'a Config,
}

impl<'a> Registry<'a> {
    /// Create a view over a cache, a transport and the feed urls.
    pub fn new(cache: &'a Cache, transport: &'a dyn Transport, config: &'a Config) -> Self {
        Registry {
            cache,
            transport,
            config,
        }
    }

    /// The status table, fetched and cached on first use.
    pub fn status(&self) -> Result<Vec<FloatRecord>, OxyfloatErr> {
        match self.cache.get(STATUS_KEY) {
            Ok(table) => return Ok(table),
            Err(err) if err.is_not_in_cache() => {
                debug!("Could not read status from cache, loading it.");
            }
            Err(err) => return Err(err),
        }

        let url = self.config.status_url();
        info!("Reading data from {}", url);
        let table = parse_status(&decode_status_text(&self.transport.get(url)?))?;
        self.cache.put(STATUS_KEY, &table, Some(&source_metadata(url)))?;

        Ok(table)
    }

    /// The global index, fetched and cached on first use.
    pub fn global_index(&self) -> Result<Vec<RegistryEntry>, OxyfloatErr> {
        match self.cache.get(GLOBAL_META_KEY) {
            Ok(table) => return Ok(table),
            Err(err) if err.is_not_in_cache() => {
                debug!("Could not read global_meta, putting it into cache.");
            }
            Err(err) => return Err(err),
        }

        let url = self.config.global_url();
        info!("Reading data from {}", url);
        let table = parse_global_index(&self.transport.get(url)?)?;
        self.cache
            .put(GLOBAL_META_KEY, &table, Some(&source_metadata(url)))?;

        Ok(table)
    }

    /// Floats with oxygen, not greylisted, with a nonzero age of at least `age_threshold`.
    ///
    /// Order follows the status feed.
    pub fn oxygen_floats(&self, age_threshold: i64) -> Result<Vec<String>, OxyfloatErr> {
        Ok(self
            .status()?
            .into_iter()
            .filter(|rec| rec.qualifies(age_threshold))
            .map(|rec| rec.wmo)
            .collect())
    }

    /// Catalog urls for the requested floats, in global index order.
    ///
    /// Floats missing from the index are left out.
    pub fn catalog_urls<S: AsRef<str>>(&self, wmos: &[S]) -> Result<Vec<CatalogUrl>, OxyfloatErr> {
        let wanted: HashSet<&str> = wmos.iter().map(|w| w.as_ref()).collect();
        let mut seen: HashSet<String> = HashSet::new();

        let mut urls = vec![];
        for entry in self.global_index()? {
            let wmo = match entry.wmo() {
                Some(wmo) if wanted.contains(wmo) => wmo.to_owned(),
                _ => continue,
            };

            if seen.insert(wmo.clone()) {
                let url = catalog_url(self.config.thredds_url(), &entry.dac_path());
                urls.push(CatalogUrl { wmo, url });
            }
        }

        debug!("Found {} dac_urls", urls.len());

        Ok(urls)
    }
}

fn source_metadata(url: &str) -> Metadata {
    let mut md = Metadata::new();
    md.insert("url".to_owned(), url.to_owned());
    md
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::cache::unit::*; // test helpers.
    use crate::collector::unit::*; // fakes.

    const STATUS: &str = "PROGRAM,WMO,OXYGEN,GREYLIST,AGE,STATUS\n\
                          US-SOCCOM,1900650,1,0,400,ACTIVE\n\
                          US-ARGO,1901158,1,1,900,ACTIVE\n\
                          US-ARGO,1900722,1,0,0,ACTIVE\n\
                          US-ARGO,1900999,0,0,500,ACTIVE\n\
                          FR-ARGO,6900001,1,0,3000,INACTIVE\n";

    const GLOBAL: &str = "# Title : Metadata directory file of the Argo Global Data Assembly Center\n\
                          # FTP root number 1 : ftp://ftp.ifremer.fr/ifremer/argo/dac\n\
                          file,profiler_type,institution,date_update\n\
                          aoml/1900650/1900650_meta.nc,846,AO,20150925071317\n\
                          coriolis/6900001/6900001_meta.nc,841,IF,20140101000000\n\
                          aoml/1901158/1901158_meta.nc,846,AO,20151001000000\n";

    #[test]
    fn test_decode_status_text_drops_marker() {
        let text = decode_status_text(&utf16le("WMO,AGE\n1,2\n"));
        assert_eq!(text, "WMO,AGE\n1,2\n");
    }

    #[test]
    fn test_parse_status_tolerates_blank_cells() {
        let table = parse_status("WMO,OXYGEN,GREYLIST,AGE\n1900650,1,,abc\n")
            .expect("Error parsing status.");
        assert_eq!(
            table,
            vec![FloatRecord {
                wmo: "1900650".to_owned(),
                oxygen: true,
                greylist: false,
                age: 0,
            }]
        );
    }

    #[test]
    fn test_oxygen_floats_filter_and_order() {
        let TestCache { tmp: _tmp, cache } =
            create_test_cache("cache.db").expect("Failed to create test cache.");
        let transport = FakeTransport::new().with_body(STATUS_URL, utf16le(STATUS));
        let config = test_config();

        let registry = Registry::new(&cache, &transport, &config);
        let floats = registry.oxygen_floats(340).expect("Error reading status.");

        assert_eq!(floats, vec!["1900650", "6900001"]);
    }

    #[test]
    fn test_single_row_scenario() {
        let TestCache { tmp: _tmp, cache } =
            create_test_cache("cache.db").expect("Failed to create test cache.");
        let transport = FakeTransport::new().with_body(
            STATUS_URL,
            utf16le("WMO,OXYGEN,GREYLIST,AGE\n1900650,1,0,400\n"),
        );
        let config = test_config();

        let registry = Registry::new(&cache, &transport, &config);
        assert_eq!(registry.oxygen_floats(340).unwrap(), vec!["1900650"]);
    }

    #[test]
    fn test_zero_age_always_excluded() {
        let TestCache { tmp: _tmp, cache } =
            create_test_cache("cache.db").expect("Failed to create test cache.");
        let transport = FakeTransport::new().with_body(
            STATUS_URL,
            utf16le("WMO,OXYGEN,GREYLIST,AGE\n1900722,1,0,0\n"),
        );
        let config = test_config();

        let registry = Registry::new(&cache, &transport, &config);
        assert!(registry.oxygen_floats(0).unwrap().is_empty());
        assert!(registry.oxygen_floats(-10).unwrap().is_empty());
    }

    #[test]
    fn test_status_cached_after_first_fetch() {
        let TestCache { tmp: _tmp, cache } =
            create_test_cache("cache.db").expect("Failed to create test cache.");
        let transport = FakeTransport::new().with_body(STATUS_URL, utf16le(STATUS));
        let config = test_config();

        let registry = Registry::new(&cache, &transport, &config);
        let first = registry.oxygen_floats(340).unwrap();
        let second = registry.oxygen_floats(340).unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.count(STATUS_URL), 1);
        assert_eq!(
            cache.metadata(STATUS_KEY).unwrap().unwrap().get("url").unwrap(),
            STATUS_URL
        );
    }

    #[test]
    fn test_status_fetch_failure_is_fatal() {
        let TestCache { tmp: _tmp, cache } =
            create_test_cache("cache.db").expect("Failed to create test cache.");
        let transport = FakeTransport::new();
        let config = test_config();

        let registry = Registry::new(&cache, &transport, &config);
        assert!(registry.oxygen_floats(340).is_err());
        assert!(!cache.contains(STATUS_KEY).unwrap());
    }

    #[test]
    fn test_catalog_urls() {
        let TestCache { tmp: _tmp, cache } =
            create_test_cache("cache.db").expect("Failed to create test cache.");
        let transport = FakeTransport::new().with_body(GLOBAL_URL, GLOBAL);
        let config = test_config();

        let registry = Registry::new(&cache, &transport, &config);
        let urls = registry
            .catalog_urls(&["1901158", "1900650", "5555555"])
            .expect("Error reading index.");

        assert_eq!(
            urls,
            vec![
                CatalogUrl {
                    wmo: "1900650".to_owned(),
                    url: format!("{}/aoml/1900650/profiles/catalog.xml", THREDDS_URL),
                },
                CatalogUrl {
                    wmo: "1901158".to_owned(),
                    url: format!("{}/aoml/1901158/profiles/catalog.xml", THREDDS_URL),
                },
            ]
        );

        registry.catalog_urls(&["6900001"]).unwrap();
        assert_eq!(transport.count(GLOBAL_URL), 1);
    }

    #[test]
    fn test_catalog_url_joins_with_single_slash() {
        assert_eq!(
            catalog_url("http://host/thredds/catalog/ROOT/", "aoml/1900650"),
            "http://host/thredds/catalog/ROOT/aoml/1900650/profiles/catalog.xml"
        );
        assert_eq!(
            catalog_url("http://host/thredds/catalog/ROOT", "aoml/1900650"),
            "http://host/thredds/catalog/ROOT/aoml/1900650/profiles/catalog.xml"
        );
    }
}
