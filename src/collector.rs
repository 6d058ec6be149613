//! The retrieval pipeline: floats to catalogs to profiles to cached tables.

use std::rc::Rc;

use tracing::{debug, error, info, warn};

use crate::{
    cache::{Cache, Metadata},
    catalog,
    config::Config,
    dataset::{DatasetSource, OpendapSource},
    diagnostics::{Diagnostics, Verbosity},
    errors::OxyfloatErr,
    naming::{validate, CacheMode, Constraint},
    profile::{self, ProfileKey, ProfileTable},
    registry::{CatalogUrl, Registry},
    transport::{HttpTransport, Transport},
};

/// Collects float profile data, reading through a local cache.
///
/// Every profile is fetched from the network at most once per cache file. After that the cached
/// table, even an empty one, is returned as is.
pub struct Collector {
    config: Config,
    mode: CacheMode,
    cache: Cache,
    transport: Rc<dyn Transport>,
    datasets: Box<dyn DatasetSource>,
    diagnostics: Diagnostics,
}

impl Collector {
    /// Create a collector that reads from the configured servers.
    pub fn new(config: Config) -> Result<Self, OxyfloatErr> {
        let transport: Rc<dyn Transport> = Rc::new(HttpTransport::new());
        let datasets = Box::new(OpendapSource::new(
            Rc::clone(&transport),
            config.fill_value(),
        ));

        Self::with_sources(config, transport, datasets)
    }

    /// Create a collector that reads feeds through `transport` and profiles through `datasets`.
    pub fn with_sources(
        config: Config,
        transport: Rc<dyn Transport>,
        datasets: Box<dyn DatasetSource>,
    ) -> Result<Self, OxyfloatErr> {
        let diagnostics = Diagnostics::new(config.verbosity());
        let mode = CacheMode::for_cache_file(config.explicit_cache_file());

        let cache = diagnostics.scope(|| {
            let path = config.cache_file();
            match mode {
                CacheMode::Default => debug!("Using default cache file {}", path.display()),
                CacheMode::Fixed(_) => info!("Using fixed cache file {}", path.display()),
                CacheMode::Custom => info!("Using cache file {}", path.display()),
            }
            Cache::open(&path)
        })?;

        Ok(Collector {
            config,
            mode,
            cache,
            transport,
            datasets,
            diagnostics,
        })
    }

    /// Change how much is logged.
    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        let config = std::mem::take(&mut self.config);
        self.config = config.with_verbosity(verbosity);
        self.diagnostics = Diagnostics::new(verbosity);
    }

    /// The cache backing this collector.
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// The mode of the cache file.
    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn registry(&self) -> Registry<'_> {
        Registry::new(&self.cache, &*self.transport, &self.config)
    }

    /// Floats with an oxygen sensor that are not greylisted and have an age of at least
    /// `age_threshold`.
    pub fn oxygen_floats(&self, age_threshold: i64) -> Result<Vec<String>, OxyfloatErr> {
        self.diagnostics
            .scope(|| self.registry().oxygen_floats(age_threshold))
    }

    /// Catalog urls of the requested floats.
    pub fn catalog_urls<S: AsRef<str>>(&self, wmos: &[S]) -> Result<Vec<CatalogUrl>, OxyfloatErr> {
        self.diagnostics.scope(|| self.registry().catalog_urls(wmos))
    }

    /// Profile locations listed in a float's catalog. Never cached.
    pub fn profile_locations(&self, catalog_url: &str) -> Vec<String> {
        self.diagnostics
            .scope(|| catalog::profile_locations(&*self.transport, catalog_url))
    }

    /// Read and transform one profile, bypassing the cache.
    pub fn profile_table(
        &self,
        wmo: &str,
        location: &str,
        max_pressure: f64,
    ) -> Result<ProfileTable, OxyfloatErr> {
        self.diagnostics.scope(|| {
            profile::profile_table(&*self.datasets, wmo, location, &self.config, max_pressure)
        })
    }

    /// Collect the profiles of every float in `wmos`.
    ///
    /// Limits beyond what a fixed cache file declares are narrowed to the file's values. At most
    /// `max_profiles` profiles are read per float and only levels shallower than `max_pressure`
    /// are kept. Tables are appended to the returned table only if `merge` is set, otherwise the
    /// call just fills the cache.
    pub fn collect<S: AsRef<str>>(
        &self,
        wmos: &[S],
        max_profiles: Option<u64>,
        max_pressure: Option<u64>,
        merge: bool,
    ) -> Result<ProfileTable, OxyfloatErr> {
        self.diagnostics.scope(|| {
            let constraints = self.mode.constraints();
            let max_profiles = validate(Constraint::Profiles, max_profiles, &constraints);
            let max_pressure = validate(Constraint::Pressure, max_pressure, &constraints);

            let mut aggregate = ProfileTable::default();
            let catalogs = self.registry().catalog_urls(wmos)?;
            for (f, CatalogUrl { wmo, url }) in catalogs.iter().enumerate() {
                let float_msg = format!("WMO {}: Float {} of {}", wmo, f + 1, wmos.len());
                info!("{}", float_msg);

                let locations = catalog::profile_locations(&*self.transport, url);
                for (i, location) in locations.iter().enumerate() {
                    if i as u64 >= max_profiles {
                        info!("Stopping at max_profiles = {}", max_profiles);
                        break;
                    }

                    let key = match ProfileKey::derive(location) {
                        Ok(key) => key,
                        Err(err) => {
                            warn!("Skipping {}: {}", location, err);
                            continue;
                        }
                    };

                    let table = match self.cache.get::<ProfileTable>(key.as_str()) {
                        Ok(table) => table,
                        Err(err) if err.is_not_in_cache() => {
                            info!("{}, Profile {} of {}", float_msg, i + 1, locations.len());
                            match self.save_profile(&key, wmo, location, max_pressure as f64)? {
                                Some(table) => table,
                                None => continue,
                            }
                        }
                        Err(err) => return Err(err),
                    };

                    if merge {
                        aggregate.append(&table);
                    }
                }

                info!("Compacting cache file");
                self.cache.compact()?;
            }

            Ok(aggregate)
        })
    }

    // Transform one profile and store it, empty or not, under its key. `None` if the profile
    // could not be read; nothing is stored then, so the next run tries again.
    fn save_profile(
        &self,
        key: &ProfileKey,
        wmo: &str,
        location: &str,
        max_pressure: f64,
    ) -> Result<Option<ProfileTable>, OxyfloatErr> {
        let table =
            match profile::profile_table(&*self.datasets, wmo, location, &self.config, max_pressure)
            {
                Ok(table) => table,
                Err(err @ OxyfloatErr::RequiredVariableNotPresent { .. }) => {
                    warn!("{}", err);
                    ProfileTable::default()
                }
                Err(err) if err.is_fetch_failure() => {
                    error!("Skipping {} ({}): {}", key, location, err);
                    return Ok(None);
                }
                Err(err) => return Err(err),
            };

        let mut md = Metadata::new();
        md.insert("url".to_owned(), location.to_owned());
        self.cache.put(key.as_str(), &table, Some(&md))?;

        Ok(Some(table))
    }
}
