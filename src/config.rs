//! Options shared by the library and the command line tools.

use std::path::{Path, PathBuf};

use crate::diagnostics::Verbosity;

/// The variable holding the pressure axis.
pub const PRESSURE: &str = "PRES_ADJUSTED";
/// The variable holding the profile time.
pub const TIME: &str = "JULD";
/// The variable holding the profile longitude.
pub const LONGITUDE: &str = "LONGITUDE";
/// The variable holding the profile latitude.
pub const LATITUDE: &str = "LATITUDE";

/// Variables that become part of the row index instead of a column.
pub const COORDINATES: [&str; 4] = [PRESSURE, TIME, LONGITUDE, LATITUDE];

/// Get the default location of the growable cache file, `${HOME}/oxyfloat/oxyfloat_cache.db`.
pub fn default_cache_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("oxyfloat")
        .join("oxyfloat_cache.db")
}

/// Struct to package up the configuration of a `Collector`.
#[derive(Clone, Debug)]
pub struct Config {
    // How chatty the logs are
    verbosity: Verbosity,
    // None means use the default cache file
    cache_file: Option<PathBuf>,
    // Discard profiles without any oxygen reading
    oxygen_required: bool,
    // Float status table
    status_url: String,
    // Index of data assembly center paths
    global_url: String,
    // THREDDS catalog root
    thredds_url: String,
    // Variables pulled from each profile, coordinates included
    variables: Vec<String>,
    // Name of the oxygen variable checked when oxygen is required
    oxygen_variable: String,
    // Marker for missing values in the profile data
    fill_value: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            verbosity: Verbosity::Error,
            cache_file: None,
            oxygen_required: true,
            status_url: Self::DEFAULT_STATUS_URL.to_owned(),
            global_url: Self::DEFAULT_GLOBAL_URL.to_owned(),
            thredds_url: Self::DEFAULT_THREDDS_URL.to_owned(),
            variables: Self::DEFAULT_VARIABLES
                .iter()
                .map(|&v| v.to_owned())
                .collect(),
            oxygen_variable: "DOXY_ADJUSTED".to_owned(),
            fill_value: 99999.0,
        }
    }
}

impl Config {
    const DEFAULT_STATUS_URL: &'static str =
        "http://argo.jcommops.org/FTPRoot/Argo/Status/argo_all.txt";
    const DEFAULT_GLOBAL_URL: &'static str =
        "https://data-argo.ifremer.fr/ar_index_global_meta.txt";
    const DEFAULT_THREDDS_URL: &'static str =
        "http://tds0.ifremer.fr/thredds/catalog/CORIOLIS-ARGO-GDAC-OBS";
    const DEFAULT_VARIABLES: [&'static str; 7] = [
        "TEMP_ADJUSTED",
        "PSAL_ADJUSTED",
        "DOXY_ADJUSTED",
        PRESSURE,
        LATITUDE,
        LONGITUDE,
        TIME,
    ];

    /// Set the log verbosity.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Use this cache file instead of the default one.
    pub fn with_cache_file(mut self, cache_file: impl Into<PathBuf>) -> Self {
        self.cache_file = Some(cache_file.into());
        self
    }

    /// Keep profiles even if they have no oxygen data.
    pub fn with_oxygen_required(mut self, required: bool) -> Self {
        self.oxygen_required = required;
        self
    }

    /// Set the float status feed.
    pub fn with_status_url(mut self, url: impl Into<String>) -> Self {
        self.status_url = url.into();
        self
    }

    /// Set the global index feed.
    pub fn with_global_url(mut self, url: impl Into<String>) -> Self {
        self.global_url = url.into();
        self
    }

    /// Set the catalog server root.
    pub fn with_thredds_url(mut self, url: impl Into<String>) -> Self {
        self.thredds_url = url.into();
        self
    }

    /// Set the variables to extract. Duplicates are dropped, first occurrence wins.
    pub fn with_variables<I, S>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vars: Vec<String> = vec![];
        for v in variables.into_iter().map(Into::into) {
            if !vars.contains(&v) {
                vars.push(v);
            }
        }
        self.variables = vars;
        self
    }

    /// Set the variable used by the oxygen check.
    pub fn with_oxygen_variable(mut self, name: impl Into<String>) -> Self {
        self.oxygen_variable = name.into();
        self
    }

    /// Set the value that marks missing data in profile files.
    pub fn with_fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = fill_value;
        self
    }

    /// Get the verbosity.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Get the cache file that will be used.
    pub fn cache_file(&self) -> PathBuf {
        self.cache_file.clone().unwrap_or_else(default_cache_file)
    }

    /// Get the cache file only if one was explicitly set.
    pub fn explicit_cache_file(&self) -> Option<&Path> {
        self.cache_file.as_deref()
    }

    /// Whether profiles without oxygen are discarded.
    pub fn oxygen_required(&self) -> bool {
        self.oxygen_required
    }

    /// Get the status feed url.
    pub fn status_url(&self) -> &str {
        &self.status_url
    }

    /// Get the global index url.
    pub fn global_url(&self) -> &str {
        &self.global_url
    }

    /// Get the catalog server root.
    pub fn thredds_url(&self) -> &str {
        &self.thredds_url
    }

    /// Get all the configured variables.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// The configured variables that are not part of the row index.
    pub fn data_variables(&self) -> impl Iterator<Item = &str> {
        self.variables
            .iter()
            .map(String::as_str)
            .filter(|v| !COORDINATES.contains(v))
    }

    /// Get the oxygen variable name.
    pub fn oxygen_variable(&self) -> &str {
        &self.oxygen_variable
    }

    /// Get the fill value.
    pub fn fill_value(&self) -> f64 {
        self.fill_value
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!(cfg.oxygen_required());
        assert_eq!(cfg.verbosity(), Verbosity::Error);
        assert!(cfg.explicit_cache_file().is_none());
        assert!(cfg.cache_file().ends_with("oxyfloat/oxyfloat_cache.db"));
        assert_eq!(cfg.variables().len(), 7);
    }

    #[test]
    fn test_data_variables_skip_coordinates() {
        let cfg = Config::default();
        let data: Vec<&str> = cfg.data_variables().collect();
        assert_eq!(data, vec!["TEMP_ADJUSTED", "PSAL_ADJUSTED", "DOXY_ADJUSTED"]);
    }

    #[test]
    fn test_variables_deduplicated() {
        let cfg = Config::default().with_variables(vec!["A", "B", "A", PRESSURE]);
        assert_eq!(cfg.variables(), &["A", "B", PRESSURE]);
    }
}
