#![deny(missing_docs)]
//! Package to collect Argo float oxygen profiles into a local cache.
//!
//! Floats are selected from the Argo status feed, located through the global index and the
//! THREDDS catalogs, and each profile file is read over OPeNDAP into a `ProfileTable`. Every
//! table is stored in a single sqlite cache file, so a profile is fetched from the network at
//! most once per cache file.
//!
//! A cache file named `oxyfloat_fixed_cache[_age<n>][_profiles<n>][_pressure<n>].db` is a fixed
//! cache file: requests against it are narrowed to the limits in its name. Entries are never
//! refreshed; remove a key or delete the file to fetch it again.

//
// Public API
//
pub use crate::cache::{Cache, Metadata};
pub use crate::catalog::{parse_catalog, profile_locations};
pub use crate::collector::Collector;
pub use crate::config::{default_cache_file, Config};
pub use crate::dataset::{
    julian_day_to_datetime, Dataset, DatasetErr, DatasetSource, MemoryDataset, OpendapSource,
    Values,
};
pub use crate::diagnostics::{Diagnostics, Verbosity};
pub use crate::errors::OxyfloatErr;
pub use crate::naming::{
    decode, encode, fixed_cache_file_name, validate, CacheConstraints, CacheMode, Constraint,
    CACHE_EXTENSION, FIXED_CACHE_BASE, UNLIMITED,
};
pub use crate::profile::{ProfileKey, ProfileRow, ProfileTable, RowIndex};
pub use crate::registry::{CatalogUrl, FloatRecord, Registry, RegistryEntry};
pub use crate::transport::{HttpTransport, Transport};
pub use crate::utils::{convert_to_mll, o2sat, seawater_density};

//
// Implementation only
//
mod cache;
mod catalog;
mod collector;
pub mod config;
mod dataset;
mod diagnostics;
mod errors;
mod naming;
pub mod profile;
pub mod registry;
mod transport;
mod utils;
