//! Cache file names that carry the query constraints they were built with.
//!
//! A fixed cache file is named `oxyfloat_fixed_cache` followed by any of `_age<n>`,
//! `_profiles<n>`, `_pressure<n>`. Requests against such a file may narrow those values but never
//! widen them.

use std::path::Path;

use regex::Regex;
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};
use tracing::{info, warn};

/// Base name of every fixed cache file.
pub const FIXED_CACHE_BASE: &str = "oxyfloat_fixed_cache";

/// Extension used for cache files written by this crate.
pub const CACHE_EXTENSION: &str = "db";

/// Stand-in for "no limit" so comparisons against a limit always pass.
pub const UNLIMITED: u64 = 10_000_000_000;

/// The constraints a cache file name can declare.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Constraint {
    /// Minimum float age, in reporting cycles.
    Age,
    /// Maximum number of profiles per float.
    Profiles,
    /// Exclusive upper bound on pressure, decibars.
    Pressure,
}

impl Constraint {
    /// The token name used in file names.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// The search pattern for this constraint's token.
    pub fn pattern(self) -> &'static str {
        match self {
            Constraint::Age => "age([0-9]+)",
            Constraint::Profiles => "profiles([0-9]+)",
            Constraint::Pressure => "pressure([0-9]+)",
        }
    }

    /// Find this constraint's value in `name`, if it is there and parses.
    fn search(self, name: &str) -> Option<u64> {
        let regex = Regex::new(self.pattern()).ok()?;
        regex
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Values declared by a cache file name. `None` means unconstrained, not zero.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheConstraints {
    pub age: Option<u64>,
    pub profiles: Option<u64>,
    pub pressure: Option<u64>,
}

impl CacheConstraints {
    /// Get the value for one constraint.
    pub fn get(&self, constraint: Constraint) -> Option<u64> {
        match constraint {
            Constraint::Age => self.age,
            Constraint::Profiles => self.profiles,
            Constraint::Pressure => self.pressure,
        }
    }

    /// Set the value for one constraint.
    pub fn set(&mut self, constraint: Constraint, value: Option<u64>) {
        match constraint {
            Constraint::Age => self.age = value,
            Constraint::Profiles => self.profiles = value,
            Constraint::Pressure => self.pressure = value,
        }
    }

    /// True if no constraint is declared.
    pub fn is_empty(&self) -> bool {
        Constraint::iter().all(|c| self.get(c).is_none())
    }
}

/// How a cache file behaves, decided from its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheMode {
    /// The default growable cache file.
    Default,
    /// A fixed cache file and the constraints it declares.
    Fixed(CacheConstraints),
    /// A growable cache file with a user chosen name.
    Custom,
}

impl CacheMode {
    /// Decide the mode from an explicitly requested cache file, or `None` for the default file.
    pub fn for_cache_file(cache_file: Option<&Path>) -> Self {
        let file_name = match cache_file.and_then(|p| p.file_name()) {
            Some(file_name) => file_name.to_string_lossy(),
            None => return CacheMode::Default,
        };

        if file_name.contains(FIXED_CACHE_BASE) {
            CacheMode::Fixed(decode(&file_name))
        } else {
            CacheMode::Custom
        }
    }

    /// The constraints that bind requests, empty unless this is a fixed file.
    pub fn constraints(&self) -> CacheConstraints {
        match self {
            CacheMode::Fixed(constraints) => *constraints,
            _ => CacheConstraints::default(),
        }
    }
}

/// Append a `_<name><value>` token to `base_name` for every declared constraint.
pub fn encode(base_name: &str, constraints: &CacheConstraints) -> String {
    let mut name = base_name.to_owned();
    for constraint in Constraint::iter() {
        match constraints.get(constraint) {
            Some(value) if value != UNLIMITED => {
                name.push_str(&format!("_{}{}", constraint.name(), value));
            }
            _ => {}
        }
    }
    name
}

/// Best effort recovery of the constraints encoded in a file name.
pub fn decode(file_name: &str) -> CacheConstraints {
    let mut constraints = CacheConstraints::default();
    for constraint in Constraint::iter() {
        constraints.set(constraint, constraint.search(file_name));
    }
    constraints
}

/// Name of the fixed cache file built with `constraints`.
pub fn fixed_cache_file_name(constraints: &CacheConstraints) -> String {
    format!(
        "{}.{}",
        encode(FIXED_CACHE_BASE, constraints),
        CACHE_EXTENSION
    )
}

/// Adjust a requested value so it never exceeds what the cache file declares.
///
/// Unset requests adopt the file's value, and if neither side has one the result is
/// `UNLIMITED`.
pub fn validate(
    constraint: Constraint,
    requested: Option<u64>,
    constraints: &CacheConstraints,
) -> u64 {
    match (requested, constraints.get(constraint)) {
        (Some(value), Some(file_value)) if value > file_value => {
            warn!(
                "Requested {} {} exceeds cache file's parameter: {}",
                constraint.name(),
                value,
                file_value
            );
            info!("Setting {} to {}", constraint.name(), file_value);
            file_value
        }
        (Some(value), _) => value,
        (None, Some(file_value)) => {
            info!(
                "Using fixed cache file's {} value of {}",
                constraint.name(),
                file_value
            );
            file_value
        }
        (None, None) => UNLIMITED,
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    use std::str::FromStr;

    #[test]
    fn test_constraint_names() {
        assert_eq!(Constraint::Age.name(), "age");
        assert_eq!(Constraint::Profiles.name(), "profiles");
        assert_eq!(Constraint::Pressure.name(), "pressure");
        assert_eq!(Constraint::from_str("pressure").unwrap(), Constraint::Pressure);

        for constraint in Constraint::iter() {
            assert!(constraint.pattern().starts_with(constraint.name()));
        }
    }

    #[test]
    fn test_decode_fixed_name() {
        let constraints = decode("oxyfloat_fixed_cache_age3000_profiles1.hdf");
        assert_eq!(
            constraints,
            CacheConstraints {
                age: Some(3000),
                profiles: Some(1),
                pressure: None,
            }
        );
    }

    #[test]
    fn test_encode_omits_unset() {
        let constraints = CacheConstraints {
            age: Some(340),
            profiles: None,
            pressure: Some(10),
        };
        assert_eq!(
            encode(FIXED_CACHE_BASE, &constraints),
            "oxyfloat_fixed_cache_age340_pressure10"
        );
        assert_eq!(
            fixed_cache_file_name(&CacheConstraints::default()),
            "oxyfloat_fixed_cache.db"
        );
        assert_eq!(decode(&fixed_cache_file_name(&constraints)), constraints);
    }

    #[test]
    fn test_unparseable_token_is_unconstrained() {
        let constraints = decode("oxyfloat_fixed_cache_profiles99999999999999999999999.db");
        assert!(constraints.is_empty());
    }

    #[test]
    fn test_cache_mode() {
        assert_eq!(CacheMode::for_cache_file(None), CacheMode::Default);
        assert_eq!(
            CacheMode::for_cache_file(Some(Path::new("/tmp/my_cache.db"))),
            CacheMode::Custom
        );
        assert_eq!(
            CacheMode::for_cache_file(Some(Path::new("/tmp/age5/my_cache.db"))).constraints(),
            CacheConstraints::default()
        );

        let mode = CacheMode::for_cache_file(Some(Path::new(
            "/data/oxyfloat_fixed_cache_pressure10.db",
        )));
        assert_eq!(mode.constraints().pressure, Some(10));
        assert_eq!(mode.constraints().profiles, None);
    }

    #[test]
    fn test_validate_clamps() {
        let constraints = decode("oxyfloat_fixed_cache_age3000_profiles1.hdf");

        assert_eq!(validate(Constraint::Profiles, Some(5), &constraints), 1);
        assert_eq!(validate(Constraint::Profiles, Some(1), &constraints), 1);
        assert_eq!(validate(Constraint::Profiles, None, &constraints), 1);
    }

    #[test]
    fn test_validate_narrows_but_never_widens() {
        let constraints = CacheConstraints {
            pressure: Some(10),
            ..CacheConstraints::default()
        };

        assert_eq!(validate(Constraint::Pressure, Some(50), &constraints), 10);
        assert_eq!(validate(Constraint::Pressure, Some(5), &constraints), 5);
    }

    #[test]
    fn test_validate_unconstrained() {
        let constraints = CacheConstraints::default();

        assert_eq!(validate(Constraint::Pressure, None, &constraints), UNLIMITED);
        assert_eq!(validate(Constraint::Pressure, Some(7), &constraints), 7);
    }
}
