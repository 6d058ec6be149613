//! Turning one profile data file into a table of rows.

use std::{collections::HashSet, fmt::Display};

use regex::Regex;
use tracing::{debug, error, warn};

use crate::{
    config::{Config, LATITUDE, LONGITUDE, PRESSURE, TIME},
    dataset::{julian_day_to_datetime, Dataset, DatasetErr, DatasetSource, Values},
    errors::OxyfloatErr,
};

mod table;

pub use self::table::{ProfileRow, ProfileTable, RowIndex};

/// The cache key of one profile, `P<float>_<profile>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProfileKey(String);

impl ProfileKey {
    /// Derive the key from the basename of a profile location.
    ///
    /// `.../R1900650_003.nc` and `.../D1900650_003.nc` both give `P1900650_003`.
    pub fn derive(location: &str) -> Result<Self, OxyfloatErr> {
        let re = Regex::new(r"(\d+_\d+)\.nc$")
            .map_err(|err| OxyfloatErr::GeneralError(err.to_string()))?;

        let basename = location.rsplit('/').next().unwrap_or(location);
        re.captures(basename)
            .and_then(|caps| caps.get(1))
            .map(|m| ProfileKey(format!("P{}", m.as_str())))
            .ok_or_else(|| OxyfloatErr::InvalidProfileLocation(location.to_owned()))
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProfileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ProfileKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Open the profile at `location` and build its table, applying the oxygen check if enabled.
///
/// Fails with `RequiredVariableNotPresent` if the file lacks a configured variable, and with the
/// fetch error if the file or its pressure axis can not be read. Problems with any other single
/// variable only drop that column.
pub fn profile_table(
    source: &dyn DatasetSource,
    wmo: &str,
    location: &str,
    config: &Config,
    max_pressure: f64,
) -> Result<ProfileTable, OxyfloatErr> {
    let ds = source.open(location)?;
    let table = transform(&*ds, wmo, location, config, max_pressure)?;

    if config.oxygen_required() {
        Ok(oxygen_gate(table, config.oxygen_variable(), location))
    } else {
        Ok(table)
    }
}

/// Build the table of one opened profile.
pub fn transform(
    ds: &dyn Dataset,
    wmo: &str,
    location: &str,
    config: &Config,
    max_pressure: f64,
) -> Result<ProfileTable, OxyfloatErr> {
    if let Some(missing) = config.variables().iter().find(|v| !ds.has_variable(v)) {
        return Err(OxyfloatErr::RequiredVariableNotPresent {
            variable: missing.clone(),
            location: location.to_owned(),
        });
    }

    let levels = pressure_levels(ds, max_pressure)?;
    if levels.is_empty() {
        warn!("No {} values less than {} in {}", PRESSURE, max_pressure, location);
        return Ok(ProfileTable::default());
    }

    let time = first_value(ds, TIME).and_then(julian_day_to_datetime);
    let lon = first_value(ds, LONGITUDE);
    let lat = first_value(ds, LATITUDE);

    let indices: Vec<usize> = levels.iter().map(|&(i, _)| i).collect();
    let mut table = ProfileTable::with_index(
        levels
            .iter()
            .map(|&(_, pressure)| RowIndex {
                wmo: wmo.to_owned(),
                time,
                lon,
                lat,
                pressure,
            })
            .collect(),
    );

    for var in config.data_variables() {
        match read_column(ds, var, &indices, location) {
            Ok(values) => table.push_column(var, values),
            Err(DatasetErr::NoSuchVariable(_)) => warn!("{} not in {}", var, location),
            Err(err) => error!("Skipping {} in {}: {}", var, location, err),
        }
    }

    if table.columns().is_empty() {
        return Ok(ProfileTable::default());
    }

    Ok(table)
}

/// Empty the table if its oxygen column has no data.
pub fn oxygen_gate(table: ProfileTable, oxygen_variable: &str, location: &str) -> ProfileTable {
    if table.is_empty() {
        return table;
    }

    let has_oxygen = table
        .column(oxygen_variable)
        .map(|values| values.iter().any(Option::is_some))
        .unwrap_or(false);

    if has_oxygen {
        table
    } else {
        warn!("{} is all missing in {}", oxygen_variable, location);
        ProfileTable::default()
    }
}

/// Positions and rounded values of the usable pressure levels, shallowest first.
fn pressure_levels(ds: &dyn Dataset, max_pressure: f64) -> Result<Vec<(usize, f64)>, DatasetErr> {
    let pressures = ds.read_slot(PRESSURE, 0)?;

    let mut seen = HashSet::new();
    let mut levels = vec![];
    for (i, p) in pressures.into_iter().enumerate() {
        let p = match p {
            Some(p) if p >= max_pressure => break,
            Some(p) => p,
            None => continue,
        };

        let tenths = (p * 10.0).round();
        if seen.insert(tenths as i64) {
            levels.push((i, tenths / 10.0));
        } else {
            debug!("Dropping repeated pressure level {:.1}", tenths / 10.0);
        }
    }

    Ok(levels)
}

fn first_value(ds: &dyn Dataset, name: &str) -> Option<f64> {
    ds.read_variable(name, 0, &[0])
        .ok()
        .and_then(|vals| vals.into_iter().next())
        .flatten()
}

/// Values of `var` at `indices`, from record slot 1 if slot 0 has nothing.
fn read_column(
    ds: &dyn Dataset,
    var: &str,
    indices: &[usize],
    location: &str,
) -> Result<Values, DatasetErr> {
    let values = ds.read_variable(var, 0, indices)?;
    if values.iter().any(Option::is_some) {
        return Ok(values);
    }

    debug!("{}: record slot 0 is empty in {}, trying slot 1", var, location);
    match ds.read_variable(var, 1, indices) {
        Ok(fallback) => Ok(fallback),
        Err(err @ DatasetErr::SlotOutOfRange { .. })
        | Err(err @ DatasetErr::IndexOutOfRange { .. }) => {
            warn!(
                "Record slot 1 fallback failed for {} in {}: {}",
                var, location, err
            );
            Ok(values)
        }
        Err(err) => Err(err),
    }
}
