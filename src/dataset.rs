//! Access to the array data behind a profile location.
//!
//! Every variable is a set of record slots, each a sequence of values. Argo profile files have
//! one slot for almost everything; only slots 0 and 1 are ever read.

use std::{collections::HashMap, error::Error, fmt::Display, rc::Rc};

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::errors::OxyfloatErr;

mod opendap;

pub use self::opendap::OpendapSource;

/// Values read from a dataset, `None` where data is missing.
pub type Values = Vec<Option<f64>>;

/// Errors reading a single variable. None of these abort a profile on their own.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetErr {
    /// The variable is not in the dataset.
    NoSuchVariable(String),
    /// The variable has fewer record slots than requested.
    SlotOutOfRange {
        /// Variable name
        variable: String,
        /// Requested slot
        slot: usize,
        /// Slots available
        slots: usize,
    },
    /// A requested position is past the end of the slot.
    IndexOutOfRange {
        /// Variable name
        variable: String,
        /// Requested position
        index: usize,
        /// Length of the slot
        len: usize,
    },
    /// The server failed to deliver the data.
    Server(String),
    /// The server response could not be understood.
    Parse(String),
}

impl Display for DatasetErr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        use self::DatasetErr::*;

        match self {
            NoSuchVariable(var) => write!(f, "no variable named {}", var),
            SlotOutOfRange {
                variable,
                slot,
                slots,
            } => write!(f, "{} has {} record slots, asked for [{}]", variable, slots, slot),
            IndexOutOfRange {
                variable,
                index,
                len,
            } => write!(f, "{} has {} values, asked for [{}]", variable, len, index),
            Server(msg) => write!(f, "server error: {}", msg),
            Parse(msg) => write!(f, "unreadable response: {}", msg),
        }
    }
}

impl Error for DatasetErr {}

/// An opened dataset.
pub trait Dataset {
    /// Check if a variable exists.
    fn has_variable(&self, name: &str) -> bool;

    /// Number of record slots in the dataset.
    fn record_slot_count(&self) -> usize;

    /// Read every value of one record slot of a variable.
    fn read_slot(&self, name: &str, slot: usize) -> Result<Values, DatasetErr>;

    /// Read the values at `indices` from one record slot of a variable.
    fn read_variable(&self, name: &str, slot: usize, indices: &[usize]) -> Result<Values, DatasetErr> {
        let all = self.read_slot(name, slot)?;
        indices
            .iter()
            .map(|&index| {
                all.get(index).copied().ok_or_else(|| DatasetErr::IndexOutOfRange {
                    variable: name.to_owned(),
                    index,
                    len: all.len(),
                })
            })
            .collect()
    }
}

/// Opens datasets by location.
pub trait DatasetSource {
    /// Open the dataset at `location`.
    fn open(&self, location: &str) -> Result<Box<dyn Dataset + '_>, OxyfloatErr>;
}

impl<T: DatasetSource + ?Sized> DatasetSource for Box<T> {
    fn open(&self, location: &str) -> Result<Box<dyn Dataset + '_>, OxyfloatErr> {
        (**self).open(location)
    }
}

impl<T: DatasetSource + ?Sized> DatasetSource for Rc<T> {
    fn open(&self, location: &str) -> Result<Box<dyn Dataset + '_>, OxyfloatErr> {
        (**self).open(location)
    }
}

/// Convert an Argo `JULD` value, days since 1950-01-01 00:00 UTC, to a time.
pub fn julian_day_to_datetime(days: f64) -> Option<NaiveDateTime> {
    if !days.is_finite() {
        return None;
    }

    let epoch = NaiveDate::from_ymd_opt(1950, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let millis = (days * 86_400_000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }

    epoch.checked_add_signed(Duration::milliseconds(millis as i64))
}

/// A dataset held in memory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryDataset {
    variables: HashMap<String, Vec<Values>>,
}

impl MemoryDataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable given all its record slots. Non-finite values are stored as missing.
    pub fn with_variable(mut self, name: impl Into<String>, slots: Vec<Values>) -> Self {
        let slots = slots
            .into_iter()
            .map(|slot| {
                slot.into_iter()
                    .map(|val| val.filter(|v| v.is_finite()))
                    .collect()
            })
            .collect();
        self.variables.insert(name.into(), slots);
        self
    }

    /// Add a single valued variable, one value per record slot.
    pub fn with_scalar(self, name: impl Into<String>, values: &[f64]) -> Self {
        let slots = values.iter().map(|&v| vec![Some(v)]).collect();
        self.with_variable(name, slots)
    }

    /// Names of the variables present.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }
}

impl Dataset for MemoryDataset {
    fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    fn record_slot_count(&self) -> usize {
        self.variables.values().map(Vec::len).max().unwrap_or(0)
    }

    fn read_slot(&self, name: &str, slot: usize) -> Result<Values, DatasetErr> {
        let slots = self
            .variables
            .get(name)
            .ok_or_else(|| DatasetErr::NoSuchVariable(name.to_owned()))?;

        slots
            .get(slot)
            .cloned()
            .ok_or_else(|| DatasetErr::SlotOutOfRange {
                variable: name.to_owned(),
                slot,
                slots: slots.len(),
            })
    }
}
