//! Reading DAP2 servers through their `.dds` and `.ascii` responses.

use std::{cell::RefCell, collections::HashMap};

use regex::Regex;
use tracing::debug;

use super::{Dataset, DatasetErr, DatasetSource, Values};

use crate::{errors::OxyfloatErr, transport::Transport};

/// Opens profile files on a THREDDS/OPeNDAP server.
#[derive(Debug, Clone)]
pub struct OpendapSource<T> {
    transport: T,
    fill_value: f64,
}

impl<T: Transport> OpendapSource<T> {
    /// Create a source that treats `fill_value` as missing data.
    pub fn new(transport: T, fill_value: f64) -> Self {
        OpendapSource {
            transport,
            fill_value,
        }
    }
}

impl<T: Transport> DatasetSource for OpendapSource<T> {
    fn open(&self, location: &str) -> Result<Box<dyn Dataset + '_>, OxyfloatErr> {
        debug!("Opening {}", location);

        let dds_url = format!("{}.dds", location);
        let body = self.transport.get(&dds_url)?;
        let text = String::from_utf8_lossy(&body);
        if let Some(msg) = server_error(&text) {
            return Err(DatasetErr::Server(format!("{}: {}", dds_url, msg)).into());
        }

        let shapes = parse_dds(&text)?;

        Ok(Box::new(OpendapDataset {
            location: location.to_owned(),
            source: self,
            shapes,
            loaded: RefCell::new(HashMap::new()),
        }))
    }
}

struct OpendapDataset<'a, T> {
    location: String,
    source: &'a OpendapSource<T>,
    // Variable name to dimension sizes
    shapes: HashMap<String, Vec<usize>>,
    // Variables already downloaded, by slot
    loaded: RefCell<HashMap<String, Vec<Values>>>,
}

impl<'a, T: Transport> OpendapDataset<'a, T> {
    fn load(&self, name: &str) -> Result<Vec<Values>, DatasetErr> {
        if let Some(slots) = self.loaded.borrow().get(name) {
            return Ok(slots.clone());
        }

        let url = format!("{}.ascii?{}", self.location, name);
        let body = self
            .source
            .transport
            .get(&url)
            .map_err(|err| DatasetErr::Server(format!("{}: {}", url, err)))?;
        let text = String::from_utf8_lossy(&body);
        if let Some(msg) = server_error(&text) {
            return Err(DatasetErr::Server(format!("{}: {}", url, msg)));
        }

        let slots = parse_ascii(&text, self.source.fill_value)?;
        self.loaded
            .borrow_mut()
            .insert(name.to_owned(), slots.clone());

        Ok(slots)
    }
}

impl<'a, T: Transport> Dataset for OpendapDataset<'a, T> {
    fn has_variable(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    fn record_slot_count(&self) -> usize {
        self.shapes
            .values()
            .filter_map(|dims| dims.first().copied())
            .max()
            .unwrap_or(0)
    }

    fn read_slot(&self, name: &str, slot: usize) -> Result<Values, DatasetErr> {
        if !self.has_variable(name) {
            return Err(DatasetErr::NoSuchVariable(name.to_owned()));
        }

        let slots = self.load(name)?;
        let num_slots = slots.len();
        slots
            .into_iter()
            .nth(slot)
            .ok_or_else(|| DatasetErr::SlotOutOfRange {
                variable: name.to_owned(),
                slot,
                slots: num_slots,
            })
    }
}

/// Extract the message of a DAP `Error { ... }` response.
fn server_error(text: &str) -> Option<String> {
    let text = text.trim_start();
    if !text.starts_with("Error {") && !text.starts_with("Error{") {
        return None;
    }

    let message = Regex::new(r#"message\s*=\s*"([^"]*)""#)
        .ok()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned());

    Some(message.unwrap_or_else(|| text.lines().take(3).collect::<Vec<_>>().join(" ")))
}

/// Variable names and dimension sizes from a DDS document.
fn parse_dds(text: &str) -> Result<HashMap<String, Vec<usize>>, DatasetErr> {
    if !text.trim_start().starts_with("Dataset") {
        return Err(DatasetErr::Parse("missing Dataset declaration".to_owned()));
    }

    let decl = Regex::new(r"^\s*([A-Za-z0-9]+)\s+([A-Za-z0-9_.\-]+)((?:\s*\[[^\]]*\])*)\s*;")
        .map_err(|err| DatasetErr::Parse(err.to_string()))?;
    let dim = Regex::new(r"\[(?:[^=\]]*=)?\s*([0-9]+)\s*\]")
        .map_err(|err| DatasetErr::Parse(err.to_string()))?;

    let mut shapes = HashMap::new();
    for line in text.lines().skip(1) {
        if line.trim_start().starts_with('}') {
            continue;
        }

        if let Some(caps) = decl.captures(line) {
            let name = caps[2].to_owned();
            let dims: Vec<usize> = dim
                .captures_iter(&caps[3])
                .filter_map(|d| d[1].parse().ok())
                .collect();
            shapes.insert(name, dims);
        }
    }

    Ok(shapes)
}

/// Values of a single variable from an `.ascii` response, grouped by record slot.
fn parse_ascii(text: &str, fill_value: f64) -> Result<Vec<Values>, DatasetErr> {
    let mut lines = text
        .lines()
        .skip_while(|line| !line.starts_with("---"))
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty());

    // Header line, e.g. `PRES_ADJUSTED[1][71]`
    lines
        .next()
        .ok_or_else(|| DatasetErr::Parse("no data section".to_owned()))?;

    let to_value = |token: &str| -> Result<Option<f64>, DatasetErr> {
        let val: f64 = token
            .trim()
            .parse()
            .map_err(|_| DatasetErr::Parse(format!("not a number: {}", token)))?;

        if !val.is_finite() || val == fill_value {
            Ok(None)
        } else {
            Ok(Some(val))
        }
    };

    let mut slots: Vec<Values> = vec![];
    for line in lines {
        if line.starts_with('[') {
            // `[i], v0, v1, ...` is one record slot of a 2-d variable.
            let values = line
                .split_once(',')
                .map(|(_, rest)| rest)
                .unwrap_or("");
            let row: Result<Values, _> = values
                .split(',')
                .filter(|t| !t.trim().is_empty())
                .map(&to_value)
                .collect();
            slots.push(row?);
        } else {
            // One value per record slot of a 1-d variable.
            for token in line.split(',').filter(|t| !t.trim().is_empty()) {
                slots.push(vec![to_value(token)?]);
            }
        }
    }

    Ok(slots)
}
