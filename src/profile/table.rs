use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::dataset::Values;

/// The coordinates identifying one row.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowIndex {
    pub wmo: String,
    pub time: Option<NaiveDateTime>,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    pub pressure: f64,
}

/// One row, values are in the table's column order.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub index: RowIndex,
    pub values: Values,
}

/// Rows of profile data indexed by float, time, position and pressure.
///
/// An empty table is a real result: it means the profile had nothing usable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileTable {
    columns: Vec<String>,
    rows: Vec<ProfileRow>,
}

impl ProfileTable {
    /// A table with the given row indices and no columns yet.
    pub fn with_index(index: Vec<RowIndex>) -> Self {
        ProfileTable {
            columns: vec![],
            rows: index
                .into_iter()
                .map(|index| ProfileRow {
                    index,
                    values: vec![],
                })
                .collect(),
        }
    }

    /// Add a column. `values` must have one entry per row.
    pub(crate) fn push_column(&mut self, name: &str, values: Values) {
        debug_assert_eq!(values.len(), self.rows.len());

        self.columns.push(name.to_owned());
        for (row, val) in self.rows.iter_mut().zip(values) {
            row.values.push(val);
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All the rows.
    pub fn rows(&self) -> &[ProfileRow] {
        &self.rows
    }

    /// All values of one column, if the table has it.
    pub fn column(&self, name: &str) -> Option<Values> {
        let pos = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.values.get(pos).copied().flatten())
                .collect(),
        )
    }

    /// Append the rows of `other`, adding any columns this table lacks.
    ///
    /// Cells for columns a row never had are missing.
    pub fn append(&mut self, other: &ProfileTable) {
        for name in &other.columns {
            if !self.columns.contains(name) {
                self.columns.push(name.clone());
                for row in &mut self.rows {
                    row.values.push(None);
                }
            }
        }

        let positions: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|name| other.columns.iter().position(|c| c == name))
            .collect();

        for row in &other.rows {
            let values = positions
                .iter()
                .map(|pos| pos.and_then(|p| row.values.get(p).copied().flatten()))
                .collect();
            self.rows.push(ProfileRow {
                index: row.index.clone(),
                values,
            });
        }
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    fn index(wmo: &str, pressure: f64) -> RowIndex {
        RowIndex {
            wmo: wmo.to_owned(),
            time: None,
            lon: Some(-122.5),
            lat: Some(36.7),
            pressure,
        }
    }

    #[test]
    fn test_columns() {
        let mut table = ProfileTable::with_index(vec![index("1", 5.0), index("1", 10.0)]);
        table.push_column("TEMP_ADJUSTED", vec![Some(12.0), Some(11.5)]);
        table.push_column("DOXY_ADJUSTED", vec![None, Some(250.0)]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.columns(), &["TEMP_ADJUSTED", "DOXY_ADJUSTED"]);
        assert_eq!(table.column("DOXY_ADJUSTED"), Some(vec![None, Some(250.0)]));
        assert_eq!(table.column("PSAL_ADJUSTED"), None);
    }

    #[test]
    fn test_append_unions_columns() {
        let mut first = ProfileTable::with_index(vec![index("1", 5.0)]);
        first.push_column("TEMP_ADJUSTED", vec![Some(12.0)]);

        let mut second = ProfileTable::with_index(vec![index("2", 5.0)]);
        second.push_column("DOXY_ADJUSTED", vec![Some(250.0)]);
        second.push_column("TEMP_ADJUSTED", vec![Some(9.0)]);

        let mut agg = ProfileTable::default();
        agg.append(&first);
        agg.append(&ProfileTable::default());
        agg.append(&second);

        assert_eq!(agg.len(), 2);
        assert_eq!(agg.columns(), &["TEMP_ADJUSTED", "DOXY_ADJUSTED"]);
        assert_eq!(agg.column("TEMP_ADJUSTED"), Some(vec![Some(12.0), Some(9.0)]));
        assert_eq!(agg.column("DOXY_ADJUSTED"), Some(vec![None, Some(250.0)]));
        assert_eq!(agg.rows()[1].index.wmo, "2");
    }

    #[test]
    fn test_short_rows_read_as_missing() {
        let mut table = ProfileTable::with_index(vec![index("1", 5.0), index("1", 10.0)]);
        table.push_column("TEMP_ADJUSTED", vec![Some(12.0), Some(11.5)]);

        // A stored table whose second row lost its values
        let mut json = serde_json::to_value(&table).unwrap();
        json["rows"][1]["values"] = serde_json::json!([]);
        let damaged: ProfileTable = serde_json::from_value(json).unwrap();

        assert_eq!(damaged.column("TEMP_ADJUSTED"), Some(vec![Some(12.0), None]));

        let mut agg = ProfileTable::default();
        agg.append(&damaged);
        assert_eq!(agg.column("TEMP_ADJUSTED"), Some(vec![Some(12.0), None]));
    }
}
