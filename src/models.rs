//! Data models for the dashboard build.
//!
//! The aggregated dataset is a dense month × state matrix: every row
//! carries a value (possibly null) for every state in `states`.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// One reporting period of the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthRow {
    /// Opaque period identifier, `YYYYMM`.
    pub month: String,
    /// Display label, e.g. `3/1/2023`.
    pub date: String,
    /// Ex parte rate per state, `None` when the state has no usable data.
    pub rates: BTreeMap<String, Option<f64>>,
}

impl MonthRow {
    /// Rate for `state`, flattening "no entry" and "null entry" together.
    pub fn rate(&self, state: &str) -> Option<f64> {
        self.rates.get(state).copied().flatten()
    }
}

// Serialized flat: {"month": .., "date": .., "AK": 12.5, "AL": null, ...}
impl Serialize for MonthRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rates.len() + 2))?;
        map.serialize_entry("month", &self.month)?;
        map.serialize_entry("date", &self.date)?;
        for (state, rate) in &self.rates {
            map.serialize_entry(state, rate)?;
        }
        map.end()
    }
}

/// The data injected into the dashboard page.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct AggregatedDataset {
    /// State abbreviations, sorted and deduplicated.
    pub states: Vec<String>,
    /// One row per reporting period, ascending.
    pub rows: Vec<MonthRow>,
}

impl AggregatedDataset {
    /// Look up a single cell.
    #[allow(dead_code)] // Lookup helper for tests and debugging
    pub fn rate(&self, month: &str, state: &str) -> Option<f64> {
        self.row(month).and_then(|row| row.rate(state))
    }

    /// Find the row for a reporting period.
    pub fn row(&self, month: &str) -> Option<&MonthRow> {
        self.rows.iter().find(|row| row.month == month)
    }

    /// First and last reporting period, if any rows exist.
    pub fn span(&self) -> Option<(&str, &str)> {
        let first = self.rows.first()?;
        let last = self.rows.last()?;
        Some((first.month.as_str(), last.month.as_str()))
    }

    /// Compact JSON form embedded in the page.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Counters collected while aggregating, for logging only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    /// Data rows read from the CSV (header excluded).
    pub rows_read: usize,
    /// Rows carrying the "U" revision flag.
    pub rows_used: usize,
    /// Cells of the final matrix without a rate.
    pub null_cells: usize,
}

/// Result of aggregating one CSV document.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub dataset: AggregatedDataset,
    pub stats: AggregationStats,
}
