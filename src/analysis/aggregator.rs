//! Renewal CSV aggregation.
//!
//! Turns the raw CMS renewal CSV into the month × state matrix of ex parte
//! renewal rates used by the dashboard. Only "Updated" submissions are
//! counted, and rows that cannot yield a rate become null cells rather
//! than errors.

use crate::error::BuildError;
use crate::models::{AggregatedDataset, Aggregation, AggregationStats, MonthRow};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

pub const COL_REVISION: &str = "Original or Updated";
pub const COL_STATE: &str = "State Abbreviation";
pub const COL_PERIOD: &str = "Reporting Period";
pub const COL_RENEWAL_DUE: &str = "Beneficiaries with a Renewal Due";
pub const COL_EX_PARTE: &str = "Beneficiaries Whose Coverage Was Renewed on an Ex Parte Basis";

/// Revision flag of the submissions we keep.
const UPDATED_FLAG: &str = "U";

/// Column positions of the fields we read.
#[derive(Debug, Clone, Copy)]
struct Columns {
    revision: usize,
    state: usize,
    period: usize,
    renewal_due: usize,
    ex_parte: usize,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, BuildError> {
        // Later duplicates win, like a dict built from the header row.
        let index: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();

        let required = [
            COL_REVISION,
            COL_STATE,
            COL_PERIOD,
            COL_RENEWAL_DUE,
            COL_EX_PARTE,
        ];
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| !index.contains_key(name))
            .collect();

        if !missing.is_empty() {
            return Err(BuildError::Format(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            revision: index[COL_REVISION],
            state: index[COL_STATE],
            period: index[COL_PERIOD],
            renewal_due: index[COL_RENEWAL_DUE],
            ex_parte: index[COL_EX_PARTE],
        })
    }
}

/// Aggregate the raw CSV text into the dashboard dataset.
pub fn aggregate(raw: &str) -> Result<Aggregation, BuildError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(raw.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| BuildError::Format(format!("failed to read header row: {e}")))?
        .clone();
    let columns = Columns::from_headers(&headers)?;

    let mut stats = AggregationStats::default();
    let mut states_seen: BTreeSet<String> = BTreeSet::new();
    let mut month_dates: BTreeMap<String, String> = BTreeMap::new();
    let mut cells: HashMap<String, HashMap<String, Option<f64>>> = HashMap::new();

    for (idx, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| BuildError::Format(format!("bad record #{}: {e}", idx + 1)))?;
        stats.rows_read += 1;

        // Short records read their missing trailing fields as empty.
        let field = |i: usize| record.get(i).unwrap_or("").trim();

        if field(columns.revision) != UPDATED_FLAG {
            continue;
        }
        stats.rows_used += 1;

        let state = field(columns.state);
        let month = field(columns.period);

        states_seen.insert(state.to_string());
        if !month_dates.contains_key(month) {
            month_dates.insert(month.to_string(), display_date(month)?);
        }

        let rate = ex_parte_rate(field(columns.renewal_due), field(columns.ex_parte));

        // Last write wins for a repeated (month, state) pair.
        cells
            .entry(month.to_string())
            .or_default()
            .insert(state.to_string(), rate);
    }

    let states: Vec<String> = states_seen.into_iter().collect();
    let rows: Vec<MonthRow> = month_dates
        .into_iter()
        .map(|(month, date)| {
            let month_cells = cells.get(&month);
            let rates = states
                .iter()
                .map(|state| {
                    let rate = month_cells.and_then(|m| m.get(state)).copied().flatten();
                    (state.clone(), rate)
                })
                .collect();
            MonthRow { month, date, rates }
        })
        .collect();

    stats.null_cells = rows
        .iter()
        .flat_map(|row| row.rates.values())
        .filter(|rate| rate.is_none())
        .count();

    debug!(
        "Aggregated {} of {} rows ({} skipped, {} null cells)",
        stats.rows_used,
        stats.rows_read,
        stats.rows_read - stats.rows_used,
        stats.null_cells
    );

    Ok(Aggregation {
        dataset: AggregatedDataset { states, rows },
        stats,
    })
}

/// Ex parte renewals as a percentage of renewals due, rounded to 2 decimals.
///
/// Returns `None` when either count is blank or non-numeric, when nothing was
/// due, or when the ratio is not finite.
pub fn ex_parte_rate(renewal_due: &str, ex_parte: &str) -> Option<f64> {
    let renewal_due = renewal_due.trim();
    let ex_parte = ex_parte.trim();
    if renewal_due.is_empty() || ex_parte.is_empty() {
        return None;
    }

    let due: f64 = renewal_due.parse().ok()?;
    let renewed: f64 = ex_parte.parse().ok()?;
    if due == 0.0 {
        return None;
    }

    let rate = round2(renewed / due * 100.0);
    rate.is_finite().then_some(rate)
}

/// Round to 2 decimals from the exact binary value, ties to even.
fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Turn a `YYYYMM` period into the dashboard's `M/1/YYYY` label.
pub fn display_date(period: &str) -> Result<String, BuildError> {
    let malformed = || BuildError::Format(format!("malformed reporting period {period:?}"));

    if period.chars().count() < 5 {
        return Err(malformed());
    }
    let year = period.get(..4).ok_or_else(malformed)?;
    let month: u32 = period
        .get(4..)
        .and_then(|m| m.parse().ok())
        .ok_or_else(malformed)?;

    Ok(format!("{}/1/{}", month, year))
}
