//! Pure queries backing the dashboard views: map slice, time series, scatter.
//!
//! Every function takes its inputs explicitly and returns owned results, so a
//! front end can call them per request without shared state.

use crate::models::{
    DateSpec, JoinedDataset, JoinedRecord, LongDataset, LongRecord, country_matches,
};
use crate::stats::pearson;
use serde::Serialize;
use std::collections::BTreeSet;

/// Countries shown at most in the time-series view.
pub const MAX_SERIES_COUNTRIES: usize = 5;

/// Distinct years present, ascending.
pub fn available_years(dataset: &LongDataset) -> Vec<i32> {
    dataset
        .iter()
        .map(|r| r.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct country names, sorted.
pub fn country_names(dataset: &LongDataset) -> Vec<String> {
    dataset
        .iter()
        .map(|r| r.country_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Rows for a single year (map view).
pub fn year_slice(dataset: &LongDataset, year: i32) -> LongDataset {
    dataset.select_years(DateSpec::Year(year))
}

/// Rows for up to `max` of the requested countries (by name or code), sorted by
/// country then year. Extra countries beyond `max` are ignored in request order.
pub fn series_for(dataset: &LongDataset, countries: &[String], max: usize) -> Vec<LongRecord> {
    let wanted: Vec<&String> = countries.iter().take(max).collect();
    let mut rows: Vec<LongRecord> = dataset
        .iter()
        .filter(|r| {
            wanted
                .iter()
                .any(|c| country_matches(&r.country_name, &r.country_code, c))
        })
        .cloned()
        .collect();
    rows.sort_by(|a, b| {
        a.country_name
            .cmp(&b.country_name)
            .then(a.year.cmp(&b.year))
    });
    rows
}

/// Rows at the latest year present in `rows`.
pub fn latest_values(rows: &[LongRecord]) -> Vec<LongRecord> {
    let Some(last) = rows.iter().map(|r| r.year).max() else {
        return Vec::new();
    };
    rows.iter().filter(|r| r.year == last).cloned().collect()
}

/// Scatter view of two indicators in one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub year: i32,
    pub x_column: String,
    pub y_column: String,
    /// Sorted by the y value, descending.
    pub rows: Vec<JoinedRecord>,
    pub correlation: Option<f64>,
}

/// Latest year present in a joined dataset.
pub fn latest_joined_year(joined: &JoinedDataset) -> Option<i32> {
    joined.records.iter().map(|r| r.year).max()
}

/// Scatter rows for `year`; x is the left column, y the right column.
pub fn comparison(joined: &JoinedDataset, year: i32) -> Comparison {
    let mut rows: Vec<JoinedRecord> = joined
        .records
        .iter()
        .filter(|r| r.year == year)
        .cloned()
        .collect();
    rows.sort_by(|a, b| b.right.total_cmp(&a.right));
    let xs: Vec<f64> = rows.iter().map(|r| r.left).collect();
    let ys: Vec<f64> = rows.iter().map(|r| r.right).collect();
    Comparison {
        year,
        x_column: joined.left_column.clone(),
        y_column: joined.right_column.clone(),
        correlation: pearson(&xs, &ys),
        rows,
    }
}
