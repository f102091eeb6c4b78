//! Per-country projection to a target year.
//!
//! Model, fitted separately for each country over the selected years:
//! 1. `predictor ~ year` (e.g. renewable share), extrapolated to the target
//!    year and clamped to `[0, 100]` for percentage indicators
//! 2. `response ~ 1 + year + predictor` (e.g. CO₂ emissions), optionally on
//!    `ln(response)`, evaluated at the target year with the stage-1 value
//!
//! A country with fewer than three observations in range is excluded. A
//! failed stage-2 fit keeps the row but leaves R² and the projection undefined.
//! Neither case stops the batch.

use crate::catalog::ValueScale;
use crate::fit::{self, FitUndefined, LinearFit, MultiFit};
use crate::models::{DateSpec, JoinedDataset, JoinedRecord, country_matches};
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_TARGET_YEAR: i32 = 2030;

/// Minimum observations per country inside the fit range.
pub const MIN_POINTS: usize = 3;

/// Earliest default start of the fit range.
pub const DEFAULT_FIT_START: i32 = 2005;

/// Inputs of one projection run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionRequest {
    /// Country names or codes, in the order rows should be reported.
    pub countries: Vec<String>,
    pub fit_range: DateSpec,
    pub target_year: i32,
    /// Fit `ln(response)` and back-transform the projection.
    pub log_response: bool,
    pub predictor_scale: ValueScale,
}

impl ProjectionRequest {
    /// Target 2030, log-transformed response, percentage predictor.
    pub fn new(countries: Vec<String>, fit_range: DateSpec) -> Self {
        Self {
            countries,
            fit_range,
            target_year: DEFAULT_TARGET_YEAR,
            log_response: true,
            predictor_scale: ValueScale::Percent,
        }
    }
}

/// `max(first year, 2005)..=last year` of the joined data.
pub fn default_fit_range(joined: &JoinedDataset) -> Option<DateSpec> {
    let first = joined.records.iter().map(|r| r.year).min()?;
    let last = joined.records.iter().map(|r| r.year).max()?;
    Some(DateSpec::Range {
        start: first.max(DEFAULT_FIT_START).min(last),
        end: last,
    })
}

/// Why a requested country has no row in the report.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum Exclusion {
    #[error("no data for this country")]
    UnknownCountry,

    #[error("only {got} observations in range, need at least 3")]
    TooFewPoints { got: usize },

    #[error("predictor trend undefined: {0}")]
    PredictorFit(FitUndefined),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedCountry {
    pub country: String,
    pub reason: Exclusion,
}

/// Stage-2 result for one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseProjection {
    pub fit: MultiFit,
    /// Back-transformed when the response was fitted on a log scale.
    pub at_target: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryProjection {
    pub country_name: String,
    pub country_code: String,
    /// Observations used in stage 1.
    pub points: usize,
    pub predictor_fit: LinearFit,
    /// Stage-1 extrapolation before clamping.
    pub predictor_unclamped: f64,
    pub predictor_at_target: f64,
    pub response: Result<ResponseProjection, FitUndefined>,
}

impl CountryProjection {
    pub fn predictor_r_squared(&self) -> Option<f64> {
        self.predictor_fit.r_squared
    }

    pub fn response_r_squared(&self) -> Option<f64> {
        self.response.as_ref().ok().and_then(|r| r.fit.r_squared)
    }

    pub fn response_at_target(&self) -> Option<f64> {
        self.response.as_ref().ok().map(|r| r.at_target)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionReport {
    pub response_column: String,
    pub predictor_column: String,
    pub target_year: i32,
    pub log_response: bool,
    pub rows: Vec<CountryProjection>,
    pub excluded: Vec<ExcludedCountry>,
}

fn matches_country(r: &JoinedRecord, key: &str) -> bool {
    country_matches(&r.country_name, &r.country_code, key)
}

/// Clamp a percentage extrapolation into `[0, 100]`.
pub fn clamp_to_scale(value: f64, scale: ValueScale) -> f64 {
    match scale {
        ValueScale::Percent => value.clamp(0.0, 100.0),
        ValueScale::Absolute => value,
    }
}

/// Fit `response ~ 1 + year + predictor` and evaluate at `target_year`.
fn project_response(
    rows: &[&JoinedRecord],
    target_year: i32,
    predictor_at_target: f64,
    log_response: bool,
) -> Result<ResponseProjection, FitUndefined> {
    // ln is undefined for non-positive values; those rows are dropped
    let usable: Vec<&JoinedRecord> = rows
        .iter()
        .copied()
        .filter(|r| !log_response || r.left > 0.0)
        .collect();
    if usable.len() < MIN_POINTS {
        return Err(FitUndefined::InsufficientData {
            needed: MIN_POINTS,
            got: usable.len(),
        });
    }

    let design: Vec<[f64; 3]> = usable
        .iter()
        .map(|r| fit::design_row(r.year as f64, r.right))
        .collect();
    let y: Vec<f64> = usable
        .iter()
        .map(|r| if log_response { r.left.ln() } else { r.left })
        .collect();

    let model = fit::fit_linear_multi(&design, &y)?;
    let raw = model
        .predict(&fit::design_row(target_year as f64, predictor_at_target))
        .ok_or(FitUndefined::Singular)?;
    let at_target = if log_response { raw.exp() } else { raw };
    if !at_target.is_finite() {
        return Err(FitUndefined::NonFinite);
    }
    Ok(ResponseProjection {
        fit: model,
        at_target,
    })
}

fn project_country(
    joined: &JoinedDataset,
    key: &str,
    req: &ProjectionRequest,
) -> Result<CountryProjection, Exclusion> {
    let mut all: Vec<&JoinedRecord> = joined
        .records
        .iter()
        .filter(|r| matches_country(r, key))
        .collect();
    if all.is_empty() {
        return Err(Exclusion::UnknownCountry);
    }
    all.retain(|r| req.fit_range.contains(r.year));
    all.sort_by_key(|r| r.year);
    if all.len() < MIN_POINTS {
        return Err(Exclusion::TooFewPoints { got: all.len() });
    }

    let years: Vec<f64> = all.iter().map(|r| r.year as f64).collect();
    let predictor: Vec<f64> = all.iter().map(|r| r.right).collect();
    let predictor_fit = fit::fit_linear(&years, &predictor).map_err(Exclusion::PredictorFit)?;
    let predictor_unclamped = predictor_fit.predict(req.target_year as f64);
    let predictor_at_target = clamp_to_scale(predictor_unclamped, req.predictor_scale);

    let response = project_response(&all, req.target_year, predictor_at_target, req.log_response);
    if let Err(e) = &response {
        log::warn!("{}: {} projection undefined: {}", key, joined.left_column, e);
    }

    Ok(CountryProjection {
        country_name: all[0].country_name.clone(),
        country_code: all[0].country_code.clone(),
        points: all.len(),
        predictor_fit,
        predictor_unclamped,
        predictor_at_target,
        response,
    })
}

/// Run the two-stage projection for every requested country.
///
/// `joined.left_column` is the response and `joined.right_column` the predictor.
/// The result depends only on the arguments.
pub fn project(joined: &JoinedDataset, req: &ProjectionRequest) -> ProjectionReport {
    let mut rows = Vec::new();
    let mut excluded = Vec::new();
    for key in &req.countries {
        match project_country(joined, key, req) {
            Ok(row) => rows.push(row),
            Err(reason) => {
                log::info!("{} excluded from projection: {}", key, reason);
                excluded.push(ExcludedCountry {
                    country: key.clone(),
                    reason,
                });
            }
        }
    }
    ProjectionReport {
        response_column: joined.left_column.clone(),
        predictor_column: joined.right_column.clone(),
        target_year: req.target_year,
        log_response: req.log_response,
        rows,
        excluded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, code: &str, year: i32, response: f64, predictor: f64) -> JoinedRecord {
        JoinedRecord {
            country_name: name.into(),
            country_code: code.into(),
            year,
            left: response,
            right: predictor,
        }
    }

    fn joined(records: Vec<JoinedRecord>) -> JoinedDataset {
        JoinedDataset {
            left_column: "co2".into(),
            right_column: "ren".into(),
            records,
        }
    }

    #[test]
    fn clamping_applies_to_percentages_only() {
        assert_eq!(clamp_to_scale(108.0, ValueScale::Percent), 100.0);
        assert_eq!(clamp_to_scale(-3.0, ValueScale::Percent), 0.0);
        assert_eq!(clamp_to_scale(108.0, ValueScale::Absolute), 108.0);
    }

    #[test]
    fn default_range_starts_no_earlier_than_2005() {
        let j = joined(vec![
            rec("A", "AAA", 2000, 1.0, 1.0),
            rec("A", "AAA", 2020, 1.0, 1.0),
        ]);
        assert_eq!(
            default_fit_range(&j),
            Some(DateSpec::Range {
                start: 2005,
                end: 2020
            })
        );
        assert_eq!(default_fit_range(&joined(vec![])), None);
    }

    #[test]
    fn rising_share_is_clamped_before_second_stage() {
        // share rises 8 points a year from 60: 2030 trend = 60 + 8*20 = 220 -> 100
        let records: Vec<JoinedRecord> = (0..6)
            .map(|t| {
                let share = 60.0 + 8.0 * t as f64 + if t % 2 == 0 { 0.5 } else { -0.5 };
                rec("A", "AAA", 2010 + t, 1000.0 - 10.0 * t as f64, share)
            })
            .collect();
        let mut req = ProjectionRequest::new(
            vec!["AAA".into()],
            DateSpec::Range {
                start: 2010,
                end: 2015,
            },
        );
        req.log_response = false;
        let report = project(&joined(records), &req);
        let row = &report.rows[0];
        assert!(row.predictor_unclamped > 100.0);
        assert_eq!(row.predictor_at_target, 100.0);
        assert!(row.response_at_target().is_some());
    }

    #[test]
    fn log_response_drops_non_positive_rows() {
        let records = vec![
            rec("A", "AAA", 2010, 0.0, 10.0),
            rec("A", "AAA", 2011, 100.0, 12.0),
            rec("A", "AAA", 2012, 110.0, 11.0),
            rec("A", "AAA", 2013, -5.0, 15.0),
        ];
        let req = ProjectionRequest::new(
            vec!["A".into()],
            DateSpec::Range {
                start: 2010,
                end: 2013,
            },
        );
        let report = project(&joined(records), &req);
        let row = &report.rows[0];
        assert_eq!(row.points, 4);
        assert_eq!(
            row.response,
            Err(FitUndefined::InsufficientData { needed: 3, got: 2 })
        );
        assert_eq!(row.response_r_squared(), None);
        assert_eq!(row.response_at_target(), None);
    }

    #[test]
    fn unknown_country_is_excluded() {
        let req = ProjectionRequest::new(vec!["Atlantis".into()], DateSpec::Year(2010));
        let report = project(&joined(vec![rec("A", "AAA", 2010, 1.0, 1.0)]), &req);
        assert!(report.rows.is_empty());
        assert_eq!(report.excluded[0].reason, Exclusion::UnknownCountry);
    }

    #[test]
    fn countries_match_by_name_ignoring_case() {
        let rows = (0..3)
            .map(|i| rec("Chile", "CHL", 2010 + i, 60.0, 20.0 + (i * i) as f64))
            .collect();
        let req = ProjectionRequest::new(
            vec!["chile".into(), "CHILE".into()],
            DateSpec::Range {
                start: 2010,
                end: 2012,
            },
        );
        let report = project(&joined(rows), &req);
        assert!(report.excluded.is_empty());
        assert_eq!(report.rows.len(), 2);
        assert!(report.rows.iter().all(|r| r.country_code == "CHL"));
    }
}
