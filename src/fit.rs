//! Ordinary least squares for trend lines and small multi-predictor models.
//!
//! Two entry points:
//! - [`fit_linear`]: `y = slope * x + intercept`, closed form on centred data
//! - [`fit_linear_multi`]: `y = X β` for a design matrix with up to a handful of
//!   columns (intercept, year, one auxiliary predictor), solved by SVD
//!
//! Both return `Err(FitUndefined)` instead of NaN when a fit cannot be computed.
//! R² is `None` when y has no variance.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use thiserror::Error;

/// Singular values below `RCOND * max(σ)` count as zero.
const RCOND: f64 = 1e-10;

/// Why a fit has no numeric result.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum FitUndefined {
    #[error("need at least {needed} points, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("x has {x} values but y has {y}")]
    LengthMismatch { x: usize, y: usize },

    #[error("predictor has zero variance")]
    ZeroVariancePredictor,

    #[error("design matrix is singular or ill-conditioned")]
    Singular,

    #[error("non-finite input or coefficient")]
    NonFinite,
}

/// Result of a single-predictor fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub fitted: Vec<f64>,
    pub r_squared: Option<f64>,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Result of a multi-predictor fit. `coefficients[j]` multiplies design column `j`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiFit {
    pub coefficients: Vec<f64>,
    pub fitted: Vec<f64>,
    pub r_squared: Option<f64>,
}

impl MultiFit {
    /// Evaluate the fitted combination at one design row.
    pub fn predict(&self, row: &[f64]) -> Option<f64> {
        if row.len() != self.coefficients.len() {
            return None;
        }
        Some(row.iter().zip(&self.coefficients).map(|(a, b)| a * b).sum())
    }
}

/// Design row `[1, year, predictor]` for the two-stage projection model.
pub fn design_row(year: f64, predictor: f64) -> [f64; 3] {
    [1.0, year, predictor]
}

/// Coefficient of determination: `1 - SS_res / SS_tot`.
///
/// `None` when `SS_tot` is zero (all y equal up to rounding) or inputs are empty.
pub fn r_squared(y: &[f64], fitted: &[f64]) -> Option<f64> {
    if y.is_empty() || y.len() != fitted.len() {
        return None;
    }
    let n = y.len() as f64;
    let mean = y.iter().sum::<f64>() / n;
    let ss_tot: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    let scale: f64 = y.iter().map(|v| v * v).sum::<f64>().max(f64::MIN_POSITIVE);
    if ss_tot <= scale * 1e-12 {
        return None;
    }
    let ss_res: f64 = y.iter().zip(fitted).map(|(a, b)| (a - b).powi(2)).sum();
    Some(1.0 - ss_res / ss_tot)
}

/// Fit `y = slope * x + intercept`.
///
/// A single point yields slope `0`, intercept `y[0]` and R² `None`.
///
/// ### Errors
/// - [`FitUndefined::InsufficientData`] for empty input
/// - [`FitUndefined::LengthMismatch`] when lengths differ
/// - [`FitUndefined::ZeroVariancePredictor`] when two or more points share one x
/// - [`FitUndefined::NonFinite`] for NaN/infinite inputs
pub fn fit_linear(x: &[f64], y: &[f64]) -> Result<LinearFit, FitUndefined> {
    if x.len() != y.len() {
        return Err(FitUndefined::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    if x.is_empty() {
        return Err(FitUndefined::InsufficientData { needed: 1, got: 0 });
    }
    if !x.iter().chain(y).all(|v| v.is_finite()) {
        return Err(FitUndefined::NonFinite);
    }
    if x.len() == 1 {
        return Ok(LinearFit {
            slope: 0.0,
            intercept: y[0],
            fitted: vec![y[0]],
            r_squared: None,
        });
    }

    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let (mut sxx, mut sxy) = (0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mx;
        sxx += dx * dx;
        sxy += dx * (yi - my);
    }
    if sxx <= f64::EPSILON * x.iter().map(|v| v * v).sum::<f64>() {
        return Err(FitUndefined::ZeroVariancePredictor);
    }

    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let fitted: Vec<f64> = x.iter().map(|xi| slope * xi + intercept).collect();
    let r_squared = r_squared(y, &fitted);
    Ok(LinearFit {
        slope,
        intercept,
        fitted,
        r_squared,
    })
}

/// Least-squares solve of `design * β ≈ y` by SVD.
///
/// Returns `None` if the system is rank deficient.
fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    let tol = svd.singular_values.max() * RCOND;
    if svd.rank(tol) < x.ncols() {
        return None;
    }
    svd.solve(y, tol).ok()
}

/// Fit `y = design · β` where each design row has `K` columns.
///
/// The caller includes the intercept column; see [`design_row`].
///
/// ### Errors
/// - [`FitUndefined::InsufficientData`] with fewer rows than columns
/// - [`FitUndefined::LengthMismatch`] when row count and y length differ
/// - [`FitUndefined::Singular`] for collinear columns
/// - [`FitUndefined::NonFinite`] for NaN/infinite inputs or coefficients
pub fn fit_linear_multi<const K: usize>(
    design: &[[f64; K]],
    y: &[f64],
) -> Result<MultiFit, FitUndefined> {
    if design.len() != y.len() {
        return Err(FitUndefined::LengthMismatch {
            x: design.len(),
            y: y.len(),
        });
    }
    if K == 0 || design.len() < K {
        return Err(FitUndefined::InsufficientData {
            needed: K.max(1),
            got: design.len(),
        });
    }
    if !design.iter().flatten().chain(y).all(|v| v.is_finite()) {
        return Err(FitUndefined::NonFinite);
    }

    let x = DMatrix::from_fn(design.len(), K, |i, j| design[i][j]);
    let yv = DVector::from_column_slice(y);
    let beta = solve_least_squares(&x, &yv).ok_or(FitUndefined::Singular)?;
    if !beta.iter().all(|v| v.is_finite()) {
        return Err(FitUndefined::NonFinite);
    }

    let fitted: Vec<f64> = (&x * &beta).iter().copied().collect();
    let r_squared = r_squared(y, &fitted);
    Ok(MultiFit {
        coefficients: beta.iter().copied().collect(),
        fitted,
        r_squared,
    })
}
