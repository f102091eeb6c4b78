use crate::models::LongDataset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary statistics for one country of an indicator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub country_code: String,
    pub country_name: String,
    pub count: usize,
    pub first_year: i32,
    pub last_year: i32,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

/// Compute statistics per country code, ordered by code.
pub fn country_summary(dataset: &LongDataset) -> Vec<Summary> {
    let mut groups: BTreeMap<&str, (&str, Vec<i32>, Vec<f64>)> = BTreeMap::new();
    for r in dataset {
        let g = groups
            .entry(r.country_code.as_str())
            .or_insert_with(|| (r.country_name.as_str(), Vec::new(), Vec::new()));
        g.1.push(r.year);
        g.2.push(r.value);
    }

    let mut out = Vec::new();
    for (code, (name, years, mut vals)) in groups {
        vals.sort_by(f64::total_cmp);
        let count = vals.len();
        let median = if count % 2 == 1 {
            vals[count / 2]
        } else {
            (vals[count / 2 - 1] + vals[count / 2]) / 2.0
        };
        out.push(Summary {
            country_code: code.to_string(),
            country_name: name.to_string(),
            count,
            first_year: years.iter().copied().min().unwrap_or_default(),
            last_year: years.iter().copied().max().unwrap_or_default(),
            min: vals[0],
            max: vals[count - 1],
            mean: vals.iter().sum::<f64>() / count as f64,
            median,
        });
    }
    out
}

/// Pearson correlation of paired samples.
///
/// `None` for fewer than two pairs, mismatched lengths, or zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then_some(r.clamp(-1.0, 1.0))
}
