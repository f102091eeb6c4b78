use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// First year kept by the loader; earlier WDI years are too sparse to use.
pub const MIN_YEAR: i32 = 2000;

/// Length of a country code; regional aggregates use other lengths.
pub const COUNTRY_CODE_LEN: usize = 3;

/// Whether a user-supplied country `key` names this country, either by display
/// name or by code. Both comparisons ignore case.
pub fn country_matches(name: &str, code: &str, key: &str) -> bool {
    code.eq_ignore_ascii_case(key) || name.to_lowercase() == key.to_lowercase()
}

/// How to select years in queries and fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateSpec {
    /// Single year like 2020
    Year(i32),
    /// Inclusive range like 2005..=2020
    Range { start: i32, end: i32 },
}

impl DateSpec {
    pub fn contains(&self, year: i32) -> bool {
        match *self {
            DateSpec::Year(y) => y == year,
            DateSpec::Range { start, end } => (start..=end).contains(&year),
        }
    }

    /// Inclusive `(first, last)` bounds.
    pub fn bounds(&self) -> (i32, i32) {
        match *self {
            DateSpec::Year(y) => (y, y),
            DateSpec::Range { start, end } => (start, end),
        }
    }
}

impl fmt::Display for DateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DateSpec::Year(y) => write!(f, "{}", y),
            DateSpec::Range { start, end } => write!(f, "{}:{}", start, end),
        }
    }
}

/// Parses `YYYY` or `YYYY:YYYY`.
impl FromStr for DateSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || format!("invalid date '{}', expected YYYY or YYYY:YYYY", s);
        if let Some((a, b)) = s.split_once(':') {
            let start = a.trim().parse::<i32>().map_err(|_| bad())?;
            let end = b.trim().parse::<i32>().map_err(|_| bad())?;
            if start > end {
                return Err(bad());
            }
            Ok(DateSpec::Range { start, end })
        } else {
            s.trim().parse::<i32>().map(DateSpec::Year).map_err(|_| bad())
        }
    }
}

/// Tidy structure used by this crate (one row = one country-year observation).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LongRecord {
    pub country_name: String,
    pub country_code: String, // ISO3
    pub year: i32,
    pub value: f64,
}

impl LongRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            country_code: self.country_code.clone(),
            year: self.year,
        }
    }

    /// True when the row would survive the loader's cleaning filters.
    pub fn is_valid(&self) -> bool {
        self.country_code.chars().count() == COUNTRY_CODE_LEN
            && self.year >= MIN_YEAR
            && self.value.is_finite()
    }
}

/// Join key: (country_code, year).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub country_code: String,
    pub year: i32,
}

/// Long-format rows of a single indicator.
///
/// Every row has a finite value, `year >= 2000` and a three-character code.
/// Keys are not required to be unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LongDataset {
    value_column: String,
    records: Vec<LongRecord>,
}

impl LongDataset {
    /// Build a dataset, dropping rows that break the long-format invariants.
    pub fn from_records(value_column: impl Into<String>, records: Vec<LongRecord>) -> Self {
        Self {
            value_column: value_column.into(),
            records: records.into_iter().filter(LongRecord::is_valid).collect(),
        }
    }

    pub fn value_column(&self) -> &str {
        &self.value_column
    }

    pub fn records(&self) -> &[LongRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<LongRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LongRecord> {
        self.records.iter()
    }

    /// Rows whose year matches `date`, in input order.
    pub fn select_years(&self, date: DateSpec) -> LongDataset {
        Self {
            value_column: self.value_column.clone(),
            records: self
                .records
                .iter()
                .filter(|r| date.contains(r.year))
                .cloned()
                .collect(),
        }
    }

    /// Keys that occur more than once, with their counts.
    pub fn duplicate_keys(&self) -> Vec<(RecordKey, usize)> {
        let mut counts: BTreeMap<RecordKey, usize> = BTreeMap::new();
        for r in &self.records {
            *counts.entry(r.key()).or_default() += 1;
        }
        counts.into_iter().filter(|(_, n)| *n > 1).collect()
    }
}

impl<'a> IntoIterator for &'a LongDataset {
    type Item = &'a LongRecord;
    type IntoIter = std::slice::Iter<'a, LongRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// One row of an inner join between two indicators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoinedRecord {
    /// Taken from the left-hand dataset.
    pub country_name: String,
    pub country_code: String,
    pub year: i32,
    pub left: f64,
    pub right: f64,
}

/// Rows present in both inputs, keeping both value-column names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoinedDataset {
    pub left_column: String,
    pub right_column: String,
    pub records: Vec<JoinedRecord>,
}

impl JoinedDataset {
    /// Look up a value by its original column name.
    pub fn value(&self, record: &JoinedRecord, column: &str) -> Option<f64> {
        if column == self.left_column {
            Some(record.left)
        } else if column == self.right_column {
            Some(record.right)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn keys(&self) -> Vec<RecordKey> {
        self.records
            .iter()
            .map(|r| RecordKey {
                country_code: r.country_code.clone(),
                year: r.year,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(code: &str, year: i32, value: f64) -> LongRecord {
        LongRecord {
            country_name: "X".into(),
            country_code: code.into(),
            year,
            value,
        }
    }

    #[test]
    fn country_keys_ignore_case() {
        assert!(country_matches("Chile", "CHL", "chile"));
        assert!(country_matches("Côte d'Ivoire", "CIV", "CÔTE D'IVOIRE"));
        assert!(country_matches("Chile", "CHL", "chl"));
        assert!(!country_matches("Chile", "CHL", "Chil"));
    }

    #[test]
    fn date_spec_parses_year_and_range() {
        assert_eq!("2020".parse::<DateSpec>(), Ok(DateSpec::Year(2020)));
        assert_eq!(
            "2005:2020".parse::<DateSpec>(),
            Ok(DateSpec::Range {
                start: 2005,
                end: 2020
            })
        );
        assert!("2020:2005".parse::<DateSpec>().is_err());
        assert!("20x0".parse::<DateSpec>().is_err());
        assert_eq!(DateSpec::Range { start: 2005, end: 2020 }.to_string(), "2005:2020");
    }

    #[test]
    fn from_records_enforces_invariants() {
        let ds = LongDataset::from_records(
            "v",
            vec![
                rec("USA", 2010, 1.0),
                rec("EUU1", 2010, 1.0),
                rec("USA", 1999, 1.0),
                rec("USA", 2011, f64::NAN),
            ],
        );
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records()[0].year, 2010);
    }

    #[test]
    fn duplicate_keys_are_reported() {
        let ds = LongDataset::from_records(
            "v",
            vec![rec("USA", 2010, 1.0), rec("USA", 2010, 2.0), rec("BRA", 2010, 3.0)],
        );
        let dups = ds.duplicate_keys();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].0.country_code, "USA");
        assert_eq!(dups[0].1, 2);
    }
}
