//! Wide-to-long loader for WDI-style indicator sheets.
//!
//! A wide source has one row per country and one column per year:
//!
//! ```text
//! CountryName,CountryCode,Y1999,Y2000,Y2001
//! Brazil,BRA,1.0,2.0,3.0
//! ```
//!
//! [`load`] turns it into one [`LongRecord`] per (country, year) and applies the
//! cleaning rules: only three-letter country codes, only years from 2000 on, and
//! only non-missing values. Missing cells (empty, `..`, `NA`, unparsable) are
//! dropped silently.

use crate::error::{Error, Result, SchemaIssue};
use crate::models::{COUNTRY_CODE_LEN, LongDataset, LongRecord, MIN_YEAR};
use csv::ReaderBuilder;
use regex::Regex;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

pub const COUNTRY_NAME_COLUMN: &str = "CountryName";
pub const COUNTRY_CODE_COLUMN: &str = "CountryCode";

// One letter, then the four-digit year.
static YEAR_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]([0-9]{4})$").expect("valid year-column regex"));

/// Raw tabular input as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideSource {
    /// Path or other identity, used in error messages.
    pub source_ref: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl WideSource {
    pub fn new(source_ref: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            source_ref: source_ref.into(),
            headers,
            rows,
        }
    }

    /// Read a CSV file with a header row.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(path.display().to_string(), file)
    }

    /// Read CSV from any reader. Short rows are padded with empty cells.
    pub fn from_reader<R: Read>(source_ref: impl Into<String>, reader: R) -> Result<Self> {
        let source_ref = source_ref.into();
        let csv_err = |source| Error::Csv {
            source_ref: source_ref.clone(),
            source,
        };
        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = rdr
            .headers()
            .map_err(csv_err)?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                h.trim().to_string()
            })
            .collect();
        let mut rows = Vec::new();
        for rec in rdr.records() {
            let rec = rec.map_err(csv_err)?;
            let mut row: Vec<String> = rec.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }
        Ok(Self {
            source_ref,
            headers,
            rows,
        })
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Year columns as `(year, column index)`, sorted by year.
pub fn year_columns(headers: &[String]) -> Vec<(i32, usize)> {
    let mut cols: Vec<(i32, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, h)| {
            let caps = YEAR_COLUMN.captures(h)?;
            let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
            Some((year, idx))
        })
        .collect();
    cols.sort_by_key(|(year, _)| *year);
    cols
}

/// Parse a value cell. `None` for anything that is not a finite number.
pub fn parse_cell(cell: &str) -> Option<f64> {
    let s = cell.trim();
    if s.is_empty() || s == ".." {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

/// Reshape a wide source into long form under `value_column`.
///
/// ### Errors
/// - [`SchemaIssue::MissingIdentifierColumns`] when `CountryName` or `CountryCode` is absent
/// - [`SchemaIssue::NoYearColumns`] when no header looks like `Y2000`
pub fn load(source: &WideSource, value_column: &str) -> Result<LongDataset> {
    let name_idx = source.column(COUNTRY_NAME_COLUMN);
    let code_idx = source.column(COUNTRY_CODE_COLUMN);
    let (name_idx, code_idx) = match (name_idx, code_idx) {
        (Some(n), Some(c)) => (n, c),
        _ => {
            let missing = [
                (COUNTRY_NAME_COLUMN, name_idx),
                (COUNTRY_CODE_COLUMN, code_idx),
            ]
            .into_iter()
            .filter(|(_, idx)| idx.is_none())
            .map(|(col, _)| col.to_string())
            .collect();
            return Err(Error::schema(
                &source.source_ref,
                SchemaIssue::MissingIdentifierColumns { missing },
            ));
        }
    };

    let years = year_columns(&source.headers);
    if years.is_empty() {
        return Err(Error::schema(&source.source_ref, SchemaIssue::NoYearColumns));
    }

    let mut records = Vec::new();
    let (mut dropped_code, mut dropped_year, mut dropped_missing) = (0usize, 0usize, 0usize);
    // Melt order: year-major, source rows in input order within a year.
    for &(year, col) in &years {
        for row in &source.rows {
            let code = cell(row, code_idx);
            if code.chars().count() != COUNTRY_CODE_LEN {
                dropped_code += 1;
                continue;
            }
            if year < MIN_YEAR {
                dropped_year += 1;
                continue;
            }
            let Some(value) = parse_cell(cell(row, col)) else {
                dropped_missing += 1;
                continue;
            };
            records.push(LongRecord {
                country_name: cell(row, name_idx).to_string(),
                country_code: code.to_string(),
                year,
                value,
            });
        }
    }

    log::debug!(
        "{}: {} rows x {} year columns -> {} records (dropped: {} code, {} year, {} missing)",
        source.source_ref,
        source.rows.len(),
        years.len(),
        records.len(),
        dropped_code,
        dropped_year,
        dropped_missing
    );

    Ok(LongDataset::from_records(value_column, records))
}

/// Read `path` and reshape it. Each call re-reads the file.
pub fn load_path<P: AsRef<Path>>(path: P, value_column: &str) -> Result<LongDataset> {
    let source = WideSource::from_path(path)?;
    load(&source, value_column)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(csv: &str) -> WideSource {
        WideSource::from_reader("test.csv", csv.as_bytes()).unwrap()
    }

    #[test]
    fn year_columns_sorted_numerically_and_pattern_checked() {
        let headers: Vec<String> = ["CountryName", "Y2005", "X2001", "Y20", "YY2000", "Y2000a", "Y1999"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let cols = year_columns(&headers);
        assert_eq!(cols, vec![(1999, 6), (2001, 2), (2005, 1)]);
    }

    #[test]
    fn parse_cell_treats_markers_as_missing() {
        assert_eq!(parse_cell(" 1.5 "), Some(1.5));
        assert_eq!(parse_cell(""), None);
        assert_eq!(parse_cell(".."), None);
        assert_eq!(parse_cell("NaN"), None);
        assert_eq!(parse_cell("n/a"), None);
        assert_eq!(parse_cell("inf"), None);
    }

    #[test]
    fn melt_order_is_year_major() {
        let ds = load(
            &src("CountryName,CountryCode,Y2001,Y2000\nA,AAA,2,1\nB,BBB,4,3\n"),
            "v",
        )
        .unwrap();
        let got: Vec<(&str, i32, f64)> = ds
            .iter()
            .map(|r| (r.country_code.as_str(), r.year, r.value))
            .collect();
        assert_eq!(
            got,
            vec![("AAA", 2000, 1.0), ("BBB", 2000, 3.0), ("AAA", 2001, 2.0), ("BBB", 2001, 4.0)]
        );
        assert_eq!(ds.value_column(), "v");
    }

    #[test]
    fn bom_and_short_rows_are_tolerated() {
        let ds = load(
            &src("\u{feff}CountryName,CountryCode,Y2000,Y2001\nA,AAA,1\n"),
            "v",
        )
        .unwrap();
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn missing_identifier_column_is_schema_error() {
        let err = load(&src("CountryName,Y2000\nA,1\n"), "v").unwrap_err();
        match err {
            Error::Schema {
                reason: SchemaIssue::MissingIdentifierColumns { missing },
                ..
            } => assert_eq!(missing, vec!["CountryCode".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
    }
}
