use crate::models::LongDataset;
use crate::projection::ProjectionReport;
use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::borrow::Cow;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Prefix `'` to text cells a spreadsheet would evaluate as a formula.
fn csv_cell(s: &str) -> Cow<'_, str> {
    if s.starts_with(['=', '+', '-', '@']) {
        Cow::Owned(format!("'{}", s))
    } else {
        Cow::Borrowed(s)
    }
}

fn opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// Save long-format rows as CSV with header `country_name,country_code,year,<value column>`.
pub fn save_csv<P: AsRef<Path>>(dataset: &LongDataset, path: P) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.write_record(["country_name", "country_code", "year", dataset.value_column()])?;
    for r in dataset {
        wtr.serialize((
            csv_cell(&r.country_name),
            csv_cell(&r.country_code),
            r.year,
            r.value,
        ))?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(value)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

/// Save long-format rows as a pretty JSON array.
pub fn save_json<P: AsRef<Path>>(dataset: &LongDataset, path: P) -> Result<()> {
    write_json(dataset.records(), path)
}

/// Save one CSV row per projected country; undefined values are empty cells.
pub fn save_projection_csv<P: AsRef<Path>>(report: &ProjectionReport, path: P) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_path(path)?;
    let predictor_target = format!("{}_{}", report.predictor_column, report.target_year);
    let response_target = format!("{}_{}", report.response_column, report.target_year);
    wtr.write_record([
        "country_name",
        "country_code",
        "points",
        "predictor_r2",
        predictor_target.as_str(),
        "response_r2",
        response_target.as_str(),
        "note",
    ])?;
    for row in &report.rows {
        let note = match &row.response {
            Ok(_) => String::new(),
            Err(e) => csv_cell(&e.to_string()).into_owned(),
        };
        wtr.write_record([
            csv_cell(&row.country_name).into_owned(),
            csv_cell(&row.country_code).into_owned(),
            row.points.to_string(),
            opt(row.predictor_r_squared()),
            row.predictor_at_target.to_string(),
            opt(row.response_r_squared()),
            opt(row.response_at_target()),
            note,
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save the whole projection report, including fits and exclusions, as JSON.
pub fn save_projection_json<P: AsRef<Path>>(report: &ProjectionReport, path: P) -> Result<()> {
    write_json(report, path)
}
