use sdg7_rs::projection::{self, ProjectionRequest};
use sdg7_rs::{DateSpec, LongDataset, LongRecord, join, storage};
use std::fs;
use tempfile::tempdir;

fn series(code: &str, column: &str, values: &[f64]) -> LongDataset {
    LongDataset::from_records(
        column,
        values
            .iter()
            .enumerate()
            .map(|(i, v)| LongRecord {
                country_name: "Chile".into(),
                country_code: code.into(),
                year: 2010 + i as i32,
                value: *v,
            })
            .collect(),
    )
}

#[test]
fn save_csv_and_json() {
    let ds = series("CHL", "gdp_per_capita", &[100.0, 101.0, 102.0]);
    let dir = tempdir().unwrap();

    let csv_path = dir.path().join("long.csv");
    storage::save_csv(&ds, &csv_path).unwrap();
    let csv_txt = fs::read_to_string(&csv_path).unwrap();
    assert!(csv_txt.starts_with("country_name,country_code,year,gdp_per_capita"));
    assert_eq!(csv_txt.lines().count(), 1 + ds.len());

    let json_path = dir.path().join("long.json");
    storage::save_json(&ds, &json_path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(v.as_array().unwrap().len(), ds.len());
    assert_eq!(v[0]["country_code"], "CHL");
}

#[test]
fn projection_report_round_trips_to_files() {
    let joined = join::join(
        &series("CHL", "co2", &[60.0, 62.0, 61.0, 65.0]),
        &series("CHL", "ren", &[25.0, 24.0, 28.0, 27.0]),
    );
    let req = ProjectionRequest::new(
        vec!["CHL".into(), "PER".into()],
        DateSpec::Range {
            start: 2010,
            end: 2013,
        },
    );
    let report = projection::project(&joined, &req);
    let dir = tempdir().unwrap();

    let csv_path = dir.path().join("projection.csv");
    storage::save_projection_csv(&report, &csv_path).unwrap();
    let csv_txt = fs::read_to_string(&csv_path).unwrap();
    assert!(csv_txt.starts_with(
        "country_name,country_code,points,predictor_r2,ren_2030,response_r2,co2_2030,note"
    ));
    assert_eq!(csv_txt.lines().count(), 2);

    let json_path = dir.path().join("projection.json");
    storage::save_projection_json(&report, &json_path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(v["target_year"], 2030);
    assert_eq!(v["rows"].as_array().unwrap().len(), 1);
    assert_eq!(v["excluded"][0]["country"], "PER");
}

#[test]
fn csv_export_neutralizes_formula_names() {
    let ds = LongDataset::from_records(
        "renewables_share",
        vec![LongRecord {
            country_name: "=HYPERLINK(\"x\")".into(),
            country_code: "CHL".into(),
            year: 2010,
            value: 25.0,
        }],
    );
    let dir = tempdir().unwrap();
    let path = dir.path().join("formula.csv");
    storage::save_csv(&ds, &path).unwrap();

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let row = rdr.records().next().unwrap().unwrap();
    assert_eq!(&row[0], "'=HYPERLINK(\"x\")");
    assert_eq!(&row[1], "CHL");
}
