use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Writes the two projection sources of the built-in catalog.
fn seed_data_dir(dir: &Path) {
    fs::write(
        dir.join("EmCO2Tot.csv"),
        "CountryName,CountryCode,Y2005,Y2006,Y2007,Y2008,Y2009\n\
         Chile,CHL,60,62,61,65,66\n\
         Kenya,KEN,10,11,13,12,14\n\
         World,WLD1,1,2,3,4,5\n",
    )
    .unwrap();
    fs::write(
        dir.join("RenEnergy.csv"),
        "CountryName,CountryCode,Y2005,Y2006,Y2007,Y2008,Y2009\n\
         Chile,CHL,25,24,28,27,31\n\
         Kenya,KEN,70,72,71,75,..\n",
    )
    .unwrap();
}

#[test]
fn cli_shows_help() {
    let mut cmd = Command::cargo_bin("sdg7").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("sdg7"))
        .stdout(predicate::str::contains("project"));
}

#[test]
fn lists_builtin_indicators() {
    let mut cmd = Command::cargo_bin("sdg7").unwrap();
    cmd.args(["indicators", "--data-dir", "somewhere"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("renewables_share"))
        .stdout(predicate::str::contains("co2_emissions_total"));
}

#[test]
fn unknown_indicator_fails() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("sdg7").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .args(["map", "--indicator", "nope"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown indicator"));
}

#[test]
fn map_uses_latest_year_and_locale() {
    let dir = tempdir().unwrap();
    seed_data_dir(dir.path());
    let mut cmd = Command::cargo_bin("sdg7").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .args(["--locale", "de", "map", "--indicator", "renewables_share"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2009: data for 1 countries"))
        .stdout(predicate::str::contains("31,00"));
}

#[test]
fn project_writes_csv_report() {
    let dir = tempdir().unwrap();
    seed_data_dir(dir.path());
    let out = dir.path().join("projection.csv");
    let mut cmd = Command::cargo_bin("sdg7").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .args(["project", "--countries", "Chile,KEN,ATL", "--from", "2005", "--to", "2009", "--out"])
        .arg(&out);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Chile"))
        .stderr(predicate::str::contains("excluded ATL"));

    let txt = fs::read_to_string(&out).unwrap();
    let mut lines = txt.lines();
    let header = lines.next().unwrap();
    assert!(header.contains("renewables_share_2030"));
    assert!(header.contains("co2_emissions_total_2030"));
    assert_eq!(lines.count(), 2);
}
