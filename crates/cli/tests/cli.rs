use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn scenario(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../configs/scenarios")
        .join(name)
}

#[test]
fn cannonball_scenario_prints_weighted_objective() {
    Command::cargo_bin("multi_mission")
        .expect("multi_mission bin")
        .args(["--scenario", scenario("cannonball.yaml").to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "compound_range=2*r0+1.5*r1",
        ))
        .stdout(predicate::str::contains("[group_1]"))
        .stdout(predicate::str::contains("mass"));
}

#[test]
fn weights_and_energies_can_be_overridden() {
    Command::cargo_bin("multi_mission")
        .expect("multi_mission bin")
        .args([
            "--scenario",
            scenario("cannonball.yaml").to_str().unwrap(),
            "--kes",
            "100000,600000",
            "--weights",
            "1.2,2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("compound_range=1.2*r0+2*r1"));
}

#[test]
fn more_weights_than_missions_fails() {
    Command::cargo_bin("multi_mission")
        .expect("multi_mission bin")
        .args([
            "--scenario",
            scenario("cannonball.yaml").to_str().unwrap(),
            "--weights",
            "1,2,3",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("more weights than missions"));
}

#[test]
fn artifacts_are_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let summary = dir.path().join("summary.json");
    let table = dir.path().join("missions.csv");
    let cases = dir.path().join("cases.json");

    Command::cargo_bin("multi_mission")
        .expect("multi_mission bin")
        .args([
            "--scenario",
            scenario("climb.toml").to_str().unwrap(),
            "--summary",
            summary.to_str().unwrap(),
            "--table",
            table.to_str().unwrap(),
            "--cases",
            cases.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("[climb_0]"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary).expect("summary")).expect("json");
    assert_eq!(json["missions"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["sense"], "minimize");

    let csv = fs::read_to_string(&table).expect("table");
    assert!(csv.starts_with("namespace,mission,weight"));
    assert_eq!(csv.lines().count(), 3);

    let recorded: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&cases).expect("cases")).expect("json");
    assert_eq!(recorded[0]["label"], "initial");
}
