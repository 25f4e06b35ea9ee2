use trajectory_composer::Case;
use trajectory_composer::export::{summary, table};
use trajectory_composer::mission::{SharedVariable, SuperProblemAssembler};
use trajectory_composer::vehicles::{CannonballMission, VehicleSettings};

fn problem() -> trajectory_composer::mission::SuperProblem {
    let specs = [4e5, 6e5].map(|ke| CannonballMission::new(ke, VehicleSettings::default()));
    SuperProblemAssembler::new()
        .shared(SharedVariable::fixed("radius", 0.05))
        .shared(SharedVariable::fixed("density", 7870.0))
        .assemble(&specs, &[2.0, 1.2])
        .expect("super-problem")
}

#[test]
fn mission_table_has_one_row_per_mission() {
    let problem = problem();
    let mut case = Case::new();
    problem.seed(&mut case);
    problem.evaluate_sizing(&mut case).expect("sizing");
    case.set_val("group_1.traj.descent.states:r", vec![0.0, 1234.5]);

    let mut buffer = Vec::new();
    table::write_mission_table(&mut buffer, &problem, &case).expect("table");
    let text = String::from_utf8(buffer).expect("utf8");
    let mut reader = csv::Reader::from_reader(text.as_bytes());

    let headers = reader.headers().expect("headers").clone();
    assert_eq!(&headers[0], "namespace");
    assert_eq!(headers.iter().last(), Some("price"));

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("row")).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "group_0");
    assert_eq!(&rows[0][2], "2");
    assert_eq!(&rows[1][8], "1234.500000");
    assert_eq!(rows[0][9], rows[1][9]);
}

#[test]
fn summary_json_lists_objective_and_missions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out").join("summary.json");
    summary::write_summary(&path, &problem()).expect("summary");

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
    assert_eq!(json["expression"], "compound_range=2*r0+1.2*r1");
    assert_eq!(json["objective"]["scaler"], -1.0);
    assert_eq!(json["missions"][1]["namespace"], "group_1");
    assert_eq!(json["missions"][0]["phases"][1], "descent");
    assert_eq!(json["weights"][1], 1.2);
}
