use std::collections::BTreeSet;
use std::sync::Arc;

use approx::assert_relative_eq;
use trajectory_composer::mission::{
    ConsumedOutputs, ConstraintKind, MissionError, MissionProblem, NoSizing, PhasePlan,
    TrajectoryParameter,
};
use trajectory_composer::phase::{DeclaredSubsystem, Location, TimeOptions};
use trajectory_composer::vehicles::{VehicleSettings, cannonball_mission, min_time_climb_mission};
use trajectory_composer::{Case, CaseReader, options};

#[test]
fn cannonball_assembles_with_connected_sizing() {
    let mission = cannonball_mission(4.0e5, &VehicleSettings::default())
        .assemble()
        .unwrap();

    let traj = mission.trajectory();
    assert!(traj.is_finalized());
    assert_eq!(traj.phases().len(), 2);
    assert_eq!(traj.linkages().len(), 5);
    let linked: BTreeSet<&str> = traj.linkages().iter().map(|l| l.variable.as_str()).collect();
    assert_eq!(linked, BTreeSet::from(["time", "gam", "h", "r", "v"]));

    let targets: Vec<(&str, &str)> = mission
        .connections()
        .iter()
        .map(|c| (c.source.as_str(), c.target.as_str()))
        .collect();
    assert!(targets.contains(&("mass", "traj.parameters:m")));
    assert!(targets.contains(&("S", "traj.parameters:S")));
    assert!(targets.contains(&("price", "traj.parameters:price")));

    let fixed: BTreeSet<&str> = mission.fixed_parameters().iter().map(|p| p.name.as_str()).collect();
    assert!(fixed.contains("traj.parameters:CD"));
    assert!(fixed.contains("density"));
    assert!(!fixed.contains("radius"));

    let design: BTreeSet<&str> = mission.design_variables().iter().map(|d| d.name.as_str()).collect();
    assert!(design.contains("radius"));
    assert!(design.contains("traj.descent.t_initial"));
    assert!(!design.contains("traj.ascent.t_initial"));
    assert!(design.contains("traj.ascent.states:gam"));

    assert!(mission.constraints().iter().any(|c| c.name
        == "traj.ascent.initial_boundary_constraints:ke"
        && c.kind == ConstraintKind::Boundary { loc: Location::Initial }));
    assert_eq!(
        mission
            .constraints()
            .iter()
            .filter(|c| c.kind == ConstraintKind::Linkage)
            .count(),
        5
    );
    assert!(mission
        .constraints()
        .iter()
        .any(|c| c.name == "traj.linkages.ascent:time_final|descent:time_initial"));
    assert!(mission.objective().is_none());
    assert_eq!(mission.terminal_output(), Some("traj.descent.states:r"));
}

#[test]
fn endpoint_fixing_differs_between_phases() {
    let mission = cannonball_mission(4.0e5, &VehicleSettings::default())
        .assemble()
        .unwrap();
    let ascent = mission.trajectory().phase("ascent").unwrap();
    let descent = mission.trajectory().phase("descent").unwrap();
    assert!(ascent.is_state_fixed("h", Location::Initial));
    assert!(ascent.is_state_fixed("gam", Location::Final));
    assert!(!descent.is_state_fixed("h", Location::Initial));
    assert!(descent.is_state_fixed("h", Location::Final));
    assert!(!descent.is_state_fixed("v", Location::Final));
}

#[test]
fn sizing_runs_and_feeds_trajectory_parameters() {
    let mission = cannonball_mission(4.0e5, &VehicleSettings::default())
        .assemble()
        .unwrap();
    let mut case = Case::new();
    mission.seed(&mut case);
    case.set_scalar("radius", 0.05);
    let outputs = mission.evaluate_sizing(&mut case, &BTreeSet::new()).unwrap();

    let mass = 4.0 / 3.0 * 7870.0 * std::f64::consts::PI * 0.05_f64.powi(3);
    assert_relative_eq!(outputs["mass"], mass, max_relative = 1e-12);
    assert_relative_eq!(case.scalar("traj.parameters:m").unwrap(), mass, max_relative = 1e-12);
    assert_relative_eq!(case.scalar("price").unwrap(), mass * 10.0, max_relative = 1e-12);
    assert_eq!(case.values("traj.ascent.states:v"), Some(&[200.0, 150.0][..]));
}

#[test]
fn unconnected_parameter_is_fatal() {
    let eom = DeclaredSubsystem::new("eom").state("x", options! { "units" => "m" });
    let err = MissionProblem::new("orphan", Box::new(NoSizing))
        .phase(PhasePlan::new("p0").contributor(Arc::new(eom)))
        .parameter(TrajectoryParameter::connected("m", "mass", options! { "units" => "kg" }))
        .assemble()
        .unwrap_err();
    match err {
        MissionError::UnresolvedParameter { parameter, wanted, .. } => {
            assert_eq!(parameter, "m");
            assert_eq!(wanted.as_deref(), Some("mass"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn phase_parameter_without_source_is_fatal() {
    let eom = DeclaredSubsystem::new("eom")
        .state("x", options! { "units" => "m" })
        .parameter("CD", options! { "units" => "unitless" });
    let err = MissionProblem::new("orphan", Box::new(NoSizing))
        .phase(PhasePlan::new("p0").contributor(Arc::new(eom)))
        .assemble()
        .unwrap_err();
    assert!(matches!(err, MissionError::UnresolvedParameter { wanted: None, .. }));
}

#[test]
fn post_mission_must_read_existing_outputs() {
    let eom = DeclaredSubsystem::new("eom").state("x", options! { "units" => "m" });
    let err = MissionProblem::new("post", Box::new(NoSizing))
        .phase(PhasePlan::new("p0").contributor(Arc::new(eom)))
        .post_mission(Box::new(ConsumedOutputs(vec!["traj.p0.states:y".to_string()])))
        .assemble()
        .unwrap_err();
    assert!(matches!(
        err,
        MissionError::UnknownTrajectoryOutput { ref path, .. } if path == "traj.p0.states:y"
    ));
}

#[test]
fn overriding_an_unregistered_state_is_an_error() {
    let eom = DeclaredSubsystem::new("eom").state("x", options! { "units" => "m" });
    let err = MissionProblem::new("override", Box::new(NoSizing))
        .phase(
            PhasePlan::new("p0")
                .contributor(Arc::new(eom))
                .state_options("y", options! { "fix_initial" => true }),
        )
        .assemble()
        .unwrap_err();
    assert!(matches!(err, MissionError::PhaseOption { .. }));
}

#[test]
fn min_time_climb_has_a_single_time_objective() {
    let mission = min_time_climb_mission(20e3, &VehicleSettings::default())
        .assemble()
        .unwrap();
    let objective = mission.objective().unwrap();
    assert_eq!(objective.name, "traj.phase0.time");
    assert_eq!(objective.loc, Some(Location::Final));

    let phase = mission.trajectory().phase("phase0").unwrap();
    assert_eq!(phase.time(), &TimeOptions {
        fix_initial: true,
        duration_bounds: (50.0, 400.0),
        duration_ref: 100.0,
        ..TimeOptions::default()
    });
    assert_eq!(phase.controls()["alpha"].get("upper").and_then(|v| v.as_f64()), Some(8.0));
    assert_eq!(phase.states().len(), 5);
    for name in ["h", "aero.mach", "gam"] {
        assert!(phase.boundary_constraints().contains_key(name), "boundary {name}");
    }
    for name in ["h", "aero.mach", "alpha", "time", "time_phase"] {
        assert!(phase.path_constraints().contains_key(name), "path {name}");
    }
    let names: BTreeSet<&str> = mission.constraints().iter().map(|c| c.name.as_str()).collect();
    assert!(names.contains("traj.phase0.final_boundary_constraints:h"));
    assert!(names.contains("traj.phase0.path_constraints:h"));
    assert!(names.contains("traj.phase0.final_boundary_constraints:aero.mach"));

    let fixed: BTreeSet<&str> = mission.fixed_parameters().iter().map(|p| p.name.as_str()).collect();
    assert!(fixed.contains("traj.phase0.parameters:S"));
    assert!(fixed.contains("traj.phase0.parameters:Isp"));
}

#[test]
fn namespaced_assembly_qualifies_every_name() {
    let mission = cannonball_mission(4.0e5, &VehicleSettings::default())
        .assemble_in("group_3")
        .unwrap();
    assert!(mission.design_variables().iter().all(|d| d.name.starts_with("group_3.")));
    assert!(mission.constraints().iter().all(|c| c.name.starts_with("group_3.")));
    assert_eq!(mission.path("mass"), "group_3.mass");
    assert_eq!(mission.terminal_output(), Some("group_3.traj.descent.states:r"));
}
