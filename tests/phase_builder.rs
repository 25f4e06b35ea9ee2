use trajectory_composer::options;
use trajectory_composer::phase::{
    BuildError, Contributions, ControlQuery, DeclaredSubsystem, Location, Phase, PhaseBuilder,
    PhaseError, SubsystemContributor, VariableKind,
};

/// Records which phase name its control query received.
struct PhaseEcho {
    aware: bool,
}

impl SubsystemContributor for PhaseEcho {
    fn name(&self) -> &str {
        "echo"
    }

    fn control_query(&self) -> ControlQuery {
        if self.aware {
            ControlQuery::PhaseAware
        } else {
            ControlQuery::PhaseIndependent
        }
    }

    fn controls(&self, phase: Option<&str>) -> Contributions {
        let seen = phase.unwrap_or("none").to_string();
        Contributions::from([("alpha".to_string(), options! { "units" => seen })])
    }
}

#[test]
fn constraints_dispatch_by_type_and_lose_the_tag() {
    let aero = DeclaredSubsystem::new("aero")
        .constraint(
            "mach",
            options! { "type" => "boundary", "loc" => "final", "equals" => 1.0 },
        )
        .constraint("h", options! { "type" => "path", "lower" => 100.0 });

    let phase = PhaseBuilder::new()
        .with(&aero)
        .build(Phase::new("phase0"))
        .unwrap();

    assert_eq!(phase.boundary_location("mach"), Some(Location::Final));
    assert!(!phase.boundary_constraints()["mach"].contains_key("type"));
    assert!(!phase.path_constraints()["h"].contains_key("type"));
    assert!(phase.path_constraints().get("mach").is_none());
}

#[test]
fn later_contributors_overwrite_same_named_states() {
    let first = DeclaredSubsystem::new("first").state("h", options! { "units" => "m", "upper" => 1.0 });
    let second = DeclaredSubsystem::new("second").state("h", options! { "units" => "ft" });

    let phase = PhaseBuilder::new()
        .with(&first)
        .with(&second)
        .build(Phase::new("ascent"))
        .unwrap();
    assert_eq!(phase.states()["h"], options! { "units" => "ft" });

    let reversed = PhaseBuilder::new()
        .with(&second)
        .with(&first)
        .build(Phase::new("ascent"))
        .unwrap();
    assert_eq!(reversed.states()["h"].get("upper").and_then(|v| v.as_f64()), Some(1.0));
}

#[test]
fn unknown_constraint_type_names_contributor_and_constraint() {
    let bad = DeclaredSubsystem::new("bad")
        .constraint("q", options! { "type" => "integral", "upper" => 1.0 });
    let err = PhaseBuilder::new()
        .with(&bad)
        .build(Phase::new("cruise"))
        .unwrap_err();
    match err {
        BuildError::UnknownConstraintType {
            contributor,
            constraint,
            phase,
            ..
        } => {
            assert_eq!(contributor, "bad");
            assert_eq!(constraint, "q");
            assert_eq!(phase, "cruise");
        }
        other => panic!("unexpected error: {other}"),
    }

    let untagged = DeclaredSubsystem::new("untagged").constraint("q", options! { "upper" => 1.0 });
    let err = PhaseBuilder::new()
        .with(&untagged)
        .build(Phase::new("cruise"))
        .unwrap_err();
    assert!(err.to_string().contains("(missing)"));
}

#[test]
fn registration_failures_are_aggregated() {
    let states = DeclaredSubsystem::new("dynamics")
        .state("alpha", options! { "units" => "deg" })
        .state("v", options! { "colour" => "red" });
    let controls = DeclaredSubsystem::new("aero").control("alpha", options! { "units" => "deg" });

    let err = PhaseBuilder::new()
        .with(&states)
        .with(&controls)
        .build(Phase::new("climb"))
        .unwrap_err();
    let BuildError::Registration { phase, failures } = err else {
        panic!("expected an aggregated registration error");
    };
    assert_eq!(phase, "climb");
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().any(|f| f.contributor == "dynamics"
        && f.variable == "v"
        && matches!(f.reason, PhaseError::InvalidOption { .. })));
    assert!(failures.iter().any(|f| f.contributor == "aero"
        && f.reason
            == PhaseError::ConflictingDefinition {
                variable: "alpha".to_string(),
                existing: VariableKind::State,
                requested: VariableKind::Control,
            }));
}

#[test]
fn phase_name_reaches_only_phase_aware_contributors() {
    let aware = PhaseEcho { aware: true };
    let plain = PhaseEcho { aware: false };

    let phase = PhaseBuilder::new()
        .with(&aware)
        .build(Phase::new("cruise"))
        .unwrap();
    assert_eq!(phase.controls()["alpha"].get("units").and_then(|v| v.as_str()), Some("cruise"));

    let phase = PhaseBuilder::new()
        .with(&plain)
        .build(Phase::new("cruise"))
        .unwrap();
    assert_eq!(phase.controls()["alpha"].get("units").and_then(|v| v.as_str()), Some("none"));
}

#[test]
fn boundary_constraint_without_location_is_a_registration_failure() {
    let limits = DeclaredSubsystem::new("limits")
        .constraint("ke", options! { "type" => "boundary", "upper" => 1.0 });
    let err = PhaseBuilder::new()
        .with(&limits)
        .build(Phase::new("ascent"))
        .unwrap_err();
    assert!(matches!(err, BuildError::Registration { .. }));
    assert!(err.to_string().contains("ke"));
}

#[test]
fn disjoint_contributors_merge_into_their_union() {
    let dynamics = DeclaredSubsystem::new("dynamics")
        .state("h", options! { "units" => "m" })
        .state("v", options! { "units" => "m/s" })
        .constraint("h", options! { "type" => "path", "lower" => 0.0 });
    let engine = DeclaredSubsystem::new("engine")
        .state("m", options! { "units" => "kg" })
        .control("throttle", options! { "lower" => 0.0, "upper" => 1.0 })
        .constraint(
            "m",
            options! { "type" => "boundary", "loc" => "final", "lower" => 10.0 },
        );
    let aero = DeclaredSubsystem::new("aero")
        .control("alpha", options! { "units" => "deg" })
        .constraint("alpha", options! { "type" => "path", "upper" => 8.0 });

    let phase = PhaseBuilder::new()
        .with(&dynamics)
        .with(&engine)
        .with(&aero)
        .build(Phase::new("climb"))
        .unwrap();

    let keys = |map: &std::collections::BTreeMap<String, trajectory_composer::Options>| {
        map.keys().cloned().collect::<Vec<_>>()
    };
    assert_eq!(keys(phase.states()), ["h", "m", "v"]);
    assert_eq!(keys(phase.controls()), ["alpha", "throttle"]);
    assert_eq!(keys(phase.path_constraints()), ["alpha", "h"]);
    assert_eq!(keys(phase.boundary_constraints()), ["m"]);
    assert_eq!(phase.boundary_location("m"), Some(Location::Final));
}
