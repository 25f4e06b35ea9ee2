use trajectory_composer::options;
use trajectory_composer::phase::{
    ALL_STATES, DeclaredSubsystem, Linkage, Phase, PhaseBuilder, PhaseLinker, TIME, Trajectory,
    TrajectoryError,
};

fn ballistic() -> DeclaredSubsystem {
    ["r", "h", "gam", "v"]
        .into_iter()
        .fold(DeclaredSubsystem::new("eom"), |s, name| {
            s.state(name, options! { "units" => "m" })
        })
}

fn two_phase() -> Trajectory {
    let eom = ballistic();
    let mut traj = Trajectory::new();
    for name in ["ascent", "descent"] {
        let phase = PhaseBuilder::new().with(&eom).build(Phase::new(name)).unwrap();
        traj.add_phase(phase).unwrap();
    }
    traj
}

#[test]
fn wildcard_links_the_same_states_as_an_explicit_list() {
    let mut star = two_phase();
    assert_eq!(PhaseLinker::link(&mut star, ("ascent", "descent"), &[ALL_STATES]).unwrap(), 4);

    let mut explicit = two_phase();
    PhaseLinker::link(&mut explicit, ("ascent", "descent"), &["gam", "h", "r", "v"]).unwrap();

    let mut a: Vec<&Linkage> = star.linkages().iter().collect();
    let mut b: Vec<&Linkage> = explicit.linkages().iter().collect();
    a.sort_by(|x, y| x.variable.cmp(&y.variable));
    b.sort_by(|x, y| x.variable.cmp(&y.variable));
    assert_eq!(a, b);
    assert_eq!(
        star.linkages()[0].to_string(),
        format!("ascent.final:{0} == descent.initial:{0}", star.linkages()[0].variable)
    );
}

#[test]
fn relinking_is_idempotent() {
    let mut traj = two_phase();
    PhaseLinker::link(&mut traj, ("ascent", "descent"), &[ALL_STATES]).unwrap();
    let added = PhaseLinker::link(&mut traj, ("ascent", "descent"), &["h", TIME]).unwrap();
    assert_eq!(added, 1);
    assert_eq!(traj.linkages().len(), 5);
}

#[test]
fn missing_variable_leaves_trajectory_untouched() {
    let mut traj = two_phase();
    let err = PhaseLinker::link(&mut traj, ("ascent", "descent"), &["h", "mass"]).unwrap_err();
    assert_eq!(
        err,
        TrajectoryError::LinkageVariableMissing {
            variable: "mass".to_string(),
            phase: "ascent".to_string(),
        }
    );
    assert!(traj.linkages().is_empty());
}

#[test]
fn phases_must_be_adjacent_and_in_order() {
    let mut traj = two_phase();
    let err = PhaseLinker::link(&mut traj, ("descent", "ascent"), &[ALL_STATES]).unwrap_err();
    assert!(matches!(err, TrajectoryError::NonAdjacentPhases { .. }));
    let err = PhaseLinker::link(&mut traj, ("ascent", "coast"), &[ALL_STATES]).unwrap_err();
    assert_eq!(err, TrajectoryError::UnknownPhase("coast".to_string()));
}

#[test]
fn finalized_trajectory_rejects_linkage() {
    let mut traj = two_phase();
    traj.finalize();
    let err = PhaseLinker::link(&mut traj, ("ascent", "descent"), &[ALL_STATES]).unwrap_err();
    assert_eq!(err, TrajectoryError::Finalized);
    assert!(traj.add_phase(Phase::new("coast")).is_err());
}

#[test]
fn linkage_does_not_fix_values() {
    let mut traj = two_phase();
    PhaseLinker::link(&mut traj, ("ascent", "descent"), &[ALL_STATES]).unwrap();
    let descent = traj.phase("descent").unwrap();
    assert!(!descent.is_state_fixed("h", trajectory_composer::phase::Location::Initial));
}
