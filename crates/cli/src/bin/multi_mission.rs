use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;
use trajectory_composer::config::{MissionConfig, load_scenario};
use trajectory_composer::export::cases::JsonCaseRecorder;
use trajectory_composer::export::{summary, table, writer_for_path};
use trajectory_composer::mission::SuperProblem;
use trajectory_composer::vehicles::build_super_problem;
use trajectory_composer::{Case, CaseRecorder};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Assemble a multi-mission super-problem and check it at the initial point"
)]
struct Cli {
    /// Scenario file (YAML or TOML)
    #[arg(long)]
    scenario: PathBuf,

    /// Replace the scenario missions with cannonball missions at these muzzle energies (J)
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    kes: Option<Vec<f64>>,

    /// Override the scenario weights
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    weights: Option<Vec<f64>>,

    /// Write the problem structure as JSON
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Write one CSV row per mission (`-` for stdout)
    #[arg(long)]
    table: Option<PathBuf>,

    /// Record the evaluated initial case as JSON
    #[arg(long)]
    cases: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut scenario = load_scenario(&cli.scenario)
        .with_context(|| format!("loading scenario {}", cli.scenario.display()))?;
    if let Some(kes) = &cli.kes {
        scenario.missions = kes
            .iter()
            .map(|&ke_max_j| MissionConfig::Cannonball { ke_max_j })
            .collect();
    }

    let problem = build_super_problem(&scenario, cli.weights.as_deref())
        .context("assembling super-problem")?;

    let mut case = Case::new();
    problem.seed(&mut case);
    problem
        .evaluate_sizing(&mut case)
        .context("evaluating sizing at the initial point")?;
    let shared = problem
        .verify_shared_outputs(&case)
        .context("verifying shared outputs")?;

    print_structure(&problem);
    if !shared.is_empty() {
        println!("Shared outputs (identical across missions):");
        for (name, value) in &shared {
            println!("  {name:<12} = {value:.6}");
        }
    }

    if let Some(path) = &cli.summary {
        summary::write_summary(path, &problem)
            .with_context(|| format!("writing summary {}", path.display()))?;
        info!("summary written to {}", path.display());
    }
    if let Some(path) = &cli.table {
        let mut writer = writer_for_path(path)?;
        table::write_mission_table(&mut writer, &problem, &case)
            .with_context(|| format!("writing table {}", path.display()))?;
    }
    if let Some(path) = &cli.cases {
        let mut recorder = JsonCaseRecorder::new(path);
        recorder
            .record("initial", &case)
            .with_context(|| format!("recording case {}", path.display()))?;
    }

    Ok(())
}

fn print_structure(problem: &SuperProblem) {
    println!("=== Super-problem ===");
    println!("Objective       : {}", problem.aggregator().expression());
    println!(
        "Sense           : {:?} (scaler {})",
        problem.sense(),
        problem.objective().scaler
    );
    println!("Design variables: {}", problem.design_variables().len());
    println!("Fixed parameters: {}", problem.fixed_parameters().len());
    println!("Constraints     : {}", problem.constraints().len());
    for mission in problem.missions() {
        let phases: Vec<&str> = mission
            .trajectory()
            .phases()
            .iter()
            .map(|p| p.name())
            .collect();
        println!(
            "[{}] {} phases={} linkages={} constraints={} terminal={}",
            mission.namespace(),
            mission.name(),
            phases.join(","),
            mission.trajectory().linkages().len(),
            mission.constraints().len(),
            mission.terminal_output().unwrap_or("-"),
        );
    }
}
