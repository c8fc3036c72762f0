use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use config::RunConfig;
use phases::run_two_phase;
use report::write_phase_report;

mod config;
mod errors;
mod evaluator;
mod initial_solution;
mod mutation;
mod parser;
mod phases;
mod problem;
mod report;
mod solution;
mod solver;
mod utils;

/// Runs two back-to-back simulated-annealing passes over a pair of course
/// timetabling instances, with the second seeded from the first's
/// teacher-day occupancy.
#[derive(Debug, Parser)]
struct Args {
    /// Instance file for phase 1.
    phase_1_instance: PathBuf,
    /// Instance file for phase 2.
    phase_2_instance: PathBuf,
    /// Directory that receives both phases' reports.
    #[arg(long, default_value = "resultados")]
    out_dir: PathBuf,
    /// TOML file overriding the compiled-in SA schedule constants.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seeds the process-wide PRNG. Omit for a non-deterministic seed.
    #[arg(long)]
    seed: Option<u64>,
}

fn main_impl() -> Result<()> {
    let args = Args::parse();

    let run_config = match &args.config {
        Some(path) => RunConfig::read_from_toml(path)?,
        None => RunConfig::default(),
    };
    let seed = args.seed.unwrap_or_else(|| fastrand::u64(..));
    let mut rng = fastrand::Rng::with_seed(seed);
    let (params, schedule) = run_config.apply();

    let problem_1 = parser::parse(&args.phase_1_instance)?;
    println!(
        "Loaded phase-1 instance {:?}: {} courses, {} rooms, {} teachers",
        problem_1.name,
        problem_1.courses.len(),
        problem_1.rooms.len(),
        problem_1.teachers.len()
    );

    let problem_2 = parser::parse(&args.phase_2_instance)?;
    println!(
        "Loaded phase-2 instance {:?}: {} courses, {} rooms, {} teachers",
        problem_2.name,
        problem_2.courses.len(),
        problem_2.rooms.len(),
        problem_2.teachers.len()
    );

    let (phase_1, phase_2) = run_two_phase(&problem_1, &problem_2, params, &schedule, &mut rng);
    println!(
        "Phase 1 finished: fo = {} ({} outer iterations)",
        phase_1.anneal.best.fo, phase_1.anneal.outer_iterations
    );
    println!(
        "Phase 2 finished: fo = {} ({} outer iterations)",
        phase_2.anneal.best.fo, phase_2.anneal.outer_iterations
    );

    write_phase_report(
        &args.out_dir,
        &problem_1,
        &phase_1.anneal.best,
        &phase_1.violations,
        &phase_1.anneal.history,
        &phase_1.anneal.log,
    )?;
    write_phase_report(
        &args.out_dir,
        &problem_2,
        &phase_2.anneal.best,
        &phase_2.violations,
        &phase_2.anneal.history,
        &phase_2.anneal.log,
    )?;

    println!("Reports written to {}", args.out_dir.display());

    Ok(())
}

fn main() -> ExitCode {
    match main_impl() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("\nError: {err:?}");
            ExitCode::FAILURE
        }
    }
}
