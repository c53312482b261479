// ─────────────────────────────────────────────────────────────────────
// SCPN Poisson — Solver Launcher
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! `poisson-solve <PX> <PY>`: load a problem, solve it on a PX×PY worker
//! grid, write `output<rank>.dat` per worker.

mod args;
mod logger;

use std::path::Path;
use std::process::ExitCode;

use log::info;
use poisson_core::output::write_worker_output;
use poisson_core::worker::{run_local, WorkerReport};
use clap::Parser;
use poisson_types::config::{GlobalProblem, SolverConfig};
use poisson_types::error::{PoissonError, PoissonResult};

use crate::args::CliArgs;

fn main() -> ExitCode {
    logger::init();
    let args = CliArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("poisson-solve: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> PoissonResult<()> {
    let config = args.solver_config();
    config.validate()?;

    if args.mpi {
        return run_mpi(args, &config);
    }
    run_in_process(args, &config)
}

fn run_in_process(args: &CliArgs, config: &SolverConfig) -> PoissonResult<()> {
    let problem = GlobalProblem::from_file(&args.input)?;
    let grid = args.grid();
    let workers = match args.workers {
        Some(n) => n,
        None => grid.workers()?,
    };
    info!(
        "solving {}×{} on {} in-process worker(s)",
        problem.width, problem.height, workers
    );

    let reports = run_local(&problem, grid, workers, config)?;
    std::fs::create_dir_all(&args.output_dir)?;
    if let Some(first) = reports.first() {
        print_header(first, workers);
    }
    for report in &reports {
        finish_worker(report, &args.output_dir, args.json)?;
    }
    Ok(())
}

#[cfg(feature = "mpi")]
fn run_mpi(args: &CliArgs, config: &SolverConfig) -> PoissonResult<()> {
    use poisson_core::channel::MessageChannel;
    use poisson_core::mpi_channel::MpiChannel;
    use poisson_core::worker::{run_worker, ABORT_CODE};
    use poisson_types::constants::ROOT_RANK;

    let mut channel = MpiChannel::initialize()?;
    let size = channel.size();
    if let Some(requested) = args.workers.filter(|&n| n != size) {
        channel.abort(ABORT_CODE);
        return Err(PoissonError::Configuration(format!(
            "--workers {requested} disagrees with MPI world size {size}"
        )));
    }

    let problem = if channel.rank() == ROOT_RANK {
        match GlobalProblem::from_file(&args.input) {
            Ok(p) => Some(p),
            Err(e) => {
                eprintln!("poisson-solve: {e}");
                channel.abort(ABORT_CODE);
                return Err(e);
            }
        }
    } else {
        None
    };

    let report = run_worker(&mut channel, args.grid(), problem.as_ref(), config)?;
    if report.rank == ROOT_RANK {
        print_header(&report, size);
    }
    std::fs::create_dir_all(&args.output_dir)?;
    finish_worker(&report, &args.output_dir, args.json)
}

#[cfg(not(feature = "mpi"))]
fn run_mpi(_args: &CliArgs, _config: &SolverConfig) -> PoissonResult<()> {
    Err(PoissonError::Configuration(
        "poisson-solve was built without the `mpi` feature".to_string(),
    ))
}

fn print_header(report: &WorkerReport, workers: usize) {
    let (width, height) = report.global_dims;
    println!(
        "grid {width}×{height}, {workers} worker(s) as {}×{}",
        report.grid.px, report.grid.py
    );
    println!(
        "{:?} after {} iteration(s), global delta {:e}",
        report.outcome.status, report.outcome.iterations, report.outcome.global_max_delta
    );
    println!("bytes communicated: {}", report.total_bytes_communicated);
}

fn finish_worker(report: &WorkerReport, dir: &Path, json: bool) -> PoissonResult<()> {
    let path = write_worker_output(dir, report)?;
    if json {
        println!("{}", report.summary_json()?);
    } else {
        let (cx, cy) = report.coordinate;
        let (ox, oy) = report.subgrid.offset();
        let (dx, dy) = report.subgrid.dims();
        println!(
            "({}) coord ({cx}, {cy}) interior {dx}×{dy} at ({ox}, {oy}): {} iteration(s), {:.6} s, {} bytes -> {}",
            report.rank,
            report.outcome.iterations,
            report.elapsed.as_secs_f64(),
            report.bytes_communicated,
            path.display()
        );
    }
    Ok(())
}
