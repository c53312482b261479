// ─────────────────────────────────────────────────────────────────────
// SCPN Poisson — Worker Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-worker control flow: broadcast, allocate, solve, account.
//!
//! `run_worker` is identical on every worker and works over any
//! `MessageChannel`. `run_local` launches a whole in-process run.

use std::time::{Duration, Instant};

use log::{debug, warn};
use ndarray::{s, Array2};
use serde::Serialize;
use poisson_types::config::{GlobalProblem, ProcessGrid, SolverConfig};
use poisson_types::constants::ROOT_RANK;
use poisson_types::error::{PoissonError, PoissonResult};
use poisson_types::state::SolveOutcome;

use crate::channel::{run_local_cluster, MessageChannel};
use crate::coordinator::ConvergenceCoordinator;
use crate::exchange::BoundaryExchanger;
use crate::subgrid::LocalSubgrid;
use crate::topology::ProcessTopology;

/// Exit code handed to `MessageChannel::abort` when a worker fails.
pub const ABORT_CODE: i32 = 1;

/// What one worker hands back after a completed run.
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub rank: usize,
    pub coordinate: (usize, usize),
    pub grid: ProcessGrid,
    /// Global grid size (width, height).
    pub global_dims: (usize, usize),
    pub outcome: SolveOutcome,
    pub subgrid: LocalSubgrid,
    /// Fixed-point defect of the final field on this worker.
    pub residual: f64,
    /// Bytes sent by this worker.
    pub bytes_communicated: u64,
    /// Bytes sent by all workers together.
    pub total_bytes_communicated: u64,
    pub elapsed: Duration,
}

/// Diagnostics of one worker, without the field itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerSummary {
    pub rank: usize,
    pub coordinate: (usize, usize),
    pub offset: (usize, usize),
    pub dims: (usize, usize),
    pub outcome: SolveOutcome,
    pub residual: f64,
    pub bytes_communicated: u64,
    pub total_bytes_communicated: u64,
    pub elapsed_secs: f64,
}

impl WorkerReport {
    pub fn summary(&self) -> WorkerSummary {
        WorkerSummary {
            rank: self.rank,
            coordinate: self.coordinate,
            offset: self.subgrid.offset(),
            dims: self.subgrid.dims(),
            outcome: self.outcome,
            residual: self.residual,
            bytes_communicated: self.bytes_communicated,
            total_bytes_communicated: self.total_bytes_communicated,
            elapsed_secs: self.elapsed.as_secs_f64(),
        }
    }

    /// One JSON object, as printed by `poisson-solve --json`.
    pub fn summary_json(&self) -> PoissonResult<String> {
        Ok(serde_json::to_string(&self.summary())?)
    }
}

/// Deliver the root's problem to every worker.
/// Only the root needs to pass `Some`; other workers' argument is ignored.
pub fn broadcast_problem<C>(channel: &mut C, problem: Option<&GlobalProblem>) -> PoissonResult<GlobalProblem>
where
    C: MessageChannel + ?Sized,
{
    let mut payload = Vec::new();
    if channel.rank() == ROOT_RANK {
        let problem = problem.ok_or_else(|| {
            PoissonError::Configuration("Root worker started without a problem".to_string())
        })?;
        problem.validate()?;
        payload = problem.to_bytes()?;
    }
    channel.broadcast_bytes(ROOT_RANK, &mut payload)?;
    GlobalProblem::from_bytes(&payload)
}

/// Full control flow of one worker. On a local failure every peer is
/// aborted before the error is returned.
pub fn run_worker<C>(
    channel: &mut C,
    grid: ProcessGrid,
    problem: Option<&GlobalProblem>,
    config: &SolverConfig,
) -> PoissonResult<WorkerReport>
where
    C: MessageChannel + ?Sized,
{
    match solve(channel, grid, problem, config) {
        Ok(report) => Ok(report),
        Err(e) => {
            if !e.is_remote() {
                warn!("rank {}: {e}", channel.rank());
                channel.abort(ABORT_CODE);
            }
            Err(e)
        }
    }
}

fn solve<C>(
    channel: &mut C,
    grid: ProcessGrid,
    problem: Option<&GlobalProblem>,
    config: &SolverConfig,
) -> PoissonResult<WorkerReport>
where
    C: MessageChannel + ?Sized,
{
    let topology = ProcessTopology::new(channel.size(), channel.rank(), grid)?;
    debug!(
        "rank {}: coordinate ({}, {}) in {}×{}",
        topology.rank, topology.cx, topology.cy, topology.px, topology.py
    );
    let problem = broadcast_problem(channel, problem)?;

    let started = Instant::now();
    let subgrid = LocalSubgrid::allocate(&problem, &topology)?;
    let exchanger = BoundaryExchanger::new(&topology, &subgrid);
    let mut coordinator = ConvergenceCoordinator::new(subgrid, exchanger, &problem, config)?;
    let outcome = coordinator.run(channel)?;
    let elapsed = started.elapsed();

    let bytes_communicated = coordinator.bytes_communicated();
    let total_bytes_communicated = channel.all_reduce_sum(bytes_communicated)?;
    let residual = coordinator.solver().residual(coordinator.subgrid());

    Ok(WorkerReport {
        rank: topology.rank,
        coordinate: topology.coordinate(),
        grid,
        global_dims: (problem.width, problem.height),
        outcome,
        subgrid: coordinator.into_subgrid(),
        residual,
        bytes_communicated,
        total_bytes_communicated,
        elapsed,
    })
}

/// Solve `problem` on `workers` in-process workers arranged as `grid`.
/// Reports come back in rank order.
///
/// When a worker fails, its own error is returned rather than the
/// `Aborted` its peers observe.
pub fn run_local(
    problem: &GlobalProblem,
    grid: ProcessGrid,
    workers: usize,
    config: &SolverConfig,
) -> PoissonResult<Vec<WorkerReport>> {
    let results = run_local_cluster(workers, |mut channel| {
        let root_problem = (channel.rank() == ROOT_RANK).then_some(problem);
        run_worker(&mut channel, grid, root_problem, config)
    })?;

    let mut reports = Vec::with_capacity(results.len());
    let mut remote = None;
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) if e.is_remote() => {
                remote.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }
    }
    match remote {
        Some(e) => Err(e),
        None => Ok(reports),
    }
}

/// Stitch worker interiors into one (width × height) field indexed
/// `[gx - 1, gy - 1]`.
pub fn assemble_global(reports: &[WorkerReport], width: usize, height: usize) -> PoissonResult<Array2<f64>> {
    let mut global = Array2::zeros((width, height));
    for report in reports {
        let sub = &report.subgrid;
        let (ox, oy) = sub.offset();
        let (dx, dy) = sub.dims();
        if ox + dx > width || oy + dy > height {
            return Err(PoissonError::Configuration(format!(
                "Rank {} interior {dx}×{dy} at ({ox}, {oy}) exceeds {width}×{height}",
                report.rank
            )));
        }
        let core = sub.values().slice(s![1..=dx, 1..=dy]);
        global.slice_mut(s![ox..ox + dx, oy..oy + dy]).assign(&core);
    }
    Ok(global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use poisson_types::state::SolveStatus;

    #[test]
    fn test_broadcast_problem_reaches_every_worker() {
        let problem = GlobalProblem::new(9, 4, 1e-5, 77).with_source(0.25, 0.75, -2.5);
        let results = run_local_cluster(3, |mut ch| {
            let mine = (ch.rank() == ROOT_RANK).then_some(&problem);
            broadcast_problem(&mut ch, mine)
        })
        .expect("cluster");
        for r in results {
            assert_eq!(r.expect("worker"), problem);
        }
    }

    #[test]
    fn test_run_local_reports_in_rank_order() {
        let problem = GlobalProblem::new(6, 6, 1e-4, 1000).with_source(0.5, 0.5, 10.0);
        let reports = run_local(&problem, ProcessGrid::new(2, 2), 4, &SolverConfig::default()).unwrap();
        assert_eq!(reports.len(), 4);
        for (rank, r) in reports.iter().enumerate() {
            assert_eq!(r.rank, rank);
            assert_eq!(r.outcome.status, SolveStatus::Converged);
            assert_eq!(r.total_bytes_communicated, reports.iter().map(|r| r.bytes_communicated).sum::<u64>());
        }
        assert!(reports[0].total_bytes_communicated > 0);
    }

    #[test]
    fn test_summary_json_carries_diagnostics() {
        let problem = GlobalProblem::new(3, 3, 1e-4, 50);
        let reports = run_local(&problem, ProcessGrid::new(1, 1), 1, &SolverConfig::default()).unwrap();
        let json = reports[0].summary_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rank"], 0);
        assert_eq!(value["dims"], serde_json::json!([3, 3]));
        assert_eq!(value["outcome"]["status"], "Converged");
        assert_eq!(value["total_bytes_communicated"], 0);
    }

    #[test]
    fn test_worker_count_mismatch_is_configuration_error() {
        let problem = GlobalProblem::new(4, 4, 1e-4, 10);
        let err = run_local(&problem, ProcessGrid::new(2, 2), 3, &SolverConfig::default())
            .expect_err("2×2 needs 4 workers");
        assert!(matches!(err, PoissonError::Configuration(_)));
    }

    #[test]
    fn test_root_failure_wins_over_peer_aborts() {
        // Only the root validates before broadcasting.
        let problem = GlobalProblem::new(0, 4, 1e-4, 10);
        let err = run_local(&problem, ProcessGrid::new(1, 3), 3, &SolverConfig::default())
            .expect_err("empty grid");
        assert!(matches!(err, PoissonError::Configuration(_)));
    }

    #[test]
    fn test_assemble_global_places_every_cell() {
        let problem = GlobalProblem::new(5, 4, 1e-4, 0);
        let mut reports = run_local(&problem, ProcessGrid::new(2, 2), 4, &SolverConfig::default()).unwrap();
        for r in &mut reports {
            let (dx, dy) = r.subgrid.dims();
            let (ox, oy) = r.subgrid.offset();
            let mut v = r.subgrid.values_mut();
            for x in 1..=dx {
                for y in 1..=dy {
                    v[[x, y]] = ((x + ox) * 10 + y + oy) as f64;
                }
            }
        }
        let global = assemble_global(&reports, 5, 4).unwrap();
        for gx in 1..=5 {
            for gy in 1..=4 {
                assert_eq!(global[[gx - 1, gy - 1]], (gx * 10 + gy) as f64);
            }
        }
    }
}
