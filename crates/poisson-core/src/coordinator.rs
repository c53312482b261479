// ─────────────────────────────────────────────────────────────────────
// SCPN Poisson — Convergence Coordinator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Iterate red/black sweeps until the global change drops below the goal.
//!
//! One iteration is `sweep(Red)`, exchange, `sweep(Black)`, exchange, then a
//! reduce-max of the local deltas. Every worker sees the same reduced value,
//! so every worker stops on the same iteration.

use log::{info, trace};
use poisson_types::config::{GlobalProblem, SolverConfig};
use poisson_types::error::PoissonResult;
use poisson_types::state::{IterationState, Parity, SolveOutcome, SolveStatus};

use crate::channel::MessageChannel;
use crate::exchange::BoundaryExchanger;
use crate::sor::SorSolver;
use crate::subgrid::LocalSubgrid;

#[derive(Debug, Clone)]
pub struct ConvergenceCoordinator {
    subgrid: LocalSubgrid,
    exchanger: BoundaryExchanger,
    solver: SorSolver,
    precision_goal: f64,
    max_iterations: usize,
    status: SolveStatus,
    iterations: usize,
    global_max_delta: f64,
    needs_priming: bool,
}

impl ConvergenceCoordinator {
    pub fn new(
        subgrid: LocalSubgrid,
        exchanger: BoundaryExchanger,
        problem: &GlobalProblem,
        config: &SolverConfig,
    ) -> PoissonResult<Self> {
        let solver = SorSolver::from_config(config)?;
        Ok(Self {
            subgrid,
            exchanger,
            solver,
            precision_goal: problem.precision_goal,
            max_iterations: problem.max_iterations,
            status: SolveStatus::Running,
            iterations: 0,
            global_max_delta: f64::INFINITY,
            needs_priming: config.exchange_before_first_sweep,
        })
    }

    /// Perform one red+black iteration and the global reduction.
    /// Does not check the stopping rule; `run` does.
    pub fn step<C>(&mut self, channel: &mut C) -> PoissonResult<IterationState>
    where
        C: MessageChannel + ?Sized,
    {
        if self.needs_priming {
            self.exchanger.exchange_borders(channel, &mut self.subgrid)?;
            self.needs_priming = false;
        }

        let mut sweep_deltas = [0.0_f64; 2];
        let mut last = Parity::Red;
        for parity in Parity::BOTH {
            sweep_deltas[parity.as_usize()] = self.solver.sweep(&mut self.subgrid, parity);
            self.exchanger.exchange_borders(channel, &mut self.subgrid)?;
            last = parity;
        }
        let local_max_delta = sweep_deltas[0].max(sweep_deltas[1]);

        self.global_max_delta = channel.all_reduce_max(local_max_delta)?;
        self.iterations += 1;
        trace!(
            "rank {}: iteration {} delta = {local_max_delta:e} global_delta = {:e}",
            channel.rank(),
            self.iterations,
            self.global_max_delta
        );

        Ok(IterationState {
            parity: last,
            sweep_deltas,
            local_max_delta,
            global_max_delta: self.global_max_delta,
            iteration: self.iterations,
        })
    }

    /// Iterate until converged or out of iterations. Both are normal outcomes.
    pub fn run<C>(&mut self, channel: &mut C) -> PoissonResult<SolveOutcome>
    where
        C: MessageChannel + ?Sized,
    {
        while !self.status.is_terminal() {
            if self.global_max_delta <= self.precision_goal {
                self.status = SolveStatus::Converged;
            } else if self.iterations >= self.max_iterations {
                self.status = SolveStatus::IterationLimitReached;
            } else {
                self.step(channel)?;
            }
        }

        let outcome = self.outcome();
        info!(
            "rank {}: {:?} after {} iteration(s), global delta {:e}",
            channel.rank(),
            outcome.status,
            outcome.iterations,
            outcome.global_max_delta
        );
        Ok(outcome)
    }

    pub fn outcome(&self) -> SolveOutcome {
        SolveOutcome {
            status: self.status,
            iterations: self.iterations,
            global_max_delta: self.global_max_delta,
        }
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    pub fn subgrid(&self) -> &LocalSubgrid {
        &self.subgrid
    }

    pub fn solver(&self) -> &SorSolver {
        &self.solver
    }

    pub fn into_subgrid(self) -> LocalSubgrid {
        self.subgrid
    }

    /// Bytes this worker has sent so far.
    pub fn bytes_communicated(&self) -> u64 {
        self.exchanger.bytes_communicated()
    }
}
