// ─────────────────────────────────────────────────────────────────────
// SCPN Poisson — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

/// Checkerboard colour of a sweep: cells with (gx + gy + parity) even.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parity {
    Red = 0,
    Black = 1,
}

impl Parity {
    pub const BOTH: [Parity; 2] = [Parity::Red, Parity::Black];

    pub fn as_usize(self) -> usize {
        self as usize
    }

    /// Whether global cell (gx, gy) is updated by a sweep of this parity.
    pub fn selects(self, gx: usize, gy: usize) -> bool {
        (gx + gy + self.as_usize()) % 2 == 0
    }
}

/// Lifecycle of the iterate-until-converged loop. `Running` until the
/// loop settles on one of the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Running,
    Converged,
    IterationLimitReached,
}

impl SolveStatus {
    /// Whether the loop has stopped.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SolveStatus::Running)
    }
}

/// Snapshot of one red+black sweep pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationState {
    /// Parity of the last sweep performed. Red sweeps first, so a
    /// completed step ends on `Black`.
    pub parity: Parity,
    /// Local max delta of each sweep, indexed by `Parity::as_usize`.
    pub sweep_deltas: [f64; 2],
    /// max(red delta, black delta) on this worker.
    pub local_max_delta: f64,
    /// Maximum of `local_max_delta` over all workers.
    pub global_max_delta: f64,
    /// Completed sweep pairs, including this one.
    pub iteration: usize,
}

/// Terminal result of a solve, identical on every worker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub iterations: usize,
    pub global_max_delta: f64,
}

impl SolveOutcome {
    pub fn converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }
}
