//! Red-Black Successive Over-Relaxation on one sub-grid.
//!
//! Plain 5-point Laplace stencil; fixed-value cells act as sources. A sweep
//! touches one checkerboard colour, chosen in global coordinates so that
//! colours agree across sub-grid borders. Halo cells are read, never written.

use poisson_types::config::SolverConfig;
use poisson_types::constants::OMEGA;
use poisson_types::error::{PoissonError, PoissonResult};
use poisson_types::state::Parity;

use crate::subgrid::LocalSubgrid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SorSolver {
    omega: f64,
}

impl Default for SorSolver {
    fn default() -> Self {
        Self { omega: OMEGA }
    }
}

impl SorSolver {
    /// `omega`: relaxation factor (1.0 = Gauss-Seidel, 1.8-1.95 = over-relaxation).
    pub fn new(omega: f64) -> PoissonResult<Self> {
        if !(omega > 0.0 && omega < 2.0) {
            return Err(PoissonError::Configuration(format!(
                "Relaxation factor must lie in (0, 2), got {omega}"
            )));
        }
        Ok(Self { omega })
    }

    pub fn from_config(config: &SolverConfig) -> PoissonResult<Self> {
        config.validate()?;
        Ok(Self { omega: config.omega })
    }

    pub fn omega(&self) -> f64 {
        self.omega
    }

    /// Update every non-source interior cell of colour `parity` in place.
    /// Returns the largest absolute change made.
    pub fn sweep(&self, sub: &mut LocalSubgrid, parity: Parity) -> f64 {
        let (dx, dy) = sub.dims();
        let (ox, oy) = sub.offset();
        let (phi, source) = sub.split_mut();
        let mut max_delta: f64 = 0.0;

        for x in 1..=dx {
            // First y in this column whose global colour matches.
            let skip = (x + ox + oy + parity.as_usize() + 1) % 2;
            for y in (1 + skip..=dy).step_by(2) {
                if source[[x, y]] {
                    continue;
                }
                let old = phi[[x, y]];
                let c = 0.25 * (phi[[x + 1, y]] + phi[[x - 1, y]] + phi[[x, y + 1]] + phi[[x, y - 1]])
                    - old;
                let new = old + self.omega * c;
                phi[[x, y]] = new;
                max_delta = max_delta.max((new - old).abs());
            }
        }
        max_delta
    }

    /// L-infinity defect of the 5-point fixed point over non-source cells.
    pub fn residual(&self, sub: &LocalSubgrid) -> f64 {
        let (dx, dy) = sub.dims();
        let phi = sub.values();
        let source = sub.is_source();
        let mut max_res: f64 = 0.0;
        for x in 1..=dx {
            for y in 1..=dy {
                if source[[x, y]] {
                    continue;
                }
                let avg = 0.25 * (phi[[x + 1, y]] + phi[[x - 1, y]] + phi[[x, y + 1]] + phi[[x, y - 1]]);
                max_res = max_res.max((avg - phi[[x, y]]).abs());
            }
        }
        max_res
    }
}
