// ─────────────────────────────────────────────────────────────────────
// SCPN Poisson — Process Topology
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! 2D Cartesian process grid.
//!
//! Ranks are laid out row-major over (px, py): `rank = cx * py + cy`, the
//! same order an MPI Cartesian communicator assigns without reordering.

use poisson_types::config::ProcessGrid;
use poisson_types::constants::PERIODIC;
use poisson_types::error::{PoissonError, PoissonResult};

/// A face of a sub-grid and the neighbour behind it.
/// `Top`/`Bottom` move along y, `Left`/`Right` along x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Top,
    Bottom,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Top,
        Direction::Bottom,
        Direction::Left,
        Direction::Right,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Top => Direction::Bottom,
            Direction::Bottom => Direction::Top,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Step (dx, dy) in process-grid coordinates.
    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::Top => (0, -1),
            Direction::Bottom => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One worker's place in the process grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTopology {
    /// Number of cooperating workers; always `px * py`.
    pub total_workers: usize,
    pub px: usize,
    pub py: usize,
    /// Rank of this worker.
    pub rank: usize,
    /// Process-grid coordinate along x.
    pub cx: usize,
    /// Process-grid coordinate along y.
    pub cy: usize,
    neighbors: [Option<usize>; 4],
}

impl ProcessTopology {
    /// Place `rank` in a (px × py) grid of `total_workers` workers.
    pub fn new(total_workers: usize, rank: usize, grid: ProcessGrid) -> PoissonResult<Self> {
        let ProcessGrid { px, py } = grid;
        if px == 0 || py == 0 {
            return Err(PoissonError::Configuration(format!(
                "Process grid dimensions must be >= 1, got {px}×{py}"
            )));
        }
        if grid.workers()? != total_workers {
            return Err(PoissonError::Configuration(format!(
                "Process grid {px}×{py} does not match {total_workers} workers"
            )));
        }
        if rank >= total_workers {
            return Err(PoissonError::Configuration(format!(
                "Rank {rank} out of range for {total_workers} workers"
            )));
        }

        let cx = rank / py;
        let cy = rank % py;
        let mut topo = ProcessTopology {
            total_workers,
            px,
            py,
            rank,
            cx,
            cy,
            neighbors: [None; 4],
        };
        for dir in Direction::ALL {
            topo.neighbors[dir.index()] = topo.shifted_rank(dir);
        }
        Ok(topo)
    }

    /// Topologies of every worker, indexed by rank.
    pub fn all(total_workers: usize, grid: ProcessGrid) -> PoissonResult<Vec<Self>> {
        (0..total_workers)
            .map(|rank| Self::new(total_workers, rank, grid))
            .collect()
    }

    pub fn grid(&self) -> ProcessGrid {
        ProcessGrid::new(self.px, self.py)
    }

    pub fn coordinate(&self) -> (usize, usize) {
        (self.cx, self.cy)
    }

    pub fn rank_of(&self, cx: usize, cy: usize) -> usize {
        cx * self.py + cy
    }

    /// Rank of the neighbour across `dir`, or None at a physical edge.
    pub fn neighbor(&self, dir: Direction) -> Option<usize> {
        self.neighbors[dir.index()]
    }

    pub fn is_boundary(&self, dir: Direction) -> bool {
        self.neighbor(dir).is_none()
    }

    fn shifted_rank(&self, dir: Direction) -> Option<usize> {
        let (dx, dy) = dir.offset();
        let nx = shift(self.cx, dx, self.px, PERIODIC[0])?;
        let ny = shift(self.cy, dy, self.py, PERIODIC[1])?;
        Some(self.rank_of(nx, ny))
    }
}

fn shift(coord: usize, step: i64, extent: usize, periodic: bool) -> Option<usize> {
    let target = coord as i64 + step;
    let extent = extent as i64;
    if (0..extent).contains(&target) {
        Some(target as usize)
    } else if periodic {
        Some(target.rem_euclid(extent) as usize)
    } else {
        None
    }
}
