// ─────────────────────────────────────────────────────────────────────
// SCPN Poisson — Local Sub-grid
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-worker slice of the global grid, with a one-cell halo ring.
//!
//! Storage is indexed `[x, y]` with `y` fastest. Local interior cells are
//! `1..=dx` × `1..=dy`; index 0 and `d + 1` on each axis are halo. The
//! global coordinate of local cell (x, y) is (x + ox, y + oy), which makes
//! global numbering 1-based over the interior.

use log::debug;
use ndarray::{Array2, ArrayViewMut2};
use poisson_types::config::GlobalProblem;
use poisson_types::constants::{BOUNDARY_VALUE, HALO_WIDTH};
use poisson_types::error::{PoissonError, PoissonResult};

use crate::topology::ProcessTopology;

/// Half-open range `[floor(G·c/N), floor(G·(c+1)/N))` owned by coordinate
/// `c` of `parts` along an axis of `extent` cells. Requires `coord < parts`.
///
/// The products are taken in `u128`, so any `usize` extent splits without
/// overflow; both bounds are at most `extent`.
pub fn axis_bounds(extent: usize, parts: usize, coord: usize) -> (usize, usize) {
    debug_assert!(coord < parts, "coordinate {coord} outside {parts} part(s)");
    let bound = |c: usize| (extent as u128 * c as u128 / parts as u128) as usize;
    (bound(coord), bound(coord + 1))
}

#[derive(Debug, Clone)]
pub struct LocalSubgrid {
    /// Global coordinate offset (ox, oy) of this worker's interior.
    offset: (usize, usize),
    /// Interior cell counts (dx, dy), halo excluded.
    dims: (usize, usize),
    values: Array2<f64>,
    is_source: Array2<bool>,
}

impl LocalSubgrid {
    /// Carve this worker's region out of `problem` and place its sources.
    pub fn allocate(problem: &GlobalProblem, topology: &ProcessTopology) -> PoissonResult<Self> {
        problem.validate()?;
        if topology.px > problem.width || topology.py > problem.height {
            return Err(PoissonError::Configuration(format!(
                "Cannot split ({}×{}) across ({}×{}) workers",
                problem.width, problem.height, topology.px, topology.py
            )));
        }

        let (x0, x1) = axis_bounds(problem.width, topology.px, topology.cx);
        let (y0, y1) = axis_bounds(problem.height, topology.py, topology.cy);
        let mut sub = Self::zeroed((x0, y0), (x1 - x0, y1 - y0))?;
        let placed = sub.place_sources(problem);
        debug!(
            "rank {}: interior {}×{} at offset ({}, {}), {placed} source(s)",
            topology.rank, sub.dims.0, sub.dims.1, x0, y0
        );
        Ok(sub)
    }

    /// Zero-filled sub-grid with the given interior offset and size.
    pub fn zeroed(offset: (usize, usize), dims: (usize, usize)) -> PoissonResult<Self> {
        let padded = |d: usize| {
            d.checked_add(2 * HALO_WIDTH).ok_or(PoissonError::ResourceExhausted {
                what: "value grid",
                cells: usize::MAX,
            })
        };
        let shape = (padded(dims.0)?, padded(dims.1)?);
        let values = try_alloc(shape, BOUNDARY_VALUE, "value grid")?;
        let is_source = try_alloc(shape, false, "source mask")?;
        Ok(Self {
            offset,
            dims,
            values,
            is_source,
        })
    }

    /// Mark every source that falls in this worker's interior.
    /// Returns how many were placed here.
    pub fn place_sources(&mut self, problem: &GlobalProblem) -> usize {
        let mut placed = 0;
        for source in &problem.sources {
            let (gx, gy) = source.global_cell(problem.width, problem.height);
            if let Some((x, y)) = self.local_of(gx, gy) {
                self.values[[x, y]] = source.value;
                self.is_source[[x, y]] = true;
                placed += 1;
            }
        }
        placed
    }

    /// Local interior index of global cell (gx, gy), if this worker owns it.
    pub fn local_of(&self, gx: usize, gy: usize) -> Option<(usize, usize)> {
        let x = gx.checked_sub(self.offset.0)?;
        let y = gy.checked_sub(self.offset.1)?;
        let inside = (1..=self.dims.0).contains(&x) && (1..=self.dims.1).contains(&y);
        inside.then_some((x, y))
    }

    pub fn global_of(&self, x: usize, y: usize) -> (usize, usize) {
        (x + self.offset.0, y + self.offset.1)
    }

    pub fn offset(&self) -> (usize, usize) {
        self.offset
    }

    pub fn dims(&self) -> (usize, usize) {
        self.dims
    }

    /// Halo-inclusive shape (dx + 2, dy + 2).
    pub fn padded_dims(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn values_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        self.values.view_mut()
    }

    pub fn is_source(&self) -> &Array2<bool> {
        &self.is_source
    }

    pub(crate) fn split_mut(&mut self) -> (&mut Array2<f64>, &Array2<bool>) {
        (&mut self.values, &self.is_source)
    }

    /// Interior cells as (gx, gy, value), x-major with y varying fastest.
    pub fn interior_cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (1..=self.dims.0).flat_map(move |x| {
            (1..=self.dims.1).map(move |y| {
                let (gx, gy) = self.global_of(x, y);
                (gx, gy, self.values[[x, y]])
            })
        })
    }
}

fn try_alloc<T: Clone>(shape: (usize, usize), fill: T, what: &'static str) -> PoissonResult<Array2<T>> {
    let cells = shape
        .0
        .checked_mul(shape.1)
        .ok_or(PoissonError::ResourceExhausted { what, cells: usize::MAX })?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(cells)
        .map_err(|_| PoissonError::ResourceExhausted { what, cells })?;
    buf.resize(cells, fill);
    Array2::from_shape_vec(shape, buf).map_err(|e| {
        PoissonError::Configuration(format!("{what} shape {shape:?} rejected: {e}"))
    })
}
