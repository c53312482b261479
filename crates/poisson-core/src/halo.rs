//! Strided addressing of perimeter strips.
//!
//! A `HaloDescriptor` names one row or column of a sub-grid's flat
//! `(dx + 2) × (dy + 2)` buffer as (offset, count, stride). The same
//! descriptor shape serves as send source on one worker and receive
//! destination on its neighbour.

use ndarray::Array2;
use poisson_types::error::{PoissonError, PoissonResult};

use crate::subgrid::LocalSubgrid;
use crate::topology::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaloDescriptor {
    /// Flat index of the first element.
    pub offset: usize,
    /// Number of elements in the strip.
    pub count: usize,
    /// Flat distance between consecutive elements.
    pub stride: usize,
}

impl HaloDescriptor {
    /// Strip at fixed y, running over interior x. Consecutive elements are
    /// one full y-row (`dy + 2` values) apart.
    pub fn at_y(sub: &LocalSubgrid, y: usize) -> Self {
        let (_, ny) = sub.padded_dims();
        Self {
            offset: ny + y,
            count: sub.dims().0,
            stride: ny,
        }
    }

    /// Strip at fixed x, running over interior y. Contiguous.
    pub fn at_x(sub: &LocalSubgrid, x: usize) -> Self {
        let (_, ny) = sub.padded_dims();
        Self {
            offset: x * ny + 1,
            count: sub.dims().1,
            stride: 1,
        }
    }

    /// Outermost interior strip facing `dir`; what gets sent that way.
    pub fn interior(sub: &LocalSubgrid, dir: Direction) -> Self {
        let (dx, dy) = sub.dims();
        match dir {
            Direction::Top => Self::at_y(sub, 1),
            Direction::Bottom => Self::at_y(sub, dy),
            Direction::Left => Self::at_x(sub, 1),
            Direction::Right => Self::at_x(sub, dx),
        }
    }

    /// Halo strip on side `dir`; filled from the neighbour on that side.
    pub fn halo(sub: &LocalSubgrid, dir: Direction) -> Self {
        let (dx, dy) = sub.dims();
        match dir {
            Direction::Top => Self::at_y(sub, 0),
            Direction::Bottom => Self::at_y(sub, dy + 1),
            Direction::Left => Self::at_x(sub, 0),
            Direction::Right => Self::at_x(sub, dx + 1),
        }
    }

    /// Flat indices addressed by this strip.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        let (offset, stride) = (self.offset, self.stride);
        (0..self.count).map(move |k| offset + k * stride)
    }

    /// Copy the strip out of `grid` into `out` (resized to `count`).
    pub fn gather(&self, grid: &Array2<f64>, out: &mut Vec<f64>) -> PoissonResult<()> {
        self.check_fits(grid)?;
        let ny = grid.ncols();
        out.clear();
        out.extend(self.indices().map(|i| grid[[i / ny, i % ny]]));
        Ok(())
    }

    /// Write `data` into the strip of `grid`.
    pub fn scatter(&self, data: &[f64], grid: &mut Array2<f64>) -> PoissonResult<()> {
        if data.len() != self.count {
            return Err(PoissonError::Channel(format!(
                "Strip length mismatch: expected {}, got {}",
                self.count,
                data.len()
            )));
        }
        self.check_fits(grid)?;
        let ny = grid.ncols();
        for (i, &v) in self.indices().zip(data) {
            grid[[i / ny, i % ny]] = v;
        }
        Ok(())
    }

    fn check_fits(&self, grid: &Array2<f64>) -> PoissonResult<()> {
        if let Some(last) = self.indices().last() {
            if last >= grid.len() {
                return Err(PoissonError::Configuration(format!(
                    "Strip ends at {last}, grid {:?} holds {}",
                    grid.dim(),
                    grid.len()
                )));
            }
        }
        Ok(())
    }
}
