// ─────────────────────────────────────────────────────────────────────
// SCPN Poisson — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Over-relaxation factor of the red-black SOR sweep.
/// Changing it changes the iteration count needed to hit a precision goal,
/// so runs are only reproducible with the same value.
pub const OMEGA: f64 = 1.95;

/// Width of the ghost-cell ring around every local sub-grid.
/// The 5-point stencil reads exactly one neighbour in each direction.
pub const HALO_WIDTH: usize = 1;

/// The process grid never connects first and last worker along an axis.
pub const PERIODIC: [bool; 2] = [false, false];

/// Value held by halo cells on a physical domain edge.
pub const BOUNDARY_VALUE: f64 = 0.0;

/// Rank that loads the input artifact and broadcasts it.
pub const ROOT_RANK: usize = 0;

/// Default input artifact name.
pub const DEFAULT_INPUT: &str = "input.dat";

/// Per-worker output artifact name: `output<rank>.dat`.
pub fn output_file_name(rank: usize) -> String {
    format!("output{rank}.dat")
}

/// Size in bytes of one transferred grid value.
pub const VALUE_BYTES: u64 = std::mem::size_of::<f64>() as u64;
