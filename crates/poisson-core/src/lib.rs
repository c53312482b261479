// ─────────────────────────────────────────────────────────────────────
// SCPN Poisson — Poisson Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Distributed red-black SOR solver for the 2D Poisson equation.

pub mod channel;
pub mod coordinator;
pub mod exchange;
pub mod halo;
#[cfg(feature = "mpi")]
pub mod mpi_channel;
pub mod output;
pub mod sor;
pub mod subgrid;
pub mod topology;
pub mod worker;
