// ─────────────────────────────────────────────────────────────────────
// SCPN Poisson — Property-Based Tests (proptest) for poisson-types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for poisson-types using proptest.
//!
//! Covers: input format parsing, source cell placement, broadcast payload.

use poisson_types::config::{GlobalProblem, SourcePoint};
use poisson_types::state::Parity;
use proptest::prelude::*;

// ── Input Format ─────────────────────────────────────────────────────

proptest! {
    /// Whatever the loader is given in the reference format comes back unchanged.
    #[test]
    fn parse_recovers_header_and_sources(
        nx in 1usize..500,
        ny in 1usize..500,
        max_iter in 0usize..100_000,
        exp in 1i32..12,
        sources in prop::collection::vec((0.0f64..1.0, 0.0f64..1.0, -1e3f64..1e3), 0..8),
    ) {
        let precision = 10f64.powi(-exp);
        let mut text = format!(
            "nx: {nx}\nny: {ny}\nprecision goal: {precision:e}\nmax iterations: {max_iter}\n"
        );
        for (x, y, v) in &sources {
            text.push_str(&format!("source: {x:?} {y:?} {v:?}\n"));
        }

        let p = GlobalProblem::parse(&text).unwrap();
        prop_assert_eq!(p.width, nx);
        prop_assert_eq!(p.height, ny);
        prop_assert_eq!(p.max_iterations, max_iter);
        prop_assert!((p.precision_goal - precision).abs() <= precision * 1e-12);
        prop_assert_eq!(p.sources.len(), sources.len());
        for (got, (x, y, v)) in p.sources.iter().zip(&sources) {
            prop_assert_eq!(*got, SourcePoint::new(*x, *y, *v));
        }
    }

    /// The broadcast payload reproduces the problem bit for bit.
    #[test]
    fn broadcast_payload_is_lossless(
        nx in 1usize..2000,
        ny in 1usize..2000,
        x in 0.0f64..1.0,
        y in 0.0f64..1.0,
        v in -1e6f64..1e6,
    ) {
        let p = GlobalProblem::new(nx, ny, 1e-4, 100).with_source(x, y, v);
        let back = GlobalProblem::from_bytes(&p.to_bytes().unwrap()).unwrap();
        prop_assert_eq!(p, back);
    }
}

// ── Source Placement ─────────────────────────────────────────────────

proptest! {
    /// A source inside the unit square always maps to an interior cell
    /// in 1-based numbering.
    #[test]
    fn source_cell_is_interior(
        w in 1usize..1000,
        h in 1usize..1000,
        x in 0.0f64..1.0,
        y in 0.0f64..1.0,
    ) {
        let (gx, gy) = SourcePoint::new(x, y, 1.0).global_cell(w, h);
        prop_assert!(gx >= 1 && gx <= w, "gx={} w={}", gx, w);
        prop_assert!(gy >= 1 && gy <= h, "gy={} h={}", gy, h);
    }

    /// Exactly one of the two sweep colours owns every cell.
    #[test]
    fn parity_partitions_cells(gx in 0usize..10_000, gy in 0usize..10_000) {
        let hits = Parity::BOTH.iter().filter(|p| p.selects(gx, gy)).count();
        prop_assert_eq!(hits, 1);
    }
}
