// ─────────────────────────────────────────────────────────────────────
// SCPN Poisson — End-to-End Solver Tests
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Whole runs on the in-process cluster, compared across decompositions.

use poisson_core::channel::local_cluster;
use poisson_core::coordinator::ConvergenceCoordinator;
use poisson_core::exchange::BoundaryExchanger;
use poisson_core::output::write_worker_output;
use poisson_core::subgrid::LocalSubgrid;
use poisson_core::topology::ProcessTopology;
use poisson_core::worker::{assemble_global, run_local, WorkerReport};
use poisson_types::config::{GlobalProblem, ProcessGrid, SolverConfig};
use poisson_types::error::PoissonError;
use poisson_types::state::SolveStatus;

fn reference_problem() -> GlobalProblem {
    GlobalProblem::new(4, 4, 1e-4, 1000).with_source(0.5, 0.5, 100.0)
}

fn solve(problem: &GlobalProblem, px: usize, py: usize) -> Vec<WorkerReport> {
    run_local(problem, ProcessGrid::new(px, py), px * py, &SolverConfig::default()).expect("run")
}

fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("poisson-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

#[test]
fn test_reference_problem_converges_with_source_intact() {
    let problem = reference_problem();
    let reports = solve(&problem, 1, 1);
    let outcome = reports[0].outcome;
    assert_eq!(outcome.status, SolveStatus::Converged);
    assert!(outcome.iterations < 1000, "took {} iterations", outcome.iterations);
    assert!(outcome.global_max_delta <= 1e-4);

    let field = assemble_global(&reports, 4, 4).unwrap();
    // Source (0.5, 0.5) on a 4×4 grid sits at global cell (3, 3).
    assert_eq!(field[[2, 2]], 100.0);
    for gx in 1..=4 {
        for gy in 1..=4 {
            let v = field[[gx - 1, gy - 1]];
            assert!((0.0..=100.0 + 1e-6).contains(&v), "({gx}, {gy}) = {v}");
        }
    }
}

#[test]
fn test_gauss_seidel_grows_monotonically_toward_source() {
    let problem = reference_problem();
    let config = SolverConfig {
        omega: 1.0,
        ..SolverConfig::default()
    };
    let topo = ProcessTopology::new(1, 0, ProcessGrid::new(1, 1)).unwrap();
    let sub = LocalSubgrid::allocate(&problem, &topo).unwrap();
    let ex = BoundaryExchanger::new(&topo, &sub);
    let mut coord = ConvergenceCoordinator::new(sub, ex, &problem, &config).unwrap();
    let mut eps = local_cluster(1);

    let mut previous = coord.subgrid().values().clone();
    for _ in 0..50 {
        coord.step(&mut eps[0]).unwrap();
        let current = coord.subgrid().values();
        for (idx, (&now, &before)) in current.iter().zip(previous.iter()).enumerate() {
            assert!(now >= before, "cell {idx} decreased: {before} -> {now}");
        }
        previous = current.clone();
    }
    // Direct neighbours of the source end up above the far corner.
    let v = coord.subgrid().values();
    assert!(v[[2, 3]] > v[[1, 1]]);
    assert!(v[[3, 2]] > v[[1, 1]]);
}

#[test]
fn test_decompositions_agree_with_single_worker() {
    let problem = reference_problem();
    let serial = solve(&problem, 1, 1);
    let serial_field = assemble_global(&serial, 4, 4).unwrap();

    for (px, py) in [(2, 2), (1, 4), (4, 1)] {
        let reports = solve(&problem, px, py);
        assert_eq!(reports.len(), px * py);
        assert_eq!(
            reports[0].outcome.iterations, serial[0].outcome.iterations,
            "{px}×{py} iteration count"
        );
        let field = assemble_global(&reports, 4, 4).unwrap();
        for (a, b) in field.iter().zip(serial_field.iter()) {
            assert!((a - b).abs() <= problem.precision_goal, "{px}×{py}: {a} vs {b}");
        }
    }
}

#[test]
fn test_unprimed_2x2_agrees_with_single_worker() {
    let problem = reference_problem();
    let config = SolverConfig {
        exchange_before_first_sweep: false,
        ..SolverConfig::default()
    };
    let serial = run_local(&problem, ProcessGrid::new(1, 1), 1, &config).expect("1×1");
    let split = run_local(&problem, ProcessGrid::new(2, 2), 4, &config).expect("2×2");

    assert_eq!(serial[0].outcome.status, SolveStatus::Converged);
    for r in &split {
        assert_eq!(r.outcome, split[0].outcome);
    }
    assert_eq!(split[0].outcome.iterations, serial[0].outcome.iterations);

    let serial_field = assemble_global(&serial, 4, 4).unwrap();
    let field = assemble_global(&split, 4, 4).unwrap();
    for (a, b) in field.iter().zip(serial_field.iter()) {
        assert!((a - b).abs() <= problem.precision_goal, "{a} vs {b}");
    }
}

#[test]
fn test_uneven_split_with_perimeter_sources() {
    // 7×5 on 3×2: interiors of 2 and 3 cells, sources on sub-grid edges.
    let problem = GlobalProblem::new(7, 5, 1e-5, 5000)
        .with_source(0.3, 0.4, 10.0)
        .with_source(0.85, 0.0, -4.0);
    let serial = assemble_global(&solve(&problem, 1, 1), 7, 5).unwrap();
    let split = assemble_global(&solve(&problem, 3, 2), 7, 5).unwrap();
    for (a, b) in split.iter().zip(serial.iter()) {
        assert!((a - b).abs() <= problem.precision_goal);
    }
}

#[test]
fn test_no_sources_converges_after_one_iteration() {
    let problem = GlobalProblem::new(6, 4, 1e-4, 100);
    for report in solve(&problem, 2, 2) {
        assert_eq!(report.outcome.status, SolveStatus::Converged);
        assert_eq!(report.outcome.iterations, 1);
        assert!(report.subgrid.interior_cells().all(|(_, _, v)| v == 0.0));
    }
}

#[test]
fn test_converged_field_is_near_fixed_point() {
    let problem = GlobalProblem::new(12, 10, 1e-6, 20_000)
        .with_source(0.2, 0.3, 5.0)
        .with_source(0.7, 0.6, 2.0);
    let reports = solve(&problem, 2, 2);
    for r in &reports {
        assert!(r.outcome.converged());
        assert!(
            r.residual <= 2.0 * problem.precision_goal,
            "rank {} residual {}",
            r.rank,
            r.residual
        );
    }
}

#[test]
fn test_iteration_limit_is_not_an_error() {
    let problem = GlobalProblem::new(10, 10, 1e-12, 3).with_source(0.5, 0.5, 1.0);
    for report in solve(&problem, 2, 1) {
        assert_eq!(report.outcome.status, SolveStatus::IterationLimitReached);
        assert_eq!(report.outcome.iterations, 3);
    }
}

#[test]
fn test_mismatched_worker_count_is_rejected() {
    let err = run_local(&reference_problem(), ProcessGrid::new(3, 1), 4, &SolverConfig::default())
        .expect_err("3×1 != 4");
    assert!(matches!(err, PoissonError::Configuration(_)));
}

#[test]
fn test_input_file_to_output_files() {
    let dir = scratch_dir("e2e");
    let input = dir.join("input.dat");
    std::fs::write(
        &input,
        "nx: 5\nny: 4\nprecision goal: 0.0001\nmax iterations: 2000\n\nsource: 0.5 0.5 1.0\n",
    )
    .unwrap();
    let problem = GlobalProblem::from_file(&input).unwrap();
    let reports = solve(&problem, 2, 2);

    let mut lines = 0;
    for r in &reports {
        let path = write_worker_output(&dir, r).unwrap();
        assert_eq!(path.file_name().unwrap(), format!("output{}.dat", r.rank).as_str());
        let text = std::fs::read_to_string(&path).unwrap();
        let (dx, dy) = r.subgrid.dims();
        assert_eq!(text.lines().count(), dx * dy);
        lines += text.lines().count();
    }
    assert_eq!(lines, 5 * 4);

    // Source cell (3, 3) is owned by coordinate (1, 1).
    let text = std::fs::read_to_string(dir.join("output3.dat")).unwrap();
    assert!(text.lines().any(|l| l == "3 3 1.000000"));
    let _ = std::fs::remove_dir_all(&dir);
}
