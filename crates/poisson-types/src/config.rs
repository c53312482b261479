// ─────────────────────────────────────────────────────────────────────
// SCPN Poisson — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::OMEGA;
use crate::error::{PoissonError, PoissonResult};

/// A fixed-value cell, placed by normalized coordinates in [0, 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourcePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SourcePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    /// Global cell holding this source, in the 1-based interior numbering
    /// shared by every worker (global index 0 is the left/top halo).
    pub fn global_cell(&self, width: usize, height: usize) -> (usize, usize) {
        let gx = (self.x * width as f64).floor() as usize + 1;
        let gy = (self.y * height as f64).floor() as usize + 1;
        (gx, gy)
    }
}

/// The whole problem as loaded by the root worker.
/// Identical on every worker once broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalProblem {
    pub width: usize,
    pub height: usize,
    pub precision_goal: f64,
    pub max_iterations: usize,
    #[serde(default)]
    pub sources: Vec<SourcePoint>,
}

impl GlobalProblem {
    pub fn new(width: usize, height: usize, precision_goal: f64, max_iterations: usize) -> Self {
        Self {
            width,
            height,
            precision_goal,
            max_iterations,
            sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, x: f64, y: f64, value: f64) -> Self {
        self.sources.push(SourcePoint::new(x, y, value));
        self
    }

    /// Load from an input artifact. `*.json` files are read as serialized
    /// `GlobalProblem`; anything else uses the key:value line format.
    pub fn from_file(path: impl AsRef<Path>) -> PoissonResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            let problem: Self = serde_json::from_str(&contents)?;
            problem.validate()?;
            Ok(problem)
        } else {
            Self::parse(&contents)
        }
    }

    /// Parse the key:value input format:
    ///
    /// ```text
    /// nx: 100
    /// ny: 100
    /// precision goal: 0.0001
    /// max iterations: 5000
    /// source: 0.5 0.5 1.0
    /// ```
    pub fn parse(text: &str) -> PoissonResult<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let mut header = |key: &str| -> PoissonResult<(usize, String)> {
            let (line, raw) = lines.next().ok_or_else(|| PoissonError::InputFormat {
                line: 0,
                message: format!("missing '{key}' record"),
            })?;
            let value = strip_key(raw, key).ok_or_else(|| PoissonError::InputFormat {
                line,
                message: format!("expected '{key}: <value>', got '{raw}'"),
            })?;
            Ok((line, value.to_string()))
        };

        let width = parse_field::<usize>(header("nx")?, "nx")?;
        let height = parse_field::<usize>(header("ny")?, "ny")?;
        let precision_goal = parse_field::<f64>(header("precision goal")?, "precision goal")?;
        let max_iterations = parse_field::<usize>(header("max iterations")?, "max iterations")?;

        let mut problem = Self::new(width, height, precision_goal, max_iterations);
        for (line, raw) in lines {
            let body = strip_key(raw, "source").ok_or_else(|| PoissonError::InputFormat {
                line,
                message: format!("expected 'source: <x> <y> <value>', got '{raw}'"),
            })?;
            let fields: Vec<&str> = body.split_whitespace().collect();
            if fields.len() != 3 {
                return Err(PoissonError::InputFormat {
                    line,
                    message: format!("source record needs 3 numbers, got {}", fields.len()),
                });
            }
            let mut nums = [0.0f64; 3];
            for (slot, field) in nums.iter_mut().zip(&fields) {
                *slot = field.parse().map_err(|_| PoissonError::InputFormat {
                    line,
                    message: format!("'{field}' is not a number"),
                })?;
            }
            problem.sources.push(SourcePoint::new(nums[0], nums[1], nums[2]));
        }

        problem
            .validate()
            .map_err(|e| PoissonError::InputFormat {
                line: 0,
                message: e.to_string(),
            })?;
        Ok(problem)
    }

    pub fn validate(&self) -> PoissonResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PoissonError::Configuration(format!(
                "Grid must be at least 1×1, got {}×{}",
                self.width, self.height
            )));
        }
        if !self.precision_goal.is_finite() || self.precision_goal < 0.0 {
            return Err(PoissonError::Configuration(format!(
                "Precision goal must be finite and >= 0, got {}",
                self.precision_goal
            )));
        }
        for (i, s) in self.sources.iter().enumerate() {
            let in_unit = |v: f64| (0.0..1.0).contains(&v);
            if !in_unit(s.x) || !in_unit(s.y) {
                return Err(PoissonError::Configuration(format!(
                    "Source {i} at ({}, {}) lies outside [0, 1)",
                    s.x, s.y
                )));
            }
            if !s.value.is_finite() {
                return Err(PoissonError::Configuration(format!(
                    "Source {i} has non-finite value {}",
                    s.value
                )));
            }
        }
        Ok(())
    }

    /// Serialized form used for the startup broadcast.
    pub fn to_bytes(&self) -> PoissonResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> PoissonResult<Self> {
        let problem: Self = serde_json::from_slice(bytes)?;
        problem.validate()?;
        Ok(problem)
    }
}

fn strip_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let (k, v) = line.split_once(':')?;
    if k.trim().eq_ignore_ascii_case(key) {
        Some(v.trim())
    } else {
        None
    }
}

fn parse_field<T: std::str::FromStr>((line, raw): (usize, String), key: &str) -> PoissonResult<T> {
    raw.parse().map_err(|_| PoissonError::InputFormat {
        line,
        message: format!("invalid value '{raw}' for '{key}'"),
    })
}

/// Requested Cartesian factorization of the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessGrid {
    pub px: usize,
    pub py: usize,
}

impl ProcessGrid {
    pub fn new(px: usize, py: usize) -> Self {
        Self { px, py }
    }

    /// Worker count `px * py`; a product that overflows `usize` is a
    /// `Configuration` error.
    pub fn workers(&self) -> PoissonResult<usize> {
        self.px.checked_mul(self.py).ok_or_else(|| {
            PoissonError::Configuration(format!(
                "Process grid {}×{} overflows the worker count",
                self.px, self.py
            ))
        })
    }
}

/// Solver policy knobs. Defaults reproduce the reference behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// SOR relaxation factor ω ∈ (0, 2).
    #[serde(default = "default_omega")]
    pub omega: f64,
    /// Fill halos once before the first sweep, so a source sitting on a
    /// sub-grid perimeter is visible to its neighbours from iteration one.
    #[serde(default = "default_true")]
    pub exchange_before_first_sweep: bool,
}

fn default_omega() -> f64 {
    OMEGA
}
fn default_true() -> bool {
    true
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            omega: default_omega(),
            exchange_before_first_sweep: true,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> PoissonResult<()> {
        if !(self.omega > 0.0 && self.omega < 2.0) {
            return Err(PoissonError::Configuration(format!(
                "SOR omega must be in (0, 2), got {}",
                self.omega
            )));
        }
        Ok(())
    }
}
