//! Command-line arguments of `poisson-solve`.

use std::path::PathBuf;

use clap::Parser;
use poisson_types::config::{ProcessGrid, SolverConfig};
use poisson_types::constants::{DEFAULT_INPUT, OMEGA};

/// Solve the 2D Poisson equation with red-black SOR on a PX×PY worker grid.
///
/// Log level: POISSON_LOG=error|warn|info|debug|trace
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "poisson-solve", version)]
pub struct CliArgs {
    /// Workers along x
    pub px: usize,

    /// Workers along y
    pub py: usize,

    /// Problem file (key:value lines, or *.json)
    #[arg(long, default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Where output<rank>.dat files go
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// In-process worker count [default: PX*PY]
    #[arg(long)]
    pub workers: Option<usize>,

    /// SOR relaxation factor in (0, 2)
    #[arg(long, default_value_t = OMEGA)]
    pub omega: f64,

    /// Skip the halo exchange before the first sweep
    #[arg(long)]
    pub no_prime: bool,

    /// Print per-worker diagnostics as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Run over MPI, one worker per MPI process
    #[arg(long)]
    pub mpi: bool,
}

impl CliArgs {
    pub fn grid(&self) -> ProcessGrid {
        ProcessGrid::new(self.px, self.py)
    }

    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            omega: self.omega,
            exchange_before_first_sweep: !self.no_prime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("poisson-solve").chain(args.iter().copied()))
    }

    #[test]
    fn test_command_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_positional_grid_and_defaults() {
        let args = parse(&["2", "3"]).unwrap();
        assert_eq!(args.grid(), ProcessGrid::new(2, 3));
        assert_eq!(args.input, PathBuf::from("input.dat"));
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert_eq!(args.workers, None);
        assert!(!args.mpi);
        let config = args.solver_config();
        assert!((config.omega - OMEGA).abs() < 1e-15);
        assert!(config.exchange_before_first_sweep);
    }

    #[test]
    fn test_options_in_any_position() {
        let args = parse(&[
            "--omega", "1.5", "4", "--input", "p.json", "1", "--workers", "4", "--json", "--no-prime",
        ])
        .unwrap();
        assert_eq!(args.grid(), ProcessGrid::new(4, 1));
        assert_eq!(args.omega, 1.5);
        assert_eq!(args.input, PathBuf::from("p.json"));
        assert_eq!(args.workers, Some(4));
        assert!(args.json);
        assert!(!args.solver_config().exchange_before_first_sweep);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert_eq!(parse(&["2"]).unwrap_err().kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(parse(&["2", "x"]).unwrap_err().kind(), ErrorKind::ValueValidation);
        assert!(parse(&["2", "2", "--workers"]).is_err());
        assert_eq!(parse(&["2", "2", "--frobnicate"]).unwrap_err().kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_help_is_generated() {
        assert_eq!(parse(&["--help"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
        let help = CliArgs::command().render_help().to_string();
        assert!(help.contains("--output-dir"));
        assert!(help.contains("--no-prime"));
    }
}
