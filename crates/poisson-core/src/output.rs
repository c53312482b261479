//! Per-worker output artifact: one `gx gy value` line per interior cell.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use poisson_types::constants::output_file_name;
use poisson_types::error::PoissonResult;

use crate::subgrid::LocalSubgrid;
use crate::worker::WorkerReport;

/// Write interior cells in x-major scan order (y fastest), values with
/// six decimals.
pub fn write_cells<W: Write>(sub: &LocalSubgrid, out: W) -> PoissonResult<()> {
    let mut out = BufWriter::new(out);
    for (gx, gy, value) in sub.interior_cells() {
        writeln!(out, "{gx} {gy} {value:.6}")?;
    }
    out.flush()?;
    Ok(())
}

/// Write `output<rank>.dat` under `dir` and return its path.
pub fn write_worker_output(dir: &Path, report: &WorkerReport) -> PoissonResult<PathBuf> {
    let path = dir.join(output_file_name(report.rank));
    write_cells(&report.subgrid, File::create(&path)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format_and_order() {
        let mut sub = LocalSubgrid::zeroed((2, 0), (2, 2)).unwrap();
        {
            let mut v = sub.values_mut();
            v[[1, 1]] = 1.0;
            v[[1, 2]] = 0.5;
            v[[2, 1]] = -0.25;
            v[[2, 2]] = 100.0;
        }
        let mut buf = Vec::new();
        write_cells(&sub, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "3 1 1.000000\n3 2 0.500000\n4 1 -0.250000\n4 2 100.000000\n"
        );
    }
}
