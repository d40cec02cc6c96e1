//! Output writers for address → cluster assignments.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use eyre::{Context, Result};

use crate::types::ClusterAssignment;

/// Header row of the assignments CSV.
pub const ASSIGNMENTS_CSV_HEADER: &str = "address,cluster_id";

/// Write assignments as CSV (`address,cluster_id`), one row per address.
///
/// # Errors
/// Returns error if the file cannot be created or written.
pub fn write_assignments_csv(path: &Path, rows: &[ClusterAssignment]) -> Result<usize> {
    let file = create(path)?;
    let mut out = BufWriter::new(file);
    write_assignments_csv_to(&mut out, rows)
        .wrap_err_with(|| format!("failed to write {}", path.display()))?;
    out.flush()
        .wrap_err_with(|| format!("failed to flush {}", path.display()))?;
    Ok(rows.len())
}

/// Write assignments as CSV into any writer.
///
/// # Errors
/// Returns error if the underlying writer fails.
pub fn write_assignments_csv_to<W: Write>(out: &mut W, rows: &[ClusterAssignment]) -> Result<()> {
    writeln!(out, "{ASSIGNMENTS_CSV_HEADER}")?;
    for row in rows {
        writeln!(out, "{},{}", row.address, row.cluster_id)?;
    }
    Ok(())
}

/// Write assignments as a pretty-printed JSON array of
/// `{ "address": …, "cluster_id": … }` objects.
///
/// # Errors
/// Returns error if the file cannot be created or serialization fails.
pub fn write_assignments_json(path: &Path, rows: &[ClusterAssignment]) -> Result<usize> {
    let file = create(path)?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, rows).wrap_err("failed to serialize assignments")?;
    out.flush()
        .wrap_err_with(|| format!("failed to flush {}", path.display()))?;
    Ok(rows.len())
}

fn create(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("failed to create output directory {}", parent.display()))?;
    }
    File::create(path).wrap_err_with(|| format!("failed to create {}", path.display()))
}
