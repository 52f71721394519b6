// src/file.rs

use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::config::options::ExportOptions;
use crate::csv::write_table;
use crate::data::DataSet;
use crate::error::{Error, Result};

/// Create `dir` if missing; fail if the path exists and is not a directory.
pub fn ensure_directory(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    if dir.exists() && !dir.is_dir() {
        return Err(Error::InvalidOutputDir(dir.to_path_buf()));
    }
    if !dir.exists() { fs::create_dir_all(dir)?; }
    Ok(())
}

/// Write one table to `<out>/<report>/<table>.<ext>`. Returns the path written.
pub fn write_dataset(export: &ExportOptions, report: &str, data: &DataSet) -> Result<PathBuf> {
    let path = export.table_path(report, &data.name);
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let mut out = BufWriter::new(fs::File::create(&path)?);
    write_table(&mut out, data, export.format, export.include_headers)?;
    out.flush()?;
    tracing::debug!(path = %path.display(), rows = data.len(), "wrote table");
    Ok(path)
}

/// Write every table of one report.
pub fn write_report(export: &ExportOptions, report: &str, tables: &[DataSet]) -> Result<Vec<PathBuf>> {
    ensure_directory(&export.out_dir)?;
    tables.iter().map(|t| write_dataset(export, report, t)).collect()
}
