//! Export writer: a delimited summary of the retained records.
//!
//! The file is written to a temporary sibling and renamed into place once fully
//! flushed, so readers never observe a half-written export.

use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::types::InvoiceRecord;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Write `records` to the export file described by `config`.
///
/// The first row holds the column labels; each record then yields one row with
/// its fields in column order. A field the record does not carry becomes an
/// empty cell. Returns the number of data rows written.
///
/// # Errors
/// Returns [`Error::Config`] if the delimiter does not fit in one byte, and
/// [`Error::Io`] if the file cannot be created, written or moved into place. The
/// previous export, if any, is left untouched in either case.
pub fn write_export(records: &[InvoiceRecord], config: &ExportConfig) -> Result<usize> {
    let delimiter = u8::try_from(config.delimiter).map_err(|_| {
        Error::config(
            format!("delimiter '{}' is not a single byte", config.delimiter),
            "export.delimiter",
        )
    })?;
    let path = config.path.as_path();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let tmp = tempfile::Builder::new()
        .prefix(".export-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| with_path(e, "create temporary export file in", dir))?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(tmp);

    writer.write_record(config.header()).map_err(csv_error)?;
    for record in records {
        let row = config
            .columns
            .iter()
            .map(|column| record.field(&column.field).unwrap_or_default());
        writer.write_record(row).map_err(csv_error)?;
    }

    let mut tmp = writer.into_inner().map_err(|e| e.into_error())?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    set_readable(tmp.as_file())?;

    tmp.persist(path)
        .map_err(|e| with_path(e.error, "move export into place at", path))?;

    info!(path = %path.display(), rows = records.len(), "export written");
    Ok(records.len())
}

fn csv_error(err: csv::Error) -> Error {
    Error::Io(std::io::Error::from(err))
}

fn with_path(err: std::io::Error, action: &str, path: &Path) -> Error {
    Error::Io(std::io::Error::new(
        err.kind(),
        format!("Failed to {} '{}': {}", action, path.display(), err),
    ))
}

/// Temporary files are created owner-only; the export is a regular output file.
#[cfg(unix)]
fn set_readable(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_readable(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}
