//! Local CSV export of synced rows.

use crate::linkedin_models::AnswerRecord;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const PROBE_PREFIX: &str = ".lead_sync_write_probe";

/// What happened to the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Disabled,
    /// The target directory is not writable.
    ReadOnly,
    Written { path: PathBuf, rows: usize },
    Failed { message: String },
}

fn parent_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Sibling of `target` with a per-call unique name.
fn unique_sibling(target: &Path, prefix: &str) -> PathBuf {
    parent_dir(target).join(format!("{}.{}", prefix, Uuid::new_v4().simple()))
}

/// True when a file can be created (and removed) next to `target`.
pub fn can_write_to(target: &Path) -> bool {
    let probe = unique_sibling(target, PROBE_PREFIX);

    let written = File::create(&probe).and_then(|mut f| f.write_all(b"Testing write permissions"));
    let removed = fs::remove_file(&probe);
    written.is_ok() && removed.is_ok()
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row to any writer.
pub fn write_row<W: Write, S: AsRef<str>>(w: &mut W, row: &[S]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        let cell = cell.as_ref();
        if !first {
            write!(w, ",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Header row followed by one line per record.
pub fn write_csv<W: Write>(w: &mut W, records: &[AnswerRecord]) -> io::Result<()> {
    write_row(w, &AnswerRecord::COLUMNS)?;
    for record in records {
        write_row(w, &record.cells())?;
    }
    Ok(())
}

/// Probe, then write `records` to `path`. Never fails the caller.
pub fn export_csv(path: Option<&Path>, records: &[AnswerRecord]) -> ExportOutcome {
    let Some(path) = path else {
        return ExportOutcome::Disabled;
    };

    if !can_write_to(path) {
        tracing::warn!("File system is read-only. Unable to save CSV file.");
        return ExportOutcome::ReadOnly;
    }

    // Concurrent syncs each write their own file; the rename swaps it in whole
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "leads.csv".to_string());
    let staging = unique_sibling(path, &format!(".{}.tmp", file_name));

    let result = File::create(&staging)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write_csv(&mut writer, records)?;
            writer.flush()
        })
        .and_then(|()| fs::rename(&staging, path));

    if result.is_err() {
        fs::remove_file(&staging).ok();
    }

    match result {
        Ok(()) => {
            tracing::info!("Leads data saved to {}", path.display());
            ExportOutcome::Written {
                path: path.to_path_buf(),
                rows: records.len(),
            }
        }
        Err(e) => {
            tracing::error!("Failed to write {}: {}", path.display(), e);
            ExportOutcome::Failed {
                message: e.to_string(),
            }
        }
    }
}
