use super::types::HistoryRow;
use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Get the default history file path (~/.config/audit-rating/history.csv)
pub fn get_history_path() -> Result<PathBuf> {
    Ok(crate::config::get_config_dir()?.join("history.csv"))
}

/// Append-only CSV log of scored audits.
///
/// Appends take an in-process lock and rewrite the file atomically, so a
/// concurrent reader sees either the old or the new file, never a partial row.
/// Separate processes writing the same file must coordinate themselves.
#[derive(Debug)]
pub struct HistoryLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every recorded row, oldest first. A missing file is an empty log.
    pub fn load(&self) -> Result<Vec<HistoryRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open history file at {}", self.path.display()))?;

        let mut rows = Vec::new();
        for (i, record) in reader.deserialize().enumerate() {
            let row: HistoryRow = record.with_context(|| {
                format!("Failed to parse history row {} in {}", i + 1, self.path.display())
            })?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Append one row, writing the header first if the log is new.
    pub fn append(&self, row: &HistoryRow) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("history lock poisoned"))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create history directory at {}", parent.display())
                })?;
            }
        }

        let existing = if self.path.exists() {
            fs::read(&self.path).with_context(|| {
                format!("Failed to read history file at {}", self.path.display())
            })?
        } else {
            Vec::new()
        };

        let mut file = AtomicWriteFile::open(&self.path).with_context(|| {
            format!("Failed to open atomic write file at {}", self.path.display())
        })?;
        file.write_all(&existing)
            .context("Failed to copy existing history rows")?;
        if !existing.is_empty() && !existing.ends_with(b"\n") {
            file.write_all(b"\n")
                .context("Failed to copy existing history rows")?;
        }

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(existing.is_empty())
                .from_writer(&mut file);
            writer
                .serialize(row)
                .context("Failed to serialize history row")?;
            writer.flush().context("Failed to write history row")?;
        }

        file.commit().context("Failed to save history file")?;

        if existing.is_empty() {
            info!(path = %self.path.display(), "history log created");
        }
        debug!(audit = %row.audit_name, ce_score = row.ce_score, "history row appended");
        Ok(())
    }
}
