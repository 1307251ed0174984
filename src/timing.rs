//! Timing Store - persisted per-experiment wall-clock durations
//!
//! ## Write side
//!
//! One row per [`ExperimentResult`], fixed header `name,success,seconds,error`.
//! The table is written to a sibling temp file and renamed into place, so a
//! reader never sees a half-written table.
//!
//! ## Read side
//!
//! Only the name and duration columns matter downstream. Both accept several
//! header spellings, tried in the order listed in [`NAME_ALIASES`] and
//! [`DURATION_ALIASES`]:
//!
//! | Field    | Aliases (precedence order)          |
//! |----------|-------------------------------------|
//! | name     | `experiment`, `name`, `exp_name`    |
//! | duration | `time_sec`, `seconds`, `runtime`    |

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Writer};
use tracing::{info, warn};

use crate::experiment::ExperimentResult;
use crate::Result;

/// Header written by [`TimingStore::save`].
pub const TIMING_HEADER: [&str; 4] = ["name", "success", "seconds", "error"];

/// Accepted header names for the experiment identity column.
pub const NAME_ALIASES: &[&str] = &["experiment", "name", "exp_name"];

/// Accepted header names for the duration column.
pub const DURATION_ALIASES: &[&str] = &["time_sec", "seconds", "runtime"];

/// Experiment name to duration in seconds.
pub type Timings = HashMap<String, f64>;

/// CSV-backed timing table at a fixed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingStore {
    path: PathBuf,
}

impl TimingStore {
    /// Create a store for the table at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the table path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one row per result, header first, replacing any existing table.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// table cannot be written. Both are fatal for the pipeline.
    pub fn save(&self, results: &[ExperimentResult]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = Writer::from_path(&tmp)?;
            writer.write_record(TIMING_HEADER)?;
            for r in results {
                writer.write_record([
                    r.name().to_string(),
                    r.success().to_string(),
                    r.seconds().to_string(),
                    r.error(),
                ])?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;

        info!(path = %self.path.display(), rows = results.len(), "Timing table written");
        Ok(())
    }

    /// Load the name-to-duration mapping.
    ///
    /// A missing table is not an error: it yields an empty mapping and a
    /// warning. Rows whose duration cannot be parsed are skipped with a
    /// warning; rows without a name or duration are skipped silently.
    ///
    /// # Errors
    ///
    /// Returns an error only if the table exists but its header cannot be read.
    pub fn load(&self) -> Result<Timings> {
        let mut timings = Timings::new();
        if !self.path.exists() {
            warn!(path = %self.path.display(), "Timing table not found");
            return Ok(timings);
        }

        let mut reader = ReaderBuilder::new().flexible(true).from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        let name_cols = alias_columns(&headers, NAME_ALIASES);
        let duration_cols = alias_columns(&headers, DURATION_ALIASES);

        for (line, record) in reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!(row = line + 1, error = %e, "Skipping unreadable timing row");
                    continue;
                }
            };

            let Some(name) = first_non_empty(&record, &name_cols).next() else {
                continue;
            };
            let mut candidates = first_non_empty(&record, &duration_cols).peekable();
            let Some(&first_text) = candidates.peek() else {
                continue;
            };

            if let Some(seconds) = candidates.find_map(|text| text.parse::<f64>().ok()) {
                timings.insert(name.to_string(), seconds);
            } else {
                warn!(
                    experiment = name,
                    value = first_text,
                    "Could not parse time value"
                );
            }
        }

        Ok(timings)
    }
}

/// Column indices for each alias present in `headers`, in alias order.
fn alias_columns(headers: &StringRecord, aliases: &[&str]) -> Vec<usize> {
    aliases
        .iter()
        .filter_map(|alias| headers.iter().position(|h| h.trim() == *alias))
        .collect()
}

/// Non-empty (trimmed) cell values at `cols`, in column order.
fn first_non_empty<'r>(
    record: &'r StringRecord,
    cols: &'r [usize],
) -> impl Iterator<Item = &'r str> + 'r {
    cols.iter()
        .filter_map(move |&i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
