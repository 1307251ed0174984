//! Pipeline configuration: interpreter, entry script, output locations

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::experiment::Launcher;

/// File name of the timing table inside the results directory.
pub const TIMINGS_FILE: &str = "experiment_timings.csv";

/// File name of the summary table inside the results directory.
pub const SUMMARY_FILE: &str = "metrics_summary.csv";

/// Settings shared by the run and compare steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Interpreter that executes the entry script.
    pub interpreter: PathBuf,
    /// Inference entry script passed as the first argument.
    pub entry_script: String,
    /// Directory receiving the timing and summary tables.
    pub results_dir: PathBuf,
    /// Optional per-experiment time limit.
    pub timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from("python3"),
            entry_script: "mmdet3d_inference2.py".to_string(),
            results_dir: PathBuf::from("results"),
            timeout: None,
        }
    }
}

impl PipelineConfig {
    /// Path of the timing table.
    #[must_use]
    pub fn timings_path(&self) -> PathBuf {
        self.results_dir.join(TIMINGS_FILE)
    }

    /// Path of the summary table.
    #[must_use]
    pub fn summary_path(&self) -> PathBuf {
        self.results_dir.join(SUMMARY_FILE)
    }

    /// Get the results directory.
    #[must_use]
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Launcher for the configured interpreter, script and timeout.
    #[must_use]
    pub fn launcher(&self) -> Launcher {
        let launcher = Launcher::new(&self.interpreter, self.entry_script.clone());
        match self.timeout {
            Some(limit) => launcher.with_timeout(limit),
            None => launcher,
        }
    }
}
