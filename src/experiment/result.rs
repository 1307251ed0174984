//! Experiment Result - outcome of one invocation

use std::time::Duration;

use chrono::{DateTime, Utc};

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentOutcome {
    /// Process exited with code 0.
    Success,
    /// Process could not be started at all.
    LaunchFailure {
        /// Message of the launch error.
        message: String,
    },
    /// Process started and exited nonzero (or without an exit code).
    ExecutionFailure {
        /// Exit code, `None` if the process was terminated by a signal.
        code: Option<i32>,
    },
    /// Process exceeded the configured timeout and was killed.
    Timeout {
        /// The timeout that was exceeded.
        limit: Duration,
    },
}

impl ExperimentOutcome {
    /// Whether this outcome counts as a successful run.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Error text stored in the timing table; empty on success.
    #[must_use]
    pub fn error_text(&self) -> String {
        match self {
            Self::Success => String::new(),
            Self::LaunchFailure { message } => message.clone(),
            Self::ExecutionFailure { code: Some(code) } => format!("returncode={code}"),
            Self::ExecutionFailure { code: None } => "terminated by signal".to_string(),
            Self::Timeout { limit } => format!("timeout after {}s", limit.as_secs_f64()),
        }
    }
}

/// Result of running one experiment.
///
/// `stdout`/`stderr` hold the captured streams for diagnostics only; they are
/// never written to the timing table.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentResult {
    name: String,
    outcome: ExperimentOutcome,
    seconds: f64,
    started_at: DateTime<Utc>,
    stdout: String,
    stderr: String,
}

impl ExperimentResult {
    /// Create a result without captured output.
    ///
    /// Negative or non-finite durations are clamped to zero.
    #[must_use]
    pub fn new(name: impl Into<String>, outcome: ExperimentOutcome, seconds: f64) -> Self {
        Self {
            name: name.into(),
            outcome,
            seconds: if seconds.is_finite() { seconds.max(0.0) } else { 0.0 },
            started_at: Utc::now(),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Attach captured output streams.
    #[must_use]
    pub fn with_output(mut self, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self.stderr = stderr.into();
        self
    }

    /// Set the launch timestamp.
    #[must_use]
    pub const fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the outcome classification.
    #[must_use]
    pub const fn outcome(&self) -> &ExperimentOutcome {
        &self.outcome
    }

    /// Whether the run succeeded.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Get the elapsed wall-clock seconds (never negative).
    #[must_use]
    pub const fn seconds(&self) -> f64 {
        self.seconds
    }

    /// Get the error text, empty on success.
    #[must_use]
    pub fn error(&self) -> String {
        self.outcome.error_text()
    }

    /// Get the launch timestamp.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Get the captured standard output.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Get the captured standard error.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_text() {
        assert_eq!(ExperimentOutcome::Success.error_text(), "");
        assert_eq!(
            ExperimentOutcome::ExecutionFailure { code: Some(2) }.error_text(),
            "returncode=2"
        );
        assert_eq!(
            ExperimentOutcome::Timeout { limit: Duration::from_secs(5) }.error_text(),
            "timeout after 5s"
        );
    }

    #[test]
    fn test_negative_seconds_clamped() {
        let result = ExperimentResult::new("e", ExperimentOutcome::Success, -1.0);
        assert!(result.seconds().abs() < f64::EPSILON);
        assert!(result.success());
        assert!(result.error().is_empty());
    }
}
