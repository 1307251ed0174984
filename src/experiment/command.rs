//! Invocation Command - argument vector for one external inference run

use std::fmt;
use std::path::{Path, PathBuf};

use super::spec::{ExperimentSpec, ParamValue};

/// Build the flag tokens for a parameter list.
///
/// Rules, applied in parameter order:
/// - absent or empty-string values are skipped
/// - `true` flags emit `--<key>`, `false` flags emit nothing
/// - everything else emits `--<key>` followed by the value's string form
///
/// No semantic validation happens here (paths, devices, thresholds are
/// the inference program's concern).
#[must_use]
pub fn build_args(parameters: &[(String, ParamValue)]) -> Vec<String> {
    let mut args = Vec::with_capacity(parameters.len() * 2);
    for (key, value) in parameters {
        match value {
            ParamValue::Flag(true) => args.push(format!("--{key}")),
            ParamValue::Flag(false) | ParamValue::Absent => {}
            other => {
                if let Some(token) = other.value_token() {
                    args.push(format!("--{key}"));
                    args.push(token);
                }
            }
        }
    }
    args
}

/// Full command line for one experiment: interpreter, entry script, flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl InvocationCommand {
    /// Build the command for `spec`, prefixed with the interpreter and entry script.
    #[must_use]
    pub fn for_spec(
        interpreter: impl Into<PathBuf>,
        entry_script: &str,
        spec: &ExperimentSpec,
    ) -> Self {
        let mut args = Vec::with_capacity(1 + spec.parameters().len() * 2);
        args.push(entry_script.to_string());
        args.extend(build_args(spec.parameters()));
        Self {
            program: interpreter.into(),
            args,
        }
    }

    /// Get the program to execute.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments passed to the program (entry script first).
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for InvocationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
