//! Experiment Spec - immutable definition of one inference experiment

use std::path::{Path, PathBuf};

use serde_json::{Number, Value};

/// Value of a single invocation parameter.
///
/// Mirrors the JSON scalar types a registry file can hold. `Absent`
/// corresponds to JSON `null` and never reaches the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Free-form string value.
    Text(String),
    /// Numeric value, kept in its JSON form so `0.3` renders as `0.3`.
    Number(Number),
    /// Boolean switch.
    Flag(bool),
    /// No value.
    Absent,
}

impl ParamValue {
    /// Canonical string form used as a command-line value token.
    ///
    /// Returns `None` for values that contribute no value token
    /// (`Absent`, empty `Text`, and `Flag`, which is emitted bare).
    #[must_use]
    pub fn value_token(&self) -> Option<String> {
        match self {
            Self::Text(s) if s.is_empty() => None,
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Flag(_) | Self::Absent => None,
        }
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::Bool(b) => Self::Flag(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::Text(s),
            other @ (Value::Array(_) | Value::Object(_)) => Self::Text(other.to_string()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or_else(|| Self::Text(value.to_string()), Self::Number)
    }
}

impl<T: Into<Self>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

/// Experiment Spec: one configured (dataset, model, parameters) unit of work.
///
/// The `name` is unique within a [`Registry`](super::Registry) and is the
/// join key between timing records and detection metrics. Parameters keep
/// insertion order, which is the order their flags appear on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentSpec {
    name: String,
    dataset: String,
    model: String,
    result_path: PathBuf,
    parameters: Vec<(String, ParamValue)>,
}

impl ExperimentSpec {
    /// Create a builder with the required identity fields.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique experiment identifier
    /// * `dataset` - Dataset tag shown in reports (e.g., "KITTI")
    /// * `model` - Model tag shown in reports (e.g., "PointPillars")
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        dataset: impl Into<String>,
        model: impl Into<String>,
    ) -> ExperimentSpecBuilder {
        ExperimentSpecBuilder::new(name, dataset, model)
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the dataset tag.
    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Get the model tag.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the path of the result document the inference program writes.
    #[must_use]
    pub fn result_path(&self) -> &Path {
        &self.result_path
    }

    /// Get the invocation parameters in insertion order.
    #[must_use]
    pub fn parameters(&self) -> &[(String, ParamValue)] {
        &self.parameters
    }

    /// Look up a parameter by key.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&ParamValue> {
        self.parameters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Builder for `ExperimentSpec`.
#[derive(Debug)]
pub struct ExperimentSpecBuilder {
    name: String,
    dataset: String,
    model: String,
    result_path: PathBuf,
    parameters: Vec<(String, ParamValue)>,
}

impl ExperimentSpecBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        dataset: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dataset: dataset.into(),
            model: model.into(),
            result_path: PathBuf::new(),
            parameters: Vec::new(),
        }
    }

    /// Set the result document path.
    #[must_use]
    pub fn result_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.result_path = path.into();
        self
    }

    /// Append a parameter.
    ///
    /// Setting a key twice replaces the earlier value but keeps its position.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.parameters.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.parameters.push((key, value));
        }
        self
    }

    /// Build the `ExperimentSpec`.
    #[must_use]
    pub fn build(self) -> ExperimentSpec {
        ExperimentSpec {
            name: self.name,
            dataset: self.dataset,
            model: self.model,
            result_path: self.result_path,
            parameters: self.parameters,
        }
    }
}
