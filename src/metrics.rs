//! Metrics Extractor - detection counts and mean scores from result documents
//!
//! Result documents come from an external inference program and their shape
//! varies by model and exporter. Two top-level shapes are accepted:
//!
//! - a non-empty array of sample records (only the first is inspected)
//! - a single sample record
//!
//! Inside the inspected record the score sequence is located by trying each
//! [`ScoreSource`] in order. Nothing in here fails on a well-formed but
//! unexpected document: the worst case is zero detections.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::warn;

/// Where in a sample record the detection scores were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    /// `record.pred_instances_3d.scores_3d`
    NestedPredInstances,
    /// `record.scores_3d`
    FlatScores,
    /// No score sequence in the record.
    NoMatch,
}

impl ScoreSource {
    /// Structural probes, in the order they are tried.
    pub const PROBE_ORDER: [Self; 2] = [Self::NestedPredInstances, Self::FlatScores];

    /// Return the score sequence this source points at, if the record has one.
    #[must_use]
    pub fn probe(self, record: &Value) -> Option<&[Value]> {
        let candidate = match self {
            Self::NestedPredInstances => record.get("pred_instances_3d")?.get("scores_3d"),
            Self::FlatScores => record.get("scores_3d"),
            Self::NoMatch => None,
        };
        candidate?.as_array().map(Vec::as_slice)
    }
}

/// Detection count and mean score for one experiment.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DetectionMetrics {
    num_detections: usize,
    avg_score: Option<f64>,
}

impl DetectionMetrics {
    /// Zero detections, no score.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            num_detections: 0,
            avg_score: None,
        }
    }

    /// Reduce a list of scores to count and arithmetic mean.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self::empty();
        }
        let sum: f64 = scores.iter().sum();
        Self {
            num_detections: scores.len(),
            avg_score: Some(sum / scores.len() as f64),
        }
    }

    /// Number of scores that converted to a number.
    #[must_use]
    pub const fn num_detections(&self) -> usize {
        self.num_detections
    }

    /// Mean score, absent when there are no detections.
    #[must_use]
    pub const fn avg_score(&self) -> Option<f64> {
        self.avg_score
    }
}

/// Pick the sample record to inspect from a document.
///
/// Arrays yield their first element, objects yield themselves, anything
/// else (including an empty array) yields nothing.
#[must_use]
pub fn first_record(document: &Value) -> Option<&Value> {
    match document {
        Value::Array(items) => items.first().filter(|v| v.is_object()),
        Value::Object(_) => Some(document),
        _ => None,
    }
}

/// Locate the score sequence in a record, trying each probe in order.
#[must_use]
pub fn locate_scores(record: &Value) -> (ScoreSource, &[Value]) {
    ScoreSource::PROBE_ORDER
        .into_iter()
        .find_map(|source| source.probe(record).map(|scores| (source, scores)))
        .unwrap_or((ScoreSource::NoMatch, &[][..]))
}

/// Convert one score element to a float.
///
/// Numbers, numeric strings and booleans convert; everything else is dropped.
#[must_use]
pub fn score_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Compute metrics for an already-parsed result document.
#[must_use]
pub fn metrics_from_document(document: &Value) -> DetectionMetrics {
    let Some(record) = first_record(document) else {
        return DetectionMetrics::empty();
    };
    let (_, raw) = locate_scores(record);
    let scores: Vec<f64> = raw.iter().filter_map(score_value).collect();
    DetectionMetrics::from_scores(&scores)
}

/// Compute metrics for the result document at `path`.
///
/// A missing or unparseable document yields [`DetectionMetrics::empty`] and
/// a warning; it never aborts aggregation.
#[must_use]
pub fn extract_metrics(path: &Path) -> DetectionMetrics {
    if !path.exists() {
        warn!(path = %path.display(), "Prediction file not found");
        return DetectionMetrics::empty();
    }

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read prediction file");
            return DetectionMetrics::empty();
        }
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(document) => metrics_from_document(&document),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Prediction file is not valid JSON");
            DetectionMetrics::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_scores_drop_bad_elements() {
        let metrics = metrics_from_document(&json!({"scores_3d": [0.9, 0.4, "bad", 0.5]}));
        assert_eq!(metrics.num_detections(), 3);
        assert!((metrics.avg_score().unwrap() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_nested_in_sequence() {
        let metrics =
            metrics_from_document(&json!([{"pred_instances_3d": {"scores_3d": [0.8, 0.2]}}]));
        assert_eq!(metrics.num_detections(), 2);
        assert!((metrics.avg_score().unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_probe_order() {
        let record = json!({
            "pred_instances_3d": {"scores_3d": [1.0]},
            "scores_3d": [0.0, 0.0]
        });
        assert_eq!(locate_scores(&record).0, ScoreSource::NestedPredInstances);

        let record = json!({"pred_instances_3d": {"labels_3d": [1]}, "scores_3d": [0.5]});
        assert_eq!(locate_scores(&record).0, ScoreSource::FlatScores);

        let record = json!({"scores_3d": 0.5});
        assert_eq!(locate_scores(&record).0, ScoreSource::NoMatch);
    }

    #[test]
    fn test_only_first_record_inspected() {
        let metrics = metrics_from_document(&json!([
            {"scores_3d": [0.1]},
            {"scores_3d": [0.9, 0.9, 0.9]}
        ]));
        assert_eq!(metrics.num_detections(), 1);
    }

    #[test]
    fn test_unexpected_shapes_are_empty() {
        for doc in [json!([]), json!(42), json!("text"), json!([1, 2]), json!({})] {
            assert_eq!(metrics_from_document(&doc), DetectionMetrics::empty());
        }
    }

    #[test]
    fn test_score_value_conversions() {
        assert_eq!(score_value(&json!(" 0.25 ")), Some(0.25));
        assert_eq!(score_value(&json!(true)), Some(1.0));
        assert_eq!(score_value(&json!(null)), None);
        assert_eq!(score_value(&json!([0.5])), None);
    }

    #[test]
    fn test_missing_path() {
        let metrics = extract_metrics(Path::new("/nonexistent/predictions.json"));
        assert_eq!(metrics.num_detections(), 0);
        assert!(metrics.avg_score().is_none());
    }
}
