//! Registry - ordered, immutable collection of experiment specs

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use super::spec::ExperimentSpec;
use crate::{Error, Result};

const KITTI_INPUT: &str = "data/kitti/training";
const KITTI_FRAME: &str = "000123";
const NUSCENES_SWEEP: &str = "n015-2018-07-24-11-22-45+0800__LIDAR_TOP__1532402927647951.pcd";

/// Ordered set of experiments to run and report on.
///
/// The registry is the authoritative enumeration for both the runner and
/// the aggregator: one result and one summary row per entry, in this order.
/// Construct it explicitly and pass it by reference; there is no global
/// registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    specs: Vec<ExperimentSpec>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    experiments: Vec<SpecEntry>,
}

#[derive(Debug, Deserialize)]
struct SpecEntry {
    name: String,
    dataset: String,
    model: String,
    result_path: PathBuf,
    #[serde(default)]
    parameters: Map<String, Value>,
}

impl Registry {
    /// Create a registry, enforcing non-empty, unique names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateExperiment`] if two specs share a name, or
    /// [`Error::InvalidConfig`] if a name is empty.
    pub fn new(specs: Vec<ExperimentSpec>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(specs.len());
        for spec in &specs {
            if spec.name().is_empty() {
                return Err(Error::InvalidConfig("experiment name must not be empty".into()));
            }
            if !seen.insert(spec.name()) {
                return Err(Error::DuplicateExperiment(spec.name().to_string()));
            }
        }
        Ok(Self { specs })
    }

    /// Parse a registry from JSON text.
    ///
    /// Parameter order inside each `parameters` object is preserved.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the names are invalid.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: RegistryFile = serde_json::from_str(json)?;
        let specs = file
            .experiments
            .into_iter()
            .map(|entry| {
                entry
                    .parameters
                    .into_iter()
                    .fold(
                        ExperimentSpec::builder(entry.name, entry.dataset, entry.model)
                            .result_path(entry.result_path),
                        |builder, (key, value)| builder.param(key, value),
                    )
                    .build()
            })
            .collect();
        Self::new(specs)
    }

    /// Load a registry from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// The five KITTI / nuScenes experiments the pipeline ships with.
    #[must_use]
    pub fn builtin() -> Self {
        let specs = vec![
            kitti_spec(
                "kitti_pointpillars_000123",
                "PointPillars",
                "pointpillars_hv_secfpn_8xb6-160e_kitti-3d-car",
                "checkpoints/kitti_pointpillars/hv_pointpillars_secfpn_6x8_160e_kitti-3d-car_20220331_134606-d42d15ed.pth",
                "outputs/kitti_pointpillars",
                0.3,
            ),
            kitti_spec(
                "kitti_3dssd_000123",
                "3DSSD",
                "3dssd_4x4_kitti-3d-car",
                "checkpoints/3dssd/3dssd_4x4_kitti-3d-car_20210818_203828-b89c8fc4.pth",
                "outputs/kitti_3dssd",
                0.6,
            ),
            kitti_spec(
                "kitti_second_000123",
                "SECOND",
                "second_hv_secfpn_8xb6-80e_kitti-3d-3class",
                "checkpoints/kitti_second/second_hv_secfpn_8xb6-80e_kitti-3d-3class-b086d0a3.pth",
                "outputs/kitti_second",
                0.05,
            ),
            nuscenes_spec(
                "nuscenes_pointpillars_demo",
                "PointPillars",
                "pointpillars_hv_fpn_sbn-all_8xb4-2x_nus-3d",
                "checkpoints/nuscenes_pointpillars/hv_pointpillars_fpn_sbn-all_4x8_2x_nus-3d_20210826_104936-fca299c1.pth",
                "outputs/nuscenes_pointpillars",
                0.2,
            ),
            nuscenes_spec(
                "nuscenes_centerpoint_demo",
                "CenterPoint",
                "centerpoint_voxel01_second_secfpn_head-circlenms_8xb4-cyclic-20e_nus-3d",
                "checkpoints/nuscenes_centerpoint/centerpoint_01voxel_second_secfpn_circlenms_4x8_cyclic-20e_nus-3d_20220810_030004-9061688e.pth",
                "outputs/nuscenes_centerpoint",
                0.25,
            ),
        ];
        Self { specs }
    }

    /// Number of experiments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Check if the registry has no experiments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Iterate over specs in registry order.
    pub fn iter(&self) -> std::slice::Iter<'_, ExperimentSpec> {
        self.specs.iter()
    }

    /// Get a spec by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ExperimentSpec> {
        self.specs.iter().find(|spec| spec.name() == name)
    }

    /// Experiment names in registry order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(ExperimentSpec::name).collect()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a ExperimentSpec;
    type IntoIter = std::slice::Iter<'a, ExperimentSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn kitti_spec(
    name: &str,
    model_tag: &str,
    config: &str,
    checkpoint: &str,
    out_dir: &str,
    score_thr: f64,
) -> ExperimentSpec {
    ExperimentSpec::builder(name, "KITTI", model_tag)
        .result_path(Path::new(out_dir).join(format!("{KITTI_FRAME}_predictions.json")))
        .param("dataset", "kitti")
        .param("input-path", KITTI_INPUT)
        .param("frame-number", KITTI_FRAME)
        .param("model", config)
        .param("checkpoint", checkpoint)
        .param("out-dir", out_dir)
        .param("device", "cuda:0")
        .param("headless", true)
        .param("score-thr", score_thr)
        .build()
}

fn nuscenes_spec(
    name: &str,
    model_tag: &str,
    config: &str,
    checkpoint: &str,
    out_dir: &str,
    score_thr: f64,
) -> ExperimentSpec {
    ExperimentSpec::builder(name, "nuScenes", model_tag)
        .result_path(Path::new(out_dir).join(format!("{NUSCENES_SWEEP}_predictions.json")))
        .param("dataset", "any")
        .param(
            "input-path",
            format!("data/nuscenes_demo/lidar/{NUSCENES_SWEEP}.bin"),
        )
        .param("model", config)
        .param("checkpoint", checkpoint)
        .param("out-dir", out_dir)
        .param("device", "cuda:0")
        .param("headless", true)
        .param("score-thr", score_thr)
        .build()
}
