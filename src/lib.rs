//! # det3d-bench: Offline 3D Detection Experiment Runner
//!
//! Runs a fixed registry of 3D object detection inference experiments as
//! external processes, times each one, and joins the timings with the
//! detection scores found in every experiment's result document.
//!
//! ## Pipeline
//!
//! ```text
//! Registry ──> InvocationCommand ──> ExperimentRunner ──> TimingStore (write)
//!
//! TimingStore (read) ─┐
//!                     ├──> ResultsAggregator ──> summary table + report
//! MetricsExtractor  ──┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use det3d_bench::config::PipelineConfig;
//! use det3d_bench::experiment::{ExperimentRunner, Registry};
//! use det3d_bench::summary::ResultsAggregator;
//! use det3d_bench::timing::TimingStore;
//!
//! let config = PipelineConfig::default();
//! let registry = Registry::builtin();
//!
//! let results = ExperimentRunner::new(config.launcher()).run_all(&registry);
//! let store = TimingStore::new(config.timings_path());
//! store.save(&results)?;
//!
//! let rows = ResultsAggregator::new(&registry, &store.load()?).aggregate();
//! println!("{}", det3d_bench::summary::render_markdown(&rows));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod experiment;
pub mod metrics;
pub mod summary;
pub mod timing;

pub use error::{Error, Result};
