//! Experiment definition and execution
//!
//! ## Overview
//!
//! ```text
//! Registry (1) ──< ExperimentSpec (N)
//!                      │
//!                      ├── InvocationCommand  [interpreter script --flag value ...]
//!                      └── ExperimentResult   [success, seconds, error]
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use det3d_bench::experiment::{ExperimentRunner, ExperimentSpec, Launcher, Registry};
//!
//! let spec = ExperimentSpec::builder("kitti_second_000123", "KITTI", "SECOND")
//!     .result_path("outputs/kitti_second/000123_predictions.json")
//!     .param("out-dir", "outputs/kitti_second")
//!     .param("headless", true)
//!     .param("score-thr", 0.05)
//!     .build();
//! let registry = Registry::new(vec![spec])?;
//!
//! let runner = ExperimentRunner::new(Launcher::new("python3", "mmdet3d_inference2.py"));
//! for result in runner.run_all(&registry) {
//!     println!("{} {} {:.2}s", result.name(), result.success(), result.seconds());
//! }
//! # Ok::<(), det3d_bench::Error>(())
//! ```

mod command;
mod registry;
mod result;
mod runner;
mod spec;

pub use command::{build_args, InvocationCommand};
pub use registry::Registry;
pub use result::{ExperimentOutcome, ExperimentResult};
pub use runner::{render_run_summary, ExperimentRunner, Launcher};
pub use spec::{ExperimentSpec, ExperimentSpecBuilder, ParamValue};
