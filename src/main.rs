use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use det3d_bench::config::PipelineConfig;
use det3d_bench::experiment::{render_run_summary, ExperimentRunner, Registry};
use det3d_bench::summary::{render_markdown, write_summary_csv, ResultsAggregator};
use det3d_bench::timing::TimingStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run 3D detection inference experiments and summarize their timing and scores"
)]
struct Cli {
    #[command(subcommand)]
    step: Step,
    /// JSON registry file; defaults to the built-in KITTI / nuScenes experiments.
    #[arg(long, global = true)]
    registry: Option<PathBuf>,
    /// Directory for the timing and summary tables.
    #[arg(long, global = true, default_value = "results")]
    results_dir: PathBuf,
    /// Interpreter used to launch the inference script.
    #[arg(long, global = true, default_value = "python3")]
    python: PathBuf,
    /// Inference entry script.
    #[arg(long, global = true, default_value = "mmdet3d_inference2.py")]
    script: String,
    /// Kill an experiment after this many seconds (no limit by default).
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Run every experiment and write the timing table.
    Run,
    /// Aggregate timings and result documents into the summary table.
    Compare,
    /// Run, then compare.
    All,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig {
        interpreter: cli.python,
        entry_script: cli.script,
        results_dir: cli.results_dir,
        timeout: cli.timeout_secs.map(Duration::from_secs),
    };
    let registry = match &cli.registry {
        Some(path) => Registry::from_json_file(path)
            .with_context(|| format!("loading registry {}", path.display()))?,
        None => Registry::builtin(),
    };
    info!(experiments = registry.len(), "Registry loaded");

    if matches!(cli.step, Step::Run | Step::All) {
        run(&config, &registry)?;
    }
    if matches!(cli.step, Step::Compare | Step::All) {
        compare(&config, &registry)?;
    }
    Ok(())
}

fn run(config: &PipelineConfig, registry: &Registry) -> Result<()> {
    std::fs::create_dir_all(config.results_dir())
        .with_context(|| format!("creating {}", config.results_dir().display()))?;

    let results = ExperimentRunner::new(config.launcher()).run_all(registry);

    let store = TimingStore::new(config.timings_path());
    store.save(&results).context("writing timing table")?;

    println!("{}", "=".repeat(80));
    println!("Summary of experiments");
    println!("{}", "=".repeat(80));
    print!("{}", render_run_summary(&results));

    let resolved = std::fs::canonicalize(store.path()).unwrap_or_else(|_| store.path().to_path_buf());
    println!("\nTiming CSV written to: {}", resolved.display());
    println!("Next step: run `det3d-bench compare` to compute metrics.\n");
    Ok(())
}

fn compare(config: &PipelineConfig, registry: &Registry) -> Result<()> {
    std::fs::create_dir_all(config.results_dir())
        .with_context(|| format!("creating {}", config.results_dir().display()))?;

    let timings = TimingStore::new(config.timings_path())
        .load()
        .context("reading timing table")?;
    let rows = ResultsAggregator::new(registry, &timings).aggregate();

    let summary_path = config.summary_path();
    write_summary_csv(&summary_path, &rows).context("writing summary table")?;
    println!("Metrics CSV written to: {}", summary_path.display());

    println!("\n=== Markdown Table for report.md ===\n");
    print!("{}", render_markdown(&rows));
    Ok(())
}
