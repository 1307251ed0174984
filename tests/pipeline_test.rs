//! End-to-end pipeline tests
//!
//! A small `/bin/sh` script stands in for the inference program. It accepts
//! `--exit-code`, `--out-file`/`--payload` (write a result document),
//! `--sleep` (replace itself with `sleep`), `--child-sleep` (wait on a `sleep`
//! child) and `--background-sleep` (leave a `sleep` running after exit),
//! ignoring every other flag.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use det3d_bench::experiment::{
    ExperimentOutcome, ExperimentRunner, ExperimentSpec, Launcher, Registry,
};
use det3d_bench::summary::{render_markdown, write_summary_csv, ResultsAggregator};
use det3d_bench::timing::TimingStore;

const FAKE_INFERENCE: &str = r#"
code=0
out=""
payload=""
sleep_for=""
child_sleep=""
background_sleep=""
while [ $# -gt 0 ]; do
  case "$1" in
    --exit-code) code="$2"; shift 2 ;;
    --out-file) out="$2"; shift 2 ;;
    --payload) payload="$2"; shift 2 ;;
    --sleep) sleep_for="$2"; shift 2 ;;
    --child-sleep) child_sleep="$2"; shift 2 ;;
    --background-sleep) background_sleep="$2"; shift 2 ;;
    *) shift ;;
  esac
done
echo "inference stdout"
echo "inference stderr" >&2
if [ -n "$out" ]; then
  mkdir -p "$(dirname "$out")"
  printf '%s' "$payload" > "$out"
fi
if [ -n "$background_sleep" ]; then
  sleep "$background_sleep" &
fi
if [ -n "$child_sleep" ]; then
  sleep "$child_sleep"
fi
if [ -n "$sleep_for" ]; then
  exec sleep "$sleep_for"
fi
exit "$code"
"#;

fn fake_launcher(dir: &Path) -> Launcher {
    let script = dir.join("fake_infer.sh");
    fs::write(&script, FAKE_INFERENCE).unwrap();
    Launcher::new("/bin/sh", script.to_string_lossy().into_owned())
}

fn spec(name: &str, result_path: &Path, exit_code: i64, payload: Option<&str>) -> ExperimentSpec {
    let builder = ExperimentSpec::builder(name, "KITTI", "PointPillars")
        .result_path(result_path)
        .param("exit-code", exit_code)
        .param("headless", true);
    match payload {
        Some(payload) => builder
            .param("out-file", result_path.to_string_lossy().into_owned())
            .param("payload", payload)
            .build(),
        None => builder.build(),
    }
}

fn result_path(dir: &Path, name: &str) -> PathBuf {
    dir.join("outputs").join(name).join("000123_predictions.json")
}

#[test]
fn test_success_and_execution_failure_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let ok_path = result_path(dir.path(), "ok");
    let fail_path = result_path(dir.path(), "fail");
    let registry = Registry::new(vec![
        spec("ok", &ok_path, 0, Some(r#"{"scores_3d": [0.9, 0.4, "bad", 0.5]}"#)),
        spec("fail", &fail_path, 1, None),
    ])
    .unwrap();

    let results = ExperimentRunner::new(fake_launcher(dir.path())).run_all(&registry);

    assert_eq!(results.len(), 2);
    assert!(results[0].success());
    assert_eq!(results[0].error(), "");
    assert!(!results[1].success());
    assert_eq!(results[1].outcome(), &ExperimentOutcome::ExecutionFailure { code: Some(1) });
    assert_eq!(results[1].error(), "returncode=1");
    assert!(results[1].stdout().contains("inference stdout"));
    assert!(results[1].stderr().contains("inference stderr"));

    let store = TimingStore::new(dir.path().join("results").join("experiment_timings.csv"));
    store.save(&results).unwrap();
    let timings = store.load().unwrap();
    assert_eq!(timings.len(), 2);

    let rows = ResultsAggregator::new(&registry, &timings).aggregate();
    assert_eq!(rows.len(), 2);

    let ok = &rows[0];
    assert_eq!(ok.experiment(), "ok");
    assert_eq!(ok.num_dets(), 3);
    assert!((ok.avg_score().unwrap() - 0.6).abs() < 1e-9);

    // fps comes from the recorded duration even for the failed run
    let failed = &rows[1];
    let seconds = failed.time_sec().unwrap();
    assert!((seconds - results[1].seconds()).abs() < 1e-9);
    if seconds > 0.0 {
        assert!((failed.fps().unwrap() - 1.0 / seconds).abs() < 1e-9);
    }
    assert_eq!(failed.num_dets(), 0);
    assert!(failed.avg_score().is_none());

    let summary_path = dir.path().join("results").join("metrics_summary.csv");
    write_summary_csv(&summary_path, &rows).unwrap();
    let text = fs::read_to_string(&summary_path).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.starts_with("experiment,dataset,model,time_sec,fps,num_dets,avg_score\n"));

    assert_eq!(render_markdown(&rows).lines().count(), 4);
}

#[test]
fn test_missing_result_document_keeps_timing() {
    let dir = tempfile::tempdir().unwrap();
    let missing = result_path(dir.path(), "no_output");
    let registry = Registry::new(vec![spec("no_output", &missing, 0, None)]).unwrap();

    let results = ExperimentRunner::new(fake_launcher(dir.path())).run_all(&registry);
    assert!(results[0].success());

    let store = TimingStore::new(dir.path().join("timings.csv"));
    store.save(&results).unwrap();
    let timings = store.load().unwrap();
    let rows = ResultsAggregator::new(&registry, &timings).aggregate();

    assert_eq!(rows[0].num_dets(), 0);
    assert!(rows[0].avg_score().is_none());
    assert!(rows[0].time_sec().is_some());
}

#[test]
fn test_failures_do_not_stop_the_registry() {
    let dir = tempfile::tempdir().unwrap();
    let specs: Vec<ExperimentSpec> = (0..4)
        .map(|i| {
            let name = format!("exp_{i}");
            spec(&name, &result_path(dir.path(), &name), i % 2 * 3, None)
        })
        .collect();
    let registry = Registry::new(specs).unwrap();

    let results = ExperimentRunner::new(fake_launcher(dir.path())).run_all(&registry);

    let names: Vec<&str> = results.iter().map(|r| r.name()).collect();
    assert_eq!(names, registry.names());
    let successes: Vec<bool> = results.iter().map(|r| r.success()).collect();
    assert_eq!(successes, vec![true, false, true, false]);
    assert_eq!(results[1].error(), "returncode=3");
}

#[test]
fn test_launch_failure_for_every_spec() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new(vec![
        spec("a", &result_path(dir.path(), "a"), 0, None),
        spec("b", &result_path(dir.path(), "b"), 0, None),
    ])
    .unwrap();
    let launcher = Launcher::new(dir.path().join("no-such-interpreter"), "infer.py");

    let results = ExperimentRunner::new(launcher).run_all(&registry);

    assert_eq!(results.len(), 2);
    for r in &results {
        assert!(matches!(r.outcome(), ExperimentOutcome::LaunchFailure { .. }));
        assert!(!r.error().is_empty());
        assert!(r.seconds() >= 0.0);
    }
}

#[test]
fn test_timeout_is_a_distinct_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let slow = ExperimentSpec::builder("slow", "nuScenes", "CenterPoint")
        .result_path(result_path(dir.path(), "slow"))
        .param("sleep", 5_i64)
        .build();
    let launcher = fake_launcher(dir.path()).with_timeout(Duration::from_millis(200));

    let result = ExperimentRunner::new(launcher).run_one(&slow);

    assert_eq!(
        result.outcome(),
        &ExperimentOutcome::Timeout {
            limit: Duration::from_millis(200)
        }
    );
    assert!(!result.success());
    assert!(result.error().starts_with("timeout after"));
    assert!(result.seconds() < 5.0);
}

#[test]
fn test_timeout_bounds_wall_time_when_sleep_is_a_child() {
    let dir = tempfile::tempdir().unwrap();
    let slow = ExperimentSpec::builder("slow_child", "nuScenes", "CenterPoint")
        .result_path(result_path(dir.path(), "slow_child"))
        .param("child-sleep", 5_i64)
        .build();
    let launcher = fake_launcher(dir.path()).with_timeout(Duration::from_millis(200));

    let wall = Instant::now();
    let result = ExperimentRunner::new(launcher).run_one(&slow);
    let wall = wall.elapsed();

    assert!(matches!(result.outcome(), ExperimentOutcome::Timeout { .. }));
    assert!(wall < Duration::from_secs(2), "run took {wall:?}");
    assert!(result.seconds() < 2.0);
    assert!(result.seconds() >= 0.2);
    assert!(result.stdout().contains("inference stdout"));
}

#[test]
fn test_lingering_background_process_does_not_stall_run() {
    let dir = tempfile::tempdir().unwrap();
    let quick = ExperimentSpec::builder("quick", "KITTI", "SECOND")
        .result_path(result_path(dir.path(), "quick"))
        .param("background-sleep", 5_i64)
        .build();

    let wall = Instant::now();
    let result = ExperimentRunner::new(fake_launcher(dir.path())).run_one(&quick);
    let wall = wall.elapsed();

    assert!(result.success(), "{}", result.error());
    assert!(wall < Duration::from_secs(2), "run took {wall:?}");
    assert!(result.seconds() < 2.0);
    assert!(result.stdout().contains("inference stdout"));
    assert!(result.stderr().contains("inference stderr"));
}

#[test]
fn test_builtin_registry_rows_without_artifacts() {
    let registry = Registry::builtin();
    let timings = det3d_bench::timing::Timings::new();

    let rows = ResultsAggregator::new(&registry, &timings).aggregate();

    assert_eq!(rows.len(), registry.len());
    for (row, spec) in rows.iter().zip(&registry) {
        assert_eq!(row.experiment(), spec.name());
        assert!(row.time_sec().is_none());
        assert!(row.fps().is_none());
    }
}
