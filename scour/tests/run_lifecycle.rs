//! Engine-level harness tests for full cleaning run scenarios.
//!
//! These tests drive `run_plan` over multi-step plans with scripted code
//! generators to verify end-to-end behavior: acceptance, feedback-driven
//! retries, durable artifacts, and run abortion.

use std::fs;

use scour::core::frame::{Column, Dtype, Value};
use scour::core::plan::segment_plan;
use scour::core::state::AttemptStatus;
use scour::engine::{EngineConfig, FatalStepFailure, run_plan};
use scour::test_support::{ScriptedGenerator, frame_of};

fn config() -> EngineConfig {
    EngineConfig {
        max_attempts: 5,
        row_drop_limit_pct: 10.0,
        sample_rows: 5,
    }
}

fn tracks() -> scour::core::frame::Frame {
    let names: Vec<Value> = [
        " Queen ", "queen", "Bowie", "", "Bowie", "Prince", "Kate", "Miles", "Nina", "Joni",
    ]
    .iter()
    .map(|s| {
        if s.is_empty() {
            Value::Null
        } else {
            Value::Str((*s).to_string())
        }
    })
    .collect();
    let plays: Vec<Value> = (1..=10).map(Value::Int).collect();
    frame_of(vec![
        Column::new("artist", Dtype::Str, names),
        Column::new("plays", Dtype::Int, plays),
    ])
}

/// Full lifecycle: a three-step plan where every step is accepted first try.
///
/// 1. Trim artist names.
/// 2. Fill the missing artist.
/// 3. Drop duplicate rows (none remain after trimming, so it is a no-op).
#[test]
fn multi_step_plan_runs_to_completion() {
    let temp = tempfile::tempdir().expect("tempdir");
    let generator = ScriptedGenerator::replies(&[
        "df = df.trim(\"artist\")",
        "df = df.fill_null(\"artist\", \"Unknown\")",
        "df = df.drop_duplicates()",
    ]);
    let plan = segment_plan(
        "Step 1: Trim whitespace in artist\nStep 2: Fill missing artist values\nStep 3: Drop duplicate rows",
    );

    let outcome = run_plan(tracks(), plan, &generator, &config(), temp.path()).expect("run");

    assert_eq!(outcome.steps_completed, 3);
    assert_eq!(outcome.history.len(), 3);
    assert!(
        outcome
            .history
            .iter()
            .all(|r| r.status == AttemptStatus::Accepted)
    );
    assert_eq!(outcome.dataset.n_rows(), 10);
    assert_eq!(outcome.dataset.null_total(), 0);
    let artist = outcome.dataset.column("artist").expect("artist");
    assert_eq!(artist.values[0], Value::Str("Queen".into()));
    assert_eq!(artist.values[3], Value::Str("Unknown".into()));

    // Artifacts exist for every attempt, plus the run history.
    for step in 1..=3 {
        let dir = temp.path().join(format!("attempts/step-{step}/attempt-1"));
        assert!(dir.join("meta.json").is_file());
        assert!(dir.join("code.txt").is_file());
    }
    let history = fs::read_to_string(temp.path().join("history.json")).expect("history");
    let parsed: Vec<serde_json::Value> = serde_json::from_str(&history).expect("parse");
    assert_eq!(parsed.len(), 3);
}

/// A destructive first attempt is rejected and its reason reaches the second
/// attempt's request; the corrected attempt is accepted and only then does the
/// canonical dataset change.
#[test]
fn rejected_attempt_threads_feedback_into_the_retry() {
    let temp = tempfile::tempdir().expect("tempdir");
    let generator = ScriptedGenerator::replies(&[
        "df = df.filter(\"plays\", \">\", 8)",
        "df = df.clip(\"plays\", 1, 8)",
    ]);
    let plan = segment_plan("Step 1: Cap extreme play counts");

    let outcome = run_plan(tracks(), plan, &generator, &config(), temp.path()).expect("run");

    assert_eq!(outcome.history.len(), 2);
    assert_eq!(outcome.history[0].status, AttemptStatus::Rejected);
    let metrics = outcome.history[0].metrics.as_ref().expect("metrics");
    assert_eq!(metrics.row_drop_pct, 80.0);
    assert_eq!(outcome.history[1].status, AttemptStatus::Accepted);

    let requests = generator.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].feedback.is_none());
    let feedback = requests[1].feedback.as_deref().expect("feedback");
    assert!(feedback.contains("row drop percentage too high: 80% (limit: 10%)"));
    // The prompt itself carries the feedback for the model to read.
    assert!(requests[1].prompt.contains("row drop percentage too high"));

    // Rows survived: the accepted attempt clipped instead of filtering.
    assert_eq!(outcome.dataset.n_rows(), 10);
}

/// Markdown fences and import lines from a sloppy generator are stripped
/// before execution instead of burning attempts.
#[test]
fn fenced_generator_output_still_executes() {
    let temp = tempfile::tempdir().expect("tempdir");
    let generator =
        ScriptedGenerator::replies(&["```python\nimport pandas as pd\ndf = df.trim(\"artist\")\n```"]);
    let plan = segment_plan("Step 1: Trim artist");

    let outcome = run_plan(tracks(), plan, &generator, &config(), temp.path()).expect("run");

    assert_eq!(outcome.history[0].status, AttemptStatus::Accepted);
    assert_eq!(outcome.history[0].generated_code, "df = df.trim(\"artist\")");
}

/// Exhausting the attempt budget aborts the run: typed error, untouched
/// dataset on the caller's side, and a fully persisted history on disk.
#[test]
fn exhausted_step_aborts_with_artifacts_on_disk() {
    let temp = tempfile::tempdir().expect("tempdir");
    // Every attempt violates the binding contract.
    let replies: Vec<&str> = vec!["cleaned = df.copy()"; 5];
    let generator = ScriptedGenerator::replies(&replies);
    let plan = segment_plan("Step 1: Clean\nStep 2: Never reached");

    let err = run_plan(tracks(), plan, &generator, &config(), temp.path()).unwrap_err();

    let fatal = err.downcast_ref::<FatalStepFailure>().expect("typed error");
    assert_eq!(fatal.step, 1);
    assert_eq!(fatal.attempts, 5);

    // All five attempts are on disk; step 2 never started.
    for attempt in 1..=5 {
        assert!(
            temp.path()
                .join(format!("attempts/step-1/attempt-{attempt}/meta.json"))
                .is_file()
        );
    }
    assert!(!temp.path().join("attempts/step-2").exists());

    let history = fs::read_to_string(temp.path().join("history.json")).expect("history");
    let parsed: Vec<serde_json::Value> = serde_json::from_str(&history).expect("parse");
    assert_eq!(parsed.len(), 5);
    assert!(
        parsed
            .iter()
            .all(|r| r["status"] == "contract_violation")
    );
}

/// A transformation that changes nothing is still a success: zero row drop
/// passes the acceptance policy.
#[test]
fn noop_transformation_is_accepted() {
    let temp = tempfile::tempdir().expect("tempdir");
    let generator = ScriptedGenerator::replies(&["df = df.copy()"]);
    let plan = segment_plan("Step 1: Nothing to do");

    let input = tracks();
    let outcome = run_plan(input.clone(), plan, &generator, &config(), temp.path()).expect("run");

    assert_eq!(outcome.history[0].status, AttemptStatus::Accepted);
    assert_eq!(outcome.dataset, input);
    let metrics = outcome.history[0].metrics.as_ref().expect("metrics");
    assert_eq!(metrics.rows_dropped, 0);
    assert_eq!(metrics.row_drop_pct, 0.0);
}
