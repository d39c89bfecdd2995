//! Step orchestration: generate, execute, evaluate, accept or retry.
//!
//! One call to [`run_plan`] drives a whole cleaning run. Steps are strictly
//! sequential; each step gets up to `max_attempts` generate-execute-evaluate
//! cycles, and the canonical dataset only ever changes when an attempt is
//! accepted. Every attempt is persisted to the run directory before the
//! engine moves on.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::frame::Frame;
use crate::core::metrics::{StepMetrics, evaluate_step};
use crate::core::plan::Plan;
use crate::core::sanitize::sanitize_code;
use crate::core::state::{AttemptRecord, AttemptStatus, ExecutionState};
use crate::io::attempt_log::{write_attempt, write_history};
use crate::io::collab::{CodeGenerator, CodeRequest};
use crate::io::config::ScourConfig;
use crate::io::prompt::PromptEngine;
use crate::sandbox::{ExecOutcome, execute};

/// Engine knobs, extracted from [`ScourConfig`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_attempts: u32,
    pub row_drop_limit_pct: f64,
    pub sample_rows: usize,
}

impl From<&ScourConfig> for EngineConfig {
    fn from(cfg: &ScourConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            row_drop_limit_pct: f64::from(cfg.row_drop_limit_pct),
            sample_rows: cfg.sample_rows,
        }
    }
}

/// A step exhausted its attempt budget. Surfaced through `anyhow` and
/// recovered by callers via `downcast_ref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalStepFailure {
    /// 1-based ordinal of the failed step.
    pub step: usize,
    pub attempts: u32,
}

impl fmt::Display for FatalStepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {} failed after {} attempt(s)",
            self.step, self.attempts
        )
    }
}

impl std::error::Error for FatalStepFailure {}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final dataset after every step was accepted.
    pub dataset: Frame,
    pub steps_completed: usize,
    pub history: Vec<AttemptRecord>,
}

/// What one attempt produced, before recording.
struct AttemptResult {
    status: AttemptStatus,
    error: Option<String>,
    metrics: Option<StepMetrics>,
    code: String,
    frame: Option<Frame>,
}

/// Run every plan step to acceptance, or fail the run.
///
/// On success the returned outcome carries the final dataset. A step that
/// exhausts its attempts aborts the run with [`FatalStepFailure`]; the
/// canonical dataset keeps the last accepted state, and everything needed to
/// audit the run is already under `run_dir`.
#[instrument(skip_all, fields(steps = plan.len(), run_dir = %run_dir.display()))]
pub fn run_plan<G: CodeGenerator>(
    dataset: Frame,
    plan: Plan,
    generator: &G,
    config: &EngineConfig,
    run_dir: &Path,
) -> Result<RunOutcome> {
    let prompts = PromptEngine::new();
    let mut state = ExecutionState::new(dataset, plan);
    let mut steps_completed = 0usize;

    while state.has_more_steps() {
        let step = state.current_step()?.clone();
        info!(step = step.ordinal, text = %step.text.lines().next().unwrap_or(""), "starting step");
        let mut feedback: Option<String> = None;

        loop {
            let attempt = state.attempt();
            let result = run_attempt(&prompts, &step.text, &state, feedback.as_deref(), generator, config);

            let record = AttemptRecord {
                step: step.ordinal,
                attempt,
                status: result.status,
                error: result.error.clone(),
                metrics: result.metrics.clone(),
                generated_code: result.code,
            };
            state.record(record.clone());
            write_attempt(run_dir, &record).context("persist attempt")?;
            write_history(run_dir, state.history()).context("persist history")?;

            if !record.status.is_retryable() {
                let frame = result
                    .frame
                    .context("accepted attempt must carry a result frame")?;
                info!(step = step.ordinal, attempt, "step accepted");
                state.commit(frame);
                state.advance_step();
                steps_completed += 1;
                break;
            }

            warn!(
                step = step.ordinal,
                attempt,
                status = ?result.status,
                error = result.error.as_deref().unwrap_or(""),
                "attempt not accepted"
            );
            if attempt >= config.max_attempts {
                return Err(FatalStepFailure {
                    step: step.ordinal,
                    attempts: attempt,
                }
                .into());
            }
            feedback = result.error;
            state.next_attempt();
        }
    }

    Ok(RunOutcome {
        dataset: state.dataset().clone(),
        steps_completed,
        history: state.history().to_vec(),
    })
}

fn run_attempt<G: CodeGenerator>(
    prompts: &PromptEngine,
    step_text: &str,
    state: &ExecutionState,
    feedback: Option<&str>,
    generator: &G,
    config: &EngineConfig,
) -> AttemptResult {
    let failed = |status: AttemptStatus, error: String, code: String| AttemptResult {
        status,
        error: Some(error),
        metrics: None,
        code,
        frame: None,
    };

    let prompt = match prompts.render_codegen(step_text, state.dataset(), config.sample_rows, feedback)
    {
        Ok(prompt) => prompt,
        Err(e) => {
            return failed(AttemptStatus::ExecutionError, format!("{e:#}"), String::new());
        }
    };
    let request = CodeRequest {
        step_text: step_text.to_string(),
        feedback: feedback.map(str::to_string),
        prompt,
    };

    // Generator failures (spawn errors, timeouts, non-zero exits) burn an
    // attempt like any other execution error.
    let raw = match generator.generate(&request) {
        Ok(raw) => raw,
        Err(e) => {
            return failed(
                AttemptStatus::ExecutionError,
                format!("code generation failed: {e:#}"),
                String::new(),
            );
        }
    };
    let code = sanitize_code(&raw);

    match execute(&code, state.dataset()) {
        ExecOutcome::ContractViolation { reason } => {
            failed(AttemptStatus::ContractViolation, reason, code)
        }
        ExecOutcome::ExecutionError { error } => {
            failed(AttemptStatus::ExecutionError, error, code)
        }
        ExecOutcome::Success { frame, noop } => {
            let metrics = evaluate_step(state.dataset(), &frame);
            if noop {
                info!("transformation left the dataset unchanged");
            }
            if metrics.row_drop_pct <= config.row_drop_limit_pct {
                AttemptResult {
                    status: AttemptStatus::Accepted,
                    error: None,
                    metrics: Some(metrics),
                    code,
                    frame: Some(frame),
                }
            } else {
                let error = format!(
                    "row drop percentage too high: {}% (limit: {}%)",
                    metrics.row_drop_pct, config.row_drop_limit_pct
                );
                AttemptResult {
                    status: AttemptStatus::Rejected,
                    error: Some(error),
                    metrics: Some(metrics),
                    code,
                    frame: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plan::segment_plan;
    use crate::test_support::{ScriptedGenerator, int_frame};

    fn config() -> EngineConfig {
        EngineConfig {
            max_attempts: 3,
            row_drop_limit_pct: 10.0,
            sample_rows: 5,
        }
    }

    #[test]
    fn accepts_a_clean_attempt_and_commits() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::replies(&["df = df.drop_duplicates()"]);
        let dataset = int_frame("v", vec![1, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);

        let outcome = run_plan(
            dataset,
            segment_plan("Step 1: Drop duplicate rows"),
            &generator,
            &config(),
            temp.path(),
        )
        .expect("run");

        assert_eq!(outcome.steps_completed, 1);
        assert_eq!(outcome.dataset.n_rows(), 10);
        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.history[0].status, AttemptStatus::Accepted);
    }

    #[test]
    fn rejection_feeds_back_and_retry_can_succeed() {
        let temp = tempfile::tempdir().expect("tempdir");
        // First attempt filters away half the rows; second is a no-op.
        let generator = ScriptedGenerator::replies(&[
            "df = df.filter(\"v\", \"<=\", 5)",
            "df = df.copy()",
        ]);
        let dataset = int_frame("v", (1..=10).collect());

        let outcome = run_plan(
            dataset,
            segment_plan("Step 1: Remove outliers"),
            &generator,
            &config(),
            temp.path(),
        )
        .expect("run");

        assert_eq!(outcome.history.len(), 2);
        assert_eq!(outcome.history[0].status, AttemptStatus::Rejected);
        assert_eq!(outcome.history[1].status, AttemptStatus::Accepted);

        let requests = generator.requests();
        assert!(requests[0].feedback.is_none());
        let feedback = requests[1].feedback.as_deref().expect("feedback");
        assert!(feedback.contains("row drop percentage too high: 50% (limit: 10%)"));
    }

    #[test]
    fn exhausting_attempts_is_a_fatal_step_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::replies(&[
            "df = df.filter(\"v\", \"<\", 2)",
            "df = df.filter(\"v\", \"<\", 2)",
            "df = df.filter(\"v\", \"<\", 2)",
        ]);
        let dataset = int_frame("v", (1..=10).collect());

        let err = run_plan(
            dataset,
            segment_plan("Step 1: Remove outliers"),
            &generator,
            &config(),
            temp.path(),
        )
        .unwrap_err();

        let fatal = err.downcast_ref::<FatalStepFailure>().expect("typed error");
        assert_eq!(fatal.step, 1);
        assert_eq!(fatal.attempts, 3);
    }

    #[test]
    fn contract_violation_burns_an_attempt() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::replies(&[
            "cleaned = df.copy()",
            "df = df.copy()",
        ]);

        let outcome = run_plan(
            int_frame("v", vec![1, 2]),
            segment_plan("Step 1: Copy"),
            &generator,
            &config(),
            temp.path(),
        )
        .expect("run");

        assert_eq!(outcome.history[0].status, AttemptStatus::ContractViolation);
        assert_eq!(outcome.history[1].status, AttemptStatus::Accepted);
        // The violation reason is threaded back as feedback.
        let requests = generator.requests();
        assert!(
            requests[1]
                .feedback
                .as_deref()
                .expect("feedback")
                .contains("never assigns to 'df'")
        );
    }

    #[test]
    fn generator_failure_counts_against_the_budget() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::new(vec![
            Err(anyhow::anyhow!("codegen command timed out")),
            Ok("df = df.copy()".to_string()),
        ]);

        let outcome = run_plan(
            int_frame("v", vec![1]),
            segment_plan("Step 1: Copy"),
            &generator,
            &config(),
            temp.path(),
        )
        .expect("run");

        assert_eq!(outcome.history[0].status, AttemptStatus::ExecutionError);
        let error = outcome.history[0].error.as_deref().expect("error");
        assert!(error.contains("code generation failed"));
        assert_eq!(outcome.history[1].status, AttemptStatus::Accepted);
    }

    #[test]
    fn runs_steps_strictly_in_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::replies(&["df = df.copy()", "df = df.copy()"]);

        let outcome = run_plan(
            int_frame("v", vec![1]),
            segment_plan("Step 1: First\nStep 2: Second"),
            &generator,
            &config(),
            temp.path(),
        )
        .expect("run");

        assert_eq!(outcome.steps_completed, 2);
        let requests = generator.requests();
        assert!(requests[0].step_text.contains("First"));
        assert!(requests[1].step_text.contains("Second"));
    }

    #[test]
    fn empty_plan_completes_without_attempts() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::replies(&[]);

        let outcome = run_plan(
            int_frame("v", vec![1]),
            segment_plan(""),
            &generator,
            &config(),
            temp.path(),
        )
        .expect("run");

        assert_eq!(outcome.steps_completed, 0);
        assert!(outcome.history.is_empty());
    }

    #[test]
    fn attempts_are_persisted_before_the_run_ends() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::replies(&["df = df.filter(\"v\", \"<\", 0)"]);
        let mut cfg = config();
        cfg.max_attempts = 1;

        let _ = run_plan(
            int_frame("v", vec![1, 2, 3]),
            segment_plan("Step 1: Drop everything"),
            &generator,
            &cfg,
            temp.path(),
        )
        .unwrap_err();

        assert!(
            temp.path()
                .join("attempts/step-1/attempt-1/meta.json")
                .is_file()
        );
        let history = std::fs::read_to_string(temp.path().join("history.json")).expect("history");
        assert!(history.contains("\"rejected\""));
    }
}
