//! Execution state for one cleaning run.
//!
//! Owns the canonical dataset snapshot, the plan, the cursor (current step,
//! current attempt) and the append-only attempt history. The engine mutates
//! this attempt by attempt; nothing else touches the canonical frame.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::frame::Frame;
use crate::core::metrics::StepMetrics;
use crate::core::plan::{Plan, Step};

/// Outcome kind of one attempt, as recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Executed cleanly and passed the acceptance policy.
    Accepted,
    /// Executed cleanly but exceeded the row-drop threshold.
    Rejected,
    /// Evaluation of the generated code failed.
    ExecutionError,
    /// Generated code did not produce a valid dataset binding.
    ContractViolation,
}

impl AttemptStatus {
    /// Whether this status sends the step back for another attempt.
    pub fn is_retryable(self) -> bool {
        self != AttemptStatus::Accepted
    }
}

/// One history entry: everything needed to reconstruct why a step needed
/// N attempts. Never mutated or removed after being recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based step ordinal.
    pub step: usize,
    /// 1-based attempt number within the step.
    pub attempt: u32,
    pub status: AttemptStatus,
    /// Failure or rejection description, when there is one.
    pub error: Option<String>,
    /// Impact metrics; present whenever execution succeeded.
    pub metrics: Option<StepMetrics>,
    /// Sanitized code that was executed (or failed to parse).
    pub generated_code: String,
}

/// Mutable state of a run: dataset, plan, cursor, history.
#[derive(Debug, Clone)]
pub struct ExecutionState {
    dataset: Frame,
    plan: Plan,
    step_index: usize,
    attempt: u32,
    history: Vec<AttemptRecord>,
}

impl ExecutionState {
    pub fn new(dataset: Frame, plan: Plan) -> Self {
        Self {
            dataset,
            plan,
            step_index: 0,
            attempt: 1,
            history: Vec::new(),
        }
    }

    /// The canonical dataset snapshot (last committed state).
    pub fn dataset(&self) -> &Frame {
        &self.dataset
    }

    /// 0-based cursor into the plan.
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// 1-based attempt number within the current step.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn has_more_steps(&self) -> bool {
        self.step_index < self.plan.len()
    }

    pub fn current_step(&self) -> Result<&Step> {
        self.plan
            .step(self.step_index)
            .ok_or_else(|| anyhow!("step index {} out of range (plan has {} steps)", self.step_index, self.plan.len()))
    }

    /// Move to the next step and reset the attempt counter. Called exactly
    /// once per accepted step.
    pub fn advance_step(&mut self) {
        self.step_index += 1;
        self.attempt = 1;
    }

    /// Bump the attempt counter after a rejection or execution error.
    pub fn next_attempt(&mut self) {
        self.attempt += 1;
    }

    /// Replace the canonical dataset with an accepted transformation result.
    pub fn commit(&mut self, dataset: Frame) {
        self.dataset = dataset;
    }

    /// Append one attempt record. Never fails, never blocks.
    pub fn record(&mut self, record: AttemptRecord) {
        self.history.push(record);
    }

    pub fn history(&self) -> &[AttemptRecord] {
        &self.history
    }
}
