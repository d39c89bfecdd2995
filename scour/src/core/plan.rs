//! Cleaning plan: an ordered sequence of free-text steps.
//!
//! Plan text is produced by the planning collaborator and segmented here on a
//! purely structural convention: a new step begins at every line whose
//! trimmed form starts with the literal `Step` followed by a number. Step
//! bodies are opaque to the engine; only the code-generation collaborator
//! interprets them.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

static STEP_MARKER: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^Step\s+\d+").unwrap());

/// One unit of the cleaning plan. Immutable once the plan is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based position in the plan.
    pub ordinal: usize,
    /// Free-text description, including the marker line.
    pub text: String,
}

/// Ordered, immutable sequence of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }
}

/// Split raw plan text into steps at marker lines.
///
/// The marker line belongs to the step it opens. Text without any marker
/// yields a single step containing the whole text; blank text yields an
/// empty plan (callers treat zero steps as a no-op run).
pub fn segment_plan(text: &str) -> Plan {
    let mut steps = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();

    let flush = |buffer: &mut Vec<&str>, steps: &mut Vec<Step>| {
        let body = buffer.join("\n");
        let body = body.trim();
        if !body.is_empty() {
            steps.push(Step {
                ordinal: steps.len() + 1,
                text: body.to_string(),
            });
        }
        buffer.clear();
    };

    for line in text.lines() {
        if STEP_MARKER.is_match(line.trim_start()) {
            flush(&mut buffer, &mut steps);
        }
        buffer.push(line);
    }
    flush(&mut buffer, &mut steps);

    Plan { steps }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_two_steps_with_bodies() {
        let plan = segment_plan("Step 1: Fix nulls\nDo X\nStep 2: Drop dupes\nDo Y");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps()[0].ordinal, 1);
        assert_eq!(plan.steps()[0].text, "Step 1: Fix nulls\nDo X");
        assert_eq!(plan.steps()[1].ordinal, 2);
        assert_eq!(plan.steps()[1].text, "Step 2: Drop dupes\nDo Y");
    }

    #[test]
    fn text_without_markers_is_a_single_step() {
        let plan = segment_plan("just do the cleaning\nhowever you like");
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps()[0].text, "just do the cleaning\nhowever you like");
    }

    #[test]
    fn blank_text_yields_empty_plan() {
        assert!(segment_plan("").is_empty());
        assert!(segment_plan("   \n\n  ").is_empty());
    }

    #[test]
    fn marker_requires_number() {
        // "Steps" prose or a bare "Step" heading does not open a new step.
        let plan = segment_plan("Step one: intro\nStep 1: real\nbody");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps()[1].text, "Step 1: real\nbody");
    }

    #[test]
    fn marker_is_case_sensitive() {
        let plan = segment_plan("step 1: lower\nStep 2: upper");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps()[0].text, "step 1: lower");
    }

    #[test]
    fn leading_prose_before_first_marker_is_its_own_step() {
        let plan = segment_plan("Overview of the plan\nStep 1: do it");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps()[0].text, "Overview of the plan");
        assert_eq!(plan.steps()[1].text, "Step 1: do it");
    }

    #[test]
    fn indented_marker_still_opens_a_step() {
        let plan = segment_plan("  Step 1: a\nbody\n  Step 2: b");
        assert_eq!(plan.len(), 2);
    }
}
