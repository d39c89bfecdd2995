//! Prompt rendering for the collaborator commands.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::frame::Frame;
use crate::core::profile::DatasetProfile;

const CODEGEN_TEMPLATE: &str = include_str!("prompts/codegen.md");
const PLANNER_TEMPLATE: &str = include_str!("prompts/planner.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("codegen", CODEGEN_TEMPLATE)
            .expect("codegen template should be valid");
        env.add_template("planner", PLANNER_TEMPLATE)
            .expect("planner template should be valid");
        Self { env }
    }

    /// Render the code-generation prompt for one step attempt.
    pub fn render_codegen(
        &self,
        step_text: &str,
        frame: &Frame,
        sample_rows: usize,
        feedback: Option<&str>,
    ) -> Result<String> {
        let shown = sample_rows.min(frame.n_rows());
        let template = self.env.get_template("codegen")?;
        let rendered = template
            .render(context! {
                step => step_text.trim(),
                schema => render_schema(frame),
                sample => render_sample(frame, shown),
                sample_rows => shown,
                total_rows => frame.n_rows(),
                feedback => feedback.map(str::trim).filter(|s| !s.is_empty()),
            })
            .context("render codegen prompt")?;
        Ok(rendered)
    }

    /// Render the planning prompt from a dataset profile.
    pub fn render_planner(&self, profile: &DatasetProfile) -> Result<String> {
        let template = self.env.get_template("planner")?;
        let rendered = template
            .render(context! { profile => profile })
            .context("render planner prompt")?;
        Ok(rendered)
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn render_schema(frame: &Frame) -> String {
    frame
        .columns()
        .iter()
        .map(|c| format!("{}:{}", c.name, c.dtype))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_sample(frame: &Frame, rows: usize) -> String {
    (0..rows)
        .map(|i| {
            frame
                .row(i)
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
