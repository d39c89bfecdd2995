//! Collaborator abstractions for plan and code generation.
//!
//! The [`CodeGenerator`] and [`Planner`] traits decouple the engine from the
//! actual model backend. The command-backed implementations feed a rendered
//! prompt to a configured child process on stdin and take its stdout as the
//! reply; tests use scripted implementations that return predetermined
//! outputs without spawning processes.

use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::io::config::CommandConfig;
use crate::io::process::run_command_with_timeout;

/// One code-generation request for a single step attempt.
#[derive(Debug, Clone)]
pub struct CodeRequest {
    /// Plan step text being implemented.
    pub step_text: String,
    /// Feedback from the previous rejected attempt, if any.
    pub feedback: Option<String>,
    /// Fully rendered prompt.
    pub prompt: String,
}

/// Produces transformation code for a step.
pub trait CodeGenerator {
    /// Return raw generated code. The engine sanitizes and executes it.
    fn generate(&self, request: &CodeRequest) -> Result<String>;
}

/// Produces a cleaning plan from a profile prompt.
pub trait Planner {
    /// Return the raw plan text for segmentation.
    fn plan(&self, prompt: &str) -> Result<String>;
}

/// Code generator that spawns a configured command.
pub struct CommandCodeGenerator {
    pub command: CommandConfig,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl CodeGenerator for CommandCodeGenerator {
    #[instrument(skip_all, fields(step = %request.step_text))]
    fn generate(&self, request: &CodeRequest) -> Result<String> {
        invoke("codegen", &self.command, &request.prompt, self.timeout, self.output_limit_bytes)
    }
}

/// Planner that spawns a configured command.
pub struct CommandPlanner {
    pub command: CommandConfig,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl Planner for CommandPlanner {
    #[instrument(skip_all)]
    fn plan(&self, prompt: &str) -> Result<String> {
        invoke("planner", &self.command, prompt, self.timeout, self.output_limit_bytes)
    }
}

fn invoke(
    label: &str,
    command: &CommandConfig,
    prompt: &str,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<String> {
    if !command.is_configured() {
        return Err(anyhow!("{label}.command is not configured"));
    }
    info!(command = %command.command[0], "invoking {label} command");

    let mut cmd = Command::new(&command.command[0]);
    cmd.args(&command.command[1..]);
    let output = run_command_with_timeout(cmd, Some(prompt.as_bytes()), timeout, output_limit_bytes)?;

    if output.timed_out {
        warn!(timeout_secs = timeout.as_secs(), "{label} command timed out");
        return Err(anyhow!("{label} command timed out after {timeout:?}"));
    }
    if !output.status.success() {
        warn!(exit_code = ?output.status.code(), "{label} command failed");
        return Err(anyhow!(
            "{label} command failed with status {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    debug!(bytes = output.stdout.len(), "{label} command replied");
    Ok(output.stdout_text())
}
