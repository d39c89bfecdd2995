//! Engine configuration (TOML).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Cleaning engine configuration.
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values; collaborator
/// commands have no default and must be set before `run` can do anything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScourConfig {
    /// Attempts allowed per plan step before the run fails.
    pub max_attempts: u32,

    /// Reject an attempt that drops more than this percentage of rows.
    pub row_drop_limit_pct: u32,

    /// Rows of the working dataset included in code-generation prompts.
    pub sample_rows: usize,

    /// Wall-clock budget for one code-generation invocation.
    pub codegen_timeout_secs: u64,

    /// Wall-clock budget for one planner invocation.
    pub planner_timeout_secs: u64,

    /// Truncate collaborator stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    pub codegen: CommandConfig,
    pub planner: CommandConfig,
}

/// An external collaborator command, argv style.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandConfig {
    /// Command to execute (e.g. `["llm-codegen", "--model", "fast"]`).
    pub command: Vec<String>,
}

impl CommandConfig {
    pub fn is_configured(&self) -> bool {
        !self.command.is_empty() && !self.command[0].trim().is_empty()
    }
}

impl Default for ScourConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            row_drop_limit_pct: 10,
            sample_rows: 5,
            codegen_timeout_secs: 120,
            planner_timeout_secs: 120,
            output_limit_bytes: 100_000,
            codegen: CommandConfig::default(),
            planner: CommandConfig::default(),
        }
    }
}

impl ScourConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be > 0"));
        }
        if self.row_drop_limit_pct > 100 {
            return Err(anyhow!("row_drop_limit_pct must be <= 100"));
        }
        if self.codegen_timeout_secs == 0 {
            return Err(anyhow!("codegen_timeout_secs must be > 0"));
        }
        if self.planner_timeout_secs == 0 {
            return Err(anyhow!("planner_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ScourConfig::default()`.
pub fn load_config(path: &Path) -> Result<ScourConfig> {
    if !path.exists() {
        let cfg = ScourConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ScourConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ScourConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ScourConfig::default());
        assert_eq!(cfg.max_attempts, 5);
        assert_eq!(cfg.row_drop_limit_pct, 10);
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let mut cfg = ScourConfig::default();
        cfg.codegen.command = vec!["llm-codegen".to_string()];
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "max_attempts = 2\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_attempts, 2);
        assert_eq!(cfg.row_drop_limit_pct, 10);
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "max_attempts = 0\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn unconfigured_command_is_detected() {
        let cfg = ScourConfig::default();
        assert!(!cfg.codegen.is_configured());
        let mut cfg = cfg;
        cfg.codegen.command = vec!["  ".to_string()];
        assert!(!cfg.codegen.is_configured());
    }
}
