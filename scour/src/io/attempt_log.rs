//! Per-attempt artifacts under the run directory.
//!
//! Every attempt is recorded durably before the engine moves on, so an
//! interrupted run can be audited from disk alone:
//!
//! ```text
//! <run_dir>/attempts/step-<n>/attempt-<m>/meta.json
//! <run_dir>/attempts/step-<n>/attempt-<m>/code.txt
//! <run_dir>/history.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::state::AttemptRecord;

#[derive(Debug, Clone)]
pub struct AttemptPaths {
    pub dir: PathBuf,
    pub meta_path: PathBuf,
    pub code_path: PathBuf,
}

impl AttemptPaths {
    pub fn new(run_dir: &Path, step: usize, attempt: u32) -> Self {
        let dir = run_dir
            .join("attempts")
            .join(format!("step-{step}"))
            .join(format!("attempt-{attempt}"));
        Self {
            meta_path: dir.join("meta.json"),
            code_path: dir.join("code.txt"),
            dir,
        }
    }
}

/// Write one attempt's artifacts.
pub fn write_attempt(run_dir: &Path, record: &AttemptRecord) -> Result<AttemptPaths> {
    let paths = AttemptPaths::new(run_dir, record.step, record.attempt);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create attempt dir {}", paths.dir.display()))?;

    write_json(&paths.meta_path, record)?;
    fs::write(&paths.code_path, &record.generated_code)
        .with_context(|| format!("write {}", paths.code_path.display()))?;
    Ok(paths)
}

/// Rewrite the full run history atomically (temp file + rename).
pub fn write_history(run_dir: &Path, history: &[AttemptRecord]) -> Result<PathBuf> {
    let path = run_dir.join("history.json");
    fs::create_dir_all(run_dir)
        .with_context(|| format!("create run dir {}", run_dir.display()))?;
    let mut buf = serde_json::to_string_pretty(history).context("serialize history")?;
    buf.push('\n');
    let tmp_path = run_dir.join("history.json.tmp");
    fs::write(&tmp_path, &buf).with_context(|| format!("write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, &path).with_context(|| format!("replace {}", path.display()))?;
    Ok(path)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::AttemptStatus;

    fn record(step: usize, attempt: u32, status: AttemptStatus) -> AttemptRecord {
        AttemptRecord {
            step,
            attempt,
            status,
            error: None,
            metrics: None,
            generated_code: "df = df.copy()".to_string(),
        }
    }

    #[test]
    fn attempt_paths_are_stable() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = AttemptPaths::new(temp.path(), 2, 3);
        assert!(paths.dir.ends_with(Path::new("attempts/step-2/attempt-3")));
        assert!(paths.meta_path.ends_with("meta.json"));
        assert!(paths.code_path.ends_with("code.txt"));
    }

    #[test]
    fn writes_attempt_artifacts() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = write_attempt(temp.path(), &record(1, 1, AttemptStatus::Accepted))
            .expect("write");

        assert!(paths.meta_path.is_file());
        let code = fs::read_to_string(&paths.code_path).expect("read code");
        assert_eq!(code, "df = df.copy()");
        let meta = fs::read_to_string(&paths.meta_path).expect("read meta");
        assert!(meta.contains("\"accepted\""));
        assert!(meta.ends_with('\n'));
    }

    #[test]
    fn history_rewrite_replaces_previous_contents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let first = vec![record(1, 1, AttemptStatus::Rejected)];
        write_history(temp.path(), &first).expect("write");

        let second = vec![
            record(1, 1, AttemptStatus::Rejected),
            record(1, 2, AttemptStatus::Accepted),
        ];
        let path = write_history(temp.path(), &second).expect("write");

        let contents = fs::read_to_string(path).expect("read");
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&contents).expect("parse");
        assert_eq!(parsed.len(), 2);
        assert!(!temp.path().join("history.json.tmp").exists());
    }
}
