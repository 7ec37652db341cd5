//! Per-iteration artifacts under `.cache/hookfix/iterations/`.
//!
//! Always written, unaffected by `RUST_LOG`: these are the product's audit
//! trail for what each pass saw and asked the agent to do.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

/// Metadata for one loop iteration.
#[derive(Debug, Clone, Serialize)]
pub struct IterationMeta {
    pub iter: u32,
    pub max_iterations: u32,
    pub lint_exit_code: i32,
    pub lint_passed: bool,
    pub failed_hooks: Vec<String>,
    pub agent_invoked: bool,
    pub agent_exit_code: Option<i32>,
    pub duration_ms: u64,
}

/// Paths for one iteration's artifacts.
#[derive(Debug, Clone)]
pub struct IterationPaths {
    pub dir: PathBuf,
    pub meta_path: PathBuf,
    pub lint_log_path: PathBuf,
    pub prompt_path: PathBuf,
    pub agent_log_path: PathBuf,
}

impl IterationPaths {
    pub fn new(iterations_dir: &Path, iter: u32) -> Self {
        let dir = iterations_dir.join(iter.to_string());
        Self {
            dir: dir.clone(),
            meta_path: dir.join("meta.json"),
            lint_log_path: dir.join("lint.log"),
            prompt_path: dir.join("prompt.md"),
            agent_log_path: dir.join("agent.log"),
        }
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create iteration dir {}", self.dir.display()))
    }
}

pub fn write_meta(paths: &IterationPaths, meta: &IterationMeta) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(meta).context("serialize iteration meta")?;
    buf.push('\n');
    write_text(&paths.meta_path, &buf)
}

pub fn write_prompt(paths: &IterationPaths, prompt: &str) -> Result<()> {
    write_text(&paths.prompt_path, prompt)
}

pub fn write_agent_log(paths: &IterationPaths, stream: &str, stderr: &str) -> Result<()> {
    let mut buf = String::new();
    buf.push_str("=== stream ===\n");
    buf.push_str(stream);
    buf.push_str("\n=== stderr ===\n");
    buf.push_str(stderr);
    write_text(&paths.agent_log_path, &buf)
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}
