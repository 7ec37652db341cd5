//! Loop configuration: `hookfix.toml`, environment snapshot, CLI flags.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Maximum iterations override, kept from the original hook contract.
pub const MAX_ITER_ENV: &str = "CODEX_MAX_ITER";
/// Scope override: `"1"` lints all tracked files instead of staged ones.
pub const ALL_FILES_ENV: &str = "ALL_FILES";

/// Loop configuration (TOML).
///
/// Read from `hookfix.toml` at the repository root when present. This file
/// is intended to be edited by humans; missing fields default to values
/// matching the plain pre-commit hook setup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoopConfig {
    /// Maximum lint/fix iterations before giving up.
    pub max_iterations: u32,

    /// Run lint against all tracked files instead of only staged ones.
    pub all_files: bool,

    /// Lint command argv; the scope flag is appended to it.
    pub lint_command: Vec<String>,

    /// Model passed to `codex exec`.
    pub model: String,

    /// Wall-clock budget for one lint run, in seconds.
    pub lint_timeout_secs: u64,

    /// Wall-clock budget for reaping one agent turn, in seconds.
    pub agent_timeout_secs: u64,

    /// Truncate captured child output beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            all_files: false,
            lint_command: vec!["pre-commit".to_string(), "run".to_string()],
            model: "gpt-5.1-codex-mini".to_string(),
            lint_timeout_secs: 30 * 60,
            agent_timeout_secs: 30 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be >= 1"));
        }
        if self.lint_command.is_empty() || self.lint_command[0].trim().is_empty() {
            return Err(anyhow!("lint_command must be a non-empty array"));
        }
        if self.lint_timeout_secs == 0 {
            return Err(anyhow!("lint_timeout_secs must be > 0"));
        }
        if self.agent_timeout_secs == 0 {
            return Err(anyhow!("agent_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must be non-empty"));
        }
        Ok(())
    }

    /// Apply `CODEX_MAX_ITER` / `ALL_FILES` from an environment snapshot.
    ///
    /// The snapshot is passed in so callers control exactly which
    /// environment the loop sees; nothing here reads process globals.
    /// A non-integer `CODEX_MAX_ITER` is rejected instead of silently
    /// disabling the loop.
    pub fn apply_env(&mut self, env: &HashMap<String, String>) -> Result<()> {
        if let Some(raw) = env.get(MAX_ITER_ENV) {
            self.max_iterations = raw
                .trim()
                .parse()
                .with_context(|| format!("parse {MAX_ITER_ENV}={raw:?} as an integer"))?;
        }
        if let Some(raw) = env.get(ALL_FILES_ENV) {
            self.all_files = raw == "1";
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `LoopConfig::default()`.
pub fn load_config(path: &Path) -> Result<LoopConfig> {
    if !path.exists() {
        let cfg = LoopConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: LoopConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Environment overlay applied to the lint child on top of the inherited
/// environment. Points pre-commit's caches into `.cache/` under the root.
pub fn lint_env_overlay(root: &Path) -> Vec<(String, String)> {
    vec![
        (
            "PRE_COMMIT_HOME".to_string(),
            root.join(".cache").join("pre-commit").display().to_string(),
        ),
        (
            "XDG_CACHE_HOME".to_string(),
            root.join(".cache").display().to_string(),
        ),
    ]
}
