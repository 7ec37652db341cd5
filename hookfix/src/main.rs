//! Pre-commit automation shim.
//!
//! Runs the configured lint command and, on failure, asks a Codex agent to
//! patch the working tree, retrying up to a bounded number of iterations.
//! Intended to be wired in as a git pre-commit hook.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use hookfix::exit_codes;
use hookfix::io::agent::CodexClient;
use hookfix::io::config::{LoopConfig, load_config};
use hookfix::io::lint::PreCommitRunner;
use hookfix::logging;
use hookfix::looping::{Console, LoopStop, run_loop};

#[derive(Parser)]
#[command(
    name = "hookfix",
    version,
    about = "Run pre-commit and let a Codex agent fix failures, retrying a bounded number of times"
)]
struct Cli {
    /// Lint all tracked files instead of only staged ones (also: ALL_FILES=1).
    #[arg(long)]
    all_files: bool,

    /// Maximum lint/fix iterations (also: CODEX_MAX_ITER).
    #[arg(long)]
    max_iter: Option<u32>,

    /// Repository root to operate in.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Config file path, relative to the root.
    #[arg(long, default_value = "hookfix.toml")]
    config: PathBuf,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FAILING);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let env: HashMap<String, String> = std::env::vars().collect();
    let config = build_config(&cli, &env)?;

    // Unlocked handles that lock per write: the agent's stream pump thread
    // also writes to stderr through tracing, so no guard may be held here
    // for the duration of the loop.
    let mut out = std::io::stdout();
    let mut err = std::io::stderr();
    let mut console = Console {
        out: &mut out,
        err: &mut err,
    };

    let outcome = run_loop(
        &cli.root,
        &config,
        &PreCommitRunner,
        &CodexClient,
        &mut console,
    )?;
    Ok(match outcome.stop {
        LoopStop::Clean { .. } => exit_codes::OK,
        LoopStop::BudgetExhausted { .. } => exit_codes::FAILING,
    })
}

/// Merge config sources, lowest to highest precedence: `hookfix.toml`,
/// environment variables, CLI flags.
fn build_config(cli: &Cli, env: &HashMap<String, String>) -> Result<LoopConfig> {
    let config_path = cli.root.join(&cli.config);
    let mut config = load_config(&config_path)
        .with_context(|| format!("load config {}", config_path.display()))?;
    config.apply_env(env)?;
    if let Some(max_iter) = cli.max_iter {
        config.max_iterations = max_iter;
    }
    if cli.all_files {
        config.all_files = true;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookfix::io::config::{ALL_FILES_ENV, MAX_ITER_ENV};

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_defaults() {
        let cli = Cli::parse_from(["hookfix"]);
        assert!(!cli.all_files);
        assert_eq!(cli.max_iter, None);
        assert_eq!(cli.root, PathBuf::from("."));
    }

    #[test]
    fn parse_flags() {
        let cli = Cli::parse_from(["hookfix", "--all-files", "--max-iter", "5"]);
        assert!(cli.all_files);
        assert_eq!(cli.max_iter, Some(5));
    }

    #[test]
    fn defaults_without_env_or_flags() {
        let cli = Cli::parse_from(["hookfix"]);
        let config = build_config(&cli, &env(&[])).expect("config");
        assert_eq!(config.max_iterations, 3);
        assert!(!config.all_files);
    }

    #[test]
    fn env_feeds_config() {
        let cli = Cli::parse_from(["hookfix"]);
        let config =
            build_config(&cli, &env(&[(MAX_ITER_ENV, "2"), (ALL_FILES_ENV, "1")])).expect("config");
        assert_eq!(config.max_iterations, 2);
        assert!(config.all_files);
    }

    #[test]
    fn flags_win_over_env() {
        let cli = Cli::parse_from(["hookfix", "--max-iter", "9"]);
        let config = build_config(&cli, &env(&[(MAX_ITER_ENV, "2")])).expect("config");
        assert_eq!(config.max_iterations, 9);
    }

    #[test]
    fn bad_env_value_is_rejected() {
        let cli = Cli::parse_from(["hookfix"]);
        let err = build_config(&cli, &env(&[(MAX_ITER_ENV, "three")])).unwrap_err();
        assert!(format!("{err:#}").contains(MAX_ITER_ENV));
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let cli = Cli::parse_from(["hookfix", "--max-iter", "0"]);
        assert!(build_config(&cli, &env(&[])).is_err());
    }
}
