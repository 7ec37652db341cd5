//! The lint/fix retry loop.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::hooks::failed_hook_ids;
use crate::core::prompt::build_fix_prompt;
use crate::io::agent::{AgentClient, AgentEvent, AgentRequest, TurnReport};
use crate::io::cache::CachePaths;
use crate::io::config::{LoopConfig, lint_env_overlay};
use crate::io::iteration_log::{
    IterationMeta, IterationPaths, write_agent_log, write_meta, write_prompt,
};
use crate::io::lint::{LintOutcome, LintRequest, LintRunner, LintScope};

/// Where the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStop {
    /// Lint exited 0 on `iteration`.
    Clean { iteration: u32 },
    /// Lint still failing after the full iteration budget.
    BudgetExhausted { max_iterations: u32 },
}

/// Summary of one loop invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    pub iterations_run: u32,
    pub agent_turns: u32,
    pub stop: LoopStop,
}

/// Writers for user-facing progress: banners, lint output, and agent
/// messages on `out`; turn failures and the exhaustion notice on `err`.
/// The binary passes stdout/stderr; tests capture both.
pub struct Console<'a> {
    pub out: &'a mut dyn Write,
    pub err: &'a mut dyn Write,
}

/// Run the lint/fix loop until lint passes or the budget is exhausted.
///
/// Lint-spawn and agent-plumbing errors propagate immediately and abort the
/// loop; a reported agent turn failure does not, since the agent may have
/// made partial progress and the next lint run is the arbiter.
#[instrument(skip_all, fields(max_iterations = config.max_iterations))]
pub fn run_loop<L: LintRunner, A: AgentClient>(
    root: &Path,
    config: &LoopConfig,
    lint: &L,
    agent: &A,
    console: &mut Console<'_>,
) -> Result<LoopOutcome> {
    config.validate()?;
    let cache = CachePaths::new(root);
    cache.ensure()?;

    let scope = LintScope::from_all_files(config.all_files);
    let env_overlay = lint_env_overlay(root);
    let max = config.max_iterations;
    let mut agent_turns = 0u32;

    for iter in 1..=max {
        let started = Instant::now();
        let paths = IterationPaths::new(&cache.iterations_dir, iter);
        paths.ensure_dir()?;

        writeln!(console.out, "\n=== pre-commit pass {iter}/{max} ===")?;

        let lint_outcome = lint.run(&LintRequest {
            workdir: root.to_path_buf(),
            command: config.lint_command.clone(),
            scope,
            env_overlay: env_overlay.clone(),
            log_path: paths.lint_log_path.clone(),
            timeout: Duration::from_secs(config.lint_timeout_secs),
            output_limit_bytes: config.output_limit_bytes,
        })?;
        writeln!(console.out, "{}", lint_outcome.combined_output)?;

        if lint_outcome.passed() {
            writeln!(console.out, "pre-commit clean.")?;
            write_meta(&paths, &meta(iter, config, &lint_outcome, None, started))?;
            info!(iteration = iter, "lint clean");
            return Ok(LoopOutcome {
                iterations_run: iter,
                agent_turns,
                stop: LoopStop::Clean { iteration: iter },
            });
        }

        let hooks = failed_hook_ids(&lint_outcome.combined_output);
        info!(iteration = iter, failed_hooks = ?hooks, "lint failing, asking agent");

        let prompt = build_fix_prompt(&lint_outcome.combined_output);
        write_prompt(&paths, &prompt)?;

        writeln!(console.out, "\n=== codex fix {iter}/{max} ===")?;
        let report = run_agent_turn(
            agent,
            &AgentRequest {
                workdir: root.to_path_buf(),
                prompt,
                model: config.model.clone(),
                timeout: Duration::from_secs(config.agent_timeout_secs),
                output_limit_bytes: config.output_limit_bytes,
            },
            console,
        )?;
        agent_turns += 1;

        write_agent_log(&paths, &report.stream.lossy(), &report.stderr.lossy())?;
        write_meta(
            &paths,
            &meta(iter, config, &lint_outcome, Some(&report), started),
        )?;
    }

    writeln!(console.err, "max iterations reached; still failing.")?;
    warn!(max_iterations = max, "iteration budget exhausted");
    Ok(LoopOutcome {
        iterations_run: max,
        agent_turns,
        stop: LoopStop::BudgetExhausted {
            max_iterations: max,
        },
    })
}

/// Stream one agent turn to the console, draining events in arrival order.
fn run_agent_turn<A: AgentClient>(
    agent: &A,
    request: &AgentRequest,
    console: &mut Console<'_>,
) -> Result<TurnReport> {
    let turn = agent.start(request)?;
    for event in &turn.events {
        match event {
            AgentEvent::Message(text) => {
                writeln!(console.out, "{text}")?;
                console.out.flush()?;
            }
            AgentEvent::TurnFailed(message) => {
                writeln!(console.err, "Turn failed: {message}")?;
                console.err.flush()?;
            }
            AgentEvent::Other => {}
        }
    }
    turn.finish()
}

fn meta(
    iter: u32,
    config: &LoopConfig,
    lint_outcome: &LintOutcome,
    report: Option<&TurnReport>,
    started: Instant,
) -> IterationMeta {
    IterationMeta {
        iter,
        max_iterations: config.max_iterations,
        lint_exit_code: lint_outcome.exit_code,
        lint_passed: lint_outcome.passed(),
        failed_hooks: failed_hook_ids(&lint_outcome.combined_output),
        agent_invoked: report.is_some(),
        agent_exit_code: report.and_then(|r| r.exit_code),
        duration_ms: started.elapsed().as_millis() as u64,
    }
}
