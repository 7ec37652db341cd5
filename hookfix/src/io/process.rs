//! Child-process execution with bounded output capture.

use std::io::{Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured outcome of one child-process invocation.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    /// Exit code, or -1 when the process was killed by a signal.
    pub fn exit_code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// Stdout followed by stderr, lossily decoded, with truncation and
    /// timeout notices appended. Ordering between the two streams is not
    /// preserved; within each stream it is.
    pub fn combined(&self) -> String {
        let mut out = String::from_utf8_lossy(&self.stdout).into_owned();
        if self.stdout_truncated > 0 {
            out.push_str(&format!(
                "\n[stdout truncated {} bytes]\n",
                self.stdout_truncated
            ));
        }
        out.push_str(&String::from_utf8_lossy(&self.stderr));
        if self.stderr_truncated > 0 {
            out.push_str(&format!(
                "\n[stderr truncated {} bytes]\n",
                self.stderr_truncated
            ));
        }
        if self.timed_out {
            out.push_str("\n[command timed out]\n");
        }
        out
    }
}

/// Run a command, waiting up to `timeout` and capturing stdout/stderr.
///
/// Both pipes are drained on reader threads while the child runs, so a
/// chatty child cannot deadlock on a full pipe. `output_limit_bytes` bounds
/// what is kept in memory per stream; bytes beyond it are drained and
/// counted.
///
/// Failing to spawn is an error. A non-zero exit status is not: callers
/// decide what an unsuccessful status means.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command(
    mut cmd: Command,
    stdin: Option<&[u8]>,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    if let Some(input) = stdin {
        let mut child_stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin was not piped"))?;
        child_stdin.write_all(input).context("write stdin")?;
    }

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
