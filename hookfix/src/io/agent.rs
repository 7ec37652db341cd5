//! Codex agent client: spawns `codex exec` and adapts its JSONL event
//! stream into typed events on a channel.
//!
//! The consumer drains [`AgentTurn::events`] until the channel closes (the
//! agent closed stdout), then calls [`AgentTurn::finish`] to reap the child
//! and collect the transcript. Events arrive in stream order and are
//! consumed on the caller's thread; nothing processes them concurrently.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use wait_timeout::ChildExt;

/// Parameters for one agent turn.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// Working directory the agent edits files in.
    pub workdir: PathBuf,
    /// Prompt text, delivered on the agent's stdin.
    pub prompt: String,
    /// Model identifier for the session.
    pub model: String,
    /// Bound on reaping the process after its stream ends.
    pub timeout: Duration,
    /// Truncate captured stream/stderr transcripts beyond this many bytes.
    pub output_limit_bytes: usize,
}

/// Typed view of the agent event stream.
///
/// Only the variants the loop reacts to are distinguished; everything else
/// is `Other` so new event kinds cannot break the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// A completed agent message to surface to the user.
    Message(String),
    /// The agent's turn failed; the loop reports it and keeps going.
    TurnFailed(String),
    /// Anything else, including lines that are not valid event JSON.
    Other,
}

/// Bounded raw capture of one child stream.
#[derive(Debug, Default)]
pub struct Transcript {
    pub bytes: Vec<u8>,
    pub truncated: usize,
}

impl Transcript {
    /// Lossily decoded contents with a truncation notice appended.
    pub fn lossy(&self) -> String {
        let mut out = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.truncated > 0 {
            out.push_str(&format!("\n[truncated {} bytes]\n", self.truncated));
        }
        out
    }
}

/// What a finished turn left behind, for the iteration log.
#[derive(Debug, Default)]
pub struct TurnReport {
    /// Agent process exit code, if it exited normally.
    pub exit_code: Option<i32>,
    /// Raw JSONL event stream (stdout).
    pub stream: Transcript,
    pub stderr: Transcript,
}

/// An in-flight agent turn.
///
/// `events` closes when the agent's stream ends; call [`AgentTurn::finish`]
/// afterwards to reap the backing process.
pub struct AgentTurn {
    pub events: mpsc::Receiver<AgentEvent>,
    completion: TurnCompletion,
}

enum TurnCompletion {
    Process {
        child: Child,
        stdout_reader: thread::JoinHandle<Result<Transcript>>,
        stderr_reader: thread::JoinHandle<Result<Transcript>>,
        timeout: Duration,
    },
    #[cfg(any(test, feature = "test-support"))]
    Scripted,
}

impl AgentTurn {
    /// Turn backed by pre-recorded events (test support).
    #[cfg(any(test, feature = "test-support"))]
    pub fn scripted(events: mpsc::Receiver<AgentEvent>) -> Self {
        Self {
            events,
            completion: TurnCompletion::Scripted,
        }
    }

    /// Reap the turn after the event channel has been drained.
    ///
    /// A non-zero agent exit is recorded in the report, not treated as an
    /// error: the loop re-runs lint either way and lint is the arbiter of
    /// progress. Errors mean the turn's plumbing itself broke (reader
    /// panic, wait failure).
    pub fn finish(self) -> Result<TurnReport> {
        match self.completion {
            #[cfg(any(test, feature = "test-support"))]
            TurnCompletion::Scripted => Ok(TurnReport::default()),
            TurnCompletion::Process {
                mut child,
                stdout_reader,
                stderr_reader,
                timeout,
            } => {
                let stream = join_reader(stdout_reader).context("join agent stdout reader")?;
                let stderr = join_reader(stderr_reader).context("join agent stderr reader")?;

                // Stdout already hit EOF, so the child should be exiting;
                // the wait bound only guards against one that never does.
                let status = match child.wait_timeout(timeout).context("wait for agent")? {
                    Some(status) => status,
                    None => {
                        warn!(
                            timeout_secs = timeout.as_secs(),
                            "agent did not exit, killing"
                        );
                        child.kill().context("kill agent")?;
                        child.wait().context("wait agent after kill")?
                    }
                };
                if !status.success() {
                    warn!(exit_code = ?status.code(), "agent exited unsuccessfully");
                }

                Ok(TurnReport {
                    exit_code: status.code(),
                    stream,
                    stderr,
                })
            }
        }
    }
}

fn join_reader(handle: thread::JoinHandle<Result<Transcript>>) -> Result<Transcript> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("agent reader thread panicked")),
    }
}

/// Abstraction over the coding-agent backend.
pub trait AgentClient {
    /// Start one turn. Returns once the process is spawned and the prompt
    /// delivered; events then flow until the stream closes.
    fn start(&self, request: &AgentRequest) -> Result<AgentTurn>;
}

/// Agent client that spawns `codex exec --json`.
pub struct CodexClient;

impl AgentClient for CodexClient {
    #[instrument(skip_all, fields(model = %request.model))]
    fn start(&self, request: &AgentRequest) -> Result<AgentTurn> {
        info!(workdir = %request.workdir.display(), "starting codex exec");

        let mut cmd = Command::new("codex");
        cmd.arg("exec")
            .arg("--json")
            .arg("--model")
            .arg(&request.model)
            // The hook may run before the repository's first commit.
            .arg("--skip-git-repo-check")
            .arg("-")
            .current_dir(&request.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().context("spawn codex exec")?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin was not piped"))?;
        stdin
            .write_all(request.prompt.as_bytes())
            .context("write prompt to codex")?;
        // Close stdin so the agent sees the end of the prompt.
        drop(stdin);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("stderr was not piped"))?;

        let (sender, events) = mpsc::channel();
        let limit = request.output_limit_bytes;
        let stdout_reader = thread::spawn(move || pump_events(stdout, &sender, limit));
        let stderr_reader = thread::spawn(move || capture_limited(stderr, limit));

        Ok(AgentTurn {
            events,
            completion: TurnCompletion::Process {
                child,
                stdout_reader,
                stderr_reader,
                timeout: request.timeout,
            },
        })
    }
}

/// Parse one JSONL line into a typed event.
pub fn parse_event(line: &str) -> AgentEvent {
    #[derive(Deserialize)]
    #[serde(tag = "type")]
    enum WireEvent {
        #[serde(rename = "item.completed")]
        ItemCompleted { item: WireItem },
        #[serde(rename = "turn.failed")]
        TurnFailed { error: WireError },
        #[serde(other)]
        Other,
    }

    #[derive(Deserialize)]
    #[serde(tag = "type")]
    enum WireItem {
        #[serde(rename = "agent_message")]
        AgentMessage { text: String },
        #[serde(other)]
        Other,
    }

    #[derive(Deserialize)]
    struct WireError {
        message: String,
    }

    match serde_json::from_str::<WireEvent>(line) {
        Ok(WireEvent::ItemCompleted {
            item: WireItem::AgentMessage { text },
        }) => AgentEvent::Message(text),
        Ok(WireEvent::TurnFailed { error }) => AgentEvent::TurnFailed(error.message),
        Ok(_) => AgentEvent::Other,
        Err(err) => {
            debug!(%err, "ignoring unparseable event line");
            AgentEvent::Other
        }
    }
}

/// Read the event stream line by line, forwarding typed events and keeping
/// a bounded raw transcript.
fn pump_events<R: Read>(
    reader: R,
    sender: &mpsc::Sender<AgentEvent>,
    limit: usize,
) -> Result<Transcript> {
    let mut lines = BufReader::new(reader);
    let mut transcript = Transcript::default();
    let mut line = Vec::new();

    loop {
        line.clear();
        let n = lines
            .read_until(b'\n', &mut line)
            .context("read agent stream")?;
        if n == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        let event = parse_event(text.trim_end());
        // A closed receiver means the consumer gave up; keep draining so
        // the child is not blocked on a full pipe.
        let _ = sender.send(event);
        append_limited(&mut transcript, &line, limit);
    }

    Ok(transcript)
}

fn capture_limited<R: Read>(mut reader: R, limit: usize) -> Result<Transcript> {
    let mut transcript = Transcript::default();
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read agent stderr")?;
        if n == 0 {
            break;
        }
        append_limited(&mut transcript, &chunk[..n], limit);
    }

    Ok(transcript)
}

fn append_limited(transcript: &mut Transcript, bytes: &[u8], limit: usize) {
    let remaining = limit.saturating_sub(transcript.bytes.len());
    let keep = bytes.len().min(remaining);
    transcript.bytes.extend_from_slice(&bytes[..keep]);
    transcript.truncated += bytes.len() - keep;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_agent_message() {
        let line = r#"{"type":"item.completed","item":{"type":"agent_message","text":"fixed it"}}"#;
        assert_eq!(parse_event(line), AgentEvent::Message("fixed it".into()));
    }

    #[test]
    fn parses_turn_failed() {
        let line = r#"{"type":"turn.failed","error":{"message":"model overloaded"}}"#;
        assert_eq!(
            parse_event(line),
            AgentEvent::TurnFailed("model overloaded".into())
        );
    }

    #[test]
    fn unknown_event_kinds_are_other() {
        assert_eq!(
            parse_event(r#"{"type":"turn.started","thread_id":"t1"}"#),
            AgentEvent::Other
        );
        assert_eq!(
            parse_event(r#"{"type":"item.completed","item":{"type":"command_execution"}}"#),
            AgentEvent::Other
        );
    }

    #[test]
    fn non_json_lines_are_other() {
        assert_eq!(parse_event("not json at all"), AgentEvent::Other);
        assert_eq!(parse_event(""), AgentEvent::Other);
    }

    #[test]
    fn pump_forwards_events_in_order_and_keeps_transcript() {
        let input = concat!(
            r#"{"type":"turn.started"}"#,
            "\n",
            r#"{"type":"item.completed","item":{"type":"agent_message","text":"first"}}"#,
            "\n",
            r#"{"type":"turn.failed","error":{"message":"boom"}}"#,
            "\n",
        );
        let (sender, receiver) = mpsc::channel();

        let transcript =
            pump_events(Cursor::new(input.as_bytes()), &sender, 1 << 20).expect("pump");
        drop(sender);

        let events: Vec<AgentEvent> = receiver.iter().collect();
        assert_eq!(
            events,
            vec![
                AgentEvent::Other,
                AgentEvent::Message("first".into()),
                AgentEvent::TurnFailed("boom".into()),
            ]
        );
        assert_eq!(transcript.lossy(), input);
        assert_eq!(transcript.truncated, 0);
    }

    #[test]
    fn transcript_is_bounded() {
        let input = "0123456789\n0123456789\n";
        let (sender, _receiver) = mpsc::channel();

        let transcript = pump_events(Cursor::new(input.as_bytes()), &sender, 5).expect("pump");
        assert_eq!(transcript.bytes, b"01234");
        assert_eq!(transcript.truncated, input.len() - 5);
        assert!(transcript.lossy().contains("[truncated"));
    }

    #[test]
    fn scripted_turn_finishes_clean() {
        let (sender, receiver) = mpsc::channel();
        sender.send(AgentEvent::Message("hi".into())).expect("send");
        drop(sender);

        let turn = AgentTurn::scripted(receiver);
        let events: Vec<AgentEvent> = turn.events.iter().collect();
        assert_eq!(events, vec![AgentEvent::Message("hi".into())]);

        let report = turn.finish().expect("finish");
        assert_eq!(report.exit_code, None);
    }
}
