//! Test-only scripted doubles for the lint runner and agent client.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::io::agent::{AgentClient, AgentEvent, AgentRequest, AgentTurn};
use crate::io::lint::{LintOutcome, LintRequest, LintRunner};

/// Temporary repository root for loop tests.
pub struct TestWorkspace {
    dir: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// Lint runner that replays a queue of outcomes and records each request.
pub struct ScriptedLint {
    results: RefCell<VecDeque<LintOutcome>>,
    pub requests: RefCell<Vec<LintRequest>>,
}

impl ScriptedLint {
    pub fn new(results: Vec<LintOutcome>) -> Self {
        Self {
            results: RefCell::new(results.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn passing() -> LintOutcome {
        LintOutcome {
            exit_code: 0,
            combined_output: String::new(),
        }
    }

    pub fn failing(output: &str) -> LintOutcome {
        LintOutcome {
            exit_code: 1,
            combined_output: output.to_string(),
        }
    }
}

impl LintRunner for ScriptedLint {
    fn run(&self, request: &LintRequest) -> Result<LintOutcome> {
        self.requests.borrow_mut().push(request.clone());
        self.results
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted lint queue exhausted"))
    }
}

/// Agent client that replays a fixed event list per turn and records the
/// prompt of each request.
pub struct ScriptedAgent {
    turns: RefCell<VecDeque<Vec<AgentEvent>>>,
    pub prompts: RefCell<Vec<String>>,
}

impl ScriptedAgent {
    pub fn new(turns: Vec<Vec<AgentEvent>>) -> Self {
        Self {
            turns: RefCell::new(turns.into()),
            prompts: RefCell::new(Vec::new()),
        }
    }
}

impl AgentClient for ScriptedAgent {
    fn start(&self, request: &AgentRequest) -> Result<AgentTurn> {
        self.prompts.borrow_mut().push(request.prompt.clone());
        let events = self
            .turns
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted agent queue exhausted"))?;

        let (sender, receiver) = mpsc::channel();
        for event in events {
            sender.send(event).expect("receiver alive");
        }
        drop(sender);
        Ok(AgentTurn::scripted(receiver))
    }
}

/// Agent client whose turns deliver events from a background thread,
/// exercising consumers against a channel that is still being fed when the
/// turn starts (the real client's reader thread behaves this way).
pub struct StreamingAgent {
    turns: RefCell<VecDeque<Vec<AgentEvent>>>,
}

impl StreamingAgent {
    pub fn new(turns: Vec<Vec<AgentEvent>>) -> Self {
        Self {
            turns: RefCell::new(turns.into()),
        }
    }
}

impl AgentClient for StreamingAgent {
    fn start(&self, _request: &AgentRequest) -> Result<AgentTurn> {
        let events = self
            .turns
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("streaming agent queue exhausted"))?;

        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            for event in events {
                thread::sleep(Duration::from_millis(5));
                if sender.send(event).is_err() {
                    break;
                }
            }
        });
        Ok(AgentTurn::scripted(receiver))
    }
}
