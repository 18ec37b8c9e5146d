#![cfg(test)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::io::Write;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::inspector::{NfsInspector, ProbeError};
use crate::runner::{command_line, CommandOutput, CommandRunner, TIMEOUT_EXIT_CODE};

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a thread-local subscriber and returns what it logged.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (result, logs)
}

/// Replays one canned `CommandOutput` for every call and records the command
/// lines it was asked to run. Clones share the call log.
#[derive(Clone)]
pub struct ScriptedRunner {
    output: CommandOutput,
    calls: Rc<RefCell<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn ok(stdout: &str) -> Self {
        Self::new(CommandOutput {
            code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
            timed_out: false,
        })
    }

    pub fn failing(code: i32, stderr: &str) -> Self {
        Self::new(CommandOutput {
            code,
            stdout: String::new(),
            stderr: stderr.to_string(),
            timed_out: false,
        })
    }

    pub fn timing_out(stderr: &str) -> Self {
        Self::new(CommandOutput {
            code: TIMEOUT_EXIT_CODE,
            stdout: String::new(),
            stderr: stderr.to_string(),
            timed_out: true,
        })
    }

    fn new(output: CommandOutput) -> Self {
        Self {
            output,
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str], _timeout: Duration) -> CommandOutput {
        self.calls.borrow_mut().push(command_line(program, args));
        self.output.clone()
    }
}

/// Inspector with fixed answers, for exercising the checks without a runner.
pub struct FakeInspector {
    versions: Vec<u32>,
    shares: BTreeSet<String>,
    error: Option<String>,
}

impl FakeInspector {
    pub fn with_versions(versions: Vec<u32>) -> Self {
        Self {
            versions,
            shares: BTreeSet::new(),
            error: None,
        }
    }

    pub fn with_shares(shares: &[&str]) -> Self {
        Self {
            versions: Vec::new(),
            shares: shares.iter().map(|s| s.to_string()).collect(),
            error: None,
        }
    }

    pub fn failing(stderr: &str) -> Self {
        Self {
            versions: Vec::new(),
            shares: BTreeSet::new(),
            error: Some(stderr.to_string()),
        }
    }

    fn check(&self, command: &str) -> Result<(), ProbeError> {
        match &self.error {
            Some(stderr) => Err(ProbeError::ToolFailed {
                command: command.to_string(),
                code: 1,
                stderr: stderr.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl NfsInspector for FakeInspector {
    fn advertised_versions(&self, server: &str) -> Result<Vec<u32>, ProbeError> {
        self.check(&format!("rpcinfo -t {} nfs", server))?;
        Ok(self.versions.clone())
    }

    fn exported_shares(&self, server: &str) -> Result<BTreeSet<String>, ProbeError> {
        self.check(&format!("showmount -e {}", server))?;
        Ok(self.shares.clone())
    }
}
