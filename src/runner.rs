use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Exit code reported when a command is killed for exceeding its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Exit code reported when a command could not be run at all.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 1;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Set only when the runner gave up on the command. A tool that exits
    /// with 124 on its own leaves this false.
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0 && !self.timed_out
    }
}

/// Runs external programs. Every failure mode is folded into the returned
/// `CommandOutput`; implementations never panic or return early.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str], timeout: Duration) -> CommandOutput;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], timeout: Duration) -> CommandOutput {
        run_command(program, args, timeout)
    }
}

pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

enum Stream {
    Stdout,
    Stderr,
}

/// Runs `program` with one deadline covering both the process exit and the
/// draining of its output pipes.
pub fn run_command(program: &str, args: &[&str], timeout: Duration) -> CommandOutput {
    let cmdline = command_line(program, args);
    tracing::debug!(command = %cmdline, ?timeout, "running command");

    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(command = %cmdline, error = %e, "failed to start command");
            return spawn_failure(&cmdline, &e);
        }
    };

    let start = Instant::now();
    let deadline = start + timeout;

    let (tx, rx) = mpsc::channel();
    if let Some(pipe) = child.stdout.take() {
        drain(pipe, Stream::Stdout, tx.clone());
    }
    if let Some(pipe) = child.stderr.take() {
        drain(pipe, Stream::Stderr, tx.clone());
    }
    drop(tx);

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return timed_out(&cmdline, timeout);
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(command = %cmdline, error = %e, "failed to wait on command");
                return spawn_failure(&cmdline, &e);
            }
        }
    };

    // A background process started by the tool can keep the pipes open after
    // the tool itself exits; the readers are abandoned at the deadline.
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((Stream::Stdout, buf)) => stdout = buf,
            Ok((Stream::Stderr, buf)) => stderr = buf,
            Err(RecvTimeoutError::Timeout) => return timed_out(&cmdline, timeout),
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let code = status.code().unwrap_or(SPAWN_FAILURE_EXIT_CODE);
    let stdout = String::from_utf8_lossy(&stdout).into_owned();
    let mut stderr = String::from_utf8_lossy(&stderr).into_owned();
    if status.code().is_none() && stderr.is_empty() {
        stderr = format!("command '{}' was terminated by a signal", cmdline);
    }

    tracing::debug!(command = %cmdline, code, elapsed = ?start.elapsed(), "command finished");

    CommandOutput {
        code,
        stdout,
        stderr,
        timed_out: false,
    }
}

fn timed_out(cmdline: &str, timeout: Duration) -> CommandOutput {
    tracing::warn!(command = %cmdline, ?timeout, "command timed out");
    CommandOutput {
        code: TIMEOUT_EXIT_CODE,
        stdout: String::new(),
        stderr: format!("command '{}' timed out after {:?}", cmdline, timeout),
        timed_out: true,
    }
}

fn spawn_failure(cmdline: &str, err: &std::io::Error) -> CommandOutput {
    CommandOutput {
        code: SPAWN_FAILURE_EXIT_CODE,
        stdout: String::new(),
        stderr: format!("failed to run '{}': {}", cmdline, err),
        timed_out: false,
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R, stream: Stream, tx: Sender<(Stream, Vec<u8>)>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send((stream, buf));
    });
}
