//! Queries an NFS server for what it advertises.
//!
//! `NfsInspector` is the seam between the checks and the way the data is
//! obtained. `ToolInspector` scrapes the text output of `rpcinfo` and
//! `showmount`; callers only ever see version numbers and share paths.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

use crate::config::ToolsConfig;
use crate::runner::{command_line, CommandOutput, CommandRunner};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("{stderr}")]
    TimedOut { stderr: String },
    #[error("{command} failed (exit code: {code}): {stderr}")]
    ToolFailed {
        command: String,
        code: i32,
        stderr: String,
    },
}

pub trait NfsInspector {
    /// NFS versions the portmapper reports as ready on `server`.
    fn advertised_versions(&self, server: &str) -> Result<Vec<u32>, ProbeError>;

    /// Paths in the server's export list.
    fn exported_shares(&self, server: &str) -> Result<BTreeSet<String>, ProbeError>;
}

pub struct ToolInspector<R> {
    runner: R,
    tools: ToolsConfig,
    timeout: Duration,
}

impl<R: CommandRunner> ToolInspector<R> {
    pub fn new(runner: R, tools: ToolsConfig, timeout: Duration) -> Self {
        Self {
            runner,
            tools,
            timeout,
        }
    }

    fn invoke(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        let output = self.runner.run(program, args, self.timeout);
        check_output(command_line(program, args), output)
    }
}

impl<R: CommandRunner> NfsInspector for ToolInspector<R> {
    fn advertised_versions(&self, server: &str) -> Result<Vec<u32>, ProbeError> {
        let stdout = self.invoke(&self.tools.rpcinfo, &["-t", server, "nfs"])?;
        Ok(parse_rpcinfo_versions(&stdout))
    }

    fn exported_shares(&self, server: &str) -> Result<BTreeSet<String>, ProbeError> {
        let stdout = self.invoke(&self.tools.showmount, &["-e", server])?;
        Ok(parse_showmount_exports(&stdout))
    }
}

fn check_output(command: String, output: CommandOutput) -> Result<String, ProbeError> {
    if output.timed_out {
        return Err(ProbeError::TimedOut {
            stderr: output.stderr.trim().to_string(),
        });
    }
    if !output.success() {
        return Err(ProbeError::ToolFailed {
            command,
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output.stdout)
}

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"version (\d+)").expect("Invalid version regex"));

/// Extracts versions from lines like
/// `program 100003 version 3 ready and waiting`.
pub fn parse_rpcinfo_versions(stdout: &str) -> Vec<u32> {
    stdout
        .lines()
        .filter(|line| line.contains("ready and waiting"))
        .filter_map(|line| {
            let caps = VERSION_RE.captures(line)?;
            match caps[1].parse::<u32>() {
                Ok(version) => Some(version),
                Err(e) => {
                    tracing::warn!(line, error = %e, "ignoring unparseable NFS version");
                    None
                }
            }
        })
        .collect()
}

/// `showmount -e` prints an `Export list for <host>:` header, then one export
/// per line with the path first and the allowed clients after it.
pub fn parse_showmount_exports(stdout: &str) -> BTreeSet<String> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}
