//! Bounded execution of external tools.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};
use uncork_common::{Error, Result};
use wait_timeout::ChildExt;

/// How a tool invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Completed,
    /// Non-zero exit or spawn failure.
    Failed(String),
    /// Killed after exceeding its timeout.
    TimedOut(Duration),
    /// Not found in the preferred directory or on `PATH`.
    Missing,
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Completed)
    }

    /// Turn anything but success into [`Error::Tool`].
    pub fn into_result(self, tool: &str) -> Result<()> {
        match self {
            ToolOutcome::Completed => Ok(()),
            other => Err(Error::Tool {
                tool: tool.to_string(),
                reason: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolOutcome::Completed => write!(f, "completed"),
            ToolOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            ToolOutcome::TimedOut(timeout) => {
                write!(f, "timed out after {} seconds", timeout.as_secs())
            }
            ToolOutcome::Missing => write!(f, "not found"),
        }
    }
}

/// A command line for an external tool.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub env_remove: Vec<String>,
    pub timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            env_remove: Vec::new(),
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env_remove.push(key.into());
        self
    }

    /// Run to completion or until the timeout, preferring a binary in
    /// `preferred_dir` over one on `PATH`.
    pub fn run(&self, preferred_dir: Option<&Path>) -> ToolOutcome {
        let Some(program) = locate(&self.program, preferred_dir) else {
            debug!("{} not found", self.program);
            return ToolOutcome::Missing;
        };

        debug!("Executing: {:?} {:?}", program, self.args);

        let mut command = Command::new(&program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        for key in &self.env_remove {
            command.env_remove(key);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => return ToolOutcome::Failed(format!("failed to spawn: {}", e)),
        };

        match child.wait_timeout(self.timeout) {
            Ok(Some(status)) if status.success() => ToolOutcome::Completed,
            Ok(Some(status)) => ToolOutcome::Failed(format!(
                "exit code {}",
                status.code().unwrap_or(-1)
            )),
            Ok(None) => {
                if let Err(e) = child.kill() {
                    warn!("Failed to kill {}: {}", self.program, e);
                }
                let _ = child.wait();
                ToolOutcome::TimedOut(self.timeout)
            }
            Err(e) => ToolOutcome::Failed(e.to_string()),
        }
    }
}

/// Find a program: a path containing `/` is used as is, otherwise
/// `preferred_dir` is searched before `PATH`.
pub fn locate(program: &str, preferred_dir: Option<&Path>) -> Option<PathBuf> {
    if program.contains('/') {
        let path = PathBuf::from(program);
        return path.is_file().then_some(path);
    }
    if let Some(dir) = preferred_dir {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    which::which(program).ok()
}
