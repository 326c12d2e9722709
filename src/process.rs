//! Structured subprocess invocation
//!
//! Every external tool (git, docker, sops) is invoked through [`CommandRunner`]
//! with an argument vector — never a shell string — so paths and branch names
//! cannot be reinterpreted by a shell.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::PatrolResult;

/// Description of a single subprocess invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: None,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

/// Captured result of a finished subprocess
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Exit code and trimmed stderr, for error messages.
    pub fn detail(&self) -> String {
        let stderr = self.stderr.trim();
        match self.code {
            Some(code) if stderr.is_empty() => format!("exit code {code}"),
            Some(code) => format!("exit code {code}: {stderr}"),
            None => format!("terminated by signal: {stderr}"),
        }
    }
}

/// Abstract subprocess seam, mockable in tests
pub trait CommandRunner {
    /// Run to completion, capturing output. A non-zero exit is reported in
    /// the returned [`CommandOutput`], not as an `Err`; only spawn failures
    /// (missing binary, IO trouble) produce an error.
    fn run(&self, inv: &Invocation) -> PatrolResult<CommandOutput>;
}

/// Runner backed by `std::process::Command`
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, inv: &Invocation) -> PatrolResult<CommandOutput> {
        debug!(program = %inv.program, args = ?inv.args, cwd = ?inv.cwd, "running command");

        let mut cmd = Command::new(&inv.program);
        cmd.args(&inv.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &inv.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output()?;
        let result = CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success {
            warn!(
                program = %inv.program,
                args = ?inv.args,
                code = ?result.code,
                stderr = %result.stderr.trim(),
                "command failed"
            );
        }

        Ok(result)
    }
}

/// Scripted runner for tests
///
/// Records every invocation and replays canned outputs keyed by program name.
/// Uses `Arc<Mutex<>>` internally so it can be cloned and shared.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MockRunner {
    pub calls: std::sync::Arc<std::sync::Mutex<Vec<Invocation>>>,
    responses: std::sync::Arc<std::sync::Mutex<std::collections::HashMap<String, CommandOutput>>>,
}

#[cfg(test)]
impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every invocation of `program` yields `stdout` with a zero exit.
    pub fn respond(&self, program: &str, stdout: &str) {
        self.responses.lock().unwrap().insert(
            program.to_string(),
            CommandOutput {
                success: true,
                code: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
    }

    /// Every invocation of `program` fails with the given stderr.
    pub fn fail(&self, program: &str, stderr: &str) {
        self.responses.lock().unwrap().insert(
            program.to_string(),
            CommandOutput {
                success: false,
                code: Some(1),
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        );
    }

    pub fn recorded(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl CommandRunner for MockRunner {
    fn run(&self, inv: &Invocation) -> PatrolResult<CommandOutput> {
        self.calls.lock().unwrap().push(inv.clone());
        let responses = self.responses.lock().unwrap();
        Ok(responses.get(&inv.program).cloned().unwrap_or(CommandOutput {
            success: true,
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        }))
    }
}
