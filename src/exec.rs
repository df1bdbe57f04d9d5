// External command execution
//
// Every OS tool (lsblk, diskutil, PowerShell, umount, shred, ...) is reached through
// the CommandRunner port so platform adapters can be driven by scripted output in tests.

use crate::{WipeError, WipeResult};
use std::io;
use std::process::{Command, Stdio};
use std::sync::Arc;

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: &str) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: &str) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    /// Short human-readable reason for a failed command
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.lines().last().unwrap_or(stderr).to_string();
        }
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    }

    /// Turn a non-zero exit into `WipeError::CommandFailed`
    pub fn into_result(self, command: &str) -> WipeResult<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(WipeError::CommandFailed {
                command: command.to_string(),
                detail: self.failure_detail(),
            })
        }
    }
}

pub trait CommandRunner: Send + Sync {
    /// Run to completion, capturing stdout and stderr
    fn run(&self, program: &str, args: &[&str]) -> WipeResult<CommandOutput>;

    /// Run with the terminal attached so the tool can print its own progress.
    /// Returns whether the command exited successfully.
    fn run_attached(&self, program: &str, args: &[&str]) -> WipeResult<bool> {
        self.run(program, args).map(|output| output.success)
    }
}

pub type SharedRunner = Arc<dyn CommandRunner>;

/// Runs real processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> WipeResult<CommandOutput> {
        tracing::debug!(command = %command_line(program, args), "Running");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| spawn_error(program, e))?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_attached(&self, program: &str, args: &[&str]) -> WipeResult<bool> {
        tracing::debug!(command = %command_line(program, args), "Running attached");

        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| spawn_error(program, e))?;

        Ok(status.success())
    }
}

fn spawn_error(program: &str, err: io::Error) -> WipeError {
    if err.kind() == io::ErrorKind::NotFound {
        WipeError::ToolMissing(program.to_string())
    } else {
        WipeError::IoError(err)
    }
}

pub fn command_line(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Run a PowerShell script non-interactively
pub fn powershell(runner: &dyn CommandRunner, script: &str) -> WipeResult<CommandOutput> {
    runner.run(
        "powershell",
        &["-NoProfile", "-NonInteractive", "-Command", script],
    )
}
