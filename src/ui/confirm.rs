use super::status;
use crate::Device;
use colored::Colorize;
use std::io::{self, BufRead, Stdin, StdinLock, Stdout, Write};

/// Exact, case-sensitive answer that approves an erase
pub const CONFIRMATION_TOKEN: &str = "YES";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Skip,
}

/// Only the line terminator is removed; surrounding spaces or other casing skip the device
pub fn interpret_answer(line: &str) -> Decision {
    let answer = line.strip_suffix('\n').unwrap_or(line);
    let answer = answer.strip_suffix('\r').unwrap_or(answer);
    if answer == CONFIRMATION_TOKEN {
        Decision::Proceed
    } else {
        Decision::Skip
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait ConfirmationGate {
    /// Ask the operator about one device. Blocks until an answer or end of input.
    fn confirm(&mut self, device: &Device) -> Decision;
}

/// Prompts on a writer and reads the answer from a line reader
pub struct PromptGate<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptGate<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn prompt(&mut self, device: &Device) -> io::Result<()> {
        writeln!(self.output)?;
        status::device_identity(&mut self.output, device)?;
        write!(
            self.output,
            "{} Type '{}' to erase ALL data on {}: ",
            "WARNING:".red().bold(),
            CONFIRMATION_TOKEN,
            device.id
        )?;
        self.output.flush()
    }
}

impl PromptGate<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        Self::new(stdin.lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConfirmationGate for PromptGate<R, W> {
    fn confirm(&mut self, device: &Device) -> Decision {
        if let Err(e) = self.prompt(device) {
            tracing::warn!(device = %device.id, error = %e, "Could not show confirmation prompt");
            return Decision::Skip;
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => {
                tracing::debug!(device = %device.id, "End of input at confirmation prompt");
                Decision::Skip
            }
            Ok(_) => interpret_answer(&line),
            Err(e) => {
                tracing::warn!(device = %device.id, error = %e, "Could not read confirmation");
                Decision::Skip
            }
        }
    }
}
