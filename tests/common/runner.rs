/// Scripted command runner for integration tests
///
/// Responses are keyed by the full command line. Unscripted commands succeed with
/// empty output so a test only scripts what it asserts on; every call is recorded.
use std::collections::HashMap;
use std::sync::Mutex;
use usbwipe::exec::{command_line, CommandOutput, CommandRunner};
use usbwipe::WipeResult;

#[derive(Default)]
pub struct RecordingRunner {
    responses: Mutex<HashMap<String, CommandOutput>>,
    calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, line: &str, output: CommandOutput) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(line.to_string(), output);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[&str]) -> WipeResult<CommandOutput> {
        let line = command_line(program, args);
        self.calls.lock().unwrap().push(line.clone());
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&line)
            .cloned()
            .unwrap_or_else(|| CommandOutput::success("")))
    }
}
