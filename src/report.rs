// Run reports
//
// A DeviceReport per processed device, accumulated into a RunSummary that is
// printed at the end of the run and optionally written as JSON.

use crate::erase::ErasePolicy;
use crate::{DeviceId, WipeOutcome, WipeResult, EXIT_OK, EXIT_RUN_ABORTED};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReport {
    pub device: DeviceId,
    #[serde(flatten)]
    pub outcome: WipeOutcome,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub elapsed_ms: u64,
}

impl DeviceReport {
    pub fn new(device: DeviceId, outcome: WipeOutcome, warnings: Vec<String>, elapsed: Duration) -> Self {
        Self {
            device,
            outcome,
            warnings,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    /// Human-readable elapsed time, rounded to whole seconds
    pub fn elapsed_display(&self) -> String {
        humantime::format_duration(Duration::from_secs(self.elapsed().as_secs())).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub session_id: String,
    pub platform: String,
    pub policy: ErasePolicy,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub devices: Vec<DeviceReport>,
    /// Set when a run-fatal failure stopped the run early
    pub aborted: Option<String>,
}

impl RunSummary {
    pub fn start(platform: &str, policy: ErasePolicy) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            platform: platform.to_string(),
            policy,
            started_at: Utc::now(),
            finished_at: None,
            devices: Vec::new(),
            aborted: None,
        }
    }

    pub fn record(&mut self, report: DeviceReport) {
        self.devices.push(report);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn wiped(&self) -> usize {
        self.devices.iter().filter(|r| r.outcome.is_wiped()).count()
    }

    pub fn skipped(&self) -> usize {
        self.devices.iter().filter(|r| r.outcome.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.devices.iter().filter(|r| r.outcome.is_failed()).count()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Summary: {} wiped, {} skipped, {} failed",
            self.wiped(),
            self.skipped(),
            self.failed()
        )
    }

    pub fn exit_code(&self) -> u8 {
        if self.aborted.is_some() {
            EXIT_RUN_ABORTED
        } else {
            EXIT_OK
        }
    }

    pub fn write_json(&self, path: &Path) -> WipeResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| crate::WipeError::parse("run report", e))?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Run report written");
        Ok(())
    }
}
