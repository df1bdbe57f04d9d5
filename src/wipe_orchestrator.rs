// Run Orchestrator - drives each device through confirm, unmount and erase
//
// Devices are processed strictly one at a time in enumeration order. Every
// per-device failure becomes a WipeOutcome in that device's report; only a
// run-fatal erase failure stops the remaining devices.

use crate::erase::EraseEngine;
use crate::mounts::{resolve_mounts, MountManager, UnmountCoordinator, UnmountState};
use crate::platform::Platform;
use crate::report::{DeviceReport, RunSummary};
use crate::ui::{status, ConfirmationGate, Decision};
use crate::{Device, WipeOutcome};
use std::io::{self, Write};
use std::time::Instant;

pub const NO_DEVICES_MESSAGE: &str = "No removable/external drives detected";

/// Whether the run goes on after a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunControl {
    Continue,
    Abort(String),
}

pub struct RunOrchestrator {
    platform: Platform,
    gate: Box<dyn ConfirmationGate>,
    mounts: Box<dyn MountManager>,
    engine: EraseEngine,
    out: Box<dyn Write>,
}

impl RunOrchestrator {
    pub fn new(
        platform: Platform,
        gate: Box<dyn ConfirmationGate>,
        mounts: Box<dyn MountManager>,
        engine: EraseEngine,
    ) -> Self {
        Self {
            platform,
            gate,
            mounts,
            engine,
            out: Box::new(io::stdout()),
        }
    }

    /// Send status lines somewhere other than stdout
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self
    }

    // Status output is best effort; a closed stdout must not interrupt an erase
    fn info(&mut self, message: &str) {
        let _ = status::info(&mut *self.out, message);
    }

    fn success(&mut self, message: &str) {
        let _ = status::success(&mut *self.out, message);
    }

    fn warning(&mut self, message: &str) {
        let _ = status::warning(&mut *self.out, message);
    }

    fn error(&mut self, message: &str) {
        let _ = status::error(&mut *self.out, message);
    }

    /// Take one device from eligibility check to a final outcome
    pub fn process_device(&mut self, device: &Device) -> (DeviceReport, RunControl) {
        let started = Instant::now();
        let (outcome, warnings, control) = self.pipeline(device);

        let report = DeviceReport::new(device.id.clone(), outcome, warnings, started.elapsed());
        tracing::info!(
            device = %device.id,
            outcome = %report.outcome,
            elapsed = %report.elapsed_display(),
            "Device processed"
        );
        (report, control)
    }

    fn pipeline(&mut self, device: &Device) -> (WipeOutcome, Vec<String>, RunControl) {
        if let Some(reason) = device.ineligibility() {
            self.warning(&format!("Refusing {}: {}", device.id, reason));
            return (
                WipeOutcome::Ineligible {
                    reason: reason.to_string(),
                },
                Vec::new(),
                RunControl::Continue,
            );
        }

        if self.gate.confirm(device) == Decision::Skip {
            self.info(&format!("Skipping {}", device.id));
            return (WipeOutcome::SkippedByUser, Vec::new(), RunControl::Continue);
        }

        // Mount state unknown means erasing is unsafe
        let mounts = match resolve_mounts(self.mounts.as_ref(), device) {
            Ok(mounts) => mounts,
            Err(e) => {
                self.error(&format!(
                    "Could not resolve mounts of {}: {}",
                    device.id, e
                ));
                return (
                    WipeOutcome::UnmountFailed {
                        mount: "mount table".to_string(),
                        reason: e.to_string(),
                    },
                    Vec::new(),
                    RunControl::Continue,
                );
            }
        };

        let out = &mut self.out;
        let mut coordinator = UnmountCoordinator::new(self.mounts.as_ref());
        let state = coordinator.unmount_all(&mounts, |mount, n, total| {
            let _ = status::info(
                &mut **out,
                &format!("Unmounting {} ({}/{})", mount.mount_point, n, total),
            );
        });

        if let UnmountState::Failed { mount, reason } = state {
            self.error(&format!(
                "Unmount of {} failed for {}: {}",
                mount.mount_point, device.id, reason
            ));
            return (
                WipeOutcome::UnmountFailed {
                    mount: mount.mount_point,
                    reason,
                },
                Vec::new(),
                RunControl::Continue,
            );
        }

        self.info(&format!(
            "Erasing {} with {}",
            device.id,
            self.engine.policy()
        ));
        match self.engine.erase(device) {
            Ok(report) => {
                for warning in &report.warnings {
                    self.warning(&format!("{}: {}", device.id, warning));
                }
                self.success(&format!("{} wiped", device.id));
                (WipeOutcome::Completed, report.warnings, RunControl::Continue)
            }
            Err(failure) => {
                self.error(&format!(
                    "Erase of {} failed during {}: {}",
                    device.id, failure.step, failure.reason
                ));
                let control = if failure.run_fatal {
                    RunControl::Abort(format!(
                        "{} failed on {}: {}",
                        failure.step, device.id, failure.reason
                    ))
                } else {
                    RunControl::Continue
                };
                (
                    WipeOutcome::EraseFailed {
                        step: failure.step,
                        reason: failure.reason,
                    },
                    failure.warnings,
                    control,
                )
            }
        }
    }

    /// Process every device in order and return the accumulated summary
    pub fn run(&mut self, devices: &[Device]) -> RunSummary {
        let mut summary = RunSummary::start(&self.platform.to_string(), *self.engine.policy());

        if devices.is_empty() {
            self.info(NO_DEVICES_MESSAGE);
            summary.finish();
            return summary;
        }

        for (index, device) in devices.iter().enumerate() {
            let (report, control) = self.process_device(device);
            summary.record(report);

            if let RunControl::Abort(reason) = control {
                let remaining = devices.len() - index - 1;
                tracing::warn!(remaining, "Run aborted; remaining devices not processed");
                self.error(&format!("Run aborted: {}", reason));
                summary.aborted = Some(reason);
                break;
            }
        }

        summary.finish();
        let line = summary.summary_line();
        self.info(&line);
        summary
    }
}
