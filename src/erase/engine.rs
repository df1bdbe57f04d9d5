use super::{EraseBackend, ErasePolicy, EraseStep, FailureScope};
use crate::Device;

/// Successful erase; soft failures are carried as warnings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EraseReport {
    pub warnings: Vec<String>,
}

/// Erase stopped at `step`
#[derive(Debug, Clone, PartialEq)]
pub struct EraseFailure {
    pub step: EraseStep,
    pub reason: String,
    /// The failure ends the whole run, not just this device
    pub run_fatal: bool,
    pub warnings: Vec<String>,
}

pub struct EraseEngine {
    backend: Box<dyn EraseBackend>,
    policy: ErasePolicy,
}

impl EraseEngine {
    pub fn new(backend: Box<dyn EraseBackend>, policy: ErasePolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &ErasePolicy {
        &self.policy
    }

    /// Erase one device. Callers must have unmounted it first.
    pub fn erase(&self, device: &Device) -> Result<EraseReport, EraseFailure> {
        tracing::info!(device = %device.id, policy = %self.policy, "Starting erase");
        match self.policy {
            ErasePolicy::SignatureOverwrite {
                random_passes,
                failure_scope,
            } => self.signature_overwrite(device, random_passes, failure_scope),
            ErasePolicy::PartitionDestroy => self.partition_destroy(device),
        }
    }

    fn signature_overwrite(
        &self,
        device: &Device,
        random_passes: u32,
        failure_scope: FailureScope,
    ) -> Result<EraseReport, EraseFailure> {
        let mut warnings = Vec::new();

        // A failed signature clear still leaves the overwrite to do the real work
        if let Err(e) = self.backend.clear_signatures(device) {
            tracing::warn!(device = %device.id, error = %e, "Signature clear failed; continuing");
            warnings.push(format!("{}: {}", EraseStep::SignatureClear, e));
        }

        if let Err(e) = self.backend.overwrite(device, random_passes) {
            tracing::error!(device = %device.id, error = %e, "Overwrite failed");
            return Err(EraseFailure {
                step: EraseStep::Overwrite,
                reason: e.to_string(),
                run_fatal: failure_scope == FailureScope::Run,
                warnings,
            });
        }

        tracing::info!(device = %device.id, warnings = warnings.len(), "Overwrite complete");
        Ok(EraseReport { warnings })
    }

    fn partition_destroy(&self, device: &Device) -> Result<EraseReport, EraseFailure> {
        let mut warnings = Vec::new();

        match self.backend.partitions(device) {
            Ok(partitions) => {
                for partition in &partitions {
                    if let Err(e) = self.backend.remove_partition(device, partition) {
                        tracing::warn!(
                            device = %device.id,
                            partition = %partition.node,
                            error = %e,
                            "Partition removal failed; continuing"
                        );
                        warnings.push(format!("{}: {}", EraseStep::PartitionRemoval, e));
                    }
                }
            }
            Err(e) => {
                tracing::warn!(device = %device.id, error = %e, "Could not list partitions");
                warnings.push(format!("partition listing: {}", e));
            }
        }

        if let Err(e) = self.backend.clear_partition_table(device) {
            tracing::error!(device = %device.id, error = %e, "Partition table clear failed");
            return Err(EraseFailure {
                step: EraseStep::TableClear,
                reason: e.to_string(),
                run_fatal: false,
                warnings,
            });
        }

        Ok(EraseReport { warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::super::{MockEraseBackend, PartitionRef};
    use super::*;
    use crate::{BusType, Classification, DeviceId, WipeError};
    use mockall::predicate::{always, eq};
    use mockall::Sequence;

    fn sdb() -> Device {
        Device {
            id: DeviceId::path("/dev/sdb"),
            size: 16_000_000_000,
            bus: BusType::Usb,
            classification: Classification::RemovableExternal,
            read_only: false,
            system: false,
            model: None,
            mounts: Vec::new(),
        }
    }

    fn overwrite_policy(scope: FailureScope) -> ErasePolicy {
        ErasePolicy::SignatureOverwrite {
            random_passes: 2,
            failure_scope: scope,
        }
    }

    fn partition(n: u32) -> PartitionRef {
        PartitionRef {
            node: format!("/dev/sdb{}", n),
            number: n,
        }
    }

    #[test]
    fn test_signature_clear_then_overwrite_in_order() {
        let mut backend = MockEraseBackend::new();
        let mut seq = Sequence::new();
        backend
            .expect_clear_signatures()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        backend
            .expect_overwrite()
            .with(always(), eq(2))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        backend.expect_clear_partition_table().never();

        let engine = EraseEngine::new(Box::new(backend), overwrite_policy(FailureScope::Device));
        let report = engine.erase(&sdb()).unwrap();
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_signature_clear_failure_is_warning() {
        let mut backend = MockEraseBackend::new();
        backend
            .expect_clear_signatures()
            .returning(|_| Err(WipeError::SignatureClearFailed("wipefs: probing failed".into())));
        backend.expect_overwrite().times(1).returning(|_, _| Ok(()));

        let engine = EraseEngine::new(Box::new(backend), overwrite_policy(FailureScope::Device));
        let report = engine.erase(&sdb()).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("signature clear"));
    }

    #[test]
    fn test_overwrite_failure_scope_device() {
        let mut backend = MockEraseBackend::new();
        backend.expect_clear_signatures().returning(|_| Ok(()));
        backend
            .expect_overwrite()
            .returning(|_, _| Err(WipeError::OverwriteFailed("shred: write error".into())));

        let engine = EraseEngine::new(Box::new(backend), overwrite_policy(FailureScope::Device));
        let failure = engine.erase(&sdb()).unwrap_err();
        assert_eq!(failure.step, EraseStep::Overwrite);
        assert!(!failure.run_fatal);
    }

    #[test]
    fn test_overwrite_failure_scope_run() {
        let mut backend = MockEraseBackend::new();
        backend.expect_clear_signatures().returning(|_| Ok(()));
        backend
            .expect_overwrite()
            .returning(|_, _| Err(WipeError::OverwriteFailed("secureErase failed".into())));

        let engine = EraseEngine::new(Box::new(backend), overwrite_policy(FailureScope::Run));
        assert!(engine.erase(&sdb()).unwrap_err().run_fatal);
    }

    #[test]
    fn test_partition_destroy_removal_failures_are_warnings() {
        let mut backend = MockEraseBackend::new();
        backend
            .expect_partitions()
            .returning(|_| Ok(vec![partition(1), partition(2)]));
        backend
            .expect_remove_partition()
            .withf(|_, p| p.number == 1)
            .times(1)
            .returning(|_, p| {
                Err(WipeError::PartitionRemovalFailed {
                    partition: p.node.clone(),
                    reason: "access denied".into(),
                })
            });
        backend
            .expect_remove_partition()
            .withf(|_, p| p.number == 2)
            .times(1)
            .returning(|_, _| Ok(()));
        backend.expect_clear_partition_table().times(1).returning(|_| Ok(()));
        backend.expect_overwrite().never();

        let engine = EraseEngine::new(Box::new(backend), ErasePolicy::PartitionDestroy);
        let report = engine.erase(&sdb()).unwrap();
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_partition_destroy_table_clear_failure() {
        let mut backend = MockEraseBackend::new();
        backend.expect_partitions().returning(|_| Ok(Vec::new()));
        backend
            .expect_clear_partition_table()
            .returning(|_| Err(WipeError::TableClearFailed("Clear-Disk failed".into())));

        let engine = EraseEngine::new(Box::new(backend), ErasePolicy::PartitionDestroy);
        let failure = engine.erase(&sdb()).unwrap_err();
        assert_eq!(failure.step, EraseStep::TableClear);
        assert!(!failure.run_fatal);
    }

    #[test]
    fn test_partition_listing_failure_still_clears_table() {
        let mut backend = MockEraseBackend::new();
        backend
            .expect_partitions()
            .returning(|_| Err(WipeError::CommandFailed {
                command: "Get-Partition".into(),
                detail: "exit code 1".into(),
            }));
        backend.expect_remove_partition().never();
        backend.expect_clear_partition_table().times(1).returning(|_| Ok(()));

        let engine = EraseEngine::new(Box::new(backend), ErasePolicy::PartitionDestroy);
        assert_eq!(engine.erase(&sdb()).unwrap().warnings.len(), 1);
    }

    #[test]
    fn test_policy_display() {
        assert_eq!(
            overwrite_policy(FailureScope::Device).to_string(),
            "signature-overwrite (2 random passes + zero pass)"
        );
        assert_eq!(ErasePolicy::PartitionDestroy.to_string(), "partition-destroy");
    }
}
