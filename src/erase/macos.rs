use super::{EraseBackend, PartitionRef};
use crate::drives::classifier::macos::parse_diskutil_list;
use crate::drives::partition::partition_number;
use crate::exec::SharedRunner;
use crate::{Device, WipeError, WipeResult};

// diskutil secureErase levels
const SECURE_ERASE_ZERO: &str = "0";
const SECURE_ERASE_RANDOM: &str = "1";

/// Every step goes through diskutil, so a broken diskutil fails signature clear and
/// overwrite alike
pub struct MacEraser {
    runner: SharedRunner,
}

impl MacEraser {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }

    fn secure_erase(&self, level: &str, node: &str) -> WipeResult<bool> {
        self.runner
            .run_attached("diskutil", &["secureErase", level, node])
    }
}

impl EraseBackend for MacEraser {
    fn clear_signatures(&self, device: &Device) -> WipeResult<()> {
        let node = device.id.to_string();
        let output = self.runner.run("diskutil", &["zeroDisk", "short", &node])?;
        if !output.success {
            return Err(WipeError::SignatureClearFailed(output.failure_detail()));
        }
        Ok(())
    }

    fn overwrite(&self, device: &Device, random_passes: u32) -> WipeResult<()> {
        let node = device.id.to_string();
        for pass in 1..=random_passes {
            tracing::info!(device = %device.id, pass, total = random_passes, "Random pass");
            if !self.secure_erase(SECURE_ERASE_RANDOM, &node)? {
                return Err(WipeError::OverwriteFailed(format!(
                    "diskutil secureErase {} failed on pass {} of {}",
                    SECURE_ERASE_RANDOM, pass, random_passes
                )));
            }
        }

        if !self.secure_erase(SECURE_ERASE_ZERO, &node)? {
            return Err(WipeError::OverwriteFailed(format!(
                "diskutil secureErase {} failed on the zero pass",
                SECURE_ERASE_ZERO
            )));
        }
        Ok(())
    }

    fn partitions(&self, device: &Device) -> WipeResult<Vec<PartitionRef>> {
        let node = device.id.to_string();
        let output = self
            .runner
            .run("diskutil", &["list", &node])?
            .into_result("diskutil list")?;

        Ok(parse_diskutil_list(&output.stdout)
            .into_iter()
            .filter(|disk| disk.node == node)
            .flat_map(|disk| disk.partitions)
            .filter_map(|partition| {
                let number = partition_number(&partition)?;
                Some(PartitionRef {
                    node: partition,
                    number,
                })
            })
            .collect())
    }

    fn remove_partition(&self, _device: &Device, partition: &PartitionRef) -> WipeResult<()> {
        let output = self
            .runner
            .run("diskutil", &["eraseVolume", "free", "none", &partition.node])?;
        if !output.success {
            return Err(WipeError::PartitionRemovalFailed {
                partition: partition.node.clone(),
                reason: output.failure_detail(),
            });
        }
        Ok(())
    }

    fn clear_partition_table(&self, device: &Device) -> WipeResult<()> {
        let node = device.id.to_string();
        let output = self
            .runner
            .run("diskutil", &["eraseDisk", "free", "EMPTY", "GPT", &node])?;
        if !output.success {
            return Err(WipeError::TableClearFailed(output.failure_detail()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedRunner;
    use crate::exec::CommandOutput;
    use crate::{BusType, Classification, DeviceId};
    use std::sync::Arc;

    fn disk4() -> Device {
        Device {
            id: DeviceId::path("/dev/disk4"),
            size: 0,
            bus: BusType::Usb,
            classification: Classification::RemovableExternal,
            read_only: false,
            system: false,
            model: None,
            mounts: Vec::new(),
        }
    }

    #[test]
    fn test_overwrite_random_passes_then_zero() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond_attached("diskutil secureErase 1 /dev/disk4", true)
                .respond_attached("diskutil secureErase 0 /dev/disk4", true),
        );
        MacEraser::new(runner.clone()).overwrite(&disk4(), 2).unwrap();
        assert_eq!(
            runner.calls(),
            vec![
                "diskutil secureErase 1 /dev/disk4",
                "diskutil secureErase 1 /dev/disk4",
                "diskutil secureErase 0 /dev/disk4",
            ]
        );
    }

    #[test]
    fn test_overwrite_stops_at_failed_pass() {
        let runner = Arc::new(
            ScriptedRunner::new().respond_attached("diskutil secureErase 1 /dev/disk4", false),
        );
        let err = MacEraser::new(runner.clone()).overwrite(&disk4(), 3).unwrap_err();
        assert!(err.to_string().contains("pass 1 of 3"));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_clear_signatures_zero_disk_short() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("diskutil zeroDisk short /dev/disk4", CommandOutput::success("")),
        );
        MacEraser::new(runner).clear_signatures(&disk4()).unwrap();
    }

    #[test]
    fn test_partitions_from_diskutil_list() {
        let listing = "\
/dev/disk4 (external, physical):
   #:                       TYPE NAME                    SIZE       IDENTIFIER
   0:      GUID_partition_scheme                        *32.0 GB    disk4
   1:                        EFI EFI                     209.7 MB   disk4s1
   2:       Microsoft Basic Data UNTITLED                31.8 GB    disk4s2
";
        let runner = ScriptedRunner::new()
            .respond("diskutil list /dev/disk4", CommandOutput::success(listing));
        let partitions = MacEraser::new(Arc::new(runner)).partitions(&disk4()).unwrap();
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[1].node, "/dev/disk4s2");
        assert_eq!(partitions[1].number, 2);
    }

    #[test]
    fn test_erase_disk_rewrites_table() {
        let runner = Arc::new(ScriptedRunner::new().respond(
            "diskutil eraseDisk free EMPTY GPT /dev/disk4",
            CommandOutput::success(""),
        ));
        MacEraser::new(runner.clone()).clear_partition_table(&disk4()).unwrap();
        assert_eq!(runner.calls().len(), 1);
    }
}
