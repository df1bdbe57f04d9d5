use super::{EraseBackend, PartitionRef};
use crate::drives::classifier::json::parse_powershell_list;
use crate::exec::{powershell, SharedRunner};
use crate::{Device, WipeError, WipeResult};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PartitionNumber {
    partition_number: u32,
}

/// Partition-destroy primitives over the Storage module cmdlets.
/// There is no signature-clear or overwrite primitive on this platform.
pub struct WindowsEraser {
    runner: SharedRunner,
}

impl WindowsEraser {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }

    fn disk_number(device: &Device) -> WipeResult<u32> {
        device.id.disk_number().ok_or_else(|| {
            WipeError::Unsupported(format!("{} is not a Windows disk number", device.id))
        })
    }
}

impl EraseBackend for WindowsEraser {
    fn clear_signatures(&self, _device: &Device) -> WipeResult<()> {
        Err(WipeError::Unsupported(
            "signature clear is not available on Windows; use the partition-destroy policy"
                .to_string(),
        ))
    }

    fn overwrite(&self, _device: &Device, _random_passes: u32) -> WipeResult<()> {
        Err(WipeError::Unsupported(
            "overwrite is not available on Windows; use the partition-destroy policy".to_string(),
        ))
    }

    fn partitions(&self, device: &Device) -> WipeResult<Vec<PartitionRef>> {
        let disk = Self::disk_number(device)?;
        let script = format!(
            "Get-Partition -DiskNumber {} -ErrorAction SilentlyContinue | \
             Select-Object PartitionNumber | ConvertTo-Json -Compress",
            disk
        );
        let output = powershell(self.runner.as_ref(), &script)?.into_result("Get-Partition")?;
        let records: Vec<PartitionNumber> =
            parse_powershell_list("Get-Partition output", &output.stdout)?;

        Ok(records
            .into_iter()
            .map(|record| PartitionRef {
                node: format!("disk {} partition {}", disk, record.partition_number),
                number: record.partition_number,
            })
            .collect())
    }

    fn remove_partition(&self, device: &Device, partition: &PartitionRef) -> WipeResult<()> {
        let disk = Self::disk_number(device)?;
        let script = format!(
            "Remove-Partition -DiskNumber {} -PartitionNumber {} -Confirm:$false",
            disk, partition.number
        );
        let output = powershell(self.runner.as_ref(), &script)?;
        if !output.success {
            return Err(WipeError::PartitionRemovalFailed {
                partition: partition.node.clone(),
                reason: output.failure_detail(),
            });
        }
        Ok(())
    }

    fn clear_partition_table(&self, device: &Device) -> WipeResult<()> {
        let disk = Self::disk_number(device)?;
        let script = format!(
            "Clear-Disk -Number {} -RemoveData -RemoveOEM -Confirm:$false",
            disk
        );
        let output = powershell(self.runner.as_ref(), &script)?;
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
    use crate::exec::{command_line, CommandOutput};
    use crate::{BusType, Classification, DeviceId};
    use std::sync::Arc;

    fn ps_line(script: &str) -> String {
        command_line(
            "powershell",
            &["-NoProfile", "-NonInteractive", "-Command", script],
        )
    }

    fn disk2() -> Device {
        Device {
            id: DeviceId::DiskNumber(2),
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
    fn test_overwrite_primitives_are_unsupported() {
        let eraser = WindowsEraser::new(Arc::new(ScriptedRunner::new()));
        assert!(matches!(
            eraser.clear_signatures(&disk2()),
            Err(WipeError::Unsupported(_))
        ));
        assert!(matches!(
            eraser.overwrite(&disk2(), 1),
            Err(WipeError::Unsupported(_))
        ));
    }

    #[test]
    fn test_partitions_single_object() {
        let script = "Get-Partition -DiskNumber 2 -ErrorAction SilentlyContinue | \
             Select-Object PartitionNumber | ConvertTo-Json -Compress";
        let runner = ScriptedRunner::new()
            .respond(&ps_line(script), CommandOutput::success(r#"{"PartitionNumber":1}"#));
        let partitions = WindowsEraser::new(Arc::new(runner)).partitions(&disk2()).unwrap();
        assert_eq!(
            partitions,
            vec![PartitionRef {
                node: "disk 2 partition 1".into(),
                number: 1
            }]
        );
    }

    #[test]
    fn test_clear_disk_failure() {
        let runner = ScriptedRunner::new().respond(
            &ps_line("Clear-Disk -Number 2 -RemoveData -RemoveOEM -Confirm:$false"),
            CommandOutput::failure(1, "Clear-Disk : Access to a CIM resource was not available"),
        );
        let err = WindowsEraser::new(Arc::new(runner))
            .clear_partition_table(&disk2())
            .unwrap_err();
        assert!(matches!(err, WipeError::TableClearFailed(_)));
    }

    #[test]
    fn test_remove_partition() {
        let runner = Arc::new(ScriptedRunner::new().respond(
            &ps_line("Remove-Partition -DiskNumber 2 -PartitionNumber 1 -Confirm:$false"),
            CommandOutput::success(""),
        ));
        WindowsEraser::new(runner.clone())
            .remove_partition(
                &disk2(),
                &PartitionRef {
                    node: "disk 2 partition 1".into(),
                    number: 1,
                },
            )
            .unwrap();
        assert_eq!(runner.calls().len(), 1);
    }
}
