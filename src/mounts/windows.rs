use super::{MountEntry, MountManager};
use crate::drives::classifier::json::{non_empty, parse_powershell_list};
use crate::exec::{powershell, SharedRunner};
use crate::{Device, DeviceId, Mount, MountKind, WipeError, WipeResult};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PartitionRecord {
    disk_number: u32,
    partition_number: u32,
    #[serde(default)]
    drive_letter: Option<String>,
}

fn partition_script(disk_number: u32) -> String {
    format!(
        "Get-Partition -DiskNumber {} -ErrorAction SilentlyContinue | \
         Where-Object {{ $_.DriveLetter -match '[A-Za-z]' }} | \
         Select-Object DiskNumber, PartitionNumber, \
         @{{Name='DriveLetter';Expression={{[string]$_.DriveLetter}}}} | \
         ConvertTo-Json -Compress",
        disk_number
    )
}

pub(crate) fn parse_partitions(stdout: &str) -> WipeResult<Vec<MountEntry>> {
    let records: Vec<PartitionRecord> = parse_powershell_list("Get-Partition output", stdout)?;
    Ok(records
        .into_iter()
        .filter_map(|record| {
            let letter = non_empty(record.drive_letter)?;
            Some(MountEntry {
                source: format!(
                    "disk {} partition {}",
                    record.disk_number, record.partition_number
                ),
                parent: Some(DeviceId::DiskNumber(record.disk_number)),
                mount_point: format!("{}:\\", letter),
                kind: MountKind::AccessPath,
                partition: Some(record.partition_number),
            })
        })
        .collect())
}

/// Drive-letter access paths from `Get-Partition`, removed with `Remove-PartitionAccessPath`
pub struct WindowsMounts {
    runner: SharedRunner,
}

impl WindowsMounts {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }
}

impl MountManager for WindowsMounts {
    fn mount_table(&self, device: &Device) -> WipeResult<Vec<MountEntry>> {
        let disk_number = device.id.disk_number().ok_or_else(|| {
            WipeError::Unsupported(format!("{} is not a Windows disk number", device.id))
        })?;
        let output = powershell(self.runner.as_ref(), &partition_script(disk_number))?
            .into_result("Get-Partition")?;
        parse_partitions(&output.stdout)
    }

    fn unmount(&self, mount: &Mount) -> WipeResult<()> {
        let (Some(disk_number), Some(partition)) = (mount.device.disk_number(), mount.partition)
        else {
            return Err(WipeError::UnmountFailed {
                mount: mount.mount_point.clone(),
                reason: "access path has no disk/partition number".to_string(),
            });
        };

        let script = format!(
            "Remove-PartitionAccessPath -DiskNumber {} -PartitionNumber {} -AccessPath '{}'",
            disk_number, partition, mount.mount_point
        );
        let output = powershell(self.runner.as_ref(), &script)?;
        if output.success {
            tracing::info!(device = %mount.device, access_path = %mount.mount_point, "Access path removed");
            Ok(())
        } else {
            Err(WipeError::UnmountFailed {
                mount: mount.mount_point.clone(),
                reason: output.failure_detail(),
            })
        }
    }
}
