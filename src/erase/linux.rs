use super::{EraseBackend, PartitionRef};
use crate::drives::classifier::linux::parse_lsblk;
use crate::drives::partition::partition_number;
use crate::exec::SharedRunner;
use crate::{Device, WipeError, WipeResult};

pub struct LinuxEraser {
    runner: SharedRunner,
}

impl LinuxEraser {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }

    fn node(device: &Device) -> String {
        device.id.to_string()
    }
}

impl EraseBackend for LinuxEraser {
    fn clear_signatures(&self, device: &Device) -> WipeResult<()> {
        let node = Self::node(device);
        let output = self.runner.run("wipefs", &["-a", "-f", &node])?;
        if !output.success {
            return Err(WipeError::SignatureClearFailed(output.failure_detail()));
        }
        Ok(())
    }

    fn overwrite(&self, device: &Device, random_passes: u32) -> WipeResult<()> {
        let node = Self::node(device);
        let passes = random_passes.to_string();
        // Attached so shred's own -v progress reaches the operator
        let ok = self
            .runner
            .run_attached("shred", &["-v", "-n", &passes, "-z", &node])?;
        if !ok {
            return Err(WipeError::OverwriteFailed(format!(
                "shred did not complete on {}",
                node
            )));
        }
        Ok(())
    }

    fn partitions(&self, device: &Device) -> WipeResult<Vec<PartitionRef>> {
        let node = Self::node(device);
        let output = self
            .runner
            .run("lsblk", &["-J", "-l", "-p", "-o", "NAME,PKNAME,TYPE", &node])?
            .into_result("lsblk")?;

        Ok(parse_lsblk(&output.stdout)?
            .into_iter()
            .filter(|row| row.kind.as_deref() == Some("part"))
            .filter(|row| row.pkname.as_deref() == Some(node.as_str()))
            .filter_map(|row| {
                let number = partition_number(&row.name)?;
                Some(PartitionRef {
                    node: row.name,
                    number,
                })
            })
            .collect())
    }

    fn remove_partition(&self, device: &Device, partition: &PartitionRef) -> WipeResult<()> {
        let node = Self::node(device);
        let number = partition.number.to_string();
        let output = self.runner.run("sfdisk", &["--delete", &node, &number])?;
        if !output.success {
            return Err(WipeError::PartitionRemovalFailed {
                partition: partition.node.clone(),
                reason: output.failure_detail(),
            });
        }
        Ok(())
    }

    fn clear_partition_table(&self, device: &Device) -> WipeResult<()> {
        let node = Self::node(device);
        let output = self.runner.run("sgdisk", &["--zap-all", &node])?;
        if !output.success {
            return Err(WipeError::TableClearFailed(output.failure_detail()));
        }
        Ok(())
    }
}
