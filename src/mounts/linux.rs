use super::{MountEntry, MountManager};
use crate::drives::classifier::linux::query_lsblk;
use crate::drives::partition::partition_number;
use crate::exec::SharedRunner;
use crate::{Device, Mount, MountKind, WipeError, WipeResult};

const SWAP_MOUNT_POINT: &str = "[SWAP]";

/// Mount table from `lsblk` scoped to one device, unmount via `umount`/`swapoff`
pub struct LinuxMounts {
    runner: SharedRunner,
}

impl LinuxMounts {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }
}

impl MountManager for LinuxMounts {
    fn mount_table(&self, device: &Device) -> WipeResult<Vec<MountEntry>> {
        let node = device.id.to_string();
        let rows = query_lsblk(
            self.runner.as_ref(),
            &["-J", "-l", "-p"],
            "NAME,PKNAME,TYPE",
            Some(&node),
        )?;

        // Scoped to the device, so every row (partitions, crypt and lvm children) is its own.
        // A row mounted in several places yields one entry per mount point.
        let mut entries = Vec::new();
        for row in rows {
            for mount_point in row.mount_points() {
                let kind = if mount_point == SWAP_MOUNT_POINT {
                    MountKind::Swap
                } else {
                    MountKind::Filesystem
                };
                entries.push(MountEntry {
                    source: row.name.clone(),
                    parent: Some(device.id.clone()),
                    mount_point,
                    kind,
                    partition: partition_number(&row.name),
                });
            }
        }
        Ok(entries)
    }

    fn unmount(&self, mount: &Mount) -> WipeResult<()> {
        let output = match mount.kind {
            MountKind::Swap => self.runner.run("swapoff", &[&mount.source])?,
            _ => self.runner.run("umount", &[&mount.mount_point])?,
        };

        if output.success {
            tracing::info!(device = %mount.device, mount_point = %mount.mount_point, "Unmounted");
            Ok(())
        } else {
            Err(WipeError::UnmountFailed {
                mount: mount.mount_point.clone(),
                reason: output.failure_detail(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedRunner;
    use crate::mounts::{resolve_mounts, UnmountCoordinator, UnmountState};
    use crate::exec::CommandOutput;
    use crate::{BusType, Classification, DeviceId};
    use std::sync::Arc;

    const SCOPED_LSBLK: &str = r#"{
   "blockdevices": [
      {"name":"/dev/sdb", "pkname":null, "type":"disk", "mountpoint":null},
      {"name":"/dev/sdb1", "pkname":"/dev/sdb", "type":"part", "mountpoint":"/media/user/USB"},
      {"name":"/dev/sdb2", "pkname":"/dev/sdb", "type":"part", "mountpoint":"[SWAP]"},
      {"name":"/dev/sdb3", "pkname":"/dev/sdb", "type":"part", "mountpoint":null},
      {"name":"/dev/mapper/luks-data", "pkname":"/dev/sdb3", "type":"crypt", "mountpoint":"/media/user/data"}
   ]
}"#;

    fn sdb() -> Device {
        Device {
            id: DeviceId::path("/dev/sdb"),
            size: 0,
            bus: BusType::Usb,
            classification: Classification::RemovableExternal,
            read_only: false,
            system: false,
            model: None,
            mounts: Vec::new(),
        }
    }

    fn mount(source: &str, mount_point: &str, kind: MountKind) -> Mount {
        Mount {
            device: DeviceId::path("/dev/sdb"),
            source: source.to_string(),
            mount_point: mount_point.to_string(),
            kind,
            partition: None,
        }
    }

    const SCOPED_LSBLK_MULTI: &str = r#"{
   "blockdevices": [
      {"name":"/dev/sdb", "pkname":null, "type":"disk", "mountpoints":[null]},
      {"name":"/dev/sdb1", "pkname":"/dev/sdb", "type":"part", "mountpoints":["/media/user/USB", "/mnt/x"]}
   ]
}"#;

    #[test]
    fn test_mount_table_includes_swap_and_stacked_children() {
        let runner = ScriptedRunner::new()
            .respond(
                "lsblk -J -l -p -o NAME,PKNAME,TYPE,MOUNTPOINTS /dev/sdb",
                CommandOutput::failure(1, "lsblk: unknown column: MOUNTPOINTS"),
            )
            .respond(
                "lsblk -J -l -p -o NAME,PKNAME,TYPE,MOUNTPOINT /dev/sdb",
                CommandOutput::success(SCOPED_LSBLK),
            );
        let entries = LinuxMounts::new(Arc::new(runner)).mount_table(&sdb()).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].partition, Some(1));
        assert_eq!(entries[1].kind, MountKind::Swap);
        assert_eq!(entries[2].source, "/dev/mapper/luks-data");
        assert!(entries
            .iter()
            .all(|e| e.parent == Some(DeviceId::path("/dev/sdb"))));
    }

    #[test]
    fn test_partition_mounted_twice_is_unmounted_twice() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond(
                    "lsblk -J -l -p -o NAME,PKNAME,TYPE,MOUNTPOINTS /dev/sdb",
                    CommandOutput::success(SCOPED_LSBLK_MULTI),
                )
                .respond("umount /media/user/USB", CommandOutput::success(""))
                .respond("umount /mnt/x", CommandOutput::success("")),
        );
        let manager = LinuxMounts::new(runner.clone());

        let mounts = resolve_mounts(&manager, &sdb()).unwrap();
        assert_eq!(mounts.len(), 2);
        assert!(mounts.iter().all(|m| m.source == "/dev/sdb1"));

        let state = UnmountCoordinator::new(&manager).unmount_all(&mounts, |_, _, _| {});
        assert_eq!(state, UnmountState::Unmounted);
        assert_eq!(
            runner.calls(),
            vec![
                "lsblk -J -l -p -o NAME,PKNAME,TYPE,MOUNTPOINTS /dev/sdb",
                "umount /media/user/USB",
                "umount /mnt/x",
            ]
        );
    }

    #[test]
    fn test_unmount_filesystem_uses_mount_point() {
        let runner = Arc::new(
            ScriptedRunner::new().respond("umount /media/user/USB", CommandOutput::success("")),
        );
        LinuxMounts::new(runner.clone())
            .unmount(&mount("/dev/sdb1", "/media/user/USB", MountKind::Filesystem))
            .unwrap();
        assert_eq!(runner.calls(), vec!["umount /media/user/USB"]);
    }

    #[test]
    fn test_unmount_swap_uses_swapoff() {
        let runner = Arc::new(
            ScriptedRunner::new().respond("swapoff /dev/sdb2", CommandOutput::success("")),
        );
        LinuxMounts::new(runner.clone())
            .unmount(&mount("/dev/sdb2", "[SWAP]", MountKind::Swap))
            .unwrap();
        assert_eq!(runner.calls(), vec!["swapoff /dev/sdb2"]);
    }

    #[test]
    fn test_unmount_busy_target_fails() {
        let runner = ScriptedRunner::new().respond(
            "umount /media/user/USB",
            CommandOutput::failure(32, "umount: /media/user/USB: target is busy."),
        );
        let err = LinuxMounts::new(Arc::new(runner))
            .unmount(&mount("/dev/sdb1", "/media/user/USB", MountKind::Filesystem))
            .unwrap_err();
        match err {
            WipeError::UnmountFailed { mount, reason } => {
                assert_eq!(mount, "/media/user/USB");
                assert!(reason.contains("target is busy"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
