use super::{MountEntry, MountManager};
use crate::drives::classifier::macos::{container_hosts, parse_diskutil_list};
use crate::drives::partition::{partition_number, whole_device_path};
use crate::exec::SharedRunner;
use crate::{Device, DeviceId, Mount, MountKind, WipeError, WipeResult};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    // /dev/disk4s1 on /Volumes/USB (msdos, local, nodev, nosuid, noowners)
    static ref MOUNT_LINE: Regex =
        Regex::new(r"^(/dev/\S+) on (.+) \(([^)]*)\)$").expect("mount line regex");
}

pub(crate) fn parse_mount_output(output: &str) -> Vec<MountEntry> {
    output
        .lines()
        .filter_map(|line| MOUNT_LINE.captures(line.trim_end()))
        .map(|caps| MountEntry {
            source: caps[1].to_string(),
            parent: None,
            mount_point: caps[2].to_string(),
            kind: MountKind::Filesystem,
            partition: partition_number(&caps[1]),
        })
        .collect()
}

/// Point volumes of synthesized APFS containers at the physical disk behind them
pub(crate) fn attribute_containers(
    entries: Vec<MountEntry>,
    hosts: &HashMap<String, String>,
) -> Vec<MountEntry> {
    entries
        .into_iter()
        .map(|mut entry| {
            if let Some(host) = hosts.get(whole_device_path(&entry.source)) {
                entry.parent = Some(DeviceId::path(host.clone()));
                entry.partition = None;
            }
            entry
        })
        .collect()
}

/// Mount table from `mount`, unmount via `diskutil unmount`
pub struct MacMounts {
    runner: SharedRunner,
}

impl MacMounts {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }
}

impl MountManager for MacMounts {
    fn mount_table(&self, _device: &Device) -> WipeResult<Vec<MountEntry>> {
        let listing = self
            .runner
            .run("diskutil", &["list"])?
            .into_result("diskutil list")?;
        let hosts = container_hosts(&parse_diskutil_list(&listing.stdout));

        let output = self.runner.run("mount", &[])?.into_result("mount")?;
        Ok(attribute_containers(
            parse_mount_output(&output.stdout),
            &hosts,
        ))
    }

    fn unmount(&self, mount: &Mount) -> WipeResult<()> {
        let output = self.runner.run("diskutil", &["unmount", &mount.source])?;
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
