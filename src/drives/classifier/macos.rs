use super::{DeviceClassifier, DeviceRow};
use crate::drives::partition::whole_device_path;
use crate::exec::SharedRunner;
use crate::{BusType, Classification, DeviceId, WipeResult};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref LIST_HEADER: Regex =
        Regex::new(r"^(/dev/disk\d+)\s+\(([^)]*)\):").expect("diskutil header regex");
    static ref SLICE_ID: Regex = Regex::new(r"^disk\d+s\d+$").expect("slice id regex");
    static ref INDEXED_ROW: Regex = Regex::new(r"^\s*\d+:").expect("indexed row regex");
    static ref BYTE_COUNT: Regex = Regex::new(r"\((\d+) Bytes\)").expect("byte count regex");
    // "Physical Store disk4s2", or "Physical Stores disk0s2, disk3s2" for a Fusion container
    static ref PHYSICAL_STORE: Regex =
        Regex::new(r"^\s*Physical Stores?\s+(.+)$").expect("physical store regex");
}

/// A disk section of `diskutil list`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ListedDisk {
    pub node: String,
    pub attributes: Vec<String>,
    pub partitions: Vec<String>,
    /// Slices backing a synthesized APFS container
    pub physical_stores: Vec<String>,
}

impl ListedDisk {
    fn has(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
    }

    pub fn classification(&self) -> Classification {
        if self.has("external") && self.has("physical") {
            Classification::RemovableExternal
        } else {
            Classification::Internal
        }
    }

    pub fn is_disk_image(&self) -> bool {
        self.has("disk image")
    }
}

pub(crate) fn parse_diskutil_list(output: &str) -> Vec<ListedDisk> {
    let mut disks: Vec<ListedDisk> = Vec::new();

    for line in output.lines() {
        if let Some(caps) = LIST_HEADER.captures(line) {
            disks.push(ListedDisk {
                node: caps[1].to_string(),
                attributes: caps[2]
                    .split(',')
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect(),
                partitions: Vec::new(),
                physical_stores: Vec::new(),
            });
            continue;
        }

        let Some(current) = disks.last_mut() else {
            continue;
        };
        if let Some(caps) = PHYSICAL_STORE.captures(line) {
            current.physical_stores.extend(
                caps[1]
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|id| SLICE_ID.is_match(id))
                    .map(|id| format!("/dev/{}", id)),
            );
            continue;
        }
        if !INDEXED_ROW.is_match(line) {
            continue;
        }
        if let Some(identifier) = line.split_whitespace().last() {
            if SLICE_ID.is_match(identifier) {
                current.partitions.push(format!("/dev/{}", identifier));
            }
        }
    }

    disks
}

/// Synthesized container node to the listed physical disk holding its first store.
///
/// APFS volumes mount as slices of the container (`disk5s1`), never of the physical
/// disk (`disk4`), so both enumeration and mount lookup go through this map.
pub(crate) fn container_hosts(disks: &[ListedDisk]) -> HashMap<String, String> {
    disks
        .iter()
        .filter(|disk| disk.has("synthesized"))
        .filter_map(|disk| {
            let store = disk.physical_stores.first()?;
            let host = whole_device_path(store);
            disks
                .iter()
                .any(|listed| listed.node == host)
                .then(|| (disk.node.clone(), host.to_string()))
        })
        .collect()
}

/// Extract field from `diskutil info` output
pub(crate) fn extract_field(output: &str, field_name: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(field_name))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Size, bus, read-only flag and model from `diskutil info /dev/diskN`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DiskInfo {
    pub size: u64,
    pub bus: BusType,
    pub read_only: bool,
    pub model: Option<String>,
}

pub(crate) fn parse_diskutil_info(output: &str) -> DiskInfo {
    let size = extract_field(output, "Disk Size:")
        .and_then(|value| {
            BYTE_COUNT
                .captures(&value)
                .and_then(|caps| caps[1].parse().ok())
        })
        .unwrap_or(0);

    let bus = extract_field(output, "Protocol:")
        .map(|p| BusType::from_label(&p))
        .unwrap_or(BusType::Unknown);

    // Field name differs between macOS releases
    let read_only = extract_field(output, "Media Read-Only:")
        .or_else(|| extract_field(output, "Read-Only Media:"))
        .map(|v| v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false);

    let model = extract_field(output, "Device / Media Name:");

    DiskInfo {
        size,
        bus,
        read_only,
        model,
    }
}

/// Whole disks backing the root volume, from `diskutil info /`
pub(crate) fn system_disks(root_info: &str) -> Vec<String> {
    ["Part of Whole:", "APFS Physical Store:"]
        .iter()
        .filter_map(|field| extract_field(root_info, field))
        .map(|identifier| {
            let node = if identifier.starts_with("/dev/") {
                identifier
            } else {
                format!("/dev/{}", identifier)
            };
            whole_device_path(&node).to_string()
        })
        .collect()
}

/// Classifies disks by diskutil's external/physical enclosure attributes
pub struct MacClassifier {
    runner: SharedRunner,
}

impl MacClassifier {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }

    fn disk_info(&self, node: &str) -> WipeResult<DiskInfo> {
        let output = self
            .runner
            .run("diskutil", &["info", node])?
            .into_result("diskutil info")?;
        Ok(parse_diskutil_info(&output.stdout))
    }
}

impl DeviceClassifier for MacClassifier {
    fn platform_name(&self) -> &'static str {
        "macos"
    }

    fn discover(&self) -> WipeResult<Vec<DeviceRow>> {
        let listing = self
            .runner
            .run("diskutil", &["list"])?
            .into_result("diskutil list")?;
        let disks = parse_diskutil_list(&listing.stdout);

        let root_info = self.runner.run("diskutil", &["info", "/"])?;
        let system = if root_info.success {
            system_disks(&root_info.stdout)
        } else {
            tracing::warn!(detail = %root_info.failure_detail(), "Could not resolve the boot disk");
            Vec::new()
        };

        let hosts = container_hosts(&disks);
        let mut containers = Vec::new();
        let mut rows = Vec::new();
        for disk in disks {
            if let Some(host) = hosts.get(&disk.node) {
                containers.push((host.clone(), disk));
                continue;
            }

            let mut row = DeviceRow::disk(DeviceId::path(disk.node.clone()), disk.classification());
            row.system = system.contains(&disk.node);

            // Only external candidates need the extra round trip
            if row.classification == Classification::RemovableExternal {
                let info = self.disk_info(&disk.node)?;
                row.size = info.size;
                row.bus = info.bus;
                row.read_only = info.read_only;
                row.model = info.model;
            } else if disk.is_disk_image() {
                row.bus = BusType::Virtual;
            }

            for partition in &disk.partitions {
                let mut part = row.clone();
                part.node = DeviceId::path(partition.clone());
                part.parent = Some(row.node.clone());
                rows.push(part);
            }
            rows.push(row);
        }

        // Container volumes count as partitions of the physical disk
        for (host, container) in containers {
            let host_id = DeviceId::path(host);
            let Some(host_row) = rows
                .iter()
                .find(|row| row.node == host_id && row.parent.is_none())
                .cloned()
            else {
                continue;
            };
            for volume in &container.partitions {
                let mut part = host_row.clone();
                part.node = DeviceId::path(volume.clone());
                part.parent = Some(host_id.clone());
                part.system |= system.contains(&container.node);
                rows.push(part);
            }
        }

        Ok(rows)
    }
}
