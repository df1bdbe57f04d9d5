use super::classifier::{DeviceClassifier, DeviceRow};
use super::partition::{partition_number, whole_device};
use crate::{BusType, Classification, Device, DeviceId, Mount, MountKind, WipeError, WipeResult};

const SWAP_MOUNT_POINT: &str = "[SWAP]";

/// Produces the ordered, duplicate-free list of devices that may be wiped
pub struct DeviceEnumerator {
    classifier: Box<dyn DeviceClassifier>,
}

impl DeviceEnumerator {
    pub fn new(classifier: Box<dyn DeviceClassifier>) -> Self {
        Self { classifier }
    }

    /// Every whole device the OS reports, eligible or not
    pub fn discover_all(&self) -> WipeResult<Vec<Device>> {
        let rows = self.classifier.discover().map_err(|e| match e {
            // Missing tools keep their own exit hint
            WipeError::ToolMissing(_) => e,
            other => WipeError::Enumeration(format!(
                "{} device listing failed: {}",
                self.classifier.platform_name(),
                other
            )),
        })?;

        tracing::debug!(
            platform = self.classifier.platform_name(),
            rows = rows.len(),
            "Classified device rows"
        );
        Ok(collapse_rows(rows))
    }

    /// Removable/external, non-system, writable devices only
    pub fn enumerate(&self) -> WipeResult<Vec<Device>> {
        let devices = self.discover_all()?;
        let total = devices.len();
        let candidates: Vec<Device> = devices
            .into_iter()
            .filter(|device| match device.ineligibility() {
                Some(reason) => {
                    tracing::debug!(device = %device.id, reason, "Excluded from candidates");
                    false
                }
                None => true,
            })
            .collect();

        tracing::info!(total, candidates = candidates.len(), "Device enumeration complete");
        Ok(candidates)
    }
}

fn owner_of(row: &DeviceRow) -> DeviceId {
    row.parent
        .clone()
        .unwrap_or_else(|| whole_device(&row.node))
}

/// Collapse partition rows into their whole device, first-seen order.
///
/// A device is removable only if every one of its rows says so, and is system or
/// read-only if any row does. Size, bus and model come from the whole-device row
/// when the listing has one.
pub fn collapse_rows(rows: Vec<DeviceRow>) -> Vec<Device> {
    let mut groups: Vec<(DeviceId, Vec<DeviceRow>)> = Vec::new();
    for row in rows {
        let owner = owner_of(&row);
        match groups.iter_mut().find(|(id, _)| *id == owner) {
            Some((_, members)) => members.push(row),
            None => groups.push((owner, vec![row])),
        }
    }

    groups
        .into_iter()
        .map(|(id, members)| merge_group(id, &members))
        .collect()
}

fn merge_group(id: DeviceId, members: &[DeviceRow]) -> Device {
    let whole = members
        .iter()
        .find(|row| row.node == id)
        .unwrap_or(&members[0]);

    let classification = if members
        .iter()
        .all(|row| row.classification == Classification::RemovableExternal)
    {
        Classification::RemovableExternal
    } else {
        Classification::Internal
    };

    let bus = if whole.bus != BusType::Unknown {
        whole.bus.clone()
    } else {
        members
            .iter()
            .map(|row| &row.bus)
            .find(|bus| **bus != BusType::Unknown)
            .cloned()
            .unwrap_or(BusType::Unknown)
    };

    let size = if whole.size > 0 {
        whole.size
    } else {
        members.iter().map(|row| row.size).max().unwrap_or(0)
    };

    let mut mounts: Vec<Mount> = Vec::new();
    for row in members {
        for mount_point in &row.mount_points {
            let source = row.node.to_string();
            if mounts
                .iter()
                .any(|m| m.source == source && m.mount_point == *mount_point)
            {
                continue;
            }
            mounts.push(Mount {
                device: id.clone(),
                partition: row.node.as_path().and_then(partition_number),
                source,
                mount_point: mount_point.clone(),
                kind: if mount_point == SWAP_MOUNT_POINT {
                    MountKind::Swap
                } else {
                    MountKind::Filesystem
                },
            });
        }
    }

    Device {
        size,
        bus,
        classification,
        read_only: members.iter().any(|row| row.read_only),
        system: members.iter().any(|row| row.system),
        model: whole
            .model
            .clone()
            .or_else(|| members.iter().find_map(|row| row.model.clone())),
        mounts,
        id,
    }
}

/// Pure enumeration pipeline: collapse, then keep wipe candidates
pub fn candidates_from_rows(rows: Vec<DeviceRow>) -> Vec<Device> {
    collapse_rows(rows)
        .into_iter()
        .filter(Device::is_wipe_candidate)
        .collect()
}
