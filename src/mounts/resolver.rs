use super::{MountEntry, MountManager};
use crate::drives::partition::whole_device;
use crate::{Device, DeviceId, Mount, WipeResult};

fn owner_of(entry: &MountEntry) -> DeviceId {
    entry
        .parent
        .clone()
        .unwrap_or_else(|| whole_device(&DeviceId::path(entry.source.clone())))
}

/// Keep entries owned by `device`, deduplicated on (source, mount point) in table order
pub fn select_mounts(device: &DeviceId, entries: Vec<MountEntry>) -> Vec<Mount> {
    let mut mounts: Vec<Mount> = Vec::new();
    for entry in entries {
        if entry.mount_point.is_empty() || owner_of(&entry) != *device {
            continue;
        }
        if mounts
            .iter()
            .any(|m| m.source == entry.source && m.mount_point == entry.mount_point)
        {
            continue;
        }
        mounts.push(Mount {
            device: device.clone(),
            source: entry.source,
            mount_point: entry.mount_point,
            kind: entry.kind,
            partition: entry.partition,
        });
    }
    mounts
}

/// Every mount currently backed by `device` or one of its partitions.
/// No mounts is an empty list, not an error.
pub fn resolve_mounts(manager: &dyn MountManager, device: &Device) -> WipeResult<Vec<Mount>> {
    let entries = manager.mount_table(device)?;
    let mounts = select_mounts(&device.id, entries);
    tracing::debug!(device = %device.id, mounts = mounts.len(), "Resolved mounts");
    Ok(mounts)
}
