// Mount resolution and unmounting
//
// - resolver.rs: picks the mount-table entries that belong to a device
// - coordinator.rs: unmounts them one at a time, stopping at the first failure
// - linux.rs / macos.rs / windows.rs: MountManager adapters over the OS tools

pub mod coordinator;
pub mod linux;
pub mod macos;
pub mod resolver;
pub mod windows;

pub use coordinator::{UnmountCoordinator, UnmountState};
pub use linux::LinuxMounts;
pub use macos::MacMounts;
pub use resolver::{resolve_mounts, select_mounts};
pub use windows::WindowsMounts;

use crate::{Device, DeviceId, Mount, MountKind, WipeResult};

/// One raw row of a platform mount table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Partition node, volume or `disk N partition P`
    pub source: String,
    /// Whole device owning the source, when the OS reports it
    pub parent: Option<DeviceId>,
    pub mount_point: String,
    pub kind: MountKind,
    pub partition: Option<u32>,
}

#[cfg_attr(test, mockall::automock)]
pub trait MountManager {
    /// Current mount-table entries that may belong to `device`
    fn mount_table(&self, device: &Device) -> WipeResult<Vec<MountEntry>>;

    /// Unmount a single mount; returns once the OS has released it
    fn unmount(&self, mount: &Mount) -> WipeResult<()>;
}
