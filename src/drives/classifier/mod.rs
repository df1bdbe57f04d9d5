// Platform device classifiers
//
// Each OS reports removability through a different signal set:
// - linux.rs: per-device removable flag (lsblk RM)
// - macos.rs: external/physical enclosure classification (diskutil)
// - windows.rs: IsSystem/IsBoot/BusType/IsReadOnly (Get-Disk)
//
// All of them produce the same normalized DeviceRow records, which the enumerator
// collapses into whole devices.

pub(crate) mod json;
pub mod linux;
pub mod macos;
pub mod windows;

pub use linux::LinuxClassifier;
pub use macos::MacClassifier;
pub use windows::WindowsClassifier;

use crate::{BusType, Classification, DeviceId, WipeResult};

/// One row of an OS device listing, whole disk or partition
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRow {
    pub node: DeviceId,
    /// Whole device owning this row, when the OS reports it
    pub parent: Option<DeviceId>,
    pub size: u64,
    pub bus: BusType,
    pub classification: Classification,
    pub read_only: bool,
    pub system: bool,
    pub model: Option<String>,
    pub mount_points: Vec<String>,
}

impl DeviceRow {
    /// Minimal whole-disk row, used by adapters and tests as a starting point
    pub fn disk(node: DeviceId, classification: Classification) -> Self {
        Self {
            node,
            parent: None,
            size: 0,
            bus: BusType::Unknown,
            classification,
            read_only: false,
            system: false,
            model: None,
            mount_points: Vec::new(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait DeviceClassifier {
    fn platform_name(&self) -> &'static str;

    /// Query the OS and classify every block device row it reports
    fn discover(&self) -> WipeResult<Vec<DeviceRow>>;
}

/// Mount points whose presence marks a device as hosting the running system
pub(crate) fn is_system_mount_point(mount_point: &str) -> bool {
    matches!(mount_point, "/" | "/boot" | "/boot/efi" | "/efi")
}
