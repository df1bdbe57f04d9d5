use super::json::{flex_bool, flex_u64, non_empty, parse_powershell_list};
use super::{DeviceClassifier, DeviceRow};
use crate::exec::{powershell, SharedRunner};
use crate::{BusType, Classification, DeviceId, WipeResult};
use serde::Deserialize;

// BusType is an enum in the CIM class; ToString() keeps the label instead of its ordinal
const GET_DISK_SCRIPT: &str = "Get-Disk | Select-Object Number, FriendlyName, Size, \
     @{Name='BusType';Expression={$_.BusType.ToString()}}, \
     IsSystem, IsBoot, IsReadOnly, IsOffline | ConvertTo-Json -Compress";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DiskRecord {
    pub number: u32,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default, deserialize_with = "flex_u64")]
    pub size: u64,
    #[serde(default)]
    pub bus_type: Option<String>,
    #[serde(default, deserialize_with = "flex_bool")]
    pub is_system: bool,
    #[serde(default, deserialize_with = "flex_bool")]
    pub is_boot: bool,
    #[serde(default, deserialize_with = "flex_bool")]
    pub is_read_only: bool,
    #[serde(default, deserialize_with = "flex_bool")]
    pub is_offline: bool,
}

impl DiskRecord {
    /// Removable/external when none of the system, boot, virtual-bus, read-only or
    /// offline signals is raised
    pub fn classification(&self, bus: &BusType) -> Classification {
        if self.is_system
            || self.is_boot
            || bus.is_virtual_or_unknown()
            || self.is_read_only
            || self.is_offline
        {
            Classification::Internal
        } else {
            Classification::RemovableExternal
        }
    }

    pub fn into_row(self) -> DeviceRow {
        let bus = BusType::from_label(self.bus_type.as_deref().unwrap_or(""));
        DeviceRow {
            node: DeviceId::DiskNumber(self.number),
            parent: None,
            size: self.size,
            classification: self.classification(&bus),
            bus,
            read_only: self.is_read_only,
            system: self.is_system || self.is_boot,
            model: non_empty(self.friendly_name),
            mount_points: Vec::new(),
        }
    }
}

pub(crate) fn parse_get_disk(stdout: &str) -> WipeResult<Vec<DiskRecord>> {
    parse_powershell_list("Get-Disk output", stdout)
}

/// Classifies disks by Get-Disk's system/boot/bus/read-only signal set
pub struct WindowsClassifier {
    runner: SharedRunner,
}

impl WindowsClassifier {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }
}

impl DeviceClassifier for WindowsClassifier {
    fn platform_name(&self) -> &'static str {
        "windows"
    }

    fn discover(&self) -> WipeResult<Vec<DeviceRow>> {
        let output = powershell(self.runner.as_ref(), GET_DISK_SCRIPT)?.into_result("Get-Disk")?;
        Ok(parse_get_disk(&output.stdout)?
            .into_iter()
            .map(DiskRecord::into_row)
            .collect())
    }
}
