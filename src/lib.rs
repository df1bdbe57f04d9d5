// Allow uppercase acronyms for bus names like USB, SD, MMC
#![allow(clippy::upper_case_acronyms)]

pub mod config;
pub mod drives;
pub mod erase;
pub mod exec;
pub mod mounts;
pub mod platform;
pub mod report;
pub mod ui;
pub mod wipe_orchestrator;

// Re-export the run orchestrator for convenience
pub use report::{DeviceReport, RunSummary};
pub use wipe_orchestrator::{RunControl, RunOrchestrator};

use erase::EraseStep;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Process exit codes
pub const EXIT_OK: u8 = 0;
pub const EXIT_PRIVILEGE: u8 = 1;
pub const EXIT_RUN_ABORTED: u8 = 2;
pub const EXIT_SETUP_FAILURE: u8 = 3;

#[derive(Error, Debug)]
pub enum WipeError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Elevated privileges required: {0}")]
    PrivilegeRequired(String),

    #[error("Required tool not found on PATH: {0}")]
    ToolMissing(String),

    #[error("Device enumeration failed: {0}")]
    Enumeration(String),

    #[error("Unmount of {mount} failed: {reason}")]
    UnmountFailed { mount: String, reason: String },

    #[error("Signature clear failed: {0}")]
    SignatureClearFailed(String),

    #[error("Overwrite failed: {0}")]
    OverwriteFailed(String),

    #[error("Removal of partition {partition} failed: {reason}")]
    PartitionRemovalFailed { partition: String, reason: String },

    #[error("Partition table clear failed: {0}")]
    TableClearFailed(String),

    #[error("Command `{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("Failed to parse {what}: {detail}")]
    Parse { what: String, detail: String },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WipeError {
    pub(crate) fn parse(what: &str, detail: impl fmt::Display) -> Self {
        WipeError::Parse {
            what: what.to_string(),
            detail: detail.to_string(),
        }
    }

    /// Exit code used when this error ends the process
    pub fn exit_code(&self) -> u8 {
        match self {
            WipeError::PrivilegeRequired(_) => EXIT_PRIVILEGE,
            WipeError::OverwriteFailed(_) => EXIT_RUN_ABORTED,
            _ => EXIT_SETUP_FAILURE,
        }
    }
}

pub type WipeResult<T> = Result<T, WipeError>;

/// Platform-native identifier of a whole device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceId {
    /// Device node, e.g. `/dev/sdb` or `/dev/disk4`
    Path(String),
    /// Windows disk number as reported by `Get-Disk`
    DiskNumber(u32),
}

impl DeviceId {
    pub fn path(path: impl Into<String>) -> Self {
        DeviceId::Path(path.into())
    }

    pub fn as_path(&self) -> Option<&str> {
        match self {
            DeviceId::Path(p) => Some(p),
            DeviceId::DiskNumber(_) => None,
        }
    }

    pub fn disk_number(&self) -> Option<u32> {
        match self {
            DeviceId::DiskNumber(n) => Some(*n),
            DeviceId::Path(_) => None,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::Path(p) => write!(f, "{}", p),
            DeviceId::DiskNumber(n) => write!(f, "\\\\.\\PHYSICALDRIVE{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusType {
    Usb,
    Sd,
    Mmc,
    Sata,
    Ata,
    Nvme,
    Scsi,
    Sas,
    Thunderbolt,
    FireWire,
    Virtual,
    Unknown,
    Other(String),
}

impl BusType {
    /// Map a transport/protocol label from lsblk, diskutil or Get-Disk
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "unknown" => BusType::Unknown,
            "usb" => BusType::Usb,
            "sd" | "secure digital" => BusType::Sd,
            "mmc" | "emmc" => BusType::Mmc,
            "sata" => BusType::Sata,
            "ata" | "atapi" => BusType::Ata,
            "nvme" | "pci-express" => BusType::Nvme,
            "scsi" | "iscsi" => BusType::Scsi,
            "sas" => BusType::Sas,
            "thunderbolt" => BusType::Thunderbolt,
            "firewire" | "1394" => BusType::FireWire,
            "virtual" | "file backed virtual" | "disk image" | "virtual interface" => {
                BusType::Virtual
            }
            _ => BusType::Other(trimmed.to_string()),
        }
    }

    pub fn is_virtual_or_unknown(&self) -> bool {
        matches!(self, BusType::Virtual | BusType::Unknown)
    }
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusType::Usb => write!(f, "USB"),
            BusType::Sd => write!(f, "SD"),
            BusType::Mmc => write!(f, "MMC"),
            BusType::Sata => write!(f, "SATA"),
            BusType::Ata => write!(f, "ATA"),
            BusType::Nvme => write!(f, "NVMe"),
            BusType::Scsi => write!(f, "SCSI"),
            BusType::Sas => write!(f, "SAS"),
            BusType::Thunderbolt => write!(f, "Thunderbolt"),
            BusType::FireWire => write!(f, "FireWire"),
            BusType::Virtual => write!(f, "Virtual"),
            BusType::Unknown => write!(f, "Unknown"),
            BusType::Other(label) => write!(f, "{}", label),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    RemovableExternal,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MountKind {
    Filesystem,
    Swap,
    /// Windows drive letter or folder access path
    AccessPath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    pub device: DeviceId,
    /// Partition node or volume the mount is backed by
    pub source: String,
    pub mount_point: String,
    pub kind: MountKind,
    pub partition: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub size: u64,
    pub bus: BusType,
    pub classification: Classification,
    pub read_only: bool,
    /// Hosts the running system or its boot files
    pub system: bool,
    pub model: Option<String>,
    /// Mounts observed at enumeration time, for display only
    pub mounts: Vec<Mount>,
}

impl Device {
    /// Reason this device must never be erased, if any
    pub fn ineligibility(&self) -> Option<&'static str> {
        if self.classification != Classification::RemovableExternal {
            Some("not a removable/external drive")
        } else if self.system {
            Some("hosts the running system or boot files")
        } else if self.read_only {
            Some("device is read-only")
        } else if self.bus == BusType::Virtual {
            Some("virtual device")
        } else {
            None
        }
    }

    pub fn is_wipe_candidate(&self) -> bool {
        self.ineligibility().is_none()
    }

    pub fn size_display(&self) -> String {
        format_size(self.size)
    }
}

pub fn format_size(bytes: u64) -> String {
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.1} GB", b / GB)
    } else {
        format!("{:.1} MB", b / MB)
    }
}

/// Final state of one device in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WipeOutcome {
    SkippedByUser,
    Ineligible { reason: String },
    UnmountFailed { mount: String, reason: String },
    EraseFailed { step: EraseStep, reason: String },
    Completed,
}

impl WipeOutcome {
    pub fn is_wiped(&self) -> bool {
        matches!(self, WipeOutcome::Completed)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            WipeOutcome::SkippedByUser | WipeOutcome::Ineligible { .. }
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            WipeOutcome::UnmountFailed { .. } | WipeOutcome::EraseFailed { .. }
        )
    }
}

impl fmt::Display for WipeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WipeOutcome::SkippedByUser => write!(f, "skipped by user"),
            WipeOutcome::Ineligible { reason } => write!(f, "refused ({})", reason),
            WipeOutcome::UnmountFailed { mount, reason } => {
                write!(f, "unmount failed ({}: {})", mount, reason)
            }
            WipeOutcome::EraseFailed { step, reason } => {
                write!(f, "erase failed during {} ({})", step, reason)
            }
            WipeOutcome::Completed => write!(f, "completed"),
        }
    }
}
