// Erase policies and backends
//
// The engine applies an ErasePolicy over an EraseBackend; each backend maps the
// policy steps onto one OS's tools:
// - linux.rs: wipefs, shred, sfdisk, sgdisk
// - macos.rs: diskutil zeroDisk / secureErase / eraseVolume / eraseDisk
// - windows.rs: Remove-Partition, Clear-Disk

pub mod engine;
pub mod linux;
pub mod macos;
pub mod windows;

pub use engine::{EraseEngine, EraseFailure, EraseReport};
pub use linux::LinuxEraser;
pub use macos::MacEraser;
pub use windows::WindowsEraser;

use crate::{Device, WipeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Step of an erase that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EraseStep {
    SignatureClear,
    Overwrite,
    PartitionRemoval,
    TableClear,
}

impl fmt::Display for EraseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EraseStep::SignatureClear => "signature clear",
            EraseStep::Overwrite => "overwrite",
            EraseStep::PartitionRemoval => "partition removal",
            EraseStep::TableClear => "partition table clear",
        };
        f.write_str(name)
    }
}

/// What an overwrite failure takes down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureScope {
    /// Only the device being erased
    Device,
    /// The whole run; remaining devices are not processed
    Run,
}

/// Policy names accepted in config files and on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Clear filesystem signatures, then random passes and a final zero pass
    SignatureOverwrite,
    /// Remove every partition and reinitialize the partition table
    PartitionDestroy,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::SignatureOverwrite => write!(f, "signature-overwrite"),
            PolicyKind::PartitionDestroy => write!(f, "partition-destroy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum ErasePolicy {
    SignatureOverwrite {
        random_passes: u32,
        failure_scope: FailureScope,
    },
    /// Removes the partition structure only; data blocks are not overwritten
    PartitionDestroy,
}

impl ErasePolicy {
    pub fn kind(&self) -> PolicyKind {
        match self {
            ErasePolicy::SignatureOverwrite { .. } => PolicyKind::SignatureOverwrite,
            ErasePolicy::PartitionDestroy => PolicyKind::PartitionDestroy,
        }
    }
}

impl fmt::Display for ErasePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErasePolicy::SignatureOverwrite { random_passes, .. } => write!(
                f,
                "signature-overwrite ({} random pass{} + zero pass)",
                random_passes,
                if *random_passes == 1 { "" } else { "es" }
            ),
            ErasePolicy::PartitionDestroy => write!(f, "partition-destroy"),
        }
    }
}

/// A partition found on a device before removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRef {
    pub node: String,
    pub number: u32,
}

#[cfg_attr(test, mockall::automock)]
pub trait EraseBackend {
    fn clear_signatures(&self, device: &Device) -> WipeResult<()>;

    /// `random_passes` random passes followed by one zero pass over the whole device
    fn overwrite(&self, device: &Device, random_passes: u32) -> WipeResult<()>;

    fn partitions(&self, device: &Device) -> WipeResult<Vec<PartitionRef>>;

    fn remove_partition(&self, device: &Device, partition: &PartitionRef) -> WipeResult<()>;

    fn clear_partition_table(&self, device: &Device) -> WipeResult<()>;
}
