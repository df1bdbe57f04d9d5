// Drive discovery module
//
// Organized structure:
// - classifier/: per-platform DeviceClassifier adapters (lsblk, diskutil, Get-Disk)
// - partition.rs: partition node to whole-device normalization
// - detection.rs: DeviceEnumerator, collapses rows into eligible whole devices

pub mod classifier;
pub mod partition;

// Core functionality
pub mod detection;


// Re-exports for convenience
pub use classifier::{DeviceClassifier, DeviceRow, LinuxClassifier, MacClassifier, WindowsClassifier};
pub use detection::{candidates_from_rows, collapse_rows, DeviceEnumerator};
pub use partition::{partition_number, whole_device, whole_device_path};
