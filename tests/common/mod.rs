/// Common test utilities for integration tests
///
/// This module provides:
/// - Recording fakes for the confirmation, mount and erase ports
/// - A scripted command runner for driving the real platform adapters
/// - Device fixtures
pub mod fakes;
pub mod runner;

use usbwipe::{BusType, Classification, Device, DeviceId};

/// Eligible 16 GiB USB stick at `path`
#[allow(dead_code)]
pub fn usb_device(path: &str) -> Device {
    Device {
        id: DeviceId::path(path),
        size: 16 * 1024 * 1024 * 1024,
        bus: BusType::Usb,
        classification: Classification::RemovableExternal,
        read_only: false,
        system: false,
        model: Some("Test Stick".to_string()),
        mounts: Vec::new(),
    }
}
