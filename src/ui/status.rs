use crate::Device;
use colored::Colorize;
use std::io::{self, Write};

pub fn info(out: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(out, "{}", message)
}

pub fn success(out: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", "OK:".green().bold(), message)
}

pub fn warning(out: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", "Warning:".yellow().bold(), message)
}

pub fn error(out: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", "Error:".red().bold(), message)
}

/// Identity block shown before a device is erased or listed
pub fn device_identity(out: &mut dyn Write, device: &Device) -> io::Result<()> {
    writeln!(out, "Device: {}", device.id.to_string().bold())?;
    writeln!(out, "  Size: {}", device.size_display())?;
    writeln!(out, "  Bus:  {}", device.bus)?;
    if let Some(model) = &device.model {
        writeln!(out, "  Model: {}", model)?;
    }
    for mount in &device.mounts {
        writeln!(out, "  Mounted: {} -> {}", mount.source, mount.mount_point)?;
    }
    Ok(())
}
