// Host platform selection
//
// Picks the classifier, mount manager and erase backend for the running OS,
// checks privileges and verifies the external tools are installed.

use crate::drives::classifier::{DeviceClassifier, LinuxClassifier, MacClassifier, WindowsClassifier};
use crate::erase::{EraseBackend, ErasePolicy, FailureScope, LinuxEraser, MacEraser, WindowsEraser};
use crate::exec::{powershell, CommandRunner, SharedRunner};
use crate::mounts::{LinuxMounts, MacMounts, MountManager, WindowsMounts};
use crate::{WipeError, WipeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const ADMIN_CHECK_SCRIPT: &str = "([Security.Principal.WindowsPrincipal] \
     [Security.Principal.WindowsIdentity]::GetCurrent()).IsInRole(\
     [Security.Principal.WindowsBuiltInRole]::Administrator)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Linux => write!(f, "linux"),
            Platform::MacOs => write!(f, "macos"),
            Platform::Windows => write!(f, "windows"),
        }
    }
}

impl Platform {
    pub fn current() -> WipeResult<Self> {
        match std::env::consts::OS {
            "linux" => Ok(Platform::Linux),
            "macos" => Ok(Platform::MacOs),
            "windows" => Ok(Platform::Windows),
            other => Err(WipeError::Unsupported(format!("operating system {}", other))),
        }
    }

    /// Linux shreds per device; macOS runs signature clear and overwrite through the same
    /// diskutil, so an overwrite failure stops the run; Windows only destroys partitions
    pub fn default_policy(&self, random_passes: u32) -> ErasePolicy {
        match self {
            Platform::Linux => ErasePolicy::SignatureOverwrite {
                random_passes,
                failure_scope: FailureScope::Device,
            },
            Platform::MacOs => ErasePolicy::SignatureOverwrite {
                random_passes,
                failure_scope: FailureScope::Run,
            },
            Platform::Windows => ErasePolicy::PartitionDestroy,
        }
    }

    pub fn required_tools(&self, policy: &ErasePolicy) -> Vec<&'static str> {
        match self {
            Platform::Linux => {
                let mut tools = vec!["lsblk", "umount", "swapoff"];
                match policy {
                    ErasePolicy::SignatureOverwrite { .. } => tools.extend(["wipefs", "shred"]),
                    ErasePolicy::PartitionDestroy => tools.extend(["sfdisk", "sgdisk"]),
                }
                tools
            }
            Platform::MacOs => vec!["diskutil", "mount"],
            Platform::Windows => vec!["powershell"],
        }
    }

    /// Fails with `ToolMissing` naming the first tool not found on PATH
    pub fn check_tools(&self, policy: &ErasePolicy) -> WipeResult<()> {
        let path = std::env::var_os("PATH").unwrap_or_default();
        let dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();
        for tool in self.required_tools(policy) {
            if find_tool(&dirs, tool, *self == Platform::Windows).is_none() {
                return Err(WipeError::ToolMissing(tool.to_string()));
            }
        }
        Ok(())
    }

    pub fn ensure_elevated(&self, runner: &dyn CommandRunner) -> WipeResult<()> {
        match self {
            Platform::Windows => {
                let output = powershell(runner, ADMIN_CHECK_SCRIPT)?;
                if output.success && output.stdout.trim() == "True" {
                    Ok(())
                } else {
                    Err(WipeError::PrivilegeRequired(
                        "run from an elevated (Administrator) PowerShell".to_string(),
                    ))
                }
            }
            Platform::Linux | Platform::MacOs => {
                if effective_uid_is_root() {
                    Ok(())
                } else {
                    Err(WipeError::PrivilegeRequired(
                        "run with sudo or as root".to_string(),
                    ))
                }
            }
        }
    }

    pub fn classifier(&self, runner: SharedRunner) -> Box<dyn DeviceClassifier> {
        match self {
            Platform::Linux => Box::new(LinuxClassifier::new(runner)),
            Platform::MacOs => Box::new(MacClassifier::new(runner)),
            Platform::Windows => Box::new(WindowsClassifier::new(runner)),
        }
    }

    pub fn mount_manager(&self, runner: SharedRunner) -> Box<dyn MountManager> {
        match self {
            Platform::Linux => Box::new(LinuxMounts::new(runner)),
            Platform::MacOs => Box::new(MacMounts::new(runner)),
            Platform::Windows => Box::new(WindowsMounts::new(runner)),
        }
    }

    pub fn erase_backend(&self, runner: SharedRunner) -> Box<dyn EraseBackend> {
        match self {
            Platform::Linux => Box::new(LinuxEraser::new(runner)),
            Platform::MacOs => Box::new(MacEraser::new(runner)),
            Platform::Windows => Box::new(WindowsEraser::new(runner)),
        }
    }
}

#[cfg(unix)]
fn effective_uid_is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn effective_uid_is_root() -> bool {
    false
}

/// First regular file named `tool` in `dirs`; on Windows `tool.exe` also matches
pub(crate) fn find_tool(dirs: &[PathBuf], tool: &str, windows: bool) -> Option<PathBuf> {
    dirs.iter().find_map(|dir| {
        let mut candidates = vec![dir.join(tool)];
        if windows {
            candidates.push(dir.join(format!("{}.exe", tool)));
        }
        candidates.into_iter().find(|c| is_file(c))
    })
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}
