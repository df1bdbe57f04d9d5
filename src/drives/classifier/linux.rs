use super::json::{flex_bool, flex_u64, non_empty};
use super::{is_system_mount_point, DeviceClassifier, DeviceRow};
use crate::exec::{CommandRunner, SharedRunner};
use crate::{BusType, Classification, DeviceId, WipeError, WipeResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const LSBLK_COLUMNS: &str = "NAME,PKNAME,TYPE,RM,RO,SIZE,TRAN,MODEL";

// Guards against a malformed PKNAME cycle
const MAX_PARENT_HOPS: usize = 16;

#[derive(Debug, Deserialize)]
pub(crate) struct LsblkOutput {
    #[serde(default)]
    pub blockdevices: Vec<LsblkRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LsblkRow {
    pub name: String,
    #[serde(default)]
    pub pkname: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "flex_bool")]
    pub rm: bool,
    #[serde(default, deserialize_with = "flex_bool")]
    pub ro: bool,
    #[serde(default, deserialize_with = "flex_u64")]
    pub size: u64,
    #[serde(default)]
    pub tran: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub mountpoint: Option<String>,
    /// Every mount of the row; `[null]` when unmounted
    #[serde(default)]
    pub mountpoints: Option<Vec<Option<String>>>,
}

impl LsblkRow {
    fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("")
    }

    /// Distinct non-empty mount points, whichever column lsblk filled
    pub(crate) fn mount_points(&self) -> Vec<String> {
        let mut points: Vec<String> = Vec::new();
        let listed = self.mountpoints.iter().flatten().flatten();
        for mount_point in listed.chain(self.mountpoint.iter()) {
            if !mount_point.is_empty() && !points.contains(mount_point) {
                points.push(mount_point.clone());
            }
        }
        points
    }
}

pub(crate) fn parse_lsblk(json: &str) -> WipeResult<Vec<LsblkRow>> {
    let output: LsblkOutput =
        serde_json::from_str(json).map_err(|e| WipeError::parse("lsblk output", e))?;
    Ok(output.blockdevices)
}

fn lsblk_args<'a>(flags: &[&'a str], columns: &'a str, target: Option<&'a str>) -> Vec<&'a str> {
    let mut args = flags.to_vec();
    args.extend(["-o", columns]);
    args.extend(target);
    args
}

/// `lsblk` with `columns` plus the mount points of each row.
///
/// `MOUNTPOINTS` (util-linux 2.37+) lists every mount of a device, bind mounts included.
/// Older releases reject it, so the single-valued `MOUNTPOINT` is the fallback.
pub(crate) fn query_lsblk(
    runner: &dyn CommandRunner,
    flags: &[&str],
    columns: &str,
    target: Option<&str>,
) -> WipeResult<Vec<LsblkRow>> {
    let all_mounts = format!("{},MOUNTPOINTS", columns);
    let output = runner.run("lsblk", &lsblk_args(flags, &all_mounts, target))?;
    if output.success {
        return parse_lsblk(&output.stdout);
    }
    tracing::debug!(detail = %output.failure_detail(), "lsblk lacks MOUNTPOINTS, retrying with MOUNTPOINT");

    let single_mount = format!("{},MOUNTPOINT", columns);
    let output = runner
        .run("lsblk", &lsblk_args(flags, &single_mount, target))?
        .into_result("lsblk")?;
    parse_lsblk(&output.stdout)
}

/// Classifies block devices by the kernel's removable flag
pub struct LinuxClassifier {
    runner: SharedRunner,
}

impl LinuxClassifier {
    pub fn new(runner: SharedRunner) -> Self {
        Self { runner }
    }

    /// Check if device should be skipped
    pub(crate) fn should_skip_device(device_name: &str) -> bool {
        let name = Path::new(device_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(device_name);

        // Skip loop devices, ram disks, CD/DVD drives, compressed swap
        name.starts_with("loop")
            || name.starts_with("ram")
            || name.starts_with("sr")
            || name.starts_with("zram")
    }

    /// Turn flat `lsblk -l` rows into classified rows.
    ///
    /// Stacked children (crypt, lvm) are attributed to the disk at the top of their
    /// PKNAME chain so their mounts count against that disk.
    pub(crate) fn classify_rows(rows: &[LsblkRow]) -> Vec<DeviceRow> {
        let by_name: HashMap<&str, &LsblkRow> =
            rows.iter().map(|row| (row.name.as_str(), row)).collect();

        let mut classified = Vec::new();
        for row in rows {
            let Some(top) = top_disk(row, &by_name) else {
                continue;
            };
            if Self::should_skip_device(&top.name) {
                continue;
            }

            let is_whole = top.name == row.name;
            let classification = if top.rm {
                Classification::RemovableExternal
            } else {
                Classification::Internal
            };
            let mount_points = row.mount_points();
            let system = mount_points.iter().any(|mp| is_system_mount_point(mp));
            let tran = non_empty(row.tran.clone()).or_else(|| non_empty(top.tran.clone()));

            classified.push(DeviceRow {
                node: DeviceId::path(row.name.clone()),
                parent: (!is_whole).then(|| DeviceId::path(top.name.clone())),
                size: row.size,
                bus: BusType::from_label(tran.as_deref().unwrap_or("")),
                classification,
                read_only: row.ro,
                system,
                model: non_empty(row.model.clone()),
                mount_points,
            });
        }

        classified
    }
}

/// Follow the PKNAME chain to the disk at the top, if the chain ends at one
fn top_disk<'a>(row: &'a LsblkRow, by_name: &HashMap<&str, &'a LsblkRow>) -> Option<&'a LsblkRow> {
    let mut current = row;
    for _ in 0..MAX_PARENT_HOPS {
        match current.pkname.as_deref().and_then(|p| by_name.get(p).copied()) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    (current.kind() == "disk").then_some(current)
}

impl DeviceClassifier for LinuxClassifier {
    fn platform_name(&self) -> &'static str {
        "linux"
    }

    fn discover(&self) -> WipeResult<Vec<DeviceRow>> {
        let rows = query_lsblk(
            self.runner.as_ref(),
            &["-J", "-b", "-l", "-p"],
            LSBLK_COLUMNS,
            None,
        )?;
        tracing::debug!(rows = rows.len(), "lsblk reported block devices");
        Ok(Self::classify_rows(&rows))
    }
}
