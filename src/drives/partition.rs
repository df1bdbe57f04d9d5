// Whole-device identifier normalization
//
// OS listings report partitions next to their parent disk. These helpers collapse a
// partition node to the node of the disk that owns it.

use crate::DeviceId;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // nvme0n1p2, mmcblk0p1, md127p1, loop3p1, nbd0p1
    static ref P_SEPARATED: Regex =
        Regex::new(r"^((?:.*/)?(?:nvme\d+n\d+|mmcblk\d+|md\d+|loop\d+|nbd\d+))p(\d+)$")
            .expect("partition regex");
    // macOS slices: disk4s1, rdisk4s1
    static ref DARWIN_SLICE: Regex =
        Regex::new(r"^((?:.*/)?r?disk\d+)s(\d+)$").expect("slice regex");
    // sdb1, hdc3, vda2, xvdf1
    static ref LETTER_DISK: Regex =
        Regex::new(r"^((?:.*/)?(?:sd|hd|vd|xvd)[a-z]+)(\d+)$").expect("letter disk regex");
}

fn split(node: &str) -> Option<(&str, u32)> {
    for re in [&*P_SEPARATED, &*DARWIN_SLICE, &*LETTER_DISK] {
        if let Some(caps) = re.captures(node) {
            let whole = caps.get(1)?.as_str();
            let number = caps.get(2)?.as_str().parse().ok()?;
            return Some((whole, number));
        }
    }
    None
}

/// Strip a trailing partition suffix; whole-device nodes are returned unchanged
pub fn whole_device_path(node: &str) -> &str {
    split(node).map(|(whole, _)| whole).unwrap_or(node)
}

/// Partition number of a partition node, `None` for whole devices
pub fn partition_number(node: &str) -> Option<u32> {
    split(node).map(|(_, number)| number)
}

pub fn whole_device(id: &DeviceId) -> DeviceId {
    match id {
        DeviceId::Path(p) => DeviceId::path(whole_device_path(p)),
        DeviceId::DiskNumber(n) => DeviceId::DiskNumber(*n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("/dev/sdb1", "/dev/sdb" ; "scsi partition")]
    #[test_case("/dev/sdb", "/dev/sdb" ; "scsi whole disk")]
    #[test_case("/dev/sdaa12", "/dev/sdaa" ; "scsi two letter disk")]
    #[test_case("/dev/nvme0n1p2", "/dev/nvme0n1" ; "nvme partition")]
    #[test_case("/dev/nvme0n1", "/dev/nvme0n1" ; "nvme namespace is whole")]
    #[test_case("/dev/mmcblk0p1", "/dev/mmcblk0" ; "sd card partition")]
    #[test_case("/dev/mmcblk0", "/dev/mmcblk0" ; "sd card whole")]
    #[test_case("/dev/disk4s1", "/dev/disk4" ; "darwin slice")]
    #[test_case("/dev/rdisk4s2", "/dev/rdisk4" ; "darwin raw slice")]
    #[test_case("/dev/disk4", "/dev/disk4" ; "darwin whole")]
    #[test_case("sdc3", "sdc" ; "bare kernel name")]
    #[test_case("/dev/mapper/luks-usb", "/dev/mapper/luks-usb" ; "mapper untouched")]
    fn test_whole_device_path(node: &str, expected: &str) {
        assert_eq!(whole_device_path(node), expected);
    }

    #[test_case("/dev/sdb1", Some(1))]
    #[test_case("/dev/nvme0n1p12", Some(12))]
    #[test_case("/dev/disk4s2", Some(2))]
    #[test_case("/dev/sdb", None)]
    #[test_case("/dev/nvme0n1", None)]
    fn test_partition_number(node: &str, expected: Option<u32>) {
        assert_eq!(partition_number(node), expected);
    }

    #[test]
    fn test_whole_device_keeps_disk_numbers() {
        assert_eq!(
            whole_device(&DeviceId::DiskNumber(2)),
            DeviceId::DiskNumber(2)
        );
        assert_eq!(
            whole_device(&DeviceId::path("/dev/sdc2")),
            DeviceId::path("/dev/sdc")
        );
    }
}
