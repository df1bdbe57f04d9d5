/// Recording fakes for the orchestrator ports
///
/// Every fake appends to one shared call log so tests can assert the exact order of
/// prompts, unmounts and erase steps across ports.
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{self, Write};
use std::rc::Rc;
use usbwipe::erase::{EraseBackend, PartitionRef};
use usbwipe::mounts::{MountEntry, MountManager};
use usbwipe::ui::confirm::interpret_answer;
use usbwipe::ui::{ConfirmationGate, Decision};
use usbwipe::{Device, DeviceId, Mount, MountKind, WipeError, WipeResult};

#[derive(Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

#[allow(dead_code)]
impl CallLog {
    pub fn push(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0.borrow().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// Answers prompts from a queue of typed lines; an empty queue behaves like EOF
pub struct ScriptedGate {
    answers: VecDeque<String>,
    log: CallLog,
}

impl ScriptedGate {
    pub fn new(answers: &[&str], log: CallLog) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            log,
        }
    }
}

impl ConfirmationGate for ScriptedGate {
    fn confirm(&mut self, device: &Device) -> Decision {
        self.log.push(format!("confirm {}", device.id));
        match self.answers.pop_front() {
            Some(line) => interpret_answer(&line),
            None => Decision::Skip,
        }
    }
}

#[derive(Default)]
pub struct FakeMounts {
    table: HashMap<DeviceId, Vec<MountEntry>>,
    failing: HashSet<String>,
    log: CallLog,
}

#[allow(dead_code)]
impl FakeMounts {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn with_mount(mut self, device: &str, source: &str, mount_point: &str) -> Self {
        self.table
            .entry(DeviceId::path(device))
            .or_default()
            .push(MountEntry {
                source: source.to_string(),
                parent: None,
                mount_point: mount_point.to_string(),
                kind: MountKind::Filesystem,
                partition: None,
            });
        self
    }

    pub fn failing_at(mut self, mount_point: &str) -> Self {
        self.failing.insert(mount_point.to_string());
        self
    }
}

impl MountManager for FakeMounts {
    fn mount_table(&self, device: &Device) -> WipeResult<Vec<MountEntry>> {
        self.log.push(format!("mounts {}", device.id));
        Ok(self.table.get(&device.id).cloned().unwrap_or_default())
    }

    fn unmount(&self, mount: &Mount) -> WipeResult<()> {
        self.log.push(format!("unmount {}", mount.mount_point));
        if self.failing.contains(&mount.mount_point) {
            return Err(WipeError::UnmountFailed {
                mount: mount.mount_point.clone(),
                reason: "target is busy".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeBackend {
    failing_signature: HashSet<DeviceId>,
    failing_overwrite: HashSet<DeviceId>,
    failing_table: HashSet<DeviceId>,
    partitions: HashMap<DeviceId, Vec<PartitionRef>>,
    failing_partition: HashSet<String>,
    log: CallLog,
}

#[allow(dead_code)]
impl FakeBackend {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn failing_signature(mut self, device: &str) -> Self {
        self.failing_signature.insert(DeviceId::path(device));
        self
    }

    pub fn failing_overwrite(mut self, device: &str) -> Self {
        self.failing_overwrite.insert(DeviceId::path(device));
        self
    }

    pub fn failing_table(mut self, device: &str) -> Self {
        self.failing_table.insert(DeviceId::path(device));
        self
    }

    pub fn with_partition(mut self, device: &str, node: &str, number: u32) -> Self {
        self.partitions
            .entry(DeviceId::path(device))
            .or_default()
            .push(PartitionRef {
                node: node.to_string(),
                number,
            });
        self
    }

    pub fn failing_partition(mut self, node: &str) -> Self {
        self.failing_partition.insert(node.to_string());
        self
    }
}

impl EraseBackend for FakeBackend {
    fn clear_signatures(&self, device: &Device) -> WipeResult<()> {
        self.log.push(format!("signatures {}", device.id));
        if self.failing_signature.contains(&device.id) {
            return Err(WipeError::SignatureClearFailed("wipefs: device signature read failed".to_string()));
        }
        Ok(())
    }

    fn overwrite(&self, device: &Device, random_passes: u32) -> WipeResult<()> {
        self.log
            .push(format!("overwrite {} x{}", device.id, random_passes));
        if self.failing_overwrite.contains(&device.id) {
            return Err(WipeError::OverwriteFailed("write error".to_string()));
        }
        Ok(())
    }

    fn partitions(&self, device: &Device) -> WipeResult<Vec<PartitionRef>> {
        Ok(self.partitions.get(&device.id).cloned().unwrap_or_default())
    }

    fn remove_partition(&self, _device: &Device, partition: &PartitionRef) -> WipeResult<()> {
        self.log.push(format!("remove {}", partition.node));
        if self.failing_partition.contains(&partition.node) {
            return Err(WipeError::PartitionRemovalFailed {
                partition: partition.node.clone(),
                reason: "in use".to_string(),
            });
        }
        Ok(())
    }

    fn clear_partition_table(&self, device: &Device) -> WipeResult<()> {
        self.log.push(format!("table {}", device.id));
        if self.failing_table.contains(&device.id) {
            return Err(WipeError::TableClearFailed("device busy".to_string()));
        }
        Ok(())
    }
}

/// Captures orchestrator status output
#[derive(Clone, Default)]
pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
