use super::MountManager;
use crate::Mount;

/// Progress of unmounting one device
#[derive(Debug, Clone, PartialEq)]
pub enum UnmountState {
    Pending,
    Unmounting { done: usize, total: usize },
    Unmounted,
    Failed { mount: Mount, reason: String },
}

impl UnmountState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UnmountState::Unmounted | UnmountState::Failed { .. })
    }
}

/// Unmounts a device's mounts sequentially in discovery order.
/// The first failure abandons the remaining mounts.
pub struct UnmountCoordinator<'a> {
    manager: &'a dyn MountManager,
    state: UnmountState,
}

impl<'a> UnmountCoordinator<'a> {
    pub fn new(manager: &'a dyn MountManager) -> Self {
        Self {
            manager,
            state: UnmountState::Pending,
        }
    }

    pub fn state(&self) -> &UnmountState {
        &self.state
    }

    /// Drive the state machine to a terminal state.
    ///
    /// `on_unmount` is called before each unmount with the mount and its
    /// 1-based position, so callers can print progress.
    pub fn unmount_all<F>(&mut self, mounts: &[Mount], mut on_unmount: F) -> UnmountState
    where
        F: FnMut(&Mount, usize, usize),
    {
        let total = mounts.len();
        self.state = UnmountState::Unmounting { done: 0, total };

        for (index, mount) in mounts.iter().enumerate() {
            on_unmount(mount, index + 1, total);

            if let Err(e) = self.manager.unmount(mount) {
                tracing::warn!(
                    device = %mount.device,
                    mount_point = %mount.mount_point,
                    error = %e,
                    "Unmount failed; abandoning remaining mounts"
                );
                self.state = UnmountState::Failed {
                    mount: mount.clone(),
                    reason: e.to_string(),
                };
                return self.state.clone();
            }

            self.state = UnmountState::Unmounting {
                done: index + 1,
                total,
            };
        }

        self.state = UnmountState::Unmounted;
        self.state.clone()
    }
}
