pub mod snapper;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{Result, SnapborgError};

pub const CURRENT_SNAPSHOT: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Single,
    Pre,
    Post,
    Other(u16),
}

impl From<u16> for SnapshotKind {
    fn from(value: u16) -> Self {
        match value {
            0 => SnapshotKind::Single,
            1 => SnapshotKind::Pre,
            2 => SnapshotKind::Post,
            other => SnapshotKind::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub number: u32,
    pub kind: SnapshotKind,
    pub pre_number: u32,
    pub date: Option<DateTime<Utc>>,
    pub uid: u32,
    pub description: String,
    pub cleanup: String,
    pub userdata: HashMap<String, String>,
}

impl SnapshotRecord {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            kind: SnapshotKind::Single,
            pre_number: 0,
            date: None,
            uid: 0,
            description: String::new(),
            cleanup: String::new(),
            userdata: HashMap::new(),
        }
    }
}

pub trait SnapshotBackend {
    fn list_configs(&self) -> Result<Vec<String>>;
    fn list_snapshots(&self, config: &str) -> Result<Vec<SnapshotRecord>>;
    fn mount_snapshot(&self, config: &str, number: u32) -> Result<PathBuf>;
    fn umount_snapshot(&self, config: &str, number: u32) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountState {
    Unmounted,
    Mounted { native: PathBuf },
    BindMounted { native: PathBuf, bound: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHandle {
    config: String,
    id: u32,
    state: MountState,
}

impl SnapshotHandle {
    pub fn new(config: impl Into<String>, id: u32) -> Self {
        Self {
            config: config.into(),
            id,
            state: MountState::Unmounted,
        }
    }

    pub fn config(&self) -> &str {
        &self.config
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state(&self) -> &MountState {
        &self.state
    }

    pub fn native_path(&self) -> Option<&Path> {
        match &self.state {
            MountState::Unmounted => None,
            MountState::Mounted { native } | MountState::BindMounted { native, .. } => {
                Some(native.as_path())
            }
        }
    }

    pub fn bound_path(&self) -> Option<&Path> {
        match &self.state {
            MountState::BindMounted { bound, .. } => Some(bound.as_path()),
            _ => None,
        }
    }

    pub(crate) fn set_state(&mut self, state: MountState) {
        debug!(config = %self.config, id = self.id, ?state, "snapshot state");
        self.state = state;
    }
}

pub struct SnapshotSource<B: SnapshotBackend> {
    backend: B,
}

impl<B: SnapshotBackend> SnapshotSource<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn configs(&self) -> Result<Vec<String>> {
        self.backend.list_configs()
    }

    pub fn latest(&self, config: &str) -> Result<SnapshotHandle> {
        let records = self.backend.list_snapshots(config)?;
        let latest = records
            .iter()
            .filter(|r| r.number != CURRENT_SNAPSHOT)
            .max_by_key(|r| r.number)
            .ok_or_else(|| SnapborgError::NoSnapshotsFound(config.to_string()))?;
        info!(config, id = latest.number, description = %latest.description, "latest snapshot");
        Ok(SnapshotHandle::new(config, latest.number))
    }

    pub fn mount(&self, handle: &mut SnapshotHandle) -> Result<PathBuf> {
        if let Some(native) = handle.native_path() {
            return Ok(native.to_path_buf());
        }
        let native = self
            .backend
            .mount_snapshot(handle.config(), handle.id())
            .map_err(|e| match e {
                SnapborgError::MountFailed(_) => e,
                other => SnapborgError::MountFailed(format!(
                    "snapshot {} of {}: {}",
                    handle.id(),
                    handle.config(),
                    other
                )),
            })?;
        info!(config = %handle.config(), id = handle.id(), path = %native.display(), "snapshot mounted");
        handle.set_state(MountState::Mounted {
            native: native.clone(),
        });
        Ok(native)
    }

    pub fn unmount(&self, handle: &mut SnapshotHandle) -> Result<()> {
        if handle.state() == &MountState::Unmounted {
            return Ok(());
        }
        self.backend
            .umount_snapshot(handle.config(), handle.id())
            .map_err(|e| match e {
                SnapborgError::UnmountFailed(_) => e,
                other => SnapborgError::UnmountFailed(format!(
                    "snapshot {} of {}: {}",
                    handle.id(),
                    handle.config(),
                    other
                )),
            })?;
        info!(config = %handle.config(), id = handle.id(), "snapshot unmounted");
        handle.set_state(MountState::Unmounted);
        Ok(())
    }
}
