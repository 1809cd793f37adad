use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, SnapborgError};
use crate::mount::{MountOps, SystemMounts};
use crate::snapshot::{MountState, SnapshotHandle};
use crate::util::paths::{ensure_private_dir, is_safe_name, remove_empty_dir};

pub struct BindMounter<M: MountOps = SystemMounts> {
    ops: M,
    prefix: PathBuf,
}

impl BindMounter<SystemMounts> {
    pub fn system(prefix: impl Into<PathBuf>) -> Self {
        Self::new(SystemMounts, prefix)
    }
}

impl<M: MountOps> BindMounter<M> {
    pub fn new(ops: M, prefix: impl Into<PathBuf>) -> Self {
        Self {
            ops,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn ops(&self) -> &M {
        &self.ops
    }

    pub fn target_for(&self, handle: &SnapshotHandle) -> Result<PathBuf> {
        if !is_safe_name(handle.config()) {
            return Err(SnapborgError::MountFailed(format!(
                "snapper config {} is not usable as a directory name",
                handle.config()
            )));
        }
        Ok(self
            .prefix
            .join(handle.config())
            .join(handle.id().to_string()))
    }

    pub fn bind(&self, handle: &mut SnapshotHandle) -> Result<PathBuf> {
        let native = match handle.state() {
            MountState::Mounted { native } => native.clone(),
            MountState::BindMounted { bound, .. } => return Ok(bound.clone()),
            MountState::Unmounted => {
                return Err(SnapborgError::MountFailed(format!(
                    "snapshot {} of {} is not mounted",
                    handle.id(),
                    handle.config()
                )))
            }
        };
        let target = self.target_for(handle)?;
        ensure_private_dir(&target).map_err(|e| SnapborgError::MountFailed(e.to_string()))?;
        // the kernel lists mountpoints by their resolved path
        let target = fs::canonicalize(&target).map_err(|e| {
            SnapborgError::MountFailed(format!("resolve {}: {}", target.display(), e))
        })?;
        if self.ops.is_mounted(&target)? {
            return Err(SnapborgError::MountFailed(format!(
                "{} is already in use",
                target.display()
            )));
        }
        if let Err(err) = self.ops.bind(&native, &target) {
            let _ = remove_empty_dir(&target);
            return Err(match err {
                SnapborgError::MountFailed(_) => err,
                other => SnapborgError::MountFailed(other.to_string()),
            });
        }
        info!(source = %native.display(), target = %target.display(), "bind mounted");
        handle.set_state(MountState::BindMounted {
            native,
            bound: target.clone(),
        });
        Ok(target)
    }

    pub fn unbind(&self, path: &Path) -> Result<()> {
        let path = resolved(path);
        if self.ops.is_mounted(&path)? {
            self.ops.unmount(&path)?;
            info!(target = %path.display(), "bind unmounted");
        }
        match remove_empty_dir(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.raw_os_error() == Some(libc::EBUSY) => {
                Err(SnapborgError::UnmountFailed(format!(
                    "{} is still mounted",
                    path.display()
                )))
            }
            Err(err) => {
                warn!(target = %path.display(), error = %err, "could not remove bind directory");
                Ok(())
            }
        }
    }

    pub fn release(&self, handle: &mut SnapshotHandle) -> Result<()> {
        let (native, bound) = match handle.state() {
            MountState::BindMounted { native, bound } => (native.clone(), bound.clone()),
            _ => return Ok(()),
        };
        self.unbind(&bound)?;
        handle.set_state(MountState::Mounted { native });
        Ok(())
    }

    pub fn recover_stale(&self) -> Vec<SnapborgError> {
        let mut errors = Vec::new();
        let prefix = resolved(&self.prefix);
        let stale = match self.ops.mounts_under(&prefix) {
            Ok(stale) => stale,
            Err(err) => {
                errors.push(err);
                return errors;
            }
        };
        for mount in stale {
            warn!(target = %mount.display(), "unmounting stale bind mount");
            if let Err(err) = self.unbind(&mount) {
                warn!(target = %mount.display(), error = %err, "stale unmount failed");
                errors.push(err);
            }
        }
        errors
    }
}

// Paths that do not exist yet are compared as given.
fn resolved(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
