//! Single-instance guard on `flock(2)`. The kernel drops the lock when the
//! process dies.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, SnapborgError};

#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    file: Option<File>,
}

impl InstanceLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn acquire(&mut self) -> Result<bool> {
        if self.file.is_some() {
            return Ok(true);
        }
        let file = open_lock_file(&self.path).map_err(|e| {
            SnapborgError::message(format!("open lock {}: {}", self.path.display(), e))
        })?;
        info!(path = %self.path.display(), "lock attempt");
        match try_flock_exclusive(&file) {
            Ok(true) => {
                info!(path = %self.path.display(), "lock acquired");
                self.file = Some(file);
                Ok(true)
            }
            Ok(false) => {
                info!(path = %self.path.display(), "lock held by another process");
                Ok(false)
            }
            Err(err) => Err(SnapborgError::message(format!(
                "lock {}: {}",
                self.path.display(),
                err
            ))),
        }
    }

    pub fn release(&mut self) -> bool {
        let Some(file) = self.file.take() else {
            return false;
        };
        info!(path = %self.path.display(), "unlock attempt");
        // SAFETY: fd is owned by `file`, which is alive for the call.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
        if rc != 0 {
            warn!(
                path = %self.path.display(),
                error = %io::Error::last_os_error(),
                "unlock failed"
            );
            return false;
        }
        info!(path = %self.path.display(), "lock released");
        true
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if self.file.is_some() {
            let _ = self.release();
        }
    }
}

// The executable itself is the default lock path and cannot be opened for
// writing while it runs, so existing files are opened read-only.
fn open_lock_file(path: &Path) -> io::Result<File> {
    match OpenOptions::new().read(true).open(path) {
        Ok(file) => Ok(file),
        Err(err) if err.kind() == io::ErrorKind::NotFound => OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path),
        Err(err) => Err(err),
    }
}

fn try_flock_exclusive(file: &File) -> io::Result<bool> {
    // SAFETY: fd is a valid descriptor owned by `file`; LOCK_NB never blocks.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        return Ok(false);
    }
    Err(err)
}
