use std::path::{Path, PathBuf};

use tracing::error;

use crate::error::{Result, SnapborgError};
use crate::lock::InstanceLock;
use crate::util::is_privileged;

#[derive(Debug, Clone)]
pub struct Instance {
    lock_path: PathBuf,
    require_root: bool,
    privileged: fn() -> bool,
}

impl Instance {
    pub fn new(lock_path: impl Into<PathBuf>) -> Self {
        Self {
            lock_path: lock_path.into(),
            require_root: true,
            privileged: is_privileged,
        }
    }

    pub fn require_root(mut self, require: bool) -> Self {
        self.require_root = require;
        self
    }

    pub fn with_privilege_check(mut self, check: fn() -> bool) -> Self {
        self.privileged = check;
        self
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn run<T, F>(&self, body: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        if self.require_root && !(self.privileged)() {
            error!("not running as root");
            return Err(SnapborgError::PrivilegeDenied);
        }
        let mut lock = InstanceLock::new(&self.lock_path);
        if !lock.acquire()? {
            error!(path = %self.lock_path.display(), "already running");
            return Err(SnapborgError::AlreadyRunning(self.lock_path.clone()));
        }
        let result = body();
        lock.release();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    #[test]
    fn held_lock_stops_run_before_body() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("snapborg.lock");
        let mut other = InstanceLock::new(&path);
        assert!(other.acquire().expect("acquire"));

        let called = Cell::new(false);
        let result = Instance::new(&path).require_root(false).run(|| {
            called.set(true);
            Ok(())
        });
        match result {
            Err(err @ SnapborgError::AlreadyRunning(_)) => {
                assert_eq!(err.exit_code(), crate::error::EXIT_ALREADY_RUNNING)
            }
            other => panic!("expected AlreadyRunning, got {:?}", other),
        }
        assert!(!called.get());
    }

    #[test]
    fn lock_is_released_after_failing_body() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("snapborg.lock");
        let instance = Instance::new(&path).require_root(false);
        let result: Result<()> =
            instance.run(|| Err(SnapborgError::NoSnapshotsFound("root".to_string())));
        assert!(matches!(result, Err(SnapborgError::NoSnapshotsFound(_))));

        let mut next = InstanceLock::new(&path);
        assert!(next.acquire().expect("acquire"));
    }

    #[test]
    fn lock_is_released_after_panicking_body() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("snapborg.lock");
        let instance = Instance::new(&path).require_root(false);
        let outcome = std::panic::catch_unwind(|| {
            let _: Result<()> = instance.run(|| panic!("boom"));
        });
        assert!(outcome.is_err());

        let mut next = InstanceLock::new(&path);
        assert!(next.acquire().expect("acquire"));
    }

    #[test]
    fn body_result_is_returned() {
        let dir = TempDir::new().expect("tempdir");
        let instance = Instance::new(dir.path().join("snapborg.lock")).require_root(false);
        let value = instance.run(|| Ok(42)).expect("run");
        assert_eq!(value, 42);
    }

    #[test]
    fn unprivileged_run_is_denied_before_locking() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("snapborg.lock");
        let called = Cell::new(false);
        let result = Instance::new(&path)
            .with_privilege_check(|| false)
            .run(|| {
                called.set(true);
                Ok(())
            });
        match result {
            Err(err @ SnapborgError::PrivilegeDenied) => {
                assert_eq!(err.exit_code(), crate::error::EXIT_NOT_ROOT)
            }
            other => panic!("expected PrivilegeDenied, got {:?}", other),
        }
        assert!(!called.get());
        assert!(!path.exists(), "lock file must not be touched");
    }

    #[test]
    fn privileged_run_takes_the_lock() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("snapborg.lock");
        let instance = Instance::new(&path).with_privilege_check(|| true);
        let held = instance
            .run(|| {
                let mut other = InstanceLock::new(&path);
                Ok(other.acquire().expect("acquire"))
            })
            .expect("run");
        assert!(!held);
    }
}
