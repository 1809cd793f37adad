pub mod bind;
pub mod inspect;
pub mod ops;

use std::path::{Path, PathBuf};

use crate::error::Result;

pub use bind::BindMounter;

pub trait MountOps {
    fn bind(&self, source: &Path, target: &Path) -> Result<()>;
    fn unmount(&self, target: &Path) -> Result<()>;
    fn is_mounted(&self, target: &Path) -> Result<bool>;
    fn mounts_under(&self, base: &Path) -> Result<Vec<PathBuf>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMounts;

impl MountOps for SystemMounts {
    fn bind(&self, source: &Path, target: &Path) -> Result<()> {
        ops::bind_mount(source, target)
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        ops::unmount_path(target)
    }

    fn is_mounted(&self, target: &Path) -> Result<bool> {
        inspect::mountpoint_is_mounted(target)
    }

    fn mounts_under(&self, base: &Path) -> Result<Vec<PathBuf>> {
        inspect::find_mounts_under(base)
    }
}
