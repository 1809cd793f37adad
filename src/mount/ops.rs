use std::path::Path;
use std::process::Command;

use crate::error::{Result, SnapborgError};
use crate::util::command::run_command;

pub fn bind_mount(source: &Path, target: &Path) -> Result<()> {
    let mut cmd = Command::new("mount");
    cmd.arg("-o").arg("bind,ro").arg(source).arg(target);
    let rc = run_command(&mut cmd)
        .map_err(|e| SnapborgError::MountFailed(format!("{}: {}", target.display(), e)))?;
    if rc != 0 {
        return Err(SnapborgError::MountFailed(format!(
            "bind {} on {} failed with exit code {}",
            source.display(),
            target.display(),
            rc
        )));
    }
    Ok(())
}

pub fn unmount_path(mountpoint: &Path) -> Result<()> {
    let mut cmd = Command::new("umount");
    cmd.arg(mountpoint);
    let rc = run_command(&mut cmd)
        .map_err(|e| SnapborgError::UnmountFailed(format!("{}: {}", mountpoint.display(), e)))?;
    if rc != 0 {
        return Err(SnapborgError::UnmountFailed(format!(
            "{} failed with exit code {}",
            mountpoint.display(),
            rc
        )));
    }
    Ok(())
}
