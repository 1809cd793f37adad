use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::{Result, SnapborgError};

pub fn is_safe_name(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

pub fn ensure_private_dir(path: &Path) -> Result<()> {
    if path.exists() {
        let meta = fs::metadata(path)
            .map_err(|e| SnapborgError::message(format!("stat {}: {}", path.display(), e)))?;
        if !meta.is_dir() {
            return Err(SnapborgError::message(format!(
                "{} is not a directory",
                path.display()
            )));
        }
    } else {
        fs::create_dir_all(path)
            .map_err(|e| SnapborgError::message(format!("create {}: {}", path.display(), e)))?;
    }
    let mut perms = fs::metadata(path)
        .map_err(|e| SnapborgError::message(format!("stat {}: {}", path.display(), e)))?
        .permissions();
    perms.set_mode(0o700);
    fs::set_permissions(path, perms)
        .map_err(|e| SnapborgError::message(format!("chmod {}: {}", path.display(), e)))?;
    Ok(())
}

pub fn remove_empty_dir(path: &Path) -> io::Result<()> {
    match fs::remove_dir(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
