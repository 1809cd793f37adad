use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SnapborgError};

const MOUNTS_FILE: &str = "/proc/self/mounts";

fn read_mounts() -> Result<String> {
    fs::read_to_string(MOUNTS_FILE)
        .map_err(|e| SnapborgError::message(format!("read {}: {}", MOUNTS_FILE, e)))
}

// /proc/self/mounts escapes space, tab, newline and backslash as octal.
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits.iter().fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(value) = u8::try_from(value) {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn mountpoints(contents: &str) -> impl Iterator<Item = PathBuf> + '_ {
    contents.lines().filter_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            return None;
        }
        Some(PathBuf::from(unescape_mount_field(fields[1])))
    })
}

pub fn mountpoint_is_mounted(mountpoint: &Path) -> Result<bool> {
    let contents = read_mounts()?;
    let found = mountpoints(&contents).any(|m| m == mountpoint);
    Ok(found)
}

pub fn find_mounts_under(base: &Path) -> Result<Vec<PathBuf>> {
    let contents = read_mounts()?;
    Ok(mounts_under(&contents, base))
}

fn mounts_under(contents: &str, base: &Path) -> Vec<PathBuf> {
    let mut mounts: Vec<PathBuf> = mountpoints(contents)
        .filter(|m| m.starts_with(base) && m != base)
        .collect();
    mounts.sort_by(|a, b| {
        b.as_os_str()
            .len()
            .cmp(&a.as_os_str().len())
            .then_with(|| a.cmp(b))
    });
    mounts.dedup();
    mounts
}
