use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::archive::{ArchiveSettings, Repository};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default, rename = "backupPath", skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
    #[serde(default, rename = "bindMountPrefix", skip_serializing_if = "Option::is_none")]
    pub bind_mount_prefix: Option<String>,
    #[serde(default, rename = "lockFile", skip_serializing_if = "Option::is_none")]
    pub lock_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default)]
    pub borg: BorgOptions,
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct BorgOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
    #[serde(default, rename = "createFlags", skip_serializing_if = "Option::is_none")]
    pub create_flags: Option<Vec<String>>,
    #[serde(default, rename = "pruneFlags", skip_serializing_if = "Option::is_none")]
    pub prune_flags: Option<Vec<String>>,
    #[serde(default, rename = "pruneGlob", skip_serializing_if = "Option::is_none")]
    pub prune_glob: Option<String>,
    #[serde(default, rename = "archiveSuffix", skip_serializing_if = "Option::is_none")]
    pub archive_suffix: Option<String>,
    #[serde(default, rename = "keyFile", skip_serializing_if = "Option::is_none")]
    pub key_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passcommand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub niceness: Option<i32>,
    #[serde(default, rename = "ioNiceness", skip_serializing_if = "Option::is_none")]
    pub io_niceness: Option<u8>,
    #[serde(default, rename = "timeoutSecs", skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, rename = "compactAfterPrune", skip_serializing_if = "Option::is_none")]
    pub compact_after_prune: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RepositoryConfig {
    pub name: String,
    #[serde(default, rename = "snapperConfig", skip_serializing_if = "Option::is_none")]
    pub snapper_config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
    #[serde(default, rename = "pruneFlags", skip_serializing_if = "Option::is_none")]
    pub prune_flags: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub backup_path: PathBuf,
    pub bind_mount_prefix: PathBuf,
    pub lock_file: Option<PathBuf>,
    pub archive: ArchiveSettings,
    pub defaults: RepositoryDefaults,
    pub repositories: Vec<Repository>,
}

#[derive(Debug, Clone)]
pub struct RepositoryDefaults {
    pub encryption: String,
    pub compression: String,
    pub prune_flags: Vec<String>,
}
