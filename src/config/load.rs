use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::archive::{ArchiveSettings, Repository, SecretEnv};
use crate::config::model::{Config, RepositoryDefaults, RuntimeConfig};
use crate::error::{ConfigError, Result, SnapborgError};
use crate::util::hostname;
use crate::util::paths::is_safe_name;

pub const DEFAULT_BACKUP_PATH: &str = "/mnt/external1/backups";
pub const DEFAULT_BIND_MOUNT_PREFIX: &str = "/tmp/borg";
pub const DEFAULT_BORG_COMMAND: &str = "borg";
pub const DEFAULT_ENCRYPTION: &str = "repokey-blake2";
pub const DEFAULT_COMPRESSION: &str = "auto,zstd";
pub const DEFAULT_CREATE_FLAGS: &[&str] = &["-x", "-s"];
pub const DEFAULT_PRUNE_FLAGS: &[&str] = &["--keep-within", "1d", "-d", "10", "-w", "10", "-m", "6"];
pub const DEFAULT_ARCHIVE_SUFFIX: &str = "-";
pub const DEFAULT_NICENESS: i32 = 19;
pub const DEFAULT_IO_NICENESS: u8 = 7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 86_400;

pub fn load_config(path: &Path) -> Result<RuntimeConfig> {
    let mut contents = String::new();
    File::open(path)
        .map_err(|e| ConfigError::Parse(format!("open {}: {}", path.display(), e)))?
        .read_to_string(&mut contents)
        .map_err(|e| ConfigError::Parse(format!("read {}: {}", path.display(), e)))?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<RuntimeConfig> {
    let cfg: Config =
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
    parse_runtime(cfg)
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_runtime(cfg: Config) -> Result<RuntimeConfig> {
    let backup_path = PathBuf::from(
        non_empty(cfg.backup_path).unwrap_or_else(|| DEFAULT_BACKUP_PATH.to_string()),
    );
    if !backup_path.is_absolute() {
        return Err(ConfigError::Invalid(format!(
            "backupPath {} must be absolute",
            backup_path.display()
        ))
        .into());
    }
    let bind_mount_prefix = PathBuf::from(
        non_empty(cfg.bind_mount_prefix).unwrap_or_else(|| DEFAULT_BIND_MOUNT_PREFIX.to_string()),
    );
    if !bind_mount_prefix.is_absolute() || bind_mount_prefix == Path::new("/") {
        return Err(ConfigError::Invalid(format!(
            "bindMountPrefix {} must be an absolute directory other than /",
            bind_mount_prefix.display()
        ))
        .into());
    }

    let borg = cfg.borg;
    let defaults = RepositoryDefaults {
        encryption: non_empty(borg.encryption).unwrap_or_else(|| DEFAULT_ENCRYPTION.to_string()),
        compression: non_empty(borg.compression)
            .unwrap_or_else(|| DEFAULT_COMPRESSION.to_string()),
        prune_flags: borg
            .prune_flags
            .unwrap_or_else(|| owned(DEFAULT_PRUNE_FLAGS)),
    };
    if defaults.prune_flags.is_empty() {
        return Err(ConfigError::Invalid(
            "pruneFlags is empty; borg prune needs at least one keep rule".to_string(),
        )
        .into());
    }

    let archive_suffix = borg
        .archive_suffix
        .unwrap_or_else(|| DEFAULT_ARCHIVE_SUFFIX.to_string());
    if archive_suffix.contains('/') || archive_suffix.contains("::") {
        return Err(ConfigError::Invalid(format!(
            "archiveSuffix {:?} must not contain '/' or '::'",
            archive_suffix
        ))
        .into());
    }

    let timeout = match borg.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS) {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    let archive = ArchiveSettings {
        program: non_empty(borg.command).unwrap_or_else(|| DEFAULT_BORG_COMMAND.to_string()),
        hostname: non_empty(cfg.hostname).unwrap_or_else(hostname),
        create_flags: borg
            .create_flags
            .unwrap_or_else(|| owned(DEFAULT_CREATE_FLAGS)),
        archive_suffix,
        prune_glob: non_empty(borg.prune_glob),
        secrets: SecretEnv::new(
            borg.key_file.as_deref(),
            borg.passphrase.as_deref(),
            borg.passcommand.as_deref(),
        ),
        niceness: Some(borg.niceness.unwrap_or(DEFAULT_NICENESS)),
        io_niceness: Some(borg.io_niceness.unwrap_or(DEFAULT_IO_NICENESS)),
        timeout,
        compact_after_prune: borg.compact_after_prune.unwrap_or(true),
    };

    let mut names = HashSet::new();
    let mut repositories = Vec::new();
    for repo in cfg.repositories {
        if repo.name.trim().is_empty() {
            return Err(ConfigError::Invalid("repository name is required".to_string()).into());
        }
        if !is_safe_name(&repo.name) {
            return Err(ConfigError::Invalid(format!(
                "repository {} name must use only letters, digits, '.', '-', '_'",
                repo.name
            ))
            .into());
        }
        if !names.insert(repo.name.clone()) {
            return Err(
                ConfigError::Invalid(format!("duplicate repository name {}", repo.name)).into(),
            );
        }
        let snapper_config = non_empty(repo.snapper_config).unwrap_or_else(|| repo.name.clone());
        if !is_safe_name(&snapper_config) {
            return Err(ConfigError::Invalid(format!(
                "repository {}: snapperConfig {} must use only letters, digits, '.', '-', '_'",
                repo.name, snapper_config
            ))
            .into());
        }
        let path = match non_empty(repo.path) {
            Some(path) => PathBuf::from(path),
            None => backup_path.join(&repo.name),
        };
        if !path.is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "repository {}: path {} must be absolute",
                repo.name,
                path.display()
            ))
            .into());
        }
        let prune_flags = repo
            .prune_flags
            .unwrap_or_else(|| defaults.prune_flags.clone());
        repositories.push(Repository::new(
            repo.name,
            snapper_config,
            path,
            non_empty(repo.encryption).unwrap_or_else(|| defaults.encryption.clone()),
            non_empty(repo.compression).unwrap_or_else(|| defaults.compression.clone()),
            prune_flags,
        ));
    }

    Ok(RuntimeConfig {
        backup_path,
        bind_mount_prefix,
        lock_file: non_empty(cfg.lock_file).map(PathBuf::from),
        archive,
        defaults,
        repositories,
    })
}

impl RuntimeConfig {
    pub fn resolve_repositories(
        &self,
        snapper_configs: impl FnOnce() -> Result<Vec<String>>,
        selected: &[String],
    ) -> Result<Vec<Repository>> {
        let all = if self.repositories.is_empty() {
            let mut repos = Vec::new();
            for config in snapper_configs()? {
                if !is_safe_name(&config) {
                    tracing::warn!(config = %config, "skipping snapper config with unusable name");
                    continue;
                }
                repos.push(Repository::for_snapper_config(
                    &config,
                    &self.backup_path,
                    &self.defaults,
                ));
            }
            repos
        } else {
            self.repositories.clone()
        };

        if selected.is_empty() {
            return Ok(all);
        }
        let mut picked = Vec::new();
        for name in selected {
            match all.iter().find(|repo| repo.name() == name) {
                Some(repo) => picked.push(repo.clone()),
                None => {
                    return Err(SnapborgError::Config(ConfigError::Invalid(format!(
                        "repository not found: {}",
                        name
                    ))))
                }
            }
        }
        Ok(picked)
    }
}
