use std::path::{Path, PathBuf};

use crate::config::model::RepositoryDefaults;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    name: String,
    snapper_config: String,
    path: PathBuf,
    encryption: String,
    compression: String,
    prune_flags: Vec<String>,
}

impl Repository {
    pub fn new(
        name: impl Into<String>,
        snapper_config: impl Into<String>,
        path: impl Into<PathBuf>,
        encryption: impl Into<String>,
        compression: impl Into<String>,
        prune_flags: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            snapper_config: snapper_config.into(),
            path: path.into(),
            encryption: encryption.into(),
            compression: compression.into(),
            prune_flags,
        }
    }

    pub fn for_snapper_config(config: &str, backup_path: &Path, defaults: &RepositoryDefaults) -> Self {
        Self::new(
            config,
            config,
            backup_path.join(config),
            defaults.encryption.clone(),
            defaults.compression.clone(),
            defaults.prune_flags.clone(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn snapper_config(&self) -> &str {
        &self.snapper_config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn encryption(&self) -> &str {
        &self.encryption
    }

    pub fn compression(&self) -> &str {
        &self.compression
    }

    pub fn prune_flags(&self) -> &[String] {
        &self.prune_flags
    }

    pub fn location(&self, archive: &str) -> String {
        format!("{}::{}", self.path.display(), archive)
    }
}
