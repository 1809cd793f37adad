use std::process::Command;
use std::time::Duration;

pub const ENV_KEY_FILE: &str = "BORG_KEY_FILE";
pub const ENV_PASSPHRASE: &str = "BORG_PASSPHRASE";
pub const ENV_PASSCOMMAND: &str = "BORG_PASSCOMMAND";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretEnv {
    vars: Vec<(&'static str, String)>,
}

impl SecretEnv {
    pub fn new(key_file: Option<&str>, passphrase: Option<&str>, passcommand: Option<&str>) -> Self {
        let mut vars = Vec::new();
        for (name, value) in [
            (ENV_KEY_FILE, key_file),
            (ENV_PASSPHRASE, passphrase),
            (ENV_PASSCOMMAND, passcommand),
        ] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                vars.push((name, value.to_string()));
            }
        }
        Self { vars }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.vars.iter().map(|(name, _)| *name).collect()
    }

    pub fn apply(&self, cmd: &mut Command) {
        for (name, value) in &self.vars {
            cmd.env(name, value);
        }
    }
}

impl std::fmt::Debug for SecretEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEnv").field("vars", &self.names()).finish()
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    pub program: String,
    pub hostname: String,
    pub create_flags: Vec<String>,
    pub archive_suffix: String,
    pub prune_glob: Option<String>,
    pub secrets: SecretEnv,
    pub niceness: Option<i32>,
    pub io_niceness: Option<u8>,
    pub timeout: Option<Duration>,
    pub compact_after_prune: bool,
}

impl ArchiveSettings {
    pub fn new(program: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            hostname: hostname.into(),
            create_flags: Vec::new(),
            archive_suffix: "-".to_string(),
            prune_glob: None,
            secrets: SecretEnv::default(),
            niceness: None,
            io_niceness: None,
            timeout: None,
            compact_after_prune: false,
        }
    }
}
