use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::archive::diagnostics::{render_diagnostics, Diagnostic};

pub const EXIT_RUN_FAILED: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_ALREADY_RUNNING: i32 = 3;
pub const EXIT_NOT_ROOT: i32 = 4;

#[derive(Debug, Error)]
pub enum SnapborgError {
    #[error("must be run as root")]
    PrivilegeDenied,
    #[error("another instance is already running (lock {})", .0.display())]
    AlreadyRunning(PathBuf),
    #[error("no snapshots found for snapper config {0}")]
    NoSnapshotsFound(String),
    #[error("mount {0}")]
    MountFailed(String),
    #[error("umount {0}")]
    UnmountFailed(String),
    #[error("{command} failed with {status}{}", render_diagnostics(.diagnostics))]
    ArchiveToolFailed {
        command: String,
        status: String,
        diagnostics: Vec<Diagnostic>,
    },
    #[error("malformed response from {0}")]
    MalformedResponse(String),
    #[error("{command} timed out after {}s", .after.as_secs())]
    TimedOut { command: String, after: Duration },
    #[error("snapper: {0}")]
    Backend(String),
    #[error("{0}")]
    Config(ConfigError),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Message(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parse config: {0}")]
    Parse(String),
    #[error("{0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, SnapborgError>;

impl SnapborgError {
    pub fn message(msg: impl Into<String>) -> Self {
        SnapborgError::Message(msg.into())
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            SnapborgError::PrivilegeDenied => EXIT_NOT_ROOT,
            SnapborgError::AlreadyRunning(_) => EXIT_ALREADY_RUNNING,
            SnapborgError::Config(_) => EXIT_USAGE,
            _ => EXIT_RUN_FAILED,
        }
    }
}

impl From<ConfigError> for SnapborgError {
    fn from(err: ConfigError) -> Self {
        SnapborgError::Config(err)
    }
}
