pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod instance;
pub mod lock;
pub mod mount;
pub mod orchestrator;
pub mod snapshot;
pub mod types;
pub mod util;

pub use error::{Result, SnapborgError};
pub use instance::Instance;
pub use orchestrator::{BackupReport, Orchestrator};
pub use types::{RunCommand, RunMode};
