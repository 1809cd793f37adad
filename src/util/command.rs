use std::ffi::OsString;
use std::process::Command;

use tracing::debug;

use crate::error::{Result, SnapborgError};

pub fn describe_command(cmd: &Command) -> String {
    let program = cmd.get_program().to_string_lossy();
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| a.to_string_lossy().to_string())
        .collect();
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

pub fn run_command(cmd: &mut Command) -> Result<i32> {
    let line = describe_command(cmd);
    debug!(command = %line, "run");
    let status = cmd
        .status()
        .map_err(|e| SnapborgError::message(format!("{}: {}", line, e)))?;
    Ok(status.code().unwrap_or(1))
}

pub fn niced_command(
    program: &str,
    args: &[OsString],
    niceness: Option<i32>,
    io_niceness: Option<u8>,
) -> Command {
    let mut argv: Vec<OsString> = Vec::new();
    if let Some(level) = niceness {
        argv.push("nice".into());
        argv.push("-n".into());
        argv.push(level.to_string().into());
    }
    if let Some(level) = io_niceness {
        argv.push("ionice".into());
        argv.push("-c".into());
        argv.push("2".into());
        argv.push(format!("-n{}", level).into());
    }
    argv.push(program.into());
    argv.extend(args.iter().cloned());

    let mut iter = argv.into_iter();
    let mut cmd = Command::new(iter.next().unwrap_or_else(|| program.into()));
    cmd.args(iter);
    cmd
}
