use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::archive::diagnostics::{parse_diagnostics, Diagnostic};
use crate::error::{Result, SnapborgError};
use crate::util::command::describe_command;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct CommandResult {
    pub command: String,
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn status_text(&self) -> String {
        match self.status.code() {
            Some(code) => format!("exit code {}", code),
            None => "termination by signal".to_string(),
        }
    }

    pub fn into_checked(self) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        Err(SnapborgError::ArchiveToolFailed {
            status: self.status_text(),
            command: self.command,
            diagnostics: self.diagnostics,
        })
    }
}

pub fn execute(mut cmd: Command, timeout: Option<Duration>) -> Result<CommandResult> {
    let line = describe_command(&cmd);
    debug!(command = %line, "spawn");
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd
        .spawn()
        .map_err(|e| SnapborgError::message(format!("{}: {}", line, e)))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_reader = thread::spawn(move || read_stream(stdout));
    let stderr_reader = thread::spawn(move || read_stream(stderr));

    let waited = wait_with_deadline(&mut child, timeout);
    let (stdout, stdout_error) = stdout_reader.join().unwrap_or_default();
    let (stderr, stderr_error) = stderr_reader.join().unwrap_or_default();
    if let Some(err) = &stdout_error {
        warn!(command = %line, error = %err, "stdout read failed; output may be truncated");
    }

    let status = match waited {
        Ok(Some(status)) => status,
        Ok(None) => {
            warn!(command = %line, "killed after timeout");
            return Err(SnapborgError::TimedOut {
                command: line,
                after: timeout.unwrap_or_default(),
            });
        }
        Err(err) => {
            return Err(SnapborgError::message(format!("wait {}: {}", line, err)));
        }
    };

    let mut diagnostics = parse_diagnostics(&stderr);
    if let Some(err) = stderr_error {
        warn!(command = %line, error = %err, "stderr read failed; diagnostics may be truncated");
        diagnostics.push(Diagnostic::Text(format!("stderr truncated: {}", err)));
    }
    debug!(command = %line, status = ?status.code(), records = diagnostics.len(), "finished");
    Ok(CommandResult {
        command: line,
        status,
        stdout,
        diagnostics,
    })
}

// Keeps whatever was read before a failure, along with the error.
fn read_stream<R: Read>(stream: Option<R>) -> (Vec<u8>, Option<String>) {
    let mut buf = Vec::new();
    let error = match stream {
        Some(mut stream) => stream.read_to_end(&mut buf).err().map(|e| e.to_string()),
        None => None,
    };
    (buf, error)
}

// Ok(None) means the deadline passed and the child was killed.
fn wait_with_deadline(
    child: &mut Child,
    timeout: Option<Duration>,
) -> std::io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };
    let Some(deadline) = Instant::now().checked_add(timeout) else {
        return child.wait().map(Some);
    };
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
