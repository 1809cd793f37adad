use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LogRecord {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub levelname: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msgid: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Record(LogRecord),
    Text(String),
}

impl Diagnostic {
    pub fn level(&self) -> Option<&str> {
        match self {
            Diagnostic::Record(record) => record.levelname.as_deref(),
            Diagnostic::Text(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.level(), Some("ERROR") | Some("CRITICAL"))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.level(), Some("WARNING"))
    }

    pub fn is_noise(&self) -> bool {
        match self {
            Diagnostic::Record(record) => matches!(
                record.kind.as_deref(),
                Some("progress_message") | Some("progress_percent") | Some("file_status")
            ),
            Diagnostic::Text(text) => text.trim().is_empty(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Text(text) => f.write_str(text),
            Diagnostic::Record(record) => {
                if let Some(level) = &record.levelname {
                    write!(f, "{}: ", level)?;
                }
                match (&record.message, &record.status, &record.path) {
                    (Some(message), _, _) => f.write_str(message),
                    (None, Some(status), Some(path)) => write!(f, "{} {}", status, path),
                    _ => f.write_str(record.msgid.as_deref().unwrap_or("<no message>")),
                }
            }
        }
    }
}

pub fn parse_diagnostics(stderr: &[u8]) -> Vec<Diagnostic> {
    String::from_utf8_lossy(stderr)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match serde_json::from_str::<LogRecord>(line) {
            Ok(record) => Diagnostic::Record(record),
            Err(_) => Diagnostic::Text(line.to_string()),
        })
        .collect()
}

pub fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let shown: Vec<String> = diagnostics
        .iter()
        .filter(|d| !d.is_noise())
        .map(|d| d.to_string())
        .collect();
    if shown.is_empty() {
        String::new()
    } else {
        format!(": {}", shown.join("; "))
    }
}
