use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Deserialize;

const BORG_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub name: String,
    pub id: Option<String>,
    pub time: Option<NaiveDateTime>,
    pub source: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ListDocument {
    #[serde(default)]
    archives: Vec<ArchiveEntry>,
}

#[derive(Debug, Deserialize)]
struct CreateDocument {
    archive: ArchiveEntry,
}

#[derive(Debug, Deserialize)]
struct ArchiveEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    archive: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    time: Option<String>,
}

impl ArchiveEntry {
    fn into_archive(self, source: Option<PathBuf>) -> Option<Archive> {
        let name = self.name.or(self.archive)?;
        let time = self
            .start
            .as_deref()
            .or(self.time.as_deref())
            .and_then(|t| NaiveDateTime::parse_from_str(t, BORG_TIME_FORMAT).ok());
        Some(Archive {
            name,
            id: self.id,
            time,
            source,
        })
    }
}

pub fn parse_list(stdout: &[u8]) -> Option<Vec<Archive>> {
    let doc: ListDocument = serde_json::from_slice(stdout).ok()?;
    Some(
        doc.archives
            .into_iter()
            .filter_map(|entry| entry.into_archive(None))
            .collect(),
    )
}

pub fn parse_create(stdout: &[u8], source: PathBuf) -> Option<Archive> {
    let doc: CreateDocument = serde_json::from_slice(stdout).ok()?;
    doc.archive.into_archive(Some(source))
}
