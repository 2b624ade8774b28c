//! Session files on disk: plain `.json` or gzip-compressed `.json.gz`.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::SessionInput;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub input: SessionInput,
}

impl SessionFile {
    pub fn new(session_id: impl Into<String>, input: SessionInput) -> Self {
        Self { session_id: Some(session_id.into()), input }
    }

    /// Recorded session ID, falling back to the file name without extensions.
    pub fn id_or_stem(&self, path: &Path) -> String {
        if let Some(id) = &self.session_id {
            return id.clone();
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("session");
        name.trim_end_matches(".gz").trim_end_matches(".json").to_string()
    }
}

/// `id` with everything outside `[A-Za-z0-9._-]` replaced by `_`, usable as
/// part of a file name without leaving its directory.
pub fn file_safe_id(id: &str) -> String {
    let safe: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    if safe.is_empty() || safe.chars().all(|c| c == '.') {
        "session".to_string()
    } else {
        safe
    }
}

fn is_gz(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

/// `*.json` or `*.json.gz`.
pub fn is_session_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    path.is_file() && (name.ends_with(".json") || name.ends_with(".json.gz"))
}

pub fn load_session(path: &Path) -> Result<SessionFile> {
    let file = File::open(path)?;
    let session: SessionFile = if is_gz(path) {
        serde_json::from_reader(BufReader::new(GzDecoder::new(file)))?
    } else {
        serde_json::from_reader(BufReader::new(file))?
    };
    log::debug!(
        "loaded {}: {} samples, {} gps fixes",
        path.display(),
        session.input.len(),
        session.input.gps.len()
    );
    Ok(session)
}

/// Write any serializable value as JSON, gzip-compressed when the path ends in `.gz`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    if is_gz(path) {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        serde_json::to_writer(&mut encoder, value)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }
    Ok(())
}

pub fn save_session(path: &Path, session: &SessionFile) -> Result<()> {
    write_json(path, session)
}
