//! Session store: the persisted, ordered collection of session records.
//!
//! The whole document is read into memory on open and rewritten wholesale on
//! every `persist()`. Writes go to a temporary file in the destination
//! directory which is then renamed over the store, so a crash never leaves a
//! half-written document behind.

pub mod paths;

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::types::session::{SessionRecord, SessionSummary};

pub const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreDocument {
    version: u32,
    #[serde(default)]
    sessions: Vec<SessionRecord>,
}

pub struct SessionStore {
    path: PathBuf,
    records: Vec<SessionRecord>,
    persisted: Vec<SessionRecord>,
}

impl SessionStore {
    /// Load the store at `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<SessionStore, SessionError> {
        let path = path.to_path_buf();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no session store yet, starting empty");
                return Ok(SessionStore::empty(path));
            }
            Err(e) => return Err(SessionError::io("reading session store", &path, e)),
        };
        if text.trim().is_empty() {
            return Ok(SessionStore::empty(path));
        }

        let doc: StoreDocument = serde_yaml::from_str(&text)
            .map_err(|e| SessionError::store_corrupt(&path, e.to_string()))?;
        if doc.version != STORE_VERSION {
            return Err(SessionError::store_corrupt(
                &path,
                format!(
                    "unsupported store version {}; expected {}",
                    doc.version, STORE_VERSION
                ),
            ));
        }
        for record in &doc.sessions {
            validate_record(&path, record)?;
        }

        info!(path = %path.display(), sessions = doc.sessions.len(), "loaded session store");
        Ok(SessionStore {
            path,
            persisted: doc.sessions.clone(),
            records: doc.sessions,
        })
    }

    fn empty(path: PathBuf) -> SessionStore {
        SessionStore {
            path,
            records: Vec::new(),
            persisted: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Summaries in load order with 1-based indices.
    pub fn list(&self) -> Vec<SessionSummary> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| r.summary(i + 1))
            .collect()
    }

    pub fn load(&self, index: usize) -> Result<&SessionRecord, SessionError> {
        let slot = self.slot(index)?;
        Ok(&self.records[slot])
    }

    /// 1-based index of the first record named exactly `name`.
    pub fn find_exact(&self, name: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.name == name)
            .map(|i| i + 1)
    }

    pub fn append(&mut self, record: SessionRecord) {
        self.records.push(record);
    }

    pub fn remove(&mut self, index: usize) -> Result<SessionRecord, SessionError> {
        let slot = self.slot(index)?;
        Ok(self.records.remove(slot))
    }

    /// Remove several records at once; indices refer to the current listing.
    pub fn remove_many(&mut self, indices: &[usize]) -> Result<Vec<SessionRecord>, SessionError> {
        for index in indices {
            self.slot(*index)?;
        }
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let mut removed = Vec::with_capacity(sorted.len());
        for index in sorted.into_iter().rev() {
            removed.push(self.records.remove(index - 1));
        }
        removed.reverse();
        Ok(removed)
    }

    /// Rename by removing the record and re-appending it under the new name.
    pub fn rename(&mut self, index: usize, new_name: &str) -> Result<(), SessionError> {
        let mut record = self.remove(index)?;
        record.name = new_name.to_string();
        self.records.push(record);
        Ok(())
    }

    /// Overwrite a record in place, keeping its position.
    pub fn replace(&mut self, index: usize, record: SessionRecord) -> Result<(), SessionError> {
        let slot = self.slot(index)?;
        self.records[slot] = record;
        Ok(())
    }

    /// Write the whole store. On failure the in-memory records roll back to
    /// the last successfully persisted state.
    pub fn persist(&mut self) -> Result<(), SessionError> {
        match self.write_document() {
            Ok(()) => {
                self.persisted = self.records.clone();
                debug!(path = %self.path.display(), sessions = self.records.len(), "persisted session store");
                Ok(())
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding unsaved session changes");
                self.records = self.persisted.clone();
                Err(e)
            }
        }
    }

    fn write_document(&self) -> Result<(), SessionError> {
        let doc = StoreDocument {
            version: STORE_VERSION,
            sessions: self.records.clone(),
        };
        let text = serde_yaml::to_string(&doc).map_err(|e| {
            SessionError::store_write(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
            )
        })?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)
            .map_err(|e| SessionError::store_write(&self.path, e))?;

        let mut temp = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|e| SessionError::store_write(&self.path, e))?;
        temp.write_all(text.as_bytes())
            .map_err(|e| SessionError::store_write(&self.path, e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| SessionError::store_write(&self.path, e))?;
        temp.persist(&self.path)
            .map_err(|e| SessionError::store_write(&self.path, e.error))?;
        Ok(())
    }

    fn slot(&self, index: usize) -> Result<usize, SessionError> {
        if index == 0 || index > self.records.len() {
            return Err(SessionError::NoSuchSession {
                index,
                len: self.records.len(),
            });
        }
        Ok(index - 1)
    }
}

/// Current UTC time as an RFC 3339 string.
pub fn now_rfc3339() -> Result<String, SessionError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(SessionError::ClockFormat)
}

fn validate_record(path: &Path, record: &SessionRecord) -> Result<(), SessionError> {
    for (field, value) in [
        ("last_used", &record.last_used),
        ("last_saved", &record.last_saved),
    ] {
        if OffsetDateTime::parse(value, &Rfc3339).is_err() {
            return Err(SessionError::store_corrupt(
                path,
                format!(
                    "session '{}' has invalid RFC3339 timestamp in field '{}': {}",
                    record.name, field, value
                ),
            ));
        }
    }
    if record.layout.grid_width == 0 || record.layout.grid_height == 0 {
        return Err(SessionError::store_corrupt(
            path,
            format!(
                "session '{}' has an empty {}x{} grid",
                record.name, record.layout.grid_width, record.layout.grid_height
            ),
        ));
    }
    Ok(())
}
