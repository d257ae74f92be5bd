use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by the editor capability interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("no open document for {0}")]
    NoDocument(PathBuf),

    #[error("file is not loadable: {0}")]
    NotLoadable(PathBuf),

    #[error("tile {tile} does not exist in the current {width}x{height} grid")]
    InvalidTile { tile: u32, width: u32, height: u32 },

    #[error("view for {0} is not valid yet")]
    ViewNotReady(PathBuf),

    #[error("window manager rejected request: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store at {path} is corrupt: {reason}")]
    StoreCorrupt { path: PathBuf, reason: String },

    #[error("failed to write session store at {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no session at index {index} (store holds {len})")]
    NoSuchSession { index: usize, len: usize },

    #[error("layout of session '{session}' is inconsistent: {reason}")]
    LayoutInconsistent { session: String, reason: String },

    #[error("tile correlation failed: {0}")]
    Correlation(String),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error("failed to format current UTC timestamp as RFC3339: {0}")]
    ClockFormat(#[source] time::error::Format),
}

impl SessionError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn store_corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::StoreCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn store_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StoreWrite {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn layout(session: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LayoutInconsistent {
            session: session.into(),
            reason: reason.into(),
        }
    }
}
