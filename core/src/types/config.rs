use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::store::paths;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Location of the session store document.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Ask before deleting sessions. Default: true.
    #[serde(default = "default_delete_confirmation")]
    pub delete_confirmation: bool,
    /// Directory that receives tile marker files during restore.
    #[serde(default = "default_marker_dir")]
    pub marker_dir: PathBuf,
    #[serde(default = "default_marker_prefix")]
    pub marker_prefix: String,
    /// How long to wait for a marker file to become visible. Default: 1000.
    #[serde(default = "default_marker_timeout_ms")]
    pub marker_timeout_ms: u64,
    #[serde(default = "default_marker_poll_interval_ms")]
    pub marker_poll_interval_ms: u64,
}

fn default_store_path() -> PathBuf {
    paths::config_dir().join(paths::STORE_FILE)
}

fn default_delete_confirmation() -> bool {
    true
}

fn default_marker_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_marker_prefix() -> String {
    "eds_tile_marker_".into()
}

fn default_marker_timeout_ms() -> u64 {
    1000
}

fn default_marker_poll_interval_ms() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            store_path: default_store_path(),
            delete_confirmation: default_delete_confirmation(),
            marker_dir: default_marker_dir(),
            marker_prefix: default_marker_prefix(),
            marker_timeout_ms: default_marker_timeout_ms(),
            marker_poll_interval_ms: default_marker_poll_interval_ms(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Settings, SessionError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Settings::default());
            }
            Err(e) => return Err(SessionError::io("reading settings", path, e)),
        };
        if text.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml::from_str(&text).map_err(|source| SessionError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Settings with the store and marker files under `dir`.
    pub fn in_dir(dir: &Path) -> Settings {
        Settings {
            store_path: dir.join(paths::STORE_FILE),
            marker_dir: dir.to_path_buf(),
            ..Settings::default()
        }
    }

    pub fn marker_path(&self, ordinal: usize) -> PathBuf {
        self.marker_dir
            .join(format!("{}{}.txt", self.marker_prefix, ordinal))
    }
}
