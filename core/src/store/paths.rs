use std::path::PathBuf;

pub const APP_DIR: &str = "edsession";
pub const STORE_FILE: &str = "sessions.yaml";
pub const SETTINGS_FILE: &str = "config.yaml";
/// Headless editor state used by the CLI when no `--state` is given.
pub const EDITOR_STATE_FILE: &str = "editor.yaml";

/// `$EDS_CONFIG_DIR`, else the platform config directory joined with `edsession`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("EDS_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

#[must_use]
pub fn settings_path() -> PathBuf {
    config_dir().join(SETTINGS_FILE)
}

#[must_use]
pub fn editor_state_path() -> PathBuf {
    config_dir().join(EDITOR_STATE_FILE)
}
