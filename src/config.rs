//! Remote Configuration
//!
//! Where the backend lives and the PIN used to open a session, persisted as
//! `sync_config.json` in the application data directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "sync_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    #[serde(default)]
    pub pin: Option<String>,
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>, pin: Option<String>) -> Self {
        Self { url: url.into(), pin }
    }

    pub fn path_in(app_dir: &Path) -> PathBuf {
        app_dir.join(CONFIG_FILE_NAME)
    }

    /// `Ok(None)` when no configuration was saved yet
    pub fn load(path: &Path) -> Result<Option<Self>, String> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("Failed to read {}: {}", path.display(), e)),
        };
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
        if config.url.trim().is_empty() {
            return Err(format!("Invalid config {}: empty url", path.display()));
        }
        Ok(Some(config))
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("Failed to create config dir: {}", e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| format!("Serialization error: {}", e))?;
        fs::write(path, json).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
    }
}
