use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{TasklockError, TasklockResult};

/// Application directory name under the platform config dir
pub const APP_DIR: &str = "tasklock";

/// Top-level client configuration (loaded from tasklock.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TasklockConfig {
    pub e2ee: E2eeConfig,
    pub log: LogConfig,
}

/// End-to-end encryption settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct E2eeConfig {
    /// User-facing switch. Independent of whether a key file exists;
    /// both must hold before task fields are written encrypted.
    pub enabled: bool,
    /// Directory holding the master key file (default: platform config dir)
    pub key_dir: Option<PathBuf>,
    /// Key file name inside `key_dir`
    pub key_file: String,
}

impl Default for E2eeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            key_dir: None,
            key_file: "master.key".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl TasklockConfig {
    pub fn from_toml_str(s: &str) -> TasklockResult<Self> {
        toml::from_str(s).map_err(|e| TasklockError::Config(format!("parsing config: {e}")))
    }

    /// Load from `path`, falling back to defaults if the file does not exist.
    pub fn load(path: &Path) -> TasklockResult<Self> {
        if !path.exists() {
            tracing::debug!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| TasklockError::Config(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> TasklockResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| TasklockError::Config(format!("serializing config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Per-user config directory for tasklock (e.g. `~/.config/tasklock` on Linux)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| expand_tilde(Path::new("~/.config")))
        .join(APP_DIR)
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Expand a leading `~/` to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str().and_then(|s| s.strip_prefix("~/")) {
        Some(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        None => path.to_path_buf(),
    }
}
