//! `slotbook` configuration.
//!
//! Settings live in `~/.config/slotbook/config.toml` by default:
//!
//! ```toml
//! database = "/var/lib/slotbook/slotbook.db"
//! host = "default"
//!
//! [log]
//! level = "info"
//! format = "json"
//! ```
//!
//! Command-line flags and `SLOTBOOK_*` environment variables take precedence
//! over the file; anything left unset falls back to the defaults below.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database file.
    pub database: Option<PathBuf>,

    /// Host whose event types and calendar the commands operate on.
    pub host: Option<String>,

    pub log: LogSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default level when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl Config {
    /// Load `explicit` if given (it must exist), otherwise the default path
    /// when present, otherwise built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slotbook")
            .join("config.toml")
    }

    pub fn default_database() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slotbook")
            .join("slotbook.db")
    }

    /// Database path after applying the flag/env override.
    pub fn database_path(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.database.clone())
            .unwrap_or_else(Self::default_database)
    }

    /// Host id after applying the flag/env override.
    pub fn host_id(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
    }
}
