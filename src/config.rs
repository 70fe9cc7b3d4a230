//! Configuration for the logging streams

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Logging configuration, set by the embedding program before first use
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Application name; picks the default logs folder and config path
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Overrides the platform default logs folder. `~` is expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_path: Option<String>,

    /// Write the trace stream (default: false)
    #[serde(default)]
    pub trace_enabled: bool,

    /// Write to files at all; when off every stream is console-only
    #[serde(default = "default_true")]
    pub file_logging: bool,

    /// Mirror every line to stdout
    #[serde(default = "default_true")]
    pub console_logging: bool,

    /// Days to keep trace files (default: 3)
    #[serde(default = "default_trace_retention_days")]
    pub trace_retention_days: u32,

    /// Days to keep change and error files (default: 14)
    #[serde(default = "default_priority_retention_days")]
    pub priority_retention_days: u32,

    /// Minutes between retention sweeps (default: 360)
    #[serde(default = "default_rotation_check_interval_minutes")]
    pub rotation_check_interval_minutes: u64,
}

fn default_app_name() -> String {
    "Default".to_string()
}

fn default_true() -> bool {
    true
}

fn default_trace_retention_days() -> u32 {
    3
}

fn default_priority_retention_days() -> u32 {
    14
}

fn default_rotation_check_interval_minutes() -> u64 {
    360 // 6 hours
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            logs_path: None,
            trace_enabled: false,
            file_logging: true,
            console_logging: true,
            trace_retention_days: default_trace_retention_days(),
            priority_retention_days: default_priority_retention_days(),
            rotation_check_interval_minutes: default_rotation_check_interval_minutes(),
        }
    }
}

impl LoggingConfig {
    /// Default configuration for a named application
    pub fn for_app(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Self::default()
        }
    }

    /// Load configuration from file, or return default if not found
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Root folder for this application's log files
    pub fn base_logs_folder(&self) -> PathBuf {
        match self.logs_path.as_deref().filter(|p| !p.is_empty()) {
            Some(path) => PathBuf::from(shellexpand::tilde(path).into_owned()),
            None => default_logs_folder(&self.app_name),
        }
    }
}

/// Get the user's home directory
/// Falls back to the current directory if it cannot be determined
pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for logs");
        PathBuf::from(".")
    })
}

/// Platform default logs folder for an application
#[cfg(windows)]
pub fn default_logs_folder(app_name: &str) -> PathBuf {
    PathBuf::from(r"C:\Local\Logs").join(app_name)
}

/// Platform default logs folder for an application
#[cfg(not(windows))]
pub fn default_logs_folder(app_name: &str) -> PathBuf {
    home_dir().join("local").join("Logs").join(app_name)
}

/// Platform default config file path for an application
#[cfg(windows)]
pub fn default_config_path(app_name: &str) -> PathBuf {
    PathBuf::from(r"C:\Local\Config").join(format!("{}.toml", app_name))
}

/// Platform default config file path for an application
#[cfg(not(windows))]
pub fn default_config_path(app_name: &str) -> PathBuf {
    home_dir()
        .join("local")
        .join("Config")
        .join(format!("{}.toml", app_name))
}
