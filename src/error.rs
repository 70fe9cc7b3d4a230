//! Error types for the logging streams

use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by logger setup and configuration
#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to create logs folder {path}: {source}")]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file logging is disabled")]
    FileLoggingDisabled,

    #[error("no Tokio runtime available to run the retention loop")]
    NoRuntime,
}

/// An unrecoverable error
///
/// The only handler is [`crate::Logger::fatal`], which writes the message
/// and a backtrace, closes every log file and exits the process.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct FatalError {
    message: String,
}

impl FatalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for FatalError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for FatalError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<LogError> for FatalError {
    fn from(err: LogError) -> Self {
        Self::new(err.to_string())
    }
}

/// Why a file name in the logs folder was not treated as a dated log
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// Fewer than four dash-separated segments; not one of ours
    #[error("not a dated log file name")]
    NotALog,

    #[error("unknown log type: {0}")]
    UnknownKind(String),

    #[error("log file error, {field} is {problem}: {name}")]
    BadDate {
        name: String,
        field: &'static str,
        problem: &'static str,
    },
}
