//! handlerlog - date-stamped error, change and trace logs
//!
//! This library provides the three log streams, their console fallback and
//! the retention sweep that keeps the logs folder from growing forever.

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use config::LoggingConfig;
pub use error::{FatalError, LogError};
pub use logging::{Logger, ResultExt, StreamKind};
