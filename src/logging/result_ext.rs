//! Shorthands for routing `Result` errors into the logger

use std::fmt::Display;

use super::Logger;
use crate::error::FatalError;

/// Log-and-continue or log-and-exit helpers for any `Result` with a
/// displayable error
pub trait ResultExt<T> {
    /// Log the error to the error stream and drop it
    fn log_err(self, logger: &Logger) -> Option<T>;

    /// Log the error to the error stream and fall back to `default`
    fn log_err_or(self, logger: &Logger, default: T) -> T;

    /// Unwrap, or hand the error to [`Logger::fatal`]
    fn or_fatal(self, logger: &Logger) -> T;
}

impl<T, E: Display> ResultExt<T> for Result<T, E> {
    #[track_caller]
    fn log_err(self, logger: &Logger) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                logger.error(err.to_string());
                None
            }
        }
    }

    #[track_caller]
    fn log_err_or(self, logger: &Logger, default: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                logger.error(err.to_string());
                default
            }
        }
    }

    #[track_caller]
    fn or_fatal(self, logger: &Logger) -> T {
        match self {
            Ok(value) => value,
            Err(err) => logger.fatal(FatalError::new(err.to_string())),
        }
    }
}
