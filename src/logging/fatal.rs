//! The fatal exit path

use std::backtrace::Backtrace;
use std::fmt::Debug;
use std::io::Write;
use std::panic::Location;
use std::sync::atomic::Ordering;

use tracing::error;

use super::caller::{format_line, Caller};
use super::stream::StreamKind;
use super::{lock, Logger};
use crate::clock::kitchen_time;
use crate::error::FatalError;

/// Exit code used by [`Logger::fatal`].
///
/// 512 sits outside the 0-255 range on purpose, but POSIX keeps only the
/// low byte of an exit status and 512 would read as success there.
#[cfg(windows)]
pub const FATAL_EXIT_CODE: i32 = 512;

/// Exit code used by [`Logger::fatal`].
///
/// 512 sits outside the 0-255 range on purpose, but POSIX keeps only the
/// low byte of an exit status and 512 would read as success there.
#[cfg(not(windows))]
pub const FATAL_EXIT_CODE: i32 = 255;

impl Logger {
    /// Log `err` with a backtrace, close every log file and exit the process
    #[track_caller]
    pub fn fatal(&self, err: impl Into<FatalError>) -> ! {
        let caller = Caller::from_location(Location::caller());
        let code = self.prepare_fatal_exit(Some(caller), &err.into());
        std::process::exit(code)
    }

    /// [`fatal`](Self::fatal) with explicit caller context
    pub fn fatal_at(&self, caller: Caller, err: impl Into<FatalError>) -> ! {
        let code = self.prepare_fatal_exit(Some(caller), &err.into());
        std::process::exit(code)
    }

    /// Everything [`fatal`](Self::fatal) does short of exiting.
    ///
    /// The message and backtrace always reach the console, and also the
    /// trace and error files when they are open. All three files are closed
    /// afterwards. Returns the exit code to use.
    pub fn prepare_fatal_exit(&self, caller: Option<Caller>, err: &FatalError) -> i32 {
        let line = format_line(
            &kitchen_time(&self.clock.now_local()),
            caller.as_ref(),
            err.message(),
        );
        let report = format!("{}\n{}", Backtrace::force_capture(), line);

        error!("Fatal: {}", err.message());

        {
            let mut console = lock(&self.console);
            let _ = writeln!(console, "{}", report);
        }

        // Writes racing the exit go to the console, never to a reopened file
        self.file_logging.store(false, Ordering::SeqCst);
        self.console_logging.store(true, Ordering::SeqCst);

        for kind in [StreamKind::Trace, StreamKind::Errors] {
            let result = self.stream(kind).write_to_file(&report);
            if let Err(e) = result {
                self.console_print(&format!(
                    "Failed to write the {} log during fatal exit: {}",
                    kind.prefix(),
                    e
                ));
            }
        }

        for kind in StreamKind::ALL {
            let result = self.stream(kind).close();
            if let Err(e) = result {
                self.console_print(&format!("Failed to close the {} log file: {}", kind.prefix(), e));
            }
        }

        FATAL_EXIT_CODE
    }

    /// Fatal unless `left == right`
    #[track_caller]
    pub fn assert_equal<T: PartialEq + Debug>(&self, left: T, right: T) {
        if left != right {
            self.fatal(FatalError::new(format!(
                "Assertion Failed - Values Mismatch `{:?}` `{:?}`",
                left, right
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::LoggingConfig;
    use crate::logging::SharedBuffer;
    use chrono::NaiveDate;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn logger_in(dir: &TempDir, console: &SharedBuffer) -> Logger {
        let mut config = LoggingConfig::for_app("fatal-test");
        config.logs_path = Some(dir.path().to_string_lossy().into_owned());
        config.console_logging = false;
        config.trace_enabled = true;
        Logger::builder(config)
            .clock(Arc::new(FixedClock::on_date(
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            )))
            .console(Box::new(console.clone()))
            .build()
    }

    #[test]
    fn test_fatal_exit_code_survives_posix_truncation() {
        assert_ne!(FATAL_EXIT_CODE & 0xff, 0);
    }

    #[test]
    fn test_prepare_fatal_exit_writes_and_closes() {
        let dir = TempDir::new().unwrap();
        let console = SharedBuffer::new();
        let logger = logger_in(&dir, &console);
        logger.init_streams().unwrap();

        let code = logger.prepare_fatal_exit(
            Some(Caller::new("billing", "charge", 12)),
            &FatalError::new("card processor vanished"),
        );

        assert_eq!(code, FATAL_EXIT_CODE);
        for kind in StreamKind::ALL {
            assert!(logger.stream_path(kind).is_none());
        }

        let expected = "(billing) charge:12";
        assert!(console.contents().contains(expected));
        assert!(console.contents().contains("card processor vanished"));

        let errors = fs::read_to_string(dir.path().join("errors-2024-2-29.log")).unwrap();
        let trace = fs::read_to_string(dir.path().join("trace-2024-2-29.log")).unwrap();
        let changes = fs::read_to_string(dir.path().join("changes-2024-2-29.log")).unwrap();
        assert!(errors.contains("card processor vanished"));
        assert!(trace.contains("card processor vanished"));
        assert!(changes.is_empty());
    }

    #[test]
    fn test_writes_after_fatal_report_stay_on_console() {
        let dir = TempDir::new().unwrap();
        let console = SharedBuffer::new();
        let logger = logger_in(&dir, &console);
        logger.init_streams().unwrap();

        logger.prepare_fatal_exit(None, &FatalError::new("disk on fire"));
        logger.error("one more thing");

        assert!(!logger.file_logging());
        assert!(logger.stream_path(StreamKind::Errors).is_none());
        assert!(console.contents().ends_with("one more thing\n"));
        let errors = fs::read_to_string(dir.path().join("errors-2024-2-29.log")).unwrap();
        assert!(!errors.contains("one more thing"));
    }

    #[test]
    fn test_prepare_fatal_exit_without_open_files() {
        let dir = TempDir::new().unwrap();
        let console = SharedBuffer::new();
        let logger = logger_in(&dir, &console);

        logger.prepare_fatal_exit(None, &FatalError::new("early"));

        assert!(console.contents().contains("NO CALLER || early"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
