//! Logging streams for handlerlog
//!
//! A [`Logger`] owns the three date-stamped streams (errors, changes,
//! trace), the console sink and the routing flags. Files open lazily on the
//! first write, follow the UTC date, and fall back to the console when the
//! disk misbehaves. Logging never returns an error to its caller; the only
//! way out is [`Logger::fatal`].

mod caller;
mod fatal;
mod result_ext;
mod retention;
mod stream;

use std::io::Write;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::{info, warn};

use crate::clock::{kitchen_time, Clock, SystemClock};
use crate::config::LoggingConfig;
use crate::error::{FatalError, LogError};

pub use caller::{enclosing_function, format_line, Caller, CALLER_WIDTH, NO_CALLER};
pub use fatal::FATAL_EXIT_CODE;
pub use result_ext::ResultExt;
pub use retention::{parse_log_name, LogName, RotationReport};
pub use stream::{ConsoleSink, LogStream, Route, SharedBuffer, StreamKind};

/// Snapshot of the routing flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFlags {
    pub file_logging: bool,
    pub console_logging: bool,
    pub trace_enabled: bool,
}

/// Builder for [`Logger`]
pub struct LoggerBuilder {
    config: LoggingConfig,
    clock: Option<Arc<dyn Clock>>,
    console: Option<ConsoleSink>,
}

impl LoggerBuilder {
    /// Replace the wall clock
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace stdout as the console sink
    pub fn console(mut self, console: ConsoleSink) -> Self {
        self.console = Some(console);
        self
    }

    /// Build the logger without touching the disk
    pub fn build(self) -> Logger {
        let base = self.config.base_logs_folder();
        Logger {
            trace_enabled: AtomicBool::new(self.config.trace_enabled),
            file_logging: AtomicBool::new(self.config.file_logging),
            console_logging: AtomicBool::new(self.config.console_logging),
            base_folder: RwLock::new(base),
            subfolder: RwLock::new(None),
            config: RwLock::new(self.config),
            streams: StreamKind::ALL.map(|kind| Mutex::new(LogStream::new(kind))),
            console: Mutex::new(
                self.console
                    .unwrap_or_else(|| Box::new(std::io::stdout()) as ConsoleSink),
            ),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        }
    }

    /// Build the logger, create the logs folder and start the retention loop.
    ///
    /// Must be called from inside a Tokio runtime when file logging is on.
    pub fn init(self) -> Result<Arc<Logger>, LogError> {
        let logger = Arc::new(self.build());
        if logger.file_logging() {
            let base = logger.base_logs_folder();
            std::fs::create_dir_all(&base).map_err(|source| LogError::CreateFolder {
                path: base.clone(),
                source,
            })?;
            tokio::runtime::Handle::try_current().map_err(|_| LogError::NoRuntime)?;
            logger.spawn_rotation();
            info!("Logging to {}", base.display());
        }
        Ok(logger)
    }
}

/// The process's logging state: streams, flags, config and clock
pub struct Logger {
    config: RwLock<LoggingConfig>,
    base_folder: RwLock<PathBuf>,
    subfolder: RwLock<Option<String>>,
    trace_enabled: AtomicBool,
    file_logging: AtomicBool,
    console_logging: AtomicBool,
    streams: [Mutex<LogStream>; 3],
    console: Mutex<ConsoleSink>,
    clock: Arc<dyn Clock>,
}

impl Logger {
    pub fn builder(config: LoggingConfig) -> LoggerBuilder {
        LoggerBuilder {
            config,
            clock: None,
            console: None,
        }
    }

    /// Logger with the system clock and stdout, no I/O yet
    pub fn new(config: LoggingConfig) -> Self {
        Self::builder(config).build()
    }

    /// See [`LoggerBuilder::init`]
    pub fn init(config: LoggingConfig) -> Result<Arc<Self>, LogError> {
        Self::builder(config).init()
    }

    // --- configuration -------------------------------------------------

    /// Current configuration
    pub fn config(&self) -> LoggingConfig {
        read(&self.config).clone()
    }

    pub fn flags(&self) -> LogFlags {
        LogFlags {
            file_logging: self.file_logging(),
            console_logging: self.console_logging(),
            trace_enabled: self.trace_enabled(),
        }
    }

    pub fn file_logging(&self) -> bool {
        self.file_logging.load(Ordering::SeqCst)
    }

    pub fn console_logging(&self) -> bool {
        self.console_logging.load(Ordering::SeqCst)
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace_enabled.load(Ordering::SeqCst)
    }

    pub fn set_trace_enabled(&self, enabled: bool) {
        self.trace_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Turn console mirroring on or off and reroute every open stream
    pub fn set_console_logging(&self, enabled: bool) {
        self.console_logging.store(enabled, Ordering::SeqCst);
        for kind in StreamKind::ALL {
            self.stream(kind).rebuild_writer(enabled);
        }
    }

    pub fn set_retention(&self, trace_days: u32, priority_days: u32) {
        let mut config = write(&self.config);
        config.trace_retention_days = trace_days;
        config.priority_retention_days = priority_days;
    }

    pub fn set_rotation_interval_minutes(&self, minutes: u64) {
        write(&self.config).rotation_check_interval_minutes = minutes;
    }

    /// Close every stream and start over from `config`.
    ///
    /// This is the only way back to file logging after a degrade.
    pub fn reconfigure(&self, config: LoggingConfig) {
        for kind in StreamKind::ALL {
            if let Err(err) = self.stream(kind).close() {
                self.console_print(&format!("Failed to close the {} log file: {}", kind.prefix(), err));
            }
        }
        *write(&self.base_folder) = config.base_logs_folder();
        *write(&self.subfolder) = None;
        self.trace_enabled.store(config.trace_enabled, Ordering::SeqCst);
        self.file_logging.store(config.file_logging, Ordering::SeqCst);
        self.console_logging.store(config.console_logging, Ordering::SeqCst);
        *write(&self.config) = config;
    }

    /// Root folder for log files
    pub fn base_logs_folder(&self) -> PathBuf {
        read(&self.base_folder).clone()
    }

    /// Folder new files open in: the base folder or the active subfolder
    pub fn logs_folder(&self) -> PathBuf {
        let base = self.base_logs_folder();
        match read(&self.subfolder).as_deref() {
            Some(sub) => base.join(sub),
            None => base,
        }
    }

    /// Where `kind` should be writing today
    pub fn target_path(&self, kind: StreamKind) -> PathBuf {
        self.logs_folder().join(kind.file_name(self.clock.today_utc()))
    }

    /// Path of the file `kind` has open
    pub fn stream_path(&self, kind: StreamKind) -> Option<PathBuf> {
        self.stream(kind).path().map(Path::to_path_buf)
    }

    /// Whether `path` is open by any stream
    pub fn is_live(&self, path: &Path) -> bool {
        StreamKind::ALL
            .iter()
            .any(|kind| self.stream(*kind).path() == Some(path))
    }

    // --- writing -------------------------------------------------------

    /// Write to the error stream.
    ///
    /// The caller column records `(file):line` of the call site. Use
    /// [`error_log!`](crate::error_log) for the `(module) function:line`
    /// form, which also takes format arguments.
    #[track_caller]
    pub fn error(&self, message: impl AsRef<str>) {
        let caller = Caller::from_location(Location::caller());
        self.write(StreamKind::Errors, Some(&caller), message.as_ref(), "");
    }

    /// Write to the change stream; a non-empty `id` is appended to the line.
    ///
    /// Records `(file):line` like [`error`](Self::error);
    /// [`change_log!`](crate::change_log) records the function name too.
    #[track_caller]
    pub fn change(&self, message: impl AsRef<str>, id: &str) {
        let caller = Caller::from_location(Location::caller());
        self.write(StreamKind::Changes, Some(&caller), message.as_ref(), id);
    }

    /// Write to the trace stream; dropped while trace is disabled.
    ///
    /// Records `(file):line` like [`error`](Self::error);
    /// [`trace_log!`](crate::trace_log) records the function name too.
    #[track_caller]
    pub fn trace(&self, message: impl AsRef<str>) {
        if !self.trace_enabled() {
            return;
        }
        let caller = Caller::from_location(Location::caller());
        self.write(StreamKind::Trace, Some(&caller), message.as_ref(), "");
    }

    /// Write to the error stream with explicit caller context, as the
    /// macros do
    pub fn error_at(&self, caller: Caller, message: &str) {
        self.write(StreamKind::Errors, Some(&caller), message, "");
    }

    pub fn change_at(&self, caller: Caller, message: &str, id: &str) {
        self.write(StreamKind::Changes, Some(&caller), message, id);
    }

    pub fn trace_at(&self, caller: Caller, message: &str) {
        self.write(StreamKind::Trace, Some(&caller), message, "");
    }

    /// Lines the logger writes about itself have no external caller
    pub(crate) fn internal_error(&self, message: &str) {
        self.write(StreamKind::Errors, None, message, "");
    }

    pub(crate) fn internal_trace(&self, message: &str) {
        self.write(StreamKind::Trace, None, message, "");
    }

    fn write(&self, kind: StreamKind, caller: Option<&Caller>, message: &str, id: &str) {
        if kind == StreamKind::Trace && !self.trace_enabled() {
            return;
        }

        if !self.file_logging() {
            self.console_fallback(message);
            return;
        }

        let mut line = format_line(&kitchen_time(&self.clock.now_local()), caller, message);
        if kind == StreamKind::Changes && !id.is_empty() {
            line.push_str(" || ");
            line.push_str(id);
        }

        let mut stream = self.stream(kind);
        // close_logs or a fatal exit may have won the race for this stream
        if !self.file_logging() {
            drop(stream);
            self.console_fallback(message);
            return;
        }
        if let Err(err) = self.ensure_open(&mut stream) {
            drop(stream);
            self.console_print(&err.to_string());
            self.degrade();
            self.console_print(message);
            return;
        }

        let written = {
            let mut console = lock(&self.console);
            stream.write_line(&line, &mut **console)
        };
        drop(stream);

        if let Err(err) = written {
            warn!("Write to {} log failed: {}", kind.prefix(), err);
            self.console_print("File logging failed due to an error, reverting to console logging.");
            self.degrade();
            self.console_print(message);
        }
    }

    /// Make sure `stream` has today's file open in the current folder.
    ///
    /// Reopens when the computed path moved on (new day, new subfolder).
    /// Must be called with the stream lock held; never reopens once file
    /// logging is off.
    fn ensure_open(&self, stream: &mut LogStream) -> Result<(), LogError> {
        if !self.file_logging() {
            return Err(LogError::FileLoggingDisabled);
        }
        let target = self.target_path(stream.kind());
        let mirror = self.console_logging();

        if stream.path() == Some(target.as_path()) {
            stream.rebuild_writer(mirror);
            return Ok(());
        }

        if stream.is_open() {
            if let Err(err) = stream.close() {
                self.console_print(&format!(
                    "Failed to close the {} log file: {}",
                    stream.kind().prefix(),
                    err
                ));
            }
        }

        stream
            .open(target.clone(), mirror)
            .map_err(|source| LogError::OpenFile {
                path: target,
                source,
            })
    }

    /// Open all streams now instead of on first write.
    ///
    /// The trace stream only opens while trace is enabled.
    pub fn init_streams(&self) -> Result<(), LogError> {
        if !self.file_logging() {
            return Err(LogError::FileLoggingDisabled);
        }
        for kind in StreamKind::ALL {
            if kind == StreamKind::Trace && !self.trace_enabled() {
                continue;
            }
            let mut stream = self.stream(kind);
            if let Err(err) = self.ensure_open(&mut stream) {
                drop(stream);
                self.console_print(&err.to_string());
                self.degrade();
                return Err(err);
            }
        }
        Ok(())
    }

    /// Point every stream at `<base>/<subfolder>/<kind>-<today>.log`.
    ///
    /// An empty `subfolder` means the base folder. Streams already writing
    /// to the right file are left alone. Failing to create the folder is
    /// fatal.
    pub fn set_logs_folder(&self, subfolder: &str) -> Result<(), FatalError> {
        if !self.file_logging() {
            return Ok(());
        }

        let base = self.base_logs_folder();
        let folder = if subfolder.is_empty() {
            base
        } else {
            base.join(subfolder)
        };
        std::fs::create_dir_all(&folder).map_err(|err| {
            FatalError::new(format!(
                "Failed to create logs folder {}: {}",
                folder.display(),
                err
            ))
        })?;
        *write(&self.subfolder) = (!subfolder.is_empty()).then(|| subfolder.to_string());

        for kind in StreamKind::ALL {
            if kind == StreamKind::Trace && !self.trace_enabled() {
                continue;
            }
            let target = self.target_path(kind);
            let mut stream = self.stream(kind);
            if !self.file_logging() {
                return Ok(());
            }
            if stream.path() == Some(target.as_path()) {
                continue;
            }
            if let Err(err) = self.ensure_open(&mut stream) {
                drop(stream);
                self.console_print(&err.to_string());
                self.degrade();
                return Ok(());
            }
        }

        info!("Logs folder set to {}", folder.display());
        Ok(())
    }

    /// Switch to console-only and close every file
    pub fn close_logs(&self) {
        self.file_logging.store(false, Ordering::SeqCst);
        self.console_logging.store(true, Ordering::SeqCst);

        for kind in StreamKind::ALL {
            let result = self.stream(kind).close();
            if let Err(err) = result {
                self.console_print(&format!("Failed to close the {} log file: {}", kind.prefix(), err));
            }
        }
    }

    /// Permanent fall back to console-only logging
    fn degrade(&self) {
        let was_logging = self.file_logging.swap(false, Ordering::SeqCst);
        self.console_logging.store(true, Ordering::SeqCst);
        if was_logging {
            warn!("File logging disabled, continuing on the console only");
        }
    }

    /// Raw message to the console when console logging is on
    fn console_fallback(&self, message: &str) {
        if self.console_logging() {
            self.console_print(message);
        }
    }

    fn console_print(&self, text: &str) {
        let mut console = lock(&self.console);
        // The console is the last sink; a failure here has nowhere to go
        let _ = writeln!(console, "{}", text);
    }

    fn stream(&self, kind: StreamKind) -> MutexGuard<'_, LogStream> {
        lock(&self.streams[kind.index()])
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("base_folder", &self.base_logs_folder())
            .field("flags", &self.flags())
            .finish_non_exhaustive()
    }
}

// A panic while holding a logging lock must not take logging down with it
fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{Duration, NaiveDate};
    use std::fs;
    use tempfile::TempDir;

    struct Harness {
        logger: Logger,
        console: SharedBuffer,
        clock: Arc<FixedClock>,
        dir: TempDir,
    }

    fn harness(configure: impl FnOnce(&mut LoggingConfig)) -> Harness {
        let dir = TempDir::new().unwrap();
        let mut config = LoggingConfig::for_app("logging-test");
        config.logs_path = Some(dir.path().to_string_lossy().into_owned());
        config.console_logging = false;
        configure(&mut config);

        let console = SharedBuffer::new();
        let clock = Arc::new(FixedClock::on_date(NaiveDate::from_ymd_opt(2024, 5, 9).unwrap()));
        let logger = Logger::builder(config)
            .clock(clock.clone())
            .console(Box::new(console.clone()))
            .build();
        Harness {
            logger,
            console,
            clock,
            dir,
        }
    }

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_build_does_no_io() {
        let h = harness(|_| {});
        assert_eq!(fs::read_dir(h.dir.path()).unwrap().count(), 0);
        for kind in StreamKind::ALL {
            assert!(h.logger.stream_path(kind).is_none());
        }
    }

    #[test]
    fn test_first_write_creates_dated_file() {
        let h = harness(|_| {});
        h.logger.error("disk is fine");

        let path = h.dir.path().join("errors-2024-5-9.log");
        assert_eq!(h.logger.stream_path(StreamKind::Errors), Some(path.clone()));

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("|| disk is fine"));
        assert!(lines[0].contains("mod.rs):"));
    }

    #[test]
    fn test_second_write_appends_same_file() {
        let h = harness(|_| {});
        h.logger.change("first", "");
        let path = h.logger.stream_path(StreamKind::Changes).unwrap();
        let size = fs::metadata(&path).unwrap().len();

        h.logger.change("second", "");

        assert_eq!(h.logger.stream_path(StreamKind::Changes), Some(path.clone()));
        assert!(fs::metadata(&path).unwrap().len() > size);
        assert_eq!(read_lines(&path).len(), 2);
    }

    #[test]
    fn test_change_line_carries_correlation_id() {
        let h = harness(|_| {});
        h.logger.change("updated account", "acct-42");
        h.logger.change("no id here", "");

        let lines = read_lines(&h.dir.path().join("changes-2024-5-9.log"));
        assert!(lines[0].ends_with("|| updated account || acct-42"));
        assert!(lines[1].ends_with("|| no id here"));
    }

    #[test]
    fn test_trace_disabled_touches_nothing() {
        let h = harness(|config| config.console_logging = true);
        h.logger.trace("invisible");

        assert!(h.logger.stream_path(StreamKind::Trace).is_none());
        assert!(!h.dir.path().join("trace-2024-5-9.log").exists());
        assert!(h.console.contents().is_empty());
    }

    #[test]
    fn test_trace_lines_keep_order() {
        let h = harness(|config| config.trace_enabled = true);
        for i in 0..25 {
            h.logger.trace(format!("step {}", i));
        }

        let lines = read_lines(&h.dir.path().join("trace-2024-5-9.log"));
        assert_eq!(lines.len(), 25);
        for (i, line) in lines.iter().enumerate() {
            assert!(line.ends_with(&format!("|| step {}", i)));
        }
    }

    #[test]
    fn test_console_mirroring() {
        let h = harness(|config| config.console_logging = true);
        h.logger.error("both places");

        assert!(h.console.contents().contains("|| both places"));
        let lines = read_lines(&h.dir.path().join("errors-2024-5-9.log"));
        assert!(lines[0].contains("|| both places"));
    }

    #[test]
    fn test_console_toggle_reroutes_open_stream() {
        let h = harness(|_| {});
        h.logger.error("file only");
        h.logger.set_console_logging(true);
        h.logger.error("mirrored");

        let console = h.console.contents();
        assert!(!console.contains("file only"));
        assert!(console.contains("mirrored"));
    }

    #[test]
    fn test_file_logging_off_is_console_only() {
        let h = harness(|config| {
            config.file_logging = false;
            config.console_logging = true;
        });
        h.logger.error("plain");

        assert_eq!(h.console.contents(), "plain\n");
        assert_eq!(fs::read_dir(h.dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_file_and_console_off_is_silent() {
        let h = harness(|config| config.file_logging = false);
        h.logger.error("nowhere");

        assert!(h.console.contents().is_empty());
        assert_eq!(fs::read_dir(h.dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_open_failure_degrades_to_console() {
        let h = harness(|_| {});
        // A file where the logs folder should be makes every open fail
        let blocker = h.dir.path().join("blocked");
        fs::write(&blocker, b"not a folder").unwrap();
        h.logger.reconfigure(LoggingConfig {
            logs_path: Some(blocker.to_string_lossy().into_owned()),
            console_logging: false,
            ..LoggingConfig::for_app("logging-test")
        });

        h.logger.error("still heard");

        let flags = h.logger.flags();
        assert!(!flags.file_logging);
        assert!(flags.console_logging);
        assert!(h.console.contents().contains("still heard"));
        assert!(h.logger.stream_path(StreamKind::Errors).is_none());

        // Degrade sticks: later writes go straight to the console
        h.logger.change("after", "id-1");
        assert!(h.console.contents().ends_with("after\n"));
    }

    /// Console sink whose first write fails
    struct FlakyConsole {
        out: SharedBuffer,
        tripped: bool,
    }

    impl Write for FlakyConsole {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.tripped {
                self.tripped = true;
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "console gone"));
            }
            self.out.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_degrades_to_console() {
        let dir = TempDir::new().unwrap();
        let mut config = LoggingConfig::for_app("logging-test");
        config.logs_path = Some(dir.path().to_string_lossy().into_owned());
        let out = SharedBuffer::new();
        let logger = Logger::builder(config)
            .clock(Arc::new(FixedClock::on_date(NaiveDate::from_ymd_opt(2024, 5, 9).unwrap())))
            .console(Box::new(FlakyConsole {
                out: out.clone(),
                tripped: false,
            }))
            .build();

        logger.error("payment lost");

        assert_eq!(
            logger.flags(),
            LogFlags {
                file_logging: false,
                console_logging: true,
                trace_enabled: false,
            }
        );
        assert_eq!(
            out.contents(),
            "File logging failed due to an error, reverting to console logging.\npayment lost\n"
        );

        logger.error("next one");
        assert!(out.contents().ends_with("payment lost\nnext one\n"));
        let errors = dir.path().join("errors-2024-5-9.log");
        assert_eq!(fs::read_to_string(errors).unwrap(), "");
    }

    #[test]
    fn test_methods_record_file_and_line() {
        let h = harness(|_| {});
        let line = line!() + 1;
        h.logger.error("plain call");

        let lines = read_lines(&h.dir.path().join("errors-2024-5-9.log"));
        let expected = format!("(src/logging/mod.rs):{}", line);
        assert!(lines[0].contains(&expected), "{}", lines[0]);
    }

    #[test]
    fn test_date_rollover_opens_new_file() {
        let h = harness(|_| {});
        h.logger.error("monday");
        h.clock.advance(Duration::days(1));
        h.logger.error("tuesday");

        let monday = read_lines(&h.dir.path().join("errors-2024-5-9.log"));
        let tuesday = read_lines(&h.dir.path().join("errors-2024-5-10.log"));
        assert_eq!(monday.len(), 1);
        assert_eq!(tuesday.len(), 1);
        assert!(tuesday[0].ends_with("|| tuesday"));
        assert_eq!(
            h.logger.stream_path(StreamKind::Errors),
            Some(h.dir.path().join("errors-2024-5-10.log"))
        );
    }

    #[test]
    fn test_set_logs_folder_moves_streams() {
        let h = harness(|config| config.trace_enabled = true);
        h.logger.error("before");
        h.logger.set_logs_folder("session-1").unwrap();

        let folder = h.dir.path().join("session-1");
        for kind in StreamKind::ALL {
            assert_eq!(
                h.logger.stream_path(kind),
                Some(folder.join(kind.file_name(h.clock.today_utc())))
            );
        }

        h.logger.error("after");
        assert_eq!(read_lines(&folder.join("errors-2024-5-9.log")).len(), 1);
        assert_eq!(read_lines(&h.dir.path().join("errors-2024-5-9.log")).len(), 1);
    }

    #[test]
    fn test_set_logs_folder_skips_trace_when_disabled() {
        let h = harness(|_| {});
        h.logger.set_logs_folder("quiet").unwrap();
        assert!(h.logger.stream_path(StreamKind::Trace).is_none());
        assert!(h.logger.stream_path(StreamKind::Errors).is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_set_logs_folder_twice_does_not_reopen() {
        let h = harness(|_| {});
        h.logger.set_logs_folder("jobs").unwrap();
        let path = h.logger.stream_path(StreamKind::Errors).unwrap();

        // Unlinking keeps the handle valid; a reopen would recreate the file
        fs::remove_file(&path).unwrap();
        h.logger.set_logs_folder("jobs").unwrap();

        assert!(!path.exists());
        assert_eq!(h.logger.stream_path(StreamKind::Errors), Some(path));
    }

    #[test]
    fn test_set_logs_folder_back_to_base() {
        let h = harness(|_| {});
        h.logger.set_logs_folder("nested").unwrap();
        h.logger.set_logs_folder("").unwrap();
        assert_eq!(
            h.logger.stream_path(StreamKind::Changes),
            Some(h.dir.path().join("changes-2024-5-9.log"))
        );
    }

    #[test]
    fn test_set_logs_folder_creation_failure_is_fatal() {
        let h = harness(|_| {});
        fs::write(h.dir.path().join("taken"), b"file").unwrap();

        let err = h.logger.set_logs_folder("taken").unwrap_err();
        assert!(err.message().contains("Failed to create logs folder"));
    }

    #[test]
    fn test_init_streams_opens_eagerly() {
        let h = harness(|_| {});
        h.logger.init_streams().unwrap();

        assert!(h.dir.path().join("errors-2024-5-9.log").exists());
        assert!(h.dir.path().join("changes-2024-5-9.log").exists());
        assert!(!h.dir.path().join("trace-2024-5-9.log").exists());
    }

    #[test]
    fn test_close_logs_releases_everything() {
        let h = harness(|config| config.trace_enabled = true);
        h.logger.init_streams().unwrap();
        h.logger.close_logs();

        for kind in StreamKind::ALL {
            assert!(h.logger.stream_path(kind).is_none());
        }
        let flags = h.logger.flags();
        assert!(!flags.file_logging);
        assert!(flags.console_logging);

        h.logger.error("after close");
        assert_eq!(h.console.contents(), "after close\n");
    }

    #[test]
    fn test_close_logs_racing_writers_never_reopens() {
        for _ in 0..50 {
            let h = harness(|_| {});
            let logger = Arc::new(h.logger);

            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let logger = Arc::clone(&logger);
                    std::thread::spawn(move || {
                        for i in 0..100 {
                            logger.error(format!("thread {} line {}", t, i));
                        }
                    })
                })
                .collect();
            while logger.stream_path(StreamKind::Errors).is_none()
                && !handles.iter().all(|handle| handle.is_finished())
            {
                std::thread::yield_now();
            }
            logger.close_logs();
            for handle in handles {
                handle.join().unwrap();
            }

            for kind in StreamKind::ALL {
                assert!(logger.stream_path(kind).is_none());
            }
            assert!(!logger.file_logging());
        }
    }

    #[test]
    fn test_macros_record_function_name() {
        let h = harness(|config| config.trace_enabled = true);
        crate::error_log!(h.logger, "code {}", 7);
        crate::change_log!(h.logger, "inv-9", "paid {}", "in full");
        crate::trace_log!(h.logger, "tick");

        let errors = read_lines(&h.dir.path().join("errors-2024-5-9.log"));
        assert!(errors[0].contains(&format!("({}) test_macros_record_function_name:", module_path!())));
        assert!(errors[0].ends_with("|| code 7"));

        let changes = read_lines(&h.dir.path().join("changes-2024-5-9.log"));
        assert!(changes[0].ends_with("|| paid in full || inv-9"));

        let trace = read_lines(&h.dir.path().join("trace-2024-5-9.log"));
        assert!(trace[0].ends_with("|| tick"));
    }

    #[test]
    fn test_concurrent_writers_share_one_file() {
        let h = harness(|_| {});
        let logger = Arc::new(h.logger);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let logger = Arc::clone(&logger);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        logger.error(format!("thread {} line {}", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let lines = read_lines(&h.dir.path().join("errors-2024-5-9.log"));
        assert_eq!(lines.len(), 200);
        for t in 0..4 {
            let own: Vec<_> = lines
                .iter()
                .filter(|l| l.contains(&format!("thread {} line", t)))
                .collect();
            for (i, line) in own.iter().enumerate() {
                assert!(line.ends_with(&format!("thread {} line {}", t, i)));
            }
        }
    }
}
