//! Call-site context for log lines
//!
//! Every line carries the location of the code that asked for it. The
//! macros capture module path, function name and line. The plain
//! `Logger` methods are `#[track_caller]` and fall back to the source file
//! and line, which always points outside this crate's logging code.

use std::fmt;
use std::panic::Location;

/// Width of the caller column in a log line
pub const CALLER_WIDTH: usize = 60;

/// Marker used when a line has no external caller
pub const NO_CALLER: &str = "NO CALLER";

/// Where a log call came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Module path, or the source file when the module is unknown
    pub module: String,
    /// Enclosing function, when known
    pub function: Option<String>,
    pub line: u32,
}

impl Caller {
    pub fn new(module: impl Into<String>, function: impl Into<String>, line: u32) -> Self {
        Self {
            module: module.into(),
            function: Some(function.into()),
            line,
        }
    }

    /// Caller context from a `#[track_caller]` location
    pub fn from_location(location: &Location<'_>) -> Self {
        Self {
            module: location.file().replace('\\', "/"),
            function: None,
            line: location.line(),
        }
    }
}

impl fmt::Display for Caller {
    /// `(module) function:line`, or `(file):line` without a function
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = match &self.function {
            Some(function) => format!("({}) {}:{}", self.module, function, self.line),
            None => format!("({}):{}", self.module, self.line),
        };
        // Pad through the formatter so `{:<60}` works on the whole column
        f.pad(&rendered)
    }
}

/// Build a full log line: `<time> || <caller padded to 60> || <message>`
pub fn format_line(time: &str, caller: Option<&Caller>, message: &str) -> String {
    match caller {
        Some(caller) => format!(
            "{} || {:<width$} || {}",
            time,
            caller,
            message,
            width = CALLER_WIDTH
        ),
        None => format!("{} || {} || {}", time, NO_CALLER, message),
    }
}

/// Strip the helper item and closure segments from a `type_name` path,
/// leaving the name of the enclosing function
#[doc(hidden)]
pub fn enclosing_function(type_path: &'static str) -> &'static str {
    let path = type_path.strip_suffix("::__here").unwrap_or(type_path);
    let path = path.trim_end_matches("::{{closure}}");
    match path.rfind("::") {
        Some(pos) => &path[pos + 2..],
        None => path,
    }
}

/// Caller context for the current source location
#[macro_export]
macro_rules! caller {
    () => {{
        fn __here() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::logging::Caller::new(
            module_path!(),
            $crate::logging::enclosing_function(__type_name_of(__here)),
            line!(),
        )
    }};
}

/// Write a formatted line to the error stream
///
/// ```ignore
/// error_log!(logger, "failed to connect to {}", host);
/// ```
#[macro_export]
macro_rules! error_log {
    ($logger:expr, $($arg:tt)+) => {
        $logger.error_at($crate::caller!(), &format!($($arg)+))
    };
}

/// Write a formatted line to the change stream, tagged with a correlation id
///
/// ```ignore
/// change_log!(logger, user.id, "updated profile for {}", user.name);
/// ```
#[macro_export]
macro_rules! change_log {
    ($logger:expr, $id:expr, $($arg:tt)+) => {
        $logger.change_at($crate::caller!(), &format!($($arg)+), &$id)
    };
}

/// Write a formatted line to the trace stream
#[macro_export]
macro_rules! trace_log {
    ($logger:expr, $($arg:tt)+) => {
        $logger.trace_at($crate::caller!(), &format!($($arg)+))
    };
}
