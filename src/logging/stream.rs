//! The three log streams and their output sinks
//!
//! A stream owns at most one append-mode file. Its route decides whether a
//! line goes to the console, the file, or both.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::clock::day_stamp;

/// Which log a line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Errors,
    Changes,
    Trace,
}

impl StreamKind {
    pub const ALL: [StreamKind; 3] = [StreamKind::Errors, StreamKind::Changes, StreamKind::Trace];

    /// File name prefix for this stream
    pub fn prefix(&self) -> &'static str {
        match self {
            StreamKind::Errors => "errors",
            StreamKind::Changes => "changes",
            StreamKind::Trace => "trace",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "errors" => Some(StreamKind::Errors),
            "changes" => Some(StreamKind::Changes),
            "trace" => Some(StreamKind::Trace),
            _ => None,
        }
    }

    /// `<prefix>-<YYYY-M-D>.log`
    pub fn file_name(&self, date: NaiveDate) -> String {
        format!("{}-{}.log", self.prefix(), day_stamp(date))
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            StreamKind::Errors => 0,
            StreamKind::Changes => 1,
            StreamKind::Trace => 2,
        }
    }
}

/// Where a stream's lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// No file open; console only
    Console,
    /// File only
    File,
    /// Console and file
    Mirrored,
}

/// Console sink shared by all streams
pub type ConsoleSink = Box<dyn Write + Send>;

/// A writer that duplicates every write to the console and a file
struct FanOut<'a> {
    console: &'a mut dyn Write,
    file: &'a mut File,
}

impl Write for FanOut<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.console.write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.console.flush()?;
        self.file.flush()
    }
}

/// One log stream: its open file, the file's path and the derived route
#[derive(Debug)]
pub struct LogStream {
    kind: StreamKind,
    path: Option<PathBuf>,
    file: Option<File>,
    route: Route,
}

impl LogStream {
    pub fn new(kind: StreamKind) -> Self {
        Self {
            kind,
            path: None,
            file: None,
            route: Route::Console,
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Path of the open file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn route(&self) -> Route {
        self.route
    }

    /// Open `path` for appending, creating it and its parent folders.
    ///
    /// Any file already open is dropped first. On failure the stream is
    /// left closed.
    pub fn open(&mut self, path: PathBuf, mirror: bool) -> io::Result<()> {
        self.file = None;
        self.path = None;
        self.rebuild_writer(mirror);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        self.file = Some(file);
        self.path = Some(path);
        self.rebuild_writer(mirror);
        Ok(())
    }

    /// Flush and release the file. The stream is closed even when the
    /// flush reports an error.
    pub fn close(&mut self) -> io::Result<()> {
        self.path = None;
        self.route = Route::Console;
        match self.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }

    /// Recompute the route from the open file and the console flag
    pub fn rebuild_writer(&mut self, mirror: bool) {
        self.route = match (self.file.is_some(), mirror) {
            (false, _) => Route::Console,
            (true, false) => Route::File,
            (true, true) => Route::Mirrored,
        };
    }

    /// Append one line (plus newline) along the current route
    pub fn write_line(&mut self, line: &str, console: &mut dyn Write) -> io::Result<()> {
        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');
        let bytes = record.as_bytes();

        match (self.route, self.file.as_mut()) {
            (Route::Mirrored, Some(file)) => FanOut { console, file }.write_all(bytes),
            (Route::File, Some(file)) => file.write_all(bytes),
            _ => console.write_all(bytes),
        }
    }

    /// Append raw text to the file only; a no-op when nothing is open
    pub fn write_to_file(&mut self, text: &str) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => {
                file.write_all(text.as_bytes())?;
                file.write_all(b"\n")
            }
            None => Ok(()),
        }
    }
}

/// In-memory console sink, handy for capturing output
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        self.inner
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut inner) = self.inner.lock() {
            inner.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
