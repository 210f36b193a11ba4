// Mode-gated sequential line store: open -> read_row*/write_row* -> close.
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use libc::{EACCES, EPERM};
use tracing::{debug, trace};

use crate::core::error::{Error, ErrorKind};
use crate::core::format::{LineFormat, Row};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    Read,
    Write,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Read => "read",
            Mode::Write => "write",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Durability {
    #[default]
    Fast,
    Flush,
}

#[derive(Clone, Debug, Default)]
pub struct StoreOptions {
    pub format: LineFormat,
    pub durability: Durability,
    /// Take an exclusive advisory lock while open for writing.
    pub lock: bool,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: LineFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    pub fn with_lock(mut self, lock: bool) -> Self {
        self.lock = lock;
        self
    }
}

enum State {
    Closed,
    Reading { path: PathBuf, reader: BufReader<File> },
    Writing { path: PathBuf, file: File },
}

/// Owns at most one open file and hands out one row per call.
///
/// Not internally synchronized; share across threads only behind external
/// serialization.
pub struct DelimitedLineStore {
    options: StoreOptions,
    state: State,
    lines: u64,
}

impl Default for DelimitedLineStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DelimitedLineStore {
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            options,
            state: State::Closed,
            lines: 0,
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn mode(&self) -> Option<Mode> {
        match self.state {
            State::Closed => None,
            State::Reading { .. } => Some(Mode::Read),
            State::Writing { .. } => Some(Mode::Write),
        }
    }

    pub fn is_open(&self) -> bool {
        self.mode().is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.state {
            State::Closed => None,
            State::Reading { path, .. } | State::Writing { path, .. } => Some(path),
        }
    }

    /// Rows read or written since the last `open`.
    pub fn lines_processed(&self) -> u64 {
        self.lines
    }

    /// Opens `path` for reading from its start, or for appending (created if
    /// absent). Fails with `AlreadyOpen` if a handle is held; a failed open
    /// leaves the store closed.
    pub fn open(&mut self, path: impl AsRef<Path>, mode: Mode) -> Result<(), Error> {
        let path = path.as_ref();
        if let Some(current) = self.path() {
            return Err(Error::new(ErrorKind::AlreadyOpen)
                .with_message(format!(
                    "store already has a file open for {}",
                    self.mode().map(Mode::as_str).unwrap_or("?")
                ))
                .with_path(current)
                .with_hint("Call close() before opening another file."));
        }
        if path.as_os_str().is_empty() {
            return Err(Error::new(ErrorKind::Open).with_message("path must not be empty"));
        }

        let state = match mode {
            Mode::Read => {
                let file = File::open(path).map_err(|err| open_error(path, mode, err))?;
                reject_directory(&file, path, mode)?;
                State::Reading {
                    path: path.to_path_buf(),
                    reader: BufReader::new(file),
                }
            }
            Mode::Write => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|err| open_error(path, mode, err))?;
                reject_directory(&file, path, mode)?;
                if self.options.lock {
                    file.try_lock_exclusive()
                        .map_err(|err| lock_error(path, err))?;
                }
                State::Writing {
                    path: path.to_path_buf(),
                    file,
                }
            }
        };

        self.state = state;
        self.lines = 0;
        debug!(path = %path.display(), mode = mode.as_str(), "opened line store");
        Ok(())
    }

    /// Reads the next line as a row. `Ok(None)` means end of file.
    pub fn read_row(&mut self) -> Result<Option<Row>, Error> {
        let line_no = self.lines + 1;
        let (path, reader) = match &mut self.state {
            State::Reading { path, reader } => (path, reader),
            State::Writing { path, .. } => return Err(mode_error(path, "read_row", Mode::Write)),
            State::Closed => return Err(not_open_error("read_row")),
        };

        let mut buf = Vec::new();
        let read = reader.read_until(b'\n', &mut buf);
        // Bytes consumed count as a line even when the read or decode fails.
        if !buf.is_empty() {
            self.lines = line_no;
        }
        let read = read.map_err(|err| read_error(path, line_no, "failed to read line", err))?;
        if read == 0 {
            trace!(path = %path.display(), rows = self.lines, "end of file");
            return Ok(None);
        }

        let text = String::from_utf8(buf)
            .map_err(|err| read_error(path, line_no, "line is not valid UTF-8", err))?;
        let row = self.options.format.split_line(&text);
        trace!(line = line_no, columns = row.len(), "read row");
        Ok(Some(row))
    }

    /// Appends `columns` joined by the delimiter as one line.
    pub fn write_row<I, S>(&mut self, columns: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let line_no = self.lines + 1;
        let (path, file) = match &mut self.state {
            State::Writing { path, file } => (path, file),
            State::Reading { path, .. } => return Err(mode_error(path, "write_row", Mode::Read)),
            State::Closed => return Err(not_open_error("write_row")),
        };

        let line = self.options.format.join_row(columns);
        file.write_all(line.as_bytes())
            .map_err(|err| write_error(path, line_no, "failed to append row", err))?;
        if self.options.durability == Durability::Flush {
            file.sync_data()
                .map_err(|err| write_error(path, line_no, "failed to sync row", err))?;
        }

        self.lines = line_no;
        trace!(line = line_no, bytes = line.len(), "wrote row");
        Ok(())
    }

    /// Iterates the remaining rows; stops after the first error.
    pub fn rows(&mut self) -> Rows<'_> {
        Rows {
            store: self,
            done: false,
        }
    }

    /// Releases the handle. Closing a closed store is a no-op.
    pub fn close(&mut self) -> Result<(), Error> {
        let lines = std::mem::take(&mut self.lines);
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Closed => Ok(()),
            State::Reading { path, .. } => {
                debug!(path = %path.display(), rows = lines, "closed reader");
                Ok(())
            }
            State::Writing { path, mut file } => {
                let flushed = file
                    .flush()
                    .map_err(|err| write_error(&path, lines, "failed to flush on close", err));
                debug!(path = %path.display(), rows = lines, "closed writer");
                flushed
            }
        }
    }

    #[deprecated(note = "use `read_row` instead")]
    pub fn read_pair(&mut self) -> Result<Option<(String, String)>, Error> {
        let Some(row) = self.read_row()? else {
            return Ok(None);
        };
        let found = row.len();
        let mut fields = row.into_iter();
        match (fields.next(), fields.next()) {
            (Some(first), Some(second)) => Ok(Some((first, second))),
            _ => {
                let mut err = Error::new(ErrorKind::Format)
                    .with_message(format!("expected at least 2 columns, found {found}"))
                    .with_line(self.lines);
                if let Some(path) = self.path() {
                    err = err.with_path(path);
                }
                Err(err)
            }
        }
    }

    #[deprecated(note = "use `read_row` instead")]
    pub fn read_into<E>(&mut self, columns: &mut E) -> Result<bool, Error>
    where
        E: Extend<String>,
    {
        match self.read_row()? {
            Some(row) => {
                columns.extend(row);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    #[deprecated(note = "use `write_row` instead")]
    pub fn write<I, S>(&mut self, columns: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.write_row(columns)
    }
}

pub struct Rows<'a> {
    store: &'a mut DelimitedLineStore,
    done: bool,
}

impl Iterator for Rows<'_> {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.store.read_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn reject_directory(file: &File, path: &Path, mode: Mode) -> Result<(), Error> {
    let meta = file.metadata().map_err(|err| open_error(path, mode, err))?;
    if meta.is_dir() {
        return Err(Error::new(ErrorKind::Open)
            .with_message(format!("cannot open a directory for {}", mode.as_str()))
            .with_path(path));
    }
    Ok(())
}

fn open_error(path: &Path, mode: Mode, err: io::Error) -> Error {
    let mut out = Error::new(ErrorKind::Open)
        .with_message(format!("failed to open file for {}", mode.as_str()))
        .with_path(path);
    if err.kind() == io::ErrorKind::NotFound {
        out = out.with_hint("Read mode requires an existing file; check the path.");
    } else if is_permission_error(&err) {
        out = out.with_hint("Check file and directory permissions.");
    }
    out.with_source(err)
}

fn lock_error(path: &Path, err: io::Error) -> Error {
    let kind = lock_error_kind(&err);
    let mut out = Error::new(kind)
        .with_message("failed to lock file for writing")
        .with_path(path);
    if kind == ErrorKind::Busy {
        out = out.with_hint("Another writer holds the lock; retry after it closes.");
    }
    out.with_source(err)
}

// Some platforms report a held fcntl lock as EACCES rather than EWOULDBLOCK.
fn lock_error_kind(err: &io::Error) -> ErrorKind {
    let errno = err.raw_os_error().unwrap_or_default();
    if errno == EACCES || err.kind() == io::ErrorKind::WouldBlock {
        return ErrorKind::Busy;
    }
    ErrorKind::Open
}

fn is_permission_error(err: &io::Error) -> bool {
    let errno = err.raw_os_error().unwrap_or_default();
    errno == EACCES || errno == EPERM || err.kind() == io::ErrorKind::PermissionDenied
}

fn read_error<E>(path: &Path, line: u64, message: &str, err: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::new(ErrorKind::Read)
        .with_message(message)
        .with_path(path)
        .with_line(line)
        .with_source(err)
}

fn write_error(path: &Path, line: u64, message: &str, err: io::Error) -> Error {
    Error::new(ErrorKind::Write)
        .with_message(message)
        .with_path(path)
        .with_line(line)
        .with_source(err)
}

fn mode_error(path: &Path, op: &str, mode: Mode) -> Error {
    Error::new(ErrorKind::Mode)
        .with_message(format!("{op} is not allowed: file is open for {}", mode.as_str()))
        .with_path(path)
}

fn not_open_error(op: &str) -> Error {
    Error::new(ErrorKind::NotOpen)
        .with_message(format!("{op} requires an open file"))
        .with_hint("Call open() first.")
}
