use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Destination for formatted log lines produced by the layer.
///
/// Implementations are responsible for transporting lines to a concrete
/// backend (file, console, memory). The layer calls `write_line` inline on
/// the thread that emitted the event, so implementations serialize their own
/// access to the underlying writer.
pub trait LineSink: Send + Sync {
    /// Write one formatted line. The sink appends the line terminator.
    ///
    /// **Returns**
    /// - `Ok(())` if the line was accepted.
    /// - `Err(..)` on I/O failure. The layer reports it on stderr and keeps
    ///   going; the caller of the log statement never sees it.
    fn write_line(&self, line: &str) -> io::Result<()>;

    /// Flush any buffered output.
    ///
    /// Default implementation is a no-op.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Appends lines to a file, creating it if needed.
pub struct FileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    /// Open `path` in append mode, creating the file when it is missing.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineSink for FileSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{}", line)?;
        writer.flush()
    }

    fn flush(&self) -> io::Result<()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner).flush()
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = LineSink::flush(self);
    }
}

/// Writes lines to the process's standard error stream.
#[derive(Clone, Debug, Default)]
pub struct ConsoleSink;

impl LineSink for ConsoleSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut stderr = io::stderr().lock();
        writeln!(stderr, "{}", line)
    }

    fn flush(&self) -> io::Result<()> {
        io::stderr().lock().flush()
    }
}
