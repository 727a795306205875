use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Destination of rendered log lines.
///
/// A sink is owned by exactly one consumer thread, so implementations need no
/// internal synchronization. Each `write_line` call receives one complete
/// line including its trailing newline.
pub trait Sink: Send + 'static {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Closes out the current output under `suffix` and continues into a
    /// fresh one. Sinks that cannot rotate ignore the request.
    fn rotate(&mut self, _suffix: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Writes to the process's standard output.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        io::stdout().lock().write_all(line)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

/// Appends to a file. Rotation renames the current file to
/// `<path>.<suffix>` and reopens `<path>`.
pub struct FileSink {
    path: PathBuf,
    file: BufWriter<File>,
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

impl FileSink {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_append(&path)?;
        Ok(Self {
            path,
            file: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rotated_path(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }
}

impl Sink for FileSink {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.file.write_all(line)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }

    fn rotate(&mut self, suffix: &str) -> io::Result<()> {
        self.file.flush()?;
        let target = self.rotated_path(suffix);
        fs::rename(&self.path, &target)?;
        self.file = BufWriter::new(open_append(&self.path)?);
        tracing::info!(from = %self.path.display(), to = %target.display(), "rotated log file");
        Ok(())
    }
}
