use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target, WriteStyle};

use crate::output::suspend_spinners;

const LOG_DIR: &str = ".prev-updater";
const LOG_FILE: &str = "prev-updater.log";

/// Where records end up once the logger is installed.
#[derive(Debug)]
pub enum LogSink {
    /// stderr and the given file
    File(PathBuf),
    /// stderr only, because the log file could not be opened
    StderrOnly(anyhow::Error),
}

/// Installs the global logger.
///
/// Records are filtered by `RUST_LOG` (default `info`) and written to stderr
/// as well as appended to `log_file`, or `~/.prev-updater/prev-updater.log`.
/// When the file cannot be opened the logger still writes to stderr.
///
/// # Errors
///
/// Fails only when a global logger is already installed.
pub fn init(log_file: Option<&Path>) -> Result<LogSink> {
    let opened = log_path(log_file).and_then(|path| {
        let file = open_log_file(&path)?;
        Ok((path, file))
    });

    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.write_style(WriteStyle::Never);

    let sink = match opened {
        Ok((path, file)) => {
            builder.target(Target::Pipe(Box::new(TeeWriter::new(SpinnerAwareStderr, file))));
            LogSink::File(path)
        }
        Err(e) => {
            builder.target(Target::Pipe(Box::new(SpinnerAwareStderr)));
            LogSink::StderrOnly(e)
        }
    };

    builder.try_init().context("Logger already initialized")?;
    Ok(sink)
}

fn log_path(log_file: Option<&Path>) -> Result<PathBuf> {
    match log_file {
        Some(path) => Ok(path.to_path_buf()),
        None => {
            let home = dirs::home_dir().context("No home directory found for the log file")?;
            Ok(home.join(LOG_DIR).join(LOG_FILE))
        }
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

/// stderr writer that clears the phase spinners before each record.
struct SpinnerAwareStderr;

impl Write for SpinnerAwareStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        suspend_spinners(|| io::stderr().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

/// Duplicates every write to two sinks.
struct TeeWriter<A, B> {
    primary: A,
    secondary: B,
}

impl<A: Write, B: Write> TeeWriter<A, B> {
    fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

impl<A: Write, B: Write> Write for TeeWriter<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.primary.write_all(buf)?;
        self.secondary.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.primary.flush()?;
        self.secondary.flush()
    }
}
