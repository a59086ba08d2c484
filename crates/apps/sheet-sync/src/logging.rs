//! Logging setup: env_logger output teed to stdout and a log file

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Writer that duplicates everything to stdout and a file
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        self.file.flush()
    }
}

/// Open (or create) the log file in append mode, creating its directory
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

/// Install the global logger
///
/// Level comes from `RUST_LOG` (default `info`). Lines carry a millisecond
/// timestamp and level, and go to stdout and `log_file`.
pub fn init(log_file: &Path) -> Result<()> {
    let file = open_log_file(log_file)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(TeeWriter { file })))
        .try_init()
        .context("Logger already initialized")?;

    Ok(())
}
