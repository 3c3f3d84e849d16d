//! Rolling Logger
//!
//! A size-rotated file logger with an in-memory circular buffer of the most
//! recent lines. Installs a `tracing` subscriber and bridges the `log` facade,
//! so library code can keep using `log::info!` and friends.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::fmt::MakeWriter;

static LOGGER: OnceLock<RollingWriter> = OnceLock::new();

/// Tuning knobs for the rolling file set
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    /// Rotate once the active file would grow past this size
    pub max_file_bytes: u64,
    /// Total number of files kept, active file included
    pub max_files: usize,
    /// Lines kept in memory for `recent_lines`
    pub buffer_lines: usize,
    pub level: Level,
    /// Mirror every line to stderr
    pub also_stderr: bool,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            max_file_bytes: 2 * 1024 * 1024,
            max_files: 5,
            buffer_lines: 500,
            level: Level::INFO,
            also_stderr: true,
        }
    }
}

struct RollingFile {
    dir: PathBuf,
    app_name: String,
    max_file_bytes: u64,
    max_files: usize,
    file: File,
    written: u64,
    recent: VecDeque<String>,
    buffer_lines: usize,
}

impl RollingFile {
    fn open(dir: &Path, app_name: &str, options: &LoggerOptions) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = active_path(dir, app_name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            dir: dir.to_path_buf(),
            app_name: app_name.to_string(),
            max_file_bytes: options.max_file_bytes.max(1),
            max_files: options.max_files.max(1),
            file,
            written,
            recent: VecDeque::with_capacity(options.buffer_lines),
            buffer_lines: options.buffer_lines,
        })
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let active = active_path(&self.dir, &self.app_name);

        if self.max_files == 1 {
            fs::remove_file(&active)?;
        } else {
            let oldest = archive_path(&self.dir, &self.app_name, self.max_files - 1);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for index in (1..self.max_files - 1).rev() {
                let from = archive_path(&self.dir, &self.app_name, index);
                if from.exists() {
                    fs::rename(&from, archive_path(&self.dir, &self.app_name, index + 1))?;
                }
            }
            fs::rename(&active, archive_path(&self.dir, &self.app_name, 1))?;
        }

        self.file = OpenOptions::new().create(true).append(true).open(&active)?;
        self.written = 0;
        Ok(())
    }

    fn remember(&mut self, chunk: &[u8]) {
        if self.buffer_lines == 0 {
            return;
        }
        for line in String::from_utf8_lossy(chunk).lines() {
            if line.trim().is_empty() {
                continue;
            }
            if self.recent.len() == self.buffer_lines {
                self.recent.pop_front();
            }
            self.recent.push_back(line.to_string());
        }
    }
}

fn active_path(dir: &Path, app_name: &str) -> PathBuf {
    dir.join(format!("{}.log", app_name))
}

fn archive_path(dir: &Path, app_name: &str, index: usize) -> PathBuf {
    dir.join(format!("{}.{}.log", app_name, index))
}

/// Cloneable handle to the rolling file set; usable as a `tracing` writer.
#[derive(Clone)]
pub struct RollingWriter {
    inner: Arc<Mutex<RollingFile>>,
}

impl RollingWriter {
    pub fn new(dir: impl AsRef<Path>, app_name: &str, options: &LoggerOptions) -> io::Result<Self> {
        let file = RollingFile::open(dir.as_ref(), app_name, options)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(file)),
        })
    }

    /// Most recent lines, oldest first
    pub fn recent_lines(&self) -> Vec<String> {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.recent.iter().cloned().collect()
    }

    pub fn active_file(&self) -> PathBuf {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        active_path(&guard.dir, &guard.app_name)
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.written > 0 && guard.written + buf.len() as u64 > guard.max_file_bytes {
            guard.rotate()?;
        }
        guard.file.write_all(buf)?;
        guard.written += buf.len() as u64;
        guard.remember(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Initialize the global logger with default options
pub fn init_logger(log_dir: impl AsRef<Path>, app_name: &str) -> Result<(), String> {
    init_logger_with(log_dir, app_name, LoggerOptions::default())
}

/// Initialize the global logger
///
/// Fails if a logger (or any other global `tracing` subscriber) is already installed.
pub fn init_logger_with(
    log_dir: impl AsRef<Path>,
    app_name: &str,
    options: LoggerOptions,
) -> Result<(), String> {
    if LOGGER.get().is_some() {
        return Err("Logger already initialized".to_string());
    }

    let writer = RollingWriter::new(log_dir.as_ref(), app_name, &options)
        .map_err(|e| format!("Failed to open log file: {}", e))?;

    let installed = if options.also_stderr {
        tracing_subscriber::fmt()
            .with_writer(writer.clone().and(io::stderr))
            .with_ansi(false)
            .with_max_level(options.level)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_writer(writer.clone())
            .with_ansi(false)
            .with_max_level(options.level)
            .try_init()
    };
    installed.map_err(|e| format!("Failed to install subscriber: {}", e))?;

    LOGGER
        .set(writer)
        .map_err(|_| "Logger already initialized".to_string())?;

    tracing::info!(
        target: "rolling_logger",
        "{} logging started at {}",
        app_name,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

fn ensure_initialized() -> Result<(), String> {
    LOGGER
        .get()
        .map(|_| ())
        .ok_or_else(|| "Logger not initialized".to_string())
}

pub fn info(message: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::info!(target: "app", "{}", message);
    Ok(())
}

pub fn warn(message: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::warn!(target: "app", "{}", message);
    Ok(())
}

pub fn error(message: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::error!(target: "app", "{}", message);
    Ok(())
}

/// Last buffered lines of the global logger (empty before `init_logger`)
pub fn recent_lines() -> Vec<String> {
    LOGGER
        .get()
        .map(RollingWriter::recent_lines)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn small_options(max_file_bytes: u64, max_files: usize, buffer_lines: usize) -> LoggerOptions {
        LoggerOptions {
            max_file_bytes,
            max_files,
            buffer_lines,
            also_stderr: false,
            ..LoggerOptions::default()
        }
    }

    #[test]
    fn test_writes_to_active_file() {
        let dir = tempdir().unwrap();
        let mut writer = RollingWriter::new(dir.path(), "books", &small_options(1024, 3, 10)).unwrap();

        writer.write_all(b"first line\n").unwrap();
        writer.flush().unwrap();

        let content = fs::read_to_string(dir.path().join("books.log")).unwrap();
        assert_eq!(content, "first line\n");
        assert_eq!(writer.active_file(), dir.path().join("books.log"));
    }

    #[test]
    fn test_rotates_when_size_exceeded() {
        let dir = tempdir().unwrap();
        let mut writer = RollingWriter::new(dir.path(), "books", &small_options(16, 3, 10)).unwrap();

        writer.write_all(b"aaaaaaaaaaaa\n").unwrap();
        writer.write_all(b"bbbbbbbbbbbb\n").unwrap();
        writer.write_all(b"cccccccccccc\n").unwrap();
        writer.write_all(b"dddddddddddd\n").unwrap();
        writer.flush().unwrap();

        let active = fs::read_to_string(dir.path().join("books.log")).unwrap();
        let first = fs::read_to_string(dir.path().join("books.1.log")).unwrap();
        let second = fs::read_to_string(dir.path().join("books.2.log")).unwrap();
        assert_eq!(active, "dddddddddddd\n");
        assert_eq!(first, "cccccccccccc\n");
        assert_eq!(second, "bbbbbbbbbbbb\n");
        // Oldest archive dropped once max_files is reached
        assert!(!dir.path().join("books.3.log").exists());
    }

    #[test]
    fn test_single_file_truncates_on_rotation() {
        let dir = tempdir().unwrap();
        let mut writer = RollingWriter::new(dir.path(), "books", &small_options(8, 1, 10)).unwrap();

        writer.write_all(b"1234567\n").unwrap();
        writer.write_all(b"abcdefg\n").unwrap();
        writer.flush().unwrap();

        let active = fs::read_to_string(dir.path().join("books.log")).unwrap();
        assert_eq!(active, "abcdefg\n");
        assert!(!dir.path().join("books.1.log").exists());
    }

    #[test]
    fn test_recent_lines_is_circular() {
        let dir = tempdir().unwrap();
        let mut writer = RollingWriter::new(dir.path(), "books", &small_options(4096, 2, 2)).unwrap();

        writer.write_all(b"one\n").unwrap();
        writer.write_all(b"two\nthree\n").unwrap();

        assert_eq!(writer.recent_lines(), vec!["two".to_string(), "three".to_string()]);
    }

    #[test]
    fn test_helpers_require_init() {
        // No global logger is installed by the unit tests
        if LOGGER.get().is_none() {
            assert!(info("hello").is_err());
            assert!(recent_lines().is_empty());
        }
    }
}
