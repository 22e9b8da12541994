//! Logging setup for the tap-sftp binary.
//!
//! stdout carries the catalog, so console logs always go to stderr. A
//! size-rotated copy is kept under `$TAP_SFTP_HOME/logs` when a home
//! directory can be resolved.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "tap_sftp=info,tap_sftp_inference=warn";
const VERBOSE_LOG_FILTER: &str = "tap_sftp=debug,tap_sftp_inference=debug";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging configuration for a tap run.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
    /// Overrides the default `$TAP_SFTP_HOME/logs` directory.
    pub log_dir: Option<PathBuf>,
    /// Disable the rolling file copy entirely.
    pub file_logging: bool,
}

impl<'a> LogConfig<'a> {
    pub fn new(app_name: &'a str) -> Self {
        Self {
            app_name,
            verbose: false,
            log_dir: None,
            file_logging: true,
        }
    }
}

/// Initialize tracing with stderr output and, if possible, a rolling file.
///
/// `RUST_LOG` wins over both the default and the verbose filter.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let filter = build_filter(config.verbose);

    let file_layer = if config.file_logging {
        let dir = match config.log_dir {
            Some(dir) => Some(dir),
            None => logs_dir(),
        };
        match dir {
            Some(dir) => {
                ensure_dir(&dir)?;
                let writer = SharedRollingWriter::new(dir, config.app_name)
                    .context("Failed to initialize rolling log writer")?;
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_filter(build_filter(config.verbose)),
                )
            }
            None => None,
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            VERBOSE_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        })
    })
}

/// Get the tap home directory: `$TAP_SFTP_HOME`, else `~/.tap_sftp`
pub fn tap_home() -> Option<PathBuf> {
    if let Ok(override_path) = std::env::var("TAP_SFTP_HOME") {
        return Some(PathBuf::from(override_path));
    }
    dirs::home_dir().map(|home| home.join(".tap_sftp"))
}

/// Get the logs directory: `<tap home>/logs`
pub fn logs_dir() -> Option<PathBuf> {
    tap_home().map(|home| home.join("logs"))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))
}

struct RollingFileAppender {
    dir: PathBuf,
    base_name: String,
    max_files: usize,
    max_size: u64,
    file: Option<File>,
    current_size: u64,
}

impl RollingFileAppender {
    fn new(dir: PathBuf, base_name: &str, max_files: usize, max_size: u64) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        let mut appender = Self {
            dir,
            base_name: sanitize_name(base_name),
            max_files: max_files.max(1),
            max_size,
            file: None,
            current_size: 0,
        };
        appender.reopen()?;
        if appender.current_size > appender.max_size {
            appender.rotate()?;
        }
        Ok(appender)
    }

    fn reopen(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(0))?;
        self.current_size = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    /// Index 0 is the live file; 1.. are rotated copies, 1 being newest.
    fn path_for(&self, index: usize) -> PathBuf {
        if index == 0 {
            self.dir.join(format!("{}.log", self.base_name))
        } else {
            self.dir.join(format!("{}.log.{}", self.base_name, index))
        }
    }

    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }

        let oldest = self.max_files.saturating_sub(1);
        if oldest > 0 {
            let oldest_path = self.path_for(oldest);
            if oldest_path.exists() {
                fs::remove_file(&oldest_path)?;
            }
            for idx in (0..oldest).rev() {
                let src = self.path_for(idx);
                if src.exists() {
                    fs::rename(&src, self.path_for(idx + 1))?;
                }
            }
        }

        self.reopen()
    }
}

impl Write for RollingFileAppender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.current_size + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file unavailable"))?;
        let bytes = file.write(buf)?;
        self.current_size += bytes as u64;
        Ok(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

#[derive(Clone)]
struct SharedRollingWriter {
    inner: Arc<Mutex<RollingFileAppender>>,
}

impl SharedRollingWriter {
    fn new(dir: PathBuf, base_name: &str) -> Result<Self> {
        let appender = RollingFileAppender::new(dir, base_name, MAX_LOG_FILES, MAX_LOG_FILE_SIZE)
            .with_context(|| format!("Failed to open log file for {}", base_name))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(appender)),
        })
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedRollingWriter {
    type Writer = SharedRollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for SharedRollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?
            .flush()
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("tap-sftp"), "tap-sftp");
        assert_eq!(sanitize_name("tap sftp/1"), "tap_sftp_1");
    }

    #[test]
    fn test_rotation_keeps_bounded_file_count() {
        let temp_dir = TempDir::new().unwrap();
        let mut appender =
            RollingFileAppender::new(temp_dir.path().to_path_buf(), "tap", 3, 16).unwrap();

        for _ in 0..10 {
            appender.write_all(b"0123456789\n").unwrap();
        }
        appender.flush().unwrap();

        assert!(temp_dir.path().join("tap.log").exists());
        assert!(temp_dir.path().join("tap.log.1").exists());
        assert!(temp_dir.path().join("tap.log.2").exists());
        assert!(!temp_dir.path().join("tap.log.3").exists());
    }

    #[test]
    fn test_reopen_appends_to_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut appender =
                RollingFileAppender::new(temp_dir.path().to_path_buf(), "tap", 2, 1024).unwrap();
            appender.write_all(b"first\n").unwrap();
        }
        let appender =
            RollingFileAppender::new(temp_dir.path().to_path_buf(), "tap", 2, 1024).unwrap();
        assert_eq!(appender.current_size, 6);
    }
}
