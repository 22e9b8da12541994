//! SFTP client wrapper
//!
//! `RemoteFiles` is the seam discovery talks to; `SftpConnection` is the
//! `ssh2`-backed implementation used by the binary.

use chrono::{DateTime, Utc};
use ssh2::{Session, Sftp};
use std::io::Read;
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::SftpError;

/// A candidate file on the remote host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub filepath: String,
    pub last_modified: DateTime<Utc>,
}

/// Remote file listing and reading
pub trait RemoteFiles {
    /// Every regular, non-empty file below `prefix`, recursively.
    fn get_files_by_prefix(&self, prefix: &str) -> Result<Vec<RemoteFile>, SftpError>;

    /// Open a file for sequential reading.
    fn get_file_handle<'a>(&'a self, filepath: &str) -> Result<Box<dyn Read + 'a>, SftpError>;
}

/// Connection retry schedule
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base, 2x base, 4x base...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor)
    }
}

/// Run `op` until it succeeds, fails permanently, or the policy is exhausted.
pub fn retry_with_backoff<T, F>(policy: &RetryPolicy, host: &str, mut op: F) -> Result<T, SftpError>
where
    F: FnMut() -> Result<T, SftpError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) if attempt >= max_attempts => {
                return Err(SftpError::ConnectExhausted {
                    host: host.to_string(),
                    attempts: attempt,
                    last_error: Box::new(err),
                });
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    host,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "SFTP connection failed, retrying"
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

/// Authenticated SFTP session
pub struct SftpConnection {
    // Dropping the session closes the channel; keep it alive alongside `sftp`.
    _session: Session,
    sftp: Sftp,
}

impl SftpConnection {
    /// Connect with the default retry schedule.
    pub fn connect(config: &Config) -> Result<Self, SftpError> {
        Self::connect_with_retry(config, &RetryPolicy::default())
    }

    pub fn connect_with_retry(config: &Config, policy: &RetryPolicy) -> Result<Self, SftpError> {
        let conn = retry_with_backoff(policy, &config.host, || Self::try_connect(config))?;
        info!(host = %config.host, port = config.port, "SFTP connection established");
        Ok(conn)
    }

    fn try_connect(config: &Config) -> Result<Self, SftpError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let tcp = TcpStream::connect((config.host.as_str(), config.port))?;
        tcp.set_read_timeout(Some(timeout))?;
        tcp.set_write_timeout(Some(timeout))?;

        let mut session = Session::new()?;
        session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        session.set_tcp_stream(tcp);
        session.handshake()?;

        if let Some(key_file) = &config.private_key_file {
            debug!(key_file = %key_file.display(), "authenticating with private key");
            session.userauth_pubkey_file(
                &config.username,
                None,
                key_file,
                config.private_key_passphrase.as_deref(),
            )?;
        } else if let Some(password) = &config.password {
            debug!("authenticating with password");
            session.userauth_password(&config.username, password)?;
        }

        if !session.authenticated() {
            return Err(SftpError::Auth {
                host: config.host.clone(),
                username: config.username.clone(),
            });
        }

        let sftp = session.sftp()?;
        Ok(Self {
            _session: session,
            sftp,
        })
    }
}

impl RemoteFiles for SftpConnection {
    fn get_files_by_prefix(&self, prefix: &str) -> Result<Vec<RemoteFile>, SftpError> {
        let root = normalize_prefix(prefix);
        let mut pending = vec![PathBuf::from(&root)];
        let mut files = Vec::new();

        while let Some(dir) = pending.pop() {
            for (path, stat) in self.sftp.readdir(dir.as_path())? {
                if stat.is_dir() {
                    pending.push(path);
                    continue;
                }
                if stat.size == Some(0) {
                    debug!(path = %path.display(), "skipping empty file");
                    continue;
                }
                let Some(last_modified) = stat.mtime.and_then(mtime_to_utc) else {
                    debug!(path = %path.display(), "skipping file without modification time");
                    continue;
                };
                files.push(RemoteFile {
                    filepath: path.to_string_lossy().into_owned(),
                    last_modified,
                });
            }
        }

        files.sort_by(|a, b| a.filepath.cmp(&b.filepath));
        debug!(prefix = %root, count = files.len(), "listed remote files");
        Ok(files)
    }

    fn get_file_handle<'a>(&'a self, filepath: &str) -> Result<Box<dyn Read + 'a>, SftpError> {
        let file = self.sftp.open(Path::new(filepath))?;
        Ok(Box::new(file))
    }
}

/// Trailing slashes are dropped so `/Export/` and `/Export` walk the same
/// tree; the root itself stays `/`.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        if prefix.trim().starts_with('/') {
            "/".to_string()
        } else {
            ".".to_string()
        }
    } else {
        trimmed.to_string()
    }
}

fn mtime_to_utc(mtime: u64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(i64::try_from(mtime).ok()?, 0)
}

/// The most recently modified file. Ties go to the greatest path so the
/// choice does not depend on listing order.
pub fn select_newest<'a>(files: &'a [RemoteFile]) -> Option<&'a RemoteFile> {
    files.iter().max_by(|a, b| {
        a.last_modified
            .cmp(&b.last_modified)
            .then_with(|| a.filepath.cmp(&b.filepath))
    })
}
