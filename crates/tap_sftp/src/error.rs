//! Error types for discovery and its collaborators

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid search_pattern '{pattern}' for table '{table}': {source}")]
    Pattern {
        table: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Config error: {0}")]
    Invalid(String),
}

/// SFTP transport errors
#[derive(Error, Debug)]
pub enum SftpError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("Authentication failed for user '{username}' on {host}")]
    Auth { host: String, username: String },

    #[error("Gave up connecting to {host} after {attempts} attempts: {last_error}")]
    ConnectExhausted {
        host: String,
        attempts: u32,
        last_error: Box<SftpError>,
    },
}

// libssh2 session codes for a dropped or stalled transport
const LIBSSH2_ERROR_BANNER_RECV: i32 = -2;
const LIBSSH2_ERROR_BANNER_SEND: i32 = -3;
const LIBSSH2_ERROR_SOCKET_SEND: i32 = -7;
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;
const LIBSSH2_ERROR_SOCKET_DISCONNECT: i32 = -13;
const LIBSSH2_ERROR_SOCKET_TIMEOUT: i32 = -30;
const LIBSSH2_ERROR_SOCKET_RECV: i32 = -43;

impl SftpError {
    /// Whether reconnecting could succeed. Rejected credentials, unreadable
    /// key files and protocol failures are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            SftpError::Io(_) => true,
            SftpError::Ssh(err) => matches!(
                err.code(),
                ssh2::ErrorCode::Session(
                    LIBSSH2_ERROR_BANNER_RECV
                        | LIBSSH2_ERROR_BANNER_SEND
                        | LIBSSH2_ERROR_SOCKET_SEND
                        | LIBSSH2_ERROR_TIMEOUT
                        | LIBSSH2_ERROR_SOCKET_DISCONNECT
                        | LIBSSH2_ERROR_SOCKET_TIMEOUT
                        | LIBSSH2_ERROR_SOCKET_RECV
                )
            ),
            SftpError::Auth { .. } | SftpError::ConnectExhausted { .. } => false,
        }
    }
}

/// Decryption helper errors
#[derive(Error, Debug)]
pub enum DecryptError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Required executable '{tool}' not found on PATH: {source}")]
    ToolNotFound {
        tool: &'static str,
        #[source]
        source: which::Error,
    },

    #[error("'{tool}' {action} failed ({status}): {stderr}")]
    Command {
        tool: &'static str,
        action: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Failed to read SSM parameter '{key_name}': {message}")]
    Ssm {
        key_name: String,
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Private key '{0}' is empty")]
    EmptyKey(String),
}

/// Sampling errors, reported against the line that caused them
#[derive(Error, Debug)]
pub enum SampleError {
    #[error("file has no header row")]
    MissingHeader,

    #[error("header column {0} has no name")]
    EmptyColumnName(usize),

    #[error("duplicate column '{0}' in header row")]
    DuplicateColumn(String),

    #[error("unreadable row at line {line:?}: {source}")]
    Csv {
        line: Option<u64>,
        #[source]
        source: csv::Error,
    },
}

/// Discovery error type
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("SFTP error: {0}")]
    Sftp(#[from] SftpError),

    #[error("Decryption failed for {file}: {source}")]
    Decrypt {
        file: String,
        #[source]
        source: DecryptError,
    },

    #[error("No files found for table '{table}' under prefix '{prefix}'")]
    NoFilesFound { table: String, prefix: String },

    #[error("Malformed sample in {file} (table '{table}'): {source}")]
    MalformedSample {
        table: String,
        file: String,
        #[source]
        source: SampleError,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, DiscoveryError>;
