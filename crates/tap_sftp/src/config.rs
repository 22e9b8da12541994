//! Tap configuration
//!
//! Loaded from the JSON file passed with `--config`. `tables` may be either
//! a JSON array or a string holding that array, which is how Singer UIs
//! store it.

use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DELIMITER: &str = ",";
pub const DEFAULT_SAMPLE_RATE: usize = 5;
pub const DEFAULT_MAX_RECORDS: usize = 1000;

/// Top-level tap configuration
#[derive(Clone, Deserialize)]
pub struct Config {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: String,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub private_key_file: Option<PathBuf>,

    #[serde(default)]
    pub private_key_passphrase: Option<String>,

    /// Socket and SSH session timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(deserialize_with = "deserialize_tables")]
    pub tables: Vec<TableSpec>,

    #[serde(default)]
    pub decryption_configs: Option<DecryptionConfig>,

    #[serde(default)]
    pub sampling: SamplingConfig,
}

// Hand-written so credentials never reach the logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("private_key_file", &self.private_key_file)
            .field("timeout_secs", &self.timeout_secs)
            .field("tables", &self.tables)
            .field("decryption_configs", &self.decryption_configs)
            .field("sampling", &self.sampling)
            .finish()
    }
}

/// One remote table: a directory of delimited files sharing a layout
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableSpec {
    pub table_name: String,

    /// Remote directory searched recursively for candidate files
    pub search_prefix: String,

    /// Regex matched against each candidate's full path
    #[serde(default)]
    pub search_pattern: Option<String>,

    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    #[serde(default = "default_true")]
    pub parse_types: bool,

    #[serde(default)]
    pub key_properties: Vec<String>,

    /// Columns forced to `string` with `format: date-time`
    #[serde(default)]
    pub date_overrides: Vec<String>,
}

impl TableSpec {
    /// The delimiter as the single byte the CSV reader needs.
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(ConfigError::Invalid(format!(
                "table '{}': delimiter must be a single ASCII character, got {:?}",
                self.table_name, self.delimiter
            ))),
        }
    }

    /// Compiled `search_pattern`, if one is configured.
    pub fn search_regex(&self) -> Result<Option<Regex>, ConfigError> {
        self.search_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                    table: self.table_name.clone(),
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .transpose()
    }
}

/// GnuPG decryption settings
#[derive(Clone, Deserialize)]
pub struct DecryptionConfig {
    /// Name of the SSM parameter holding the armored private key
    #[serde(rename = "SSM_key_name")]
    pub ssm_key_name: String,

    pub gnupghome: PathBuf,

    pub passphrase: String,
}

impl std::fmt::Debug for DecryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptionConfig")
            .field("ssm_key_name", &self.ssm_key_name)
            .field("gnupghome", &self.gnupghome)
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// How many rows discovery reads from each file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Keep every Nth data row, starting with the first
    pub sample_rate: usize,

    /// Stop after this many sampled rows
    pub max_records: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_records: DEFAULT_MAX_RECORDS,
        }
    }
}

impl Config {
    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse and validate a config from JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::Invalid("username must not be empty".to_string()));
        }
        if self.password.is_none() && self.private_key_file.is_none() {
            return Err(ConfigError::Invalid(
                "one of password or private_key_file is required".to_string(),
            ));
        }
        if self.tables.is_empty() {
            return Err(ConfigError::Invalid("tables must not be empty".to_string()));
        }
        if self.sampling.sample_rate == 0 || self.sampling.max_records == 0 {
            return Err(ConfigError::Invalid(
                "sampling.sample_rate and sampling.max_records must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            if table.table_name.trim().is_empty() {
                return Err(ConfigError::Invalid("table_name must not be empty".to_string()));
            }
            if !seen.insert(table.table_name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate table_name '{}'",
                    table.table_name
                )));
            }
            if table.search_prefix.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "table '{}': search_prefix must not be empty",
                    table.table_name
                )));
            }
            table.delimiter_byte()?;
            table.search_regex()?;
        }

        Ok(())
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

fn default_true() -> bool {
    true
}

fn deserialize_tables<'de, D>(deserializer: D) -> Result<Vec<TableSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tables {
        List(Vec<TableSpec>),
        Encoded(String),
    }

    match Tables::deserialize(deserializer)? {
        Tables::List(tables) => Ok(tables),
        Tables::Encoded(raw) => serde_json::from_str(&raw).map_err(serde::de::Error::custom),
    }
}
