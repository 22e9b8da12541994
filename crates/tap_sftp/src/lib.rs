//! tap-sftp - schema discovery for delimited files on SFTP hosts
//!
//! Connects to an SFTP server, picks the newest file for each configured
//! table, optionally decrypts it with GnuPG, samples it and infers a
//! JSON-Schema for every column.

pub mod client;
pub mod config;
pub mod decrypt;
pub mod discover;
pub mod error;
pub mod sampling;
pub mod schema;

pub use client::{select_newest, RemoteFile, RemoteFiles, RetryPolicy, SftpConnection};
pub use config::{Config, DecryptionConfig, SamplingConfig, TableSpec};
pub use decrypt::{DecryptedFile, Decryptor, GpgDecryptor, KeySource, SsmKeySource};
pub use discover::{discover_streams, discover_streams_with, matching_files};
pub use error::{ConfigError, DecryptError, DiscoveryError, SampleError, SftpError};
pub use schema::{
    Catalog, PropertySchema, SchemaType, StreamDefinition, StreamSchema, SDC_COLUMNS,
    SDC_EXTRA_COLUMN, SDC_SOURCE_FILE_COLUMN, SDC_SOURCE_LINENO_COLUMN,
};
