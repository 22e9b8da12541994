//! Schema discovery
//!
//! For each configured table: list candidate files, take the newest, decrypt
//! it when decryption is configured, sample it, infer column types and wrap
//! the result in a stream definition. Tables are processed in config order
//! and the first failure aborts the run.

use indexmap::IndexMap;
use tap_sftp_inference::{infer_types_streaming, StreamingConfig, TypeInferenceResult};
use tracing::{debug, info, warn};

use crate::client::{select_newest, RemoteFile, RemoteFiles, SftpConnection};
use crate::config::{Config, TableSpec};
use crate::decrypt::{Decryptor, GpgDecryptor};
use crate::error::{ConfigError, DiscoveryError, Result, SampleError};
use crate::sampling::{sample_file, Sample};
use crate::schema::{
    PropertySchema, StreamDefinition, StreamSchema, SDC_SOURCE_FILE_COLUMN,
    SDC_SOURCE_LINENO_COLUMN,
};

/// Connect to the configured host and discover every table.
pub fn discover_streams(config: &Config) -> Result<Vec<StreamDefinition>> {
    let client = SftpConnection::connect(config)?;
    match &config.decryption_configs {
        Some(decryption) => {
            let decryptor = GpgDecryptor::new(decryption.clone());
            discover_streams_with(config, &client, Some(&decryptor))
        }
        None => discover_streams_with(config, &client, None),
    }
}

/// Discover every table using the given collaborators.
///
/// `decryptor` is only consulted when `config.decryption_configs` is set.
pub fn discover_streams_with(
    config: &Config,
    client: &dyn RemoteFiles,
    decryptor: Option<&dyn Decryptor>,
) -> Result<Vec<StreamDefinition>> {
    let decryptor = match (&config.decryption_configs, decryptor) {
        (Some(_), Some(decryptor)) => Some(decryptor),
        (Some(_), None) => {
            return Err(ConfigError::Invalid(
                "decryption_configs is set but no decryptor was supplied".to_string(),
            )
            .into());
        }
        (None, _) => None,
    };

    let mut streams = Vec::with_capacity(config.tables.len());
    for table in &config.tables {
        let stream = discover_table(config, table, client, decryptor)?;
        streams.push(stream);
    }

    info!(streams = streams.len(), "discovery complete");
    Ok(streams)
}

/// Candidate files for a table, filtered by its `search_pattern`.
pub fn matching_files(client: &dyn RemoteFiles, table: &TableSpec) -> Result<Vec<RemoteFile>> {
    let pattern = table.search_regex()?;
    let files = client.get_files_by_prefix(&table.search_prefix)?;
    let total = files.len();

    let matched: Vec<RemoteFile> = match pattern {
        Some(regex) => files
            .into_iter()
            .filter(|f| regex.is_match(&f.filepath))
            .collect(),
        None => files,
    };

    debug!(
        table = %table.table_name,
        prefix = %table.search_prefix,
        listed = total,
        matched = matched.len(),
        "matched candidate files"
    );
    Ok(matched)
}

fn discover_table(
    config: &Config,
    table: &TableSpec,
    client: &dyn RemoteFiles,
    decryptor: Option<&dyn Decryptor>,
) -> Result<StreamDefinition> {
    let delimiter = table.delimiter_byte()?;
    let files = matching_files(client, table)?;
    let newest = select_newest(&files).ok_or_else(|| DiscoveryError::NoFilesFound {
        table: table.table_name.clone(),
        prefix: table.search_prefix.clone(),
    })?;

    info!(
        table = %table.table_name,
        file = %newest.filepath,
        last_modified = %newest.last_modified.to_rfc3339(),
        candidates = files.len(),
        "sampling newest file"
    );

    let malformed = |source: SampleError| DiscoveryError::MalformedSample {
        table: table.table_name.clone(),
        file: newest.filepath.clone(),
        source,
    };

    let mut raw = client.get_file_handle(&newest.filepath)?;
    let sample = match decryptor {
        Some(decryptor) => {
            let decrypted = decryptor
                .decrypt(&mut raw, &newest.filepath)
                .map_err(|source| DiscoveryError::Decrypt {
                    file: newest.filepath.clone(),
                    source,
                })?;
            drop(raw);
            sample_file(decrypted, delimiter, &config.sampling).map_err(malformed)?
        }
        None => sample_file(&mut raw, delimiter, &config.sampling).map_err(malformed)?,
    };

    if let Some(first) = sample.rows.iter().find(|row| !row.extra.is_empty()) {
        debug!(
            table = %table.table_name,
            rows = sample.rows_with_extra(),
            first_line = first.line,
            "sampled rows carry overflow fields"
        );
    }

    let schema = StreamSchema::with_sdc_columns(column_schemas(table, &sample));
    let key_properties = key_properties(table, &sample);
    Ok(StreamDefinition::new(&table.table_name, schema, key_properties))
}

/// Per-column schemas in header order, before the bookkeeping columns.
pub fn column_schemas(table: &TableSpec, sample: &Sample) -> IndexMap<String, PropertySchema> {
    let mut columns: IndexMap<String, PropertySchema> = if table.parse_types {
        let names: Vec<&str> = sample.headers.iter().map(String::as_str).collect();
        let rows = sample.value_rows();
        let inferred = infer_types_streaming(
            &names,
            rows.iter().map(|r| r.as_slice()),
            StreamingConfig {
                max_rows: rows.len(),
                early_termination: true,
            },
        );
        inferred
            .columns
            .into_iter()
            .map(|(name, result)| {
                if let TypeInferenceResult::NoValidType { eliminations, .. } = &result {
                    for evidence in eliminations {
                        debug!(
                            table = %table.table_name,
                            column = %name,
                            eliminated = %evidence.eliminated,
                            reason = %evidence.reason.description(),
                            "column falls back to string"
                        );
                    }
                }
                let union = result.type_union();
                (name, PropertySchema::union(union))
            })
            .collect()
    } else {
        sample
            .headers
            .iter()
            .map(|name| (name.clone(), PropertySchema::nullable_string()))
            .collect()
    };

    for column in &table.date_overrides {
        match columns.get_mut(column) {
            Some(schema) => *schema = PropertySchema::nullable_date_time(),
            None => warn!(
                table = %table.table_name,
                column = %column,
                "date override names a column missing from the file"
            ),
        }
    }

    columns
}

/// Configured keys, or the file/line pair when none are configured.
fn key_properties(table: &TableSpec, sample: &Sample) -> Vec<String> {
    if table.key_properties.is_empty() {
        return vec![
            SDC_SOURCE_FILE_COLUMN.to_string(),
            SDC_SOURCE_LINENO_COLUMN.to_string(),
        ];
    }

    for key in &table.key_properties {
        if !sample.headers.contains(key) {
            warn!(
                table = %table.table_name,
                key = %key,
                "key property missing from the file header"
            );
        }
    }
    table.key_properties.clone()
}
