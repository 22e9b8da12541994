//! Stream definitions and the catalog document
//!
//! Serialization order is part of the contract: header columns come first in
//! file order, then the three `_sdc_` columns, so repeated discovery of the
//! same file produces byte-identical JSON.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tap_sftp_inference::JsonType;

pub const SDC_SOURCE_FILE_COLUMN: &str = "_sdc_source_file";
pub const SDC_SOURCE_LINENO_COLUMN: &str = "_sdc_source_lineno";
pub const SDC_EXTRA_COLUMN: &str = "_sdc_extra";

/// Names of the bookkeeping columns every stream carries
pub const SDC_COLUMNS: [&str; 3] = [
    SDC_SOURCE_FILE_COLUMN,
    SDC_SOURCE_LINENO_COLUMN,
    SDC_EXTRA_COLUMN,
];

/// A `type` keyword: either a bare type or a union list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(JsonType),
    Union(Vec<JsonType>),
}

/// Schema of one property
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
}

impl PropertySchema {
    pub fn single(data_type: JsonType) -> Self {
        Self {
            schema_type: SchemaType::Single(data_type),
            format: None,
            items: None,
        }
    }

    pub fn union(types: Vec<JsonType>) -> Self {
        Self {
            schema_type: SchemaType::Union(types),
            format: None,
            items: None,
        }
    }

    /// `["null", "string"]`, the schema of any untyped column
    pub fn nullable_string() -> Self {
        Self::union(JsonType::String.nullable_union())
    }

    /// `["null", "string"]` with `format: date-time`
    pub fn nullable_date_time() -> Self {
        Self {
            format: Some("date-time".to_string()),
            ..Self::nullable_string()
        }
    }

    pub fn array_of(items: PropertySchema) -> Self {
        Self {
            schema_type: SchemaType::Single(JsonType::Array),
            format: None,
            items: Some(Box::new(items)),
        }
    }

    /// Types this property admits, in declaration order
    pub fn types(&self) -> Vec<JsonType> {
        match &self.schema_type {
            SchemaType::Single(t) => vec![*t],
            SchemaType::Union(types) => types.clone(),
        }
    }
}

/// Object schema of one stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamSchema {
    #[serde(rename = "type")]
    pub schema_type: JsonType,
    pub properties: IndexMap<String, PropertySchema>,
}

impl StreamSchema {
    /// Build an object schema from the file's columns followed by the three
    /// bookkeeping columns. A file column that reuses an `_sdc_` name is
    /// dropped from its header position and replaced by the bookkeeping
    /// definition.
    pub fn with_sdc_columns(columns: IndexMap<String, PropertySchema>) -> Self {
        let mut properties = columns;
        for (name, schema) in sdc_properties() {
            if properties.shift_remove(name).is_some() {
                tracing::warn!(column = name, "file column shadows a reserved column");
            }
            properties.insert(name.to_string(), schema);
        }
        Self {
            schema_type: JsonType::Object,
            properties,
        }
    }
}

fn sdc_properties() -> [(&'static str, PropertySchema); 3] {
    [
        (
            SDC_SOURCE_FILE_COLUMN,
            PropertySchema::single(JsonType::String),
        ),
        (
            SDC_SOURCE_LINENO_COLUMN,
            PropertySchema::single(JsonType::Integer),
        ),
        (
            SDC_EXTRA_COLUMN,
            PropertySchema::array_of(PropertySchema::single(JsonType::String)),
        ),
    ]
}

/// Singer-style metadata entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataEntry {
    pub breadcrumb: Vec<String>,
    pub metadata: JsonValue,
}

/// One discovered stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamDefinition {
    pub stream: String,
    pub tap_stream_id: String,
    pub schema: StreamSchema,
    pub key_properties: Vec<String>,
    pub metadata: Vec<MetadataEntry>,
}

impl StreamDefinition {
    pub fn new(table_name: &str, schema: StreamSchema, key_properties: Vec<String>) -> Self {
        let metadata = build_metadata(&schema, &key_properties);
        Self {
            stream: table_name.to_string(),
            tap_stream_id: table_name.to_string(),
            schema,
            key_properties,
            metadata,
        }
    }
}

/// Stream-level entry first, then one entry per property. Key and
/// bookkeeping columns are always replicated.
fn build_metadata(schema: &StreamSchema, key_properties: &[String]) -> Vec<MetadataEntry> {
    let mut entries = vec![MetadataEntry {
        breadcrumb: vec![],
        metadata: json!({
            "inclusion": "available",
            "table-key-properties": key_properties,
            "forced-replication-method": "INCREMENTAL",
        }),
    }];

    for name in schema.properties.keys() {
        let automatic =
            key_properties.iter().any(|k| k == name) || SDC_COLUMNS.contains(&name.as_str());
        entries.push(MetadataEntry {
            breadcrumb: vec!["properties".to_string(), name.clone()],
            metadata: json!({
                "inclusion": if automatic { "automatic" } else { "available" },
            }),
        });
    }

    entries
}

/// The document printed by `discover`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    pub streams: Vec<StreamDefinition>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sdc_columns_serialize() {
        let schema = StreamSchema::with_sdc_columns(IndexMap::new());
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "object",
                "properties": {
                    "_sdc_source_file": {"type": "string"},
                    "_sdc_source_lineno": {"type": "integer"},
                    "_sdc_extra": {"type": "array", "items": {"type": "string"}}
                }
            })
        );
    }

    #[test]
    fn test_property_order_is_columns_then_sdc() {
        let mut columns = IndexMap::new();
        columns.insert("zeta".to_string(), PropertySchema::nullable_string());
        columns.insert("alpha".to_string(), PropertySchema::nullable_string());

        let schema = StreamSchema::with_sdc_columns(columns);
        let names: Vec<&str> = schema.properties.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["zeta", "alpha", "_sdc_source_file", "_sdc_source_lineno", "_sdc_extra"]
        );
    }

    #[test]
    fn test_shadowed_sdc_column_is_replaced() {
        let mut columns = IndexMap::new();
        columns.insert(SDC_EXTRA_COLUMN.to_string(), PropertySchema::nullable_string());
        columns.insert("Col1".to_string(), PropertySchema::nullable_string());
        columns.insert(
            SDC_SOURCE_LINENO_COLUMN.to_string(),
            PropertySchema::nullable_string(),
        );
        let schema = StreamSchema::with_sdc_columns(columns);

        let names: Vec<&str> = schema.properties.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["Col1", "_sdc_source_file", "_sdc_source_lineno", "_sdc_extra"]
        );
        assert_eq!(
            schema.properties[SDC_SOURCE_LINENO_COLUMN],
            PropertySchema::single(JsonType::Integer)
        );
        assert_eq!(
            schema.properties[SDC_EXTRA_COLUMN],
            PropertySchema::array_of(PropertySchema::single(JsonType::String))
        );
    }

    #[test]
    fn test_date_time_format_serializes() {
        let value = serde_json::to_value(PropertySchema::nullable_date_time()).unwrap();
        assert_eq!(value, json!({"type": ["null", "string"], "format": "date-time"}));
    }

    #[test]
    fn test_metadata_marks_keys_and_sdc_automatic() {
        let mut columns = IndexMap::new();
        columns.insert("id".to_string(), PropertySchema::nullable_string());
        columns.insert("name".to_string(), PropertySchema::nullable_string());
        let schema = StreamSchema::with_sdc_columns(columns);

        let stream = StreamDefinition::new("orders", schema, vec!["id".to_string()]);
        assert_eq!(stream.tap_stream_id, "orders");
        assert_eq!(stream.metadata.len(), 6);
        assert_eq!(
            stream.metadata[0].metadata["table-key-properties"],
            json!(["id"])
        );

        let inclusion = |column: &str| {
            stream
                .metadata
                .iter()
                .find(|m| m.breadcrumb.last().map(String::as_str) == Some(column))
                .map(|m| m.metadata["inclusion"].clone())
                .unwrap()
        };
        assert_eq!(inclusion("id"), json!("automatic"));
        assert_eq!(inclusion("name"), json!("available"));
        assert_eq!(inclusion(SDC_EXTRA_COLUMN), json!("automatic"));
    }
}
