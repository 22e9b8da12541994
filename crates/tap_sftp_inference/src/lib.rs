//! Elimination-based type inference for sampled flat-file columns
//!
//! Every column starts with all JSON-Schema scalar candidates
//! (`integer`, `number`, `boolean`). Each non-null value removes the
//! candidates it contradicts. Whatever survives the whole sample is the
//! column type; if nothing survives the column is a `string`.
//!
//! # Example
//!
//! Given a column with values: `["7", "", "12", "0.5"]`
//!
//! - `"7"` and `"12"` keep `integer` and `number`, eliminate `boolean`
//! - `""` is a null and eliminates nothing
//! - `"0.5"` eliminates `integer`
//! - The column resolves to `["null", "number"]`
//!
//! Nulls never eliminate anything, so every union starts with `"null"`.

pub mod constraints;
pub mod solver;
pub mod streaming;

pub use constraints::{EliminatedItem, EliminationEvidence, EliminationReason, TypeInferenceResult};
pub use solver::ConstraintSolver;
pub use streaming::{infer_types_streaming, StreamingConfig, StreamingInferenceResult};

use serde::Serialize;

/// JSON-Schema primitive types emitted in a column's type union.
///
/// Declaration order is the order used when a union is rendered, so
/// `Null` always comes first. `Array` and `Object` are never inferred from
/// flat-file values; they exist for the fixed columns and the stream schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    /// Candidate types a column starts with, in resolution priority.
    ///
    /// `Integer` precedes `Number` because every integer is also a number.
    pub fn candidates() -> Vec<JsonType> {
        vec![JsonType::Integer, JsonType::Number, JsonType::Boolean]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Boolean => "boolean",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Array => "array",
            JsonType::Object => "object",
        }
    }

    /// Nullable union for a column resolved to this type: `["null", <self>]`.
    pub fn nullable_union(self) -> Vec<JsonType> {
        if self == JsonType::Null {
            return vec![JsonType::Null];
        }
        vec![JsonType::Null, self]
    }
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
