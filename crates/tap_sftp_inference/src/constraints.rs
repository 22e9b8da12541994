//! Elimination evidence and inference results
//!
//! The solver records why each candidate type was dropped so that a
//! surprising `string` column can be traced back to the value that caused it.

use super::JsonType;

/// Reason why a candidate type was eliminated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EliminationReason {
    /// Value is not `true`/`false`
    NotBooleanValue { value: String },
    /// Value does not parse as a 64-bit signed integer
    NotAnInteger { value: String },
    /// Value does not parse as a finite number
    NotANumber { value: String },
    /// Value has a leading zero (codes like zip or account numbers)
    LeadingZero { value: String },
}

impl EliminationReason {
    /// Get a human-readable description
    pub fn description(&self) -> String {
        match self {
            EliminationReason::NotBooleanValue { value } => {
                format!("'{}' is not a boolean value", value)
            }
            EliminationReason::NotAnInteger { value } => {
                format!("'{}' is not an integer", value)
            }
            EliminationReason::NotANumber { value } => {
                format!("'{}' is not a finite number", value)
            }
            EliminationReason::LeadingZero { value } => {
                format!("'{}' has a leading zero", value)
            }
        }
    }
}

/// What was eliminated by a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EliminatedItem {
    Type(JsonType),
}

impl std::fmt::Display for EliminatedItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EliminatedItem::Type(t) => write!(f, "type {}", t),
        }
    }
}

/// Evidence of an elimination (for debugging/explainability)
#[derive(Debug, Clone)]
pub struct EliminationEvidence {
    /// What was eliminated
    pub eliminated: EliminatedItem,
    /// Why it was eliminated
    pub reason: EliminationReason,
    /// Which value triggered the elimination (0-indexed, nulls included)
    pub row_index: usize,
}

/// Final outcome of inference for one column
#[derive(Debug, Clone)]
pub enum TypeInferenceResult {
    /// At least one candidate survived every non-null value
    Resolved {
        data_type: JsonType,
        values_processed: usize,
        evidence: Vec<EliminationEvidence>,
    },
    /// Only nulls were seen; there is nothing to decide from
    AllNull { values_processed: usize },
    /// Every candidate was eliminated
    NoValidType {
        /// Always `String`
        fallback: JsonType,
        /// Why each candidate was eliminated
        eliminations: Vec<EliminationEvidence>,
    },
}

impl TypeInferenceResult {
    /// The column's non-null type. Ambiguous (all-null) columns fall back to
    /// `String`.
    pub fn data_type(&self) -> JsonType {
        match self {
            TypeInferenceResult::Resolved { data_type, .. } => *data_type,
            TypeInferenceResult::AllNull { .. } => JsonType::String,
            TypeInferenceResult::NoValidType { fallback, .. } => *fallback,
        }
    }

    /// The full nullable type union, e.g. `["null", "integer"]`.
    pub fn type_union(&self) -> Vec<JsonType> {
        self.data_type().nullable_union()
    }
}

impl std::fmt::Display for TypeInferenceResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeInferenceResult::Resolved { data_type, .. } => write!(f, "{}", data_type),
            TypeInferenceResult::AllNull { .. } => {
                write!(f, "all_null(fallback: {})", JsonType::String)
            }
            TypeInferenceResult::NoValidType { fallback, .. } => {
                write!(f, "no_valid_type(fallback: {})", fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elimination_reason_description() {
        let reason = EliminationReason::LeadingZero {
            value: "01234".to_string(),
        };
        assert!(reason.description().contains("01234"));
        assert!(reason.description().contains("leading zero"));
    }

    #[test]
    fn test_type_inference_result_display() {
        let resolved = TypeInferenceResult::Resolved {
            data_type: JsonType::Integer,
            values_processed: 10,
            evidence: vec![],
        };
        assert_eq!(resolved.to_string(), "integer");

        let fallback = TypeInferenceResult::NoValidType {
            fallback: JsonType::String,
            eliminations: vec![],
        };
        assert!(fallback.to_string().contains("string"));
    }

    #[test]
    fn test_all_null_falls_back_to_string() {
        let result = TypeInferenceResult::AllNull { values_processed: 3 };
        assert_eq!(result.data_type(), JsonType::String);
        assert_eq!(result.type_union(), vec![JsonType::Null, JsonType::String]);
    }

    #[test]
    fn test_eliminated_item_display() {
        let item = EliminatedItem::Type(JsonType::Boolean);
        assert_eq!(item.to_string(), "type boolean");
    }
}
