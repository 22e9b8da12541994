//! Per-column elimination solver
//!
//! The solver keeps the candidate types still consistent with every value
//! seen so far. Candidates only ever shrink.

use std::collections::BTreeSet;

use super::constraints::{
    EliminatedItem, EliminationEvidence, EliminationReason, TypeInferenceResult,
};
use super::JsonType;

/// Elimination-based type inference solver for one column
#[derive(Debug)]
pub struct ConstraintSolver {
    /// Column name (for debugging)
    column_name: String,

    /// Candidate types that are still possible
    possible_types: BTreeSet<JsonType>,

    /// Evidence of eliminations (for explainability)
    elimination_evidence: Vec<EliminationEvidence>,

    /// Number of values processed, nulls included
    values_processed: usize,

    /// Number of null/empty values seen
    null_count: usize,
}

impl ConstraintSolver {
    /// Create a new solver for a column
    pub fn new(column_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            possible_types: JsonType::candidates().into_iter().collect(),
            elimination_evidence: Vec::new(),
            values_processed: 0,
            null_count: 0,
        }
    }

    /// Add a value and eliminate the candidates it contradicts
    pub fn add_value(&mut self, value: &str) {
        self.values_processed += 1;

        let trimmed = value.trim();
        if is_null(trimmed) {
            self.null_count += 1;
            return;
        }

        self.apply_boolean_constraints(trimmed);
        self.apply_numeric_constraints(trimmed);
    }

    fn apply_boolean_constraints(&mut self, value: &str) {
        if !self.possible_types.contains(&JsonType::Boolean) {
            return;
        }

        let is_boolean = value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false");
        if !is_boolean {
            self.eliminate_type(
                JsonType::Boolean,
                EliminationReason::NotBooleanValue {
                    value: value.to_string(),
                },
            );
        }
    }

    fn apply_numeric_constraints(&mut self, value: &str) {
        if !self.possible_types.contains(&JsonType::Integer)
            && !self.possible_types.contains(&JsonType::Number)
        {
            return;
        }

        if has_leading_zero(value) {
            for data_type in [JsonType::Integer, JsonType::Number] {
                self.eliminate_type(
                    data_type,
                    EliminationReason::LeadingZero {
                        value: value.to_string(),
                    },
                );
            }
            return;
        }

        if value.parse::<i64>().is_err() {
            self.eliminate_type(
                JsonType::Integer,
                EliminationReason::NotAnInteger {
                    value: value.to_string(),
                },
            );
        }

        if !is_finite_number(value) {
            self.eliminate_type(
                JsonType::Number,
                EliminationReason::NotANumber {
                    value: value.to_string(),
                },
            );
        }
    }

    fn eliminate_type(&mut self, data_type: JsonType, reason: EliminationReason) {
        if self.possible_types.remove(&data_type) {
            tracing::trace!(
                column = %self.column_name,
                eliminated = %data_type,
                reason = %reason.description(),
                "type eliminated"
            );
            self.elimination_evidence.push(EliminationEvidence {
                eliminated: EliminatedItem::Type(data_type),
                reason,
                row_index: self.values_processed.saturating_sub(1),
            });
        }
    }

    /// True once no further value can change the outcome: every candidate
    /// has been eliminated and the column is a string.
    pub fn is_settled(&self) -> bool {
        self.possible_types.is_empty()
    }

    /// Get the inference result for the values seen so far
    pub fn get_result(&self) -> TypeInferenceResult {
        if self.null_count == self.values_processed {
            return TypeInferenceResult::AllNull {
                values_processed: self.values_processed,
            };
        }

        let resolved = JsonType::candidates()
            .into_iter()
            .find(|t| self.possible_types.contains(t));

        match resolved {
            Some(data_type) => TypeInferenceResult::Resolved {
                data_type,
                values_processed: self.values_processed,
                evidence: self.elimination_evidence.clone(),
            },
            None => TypeInferenceResult::NoValidType {
                fallback: JsonType::String,
                eliminations: self.elimination_evidence.clone(),
            },
        }
    }

    /// Get the column name
    pub fn column_name(&self) -> &str {
        &self.column_name
    }
}

fn is_null(trimmed: &str) -> bool {
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null")
}

/// `0` followed by another digit, after an optional sign. `0`, `0.5` and
/// `-0.25` are fine; `007` and `-0012` are not.
fn has_leading_zero(value: &str) -> bool {
    let digits = value.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(value);
    let mut chars = digits.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('0'), Some(c)) if c.is_ascii_digit()
    )
}

/// `f64::from_str` also accepts `inf` and `NaN`, which JSON cannot carry.
fn is_finite_number(value: &str) -> bool {
    value
        .parse::<f64>()
        .map(|n| n.is_finite())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_solver_has_all_candidates() {
        let solver = ConstraintSolver::new("test_column");
        assert!(solver.possible_types.contains(&JsonType::Integer));
        assert!(solver.possible_types.contains(&JsonType::Number));
        assert!(solver.possible_types.contains(&JsonType::Boolean));
        assert!(!solver.is_settled());
    }

    #[test]
    fn test_integer_inference() {
        let mut solver = ConstraintSolver::new("id");
        solver.add_value("1");
        solver.add_value("42");
        solver.add_value("-100");

        assert!(matches!(
            solver.get_result(),
            TypeInferenceResult::Resolved {
                data_type: JsonType::Integer,
                ..
            }
        ));
    }

    #[test]
    fn test_decimal_eliminates_integer() {
        let mut solver = ConstraintSolver::new("price");
        solver.add_value("1");
        solver.add_value("42.5");

        assert!(!solver.possible_types.contains(&JsonType::Integer));
        assert_eq!(solver.get_result().data_type(), JsonType::Number);
    }

    #[test]
    fn test_scientific_notation_is_number() {
        let mut solver = ConstraintSolver::new("measure");
        solver.add_value("1e5");
        solver.add_value("2.5E-3");
        assert_eq!(solver.get_result().data_type(), JsonType::Number);
    }

    #[test]
    fn test_non_finite_is_not_a_number() {
        let mut solver = ConstraintSolver::new("measure");
        solver.add_value("NaN");
        assert_eq!(solver.get_result().data_type(), JsonType::String);

        let mut solver = ConstraintSolver::new("measure");
        solver.add_value("inf");
        assert_eq!(solver.get_result().data_type(), JsonType::String);
    }

    #[test]
    fn test_boolean_inference() {
        let mut solver = ConstraintSolver::new("active");
        solver.add_value("true");
        solver.add_value("FALSE");
        solver.add_value("True");

        assert_eq!(solver.get_result().data_type(), JsonType::Boolean);
    }

    #[test]
    fn test_one_and_zero_are_integers_not_booleans() {
        let mut solver = ConstraintSolver::new("flag");
        solver.add_value("1");
        solver.add_value("0");
        assert_eq!(solver.get_result().data_type(), JsonType::Integer);
    }

    #[test]
    fn test_leading_zero_stays_string() {
        let mut solver = ConstraintSolver::new("zip");
        solver.add_value("12345");
        solver.add_value("01234");

        assert!(solver.is_settled());
        match solver.get_result() {
            TypeInferenceResult::NoValidType { eliminations, .. } => {
                assert!(eliminations
                    .iter()
                    .any(|e| matches!(e.reason, EliminationReason::LeadingZero { .. })));
            }
            other => panic!("expected NoValidType, got {}", other),
        }
    }

    #[test]
    fn test_zero_and_fraction_are_numbers() {
        let mut solver = ConstraintSolver::new("ratio");
        solver.add_value("0");
        solver.add_value("0.75");
        solver.add_value("-0.5");
        assert_eq!(solver.get_result().data_type(), JsonType::Number);
    }

    #[test]
    fn test_null_handling() {
        let mut solver = ConstraintSolver::new("empty");
        solver.add_value("");
        solver.add_value("NULL");
        solver.add_value("  ");

        assert!(matches!(
            solver.get_result(),
            TypeInferenceResult::AllNull { values_processed: 3 }
        ));
        assert_eq!(solver.get_result().data_type(), JsonType::String);
    }

    #[test]
    fn test_mixed_nulls_and_values() {
        let mut solver = ConstraintSolver::new("qty");
        solver.add_value("");
        solver.add_value("5");
        solver.add_value("null");
        solver.add_value("7");

        assert!(matches!(
            solver.get_result(),
            TypeInferenceResult::Resolved {
                data_type: JsonType::Integer,
                values_processed: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_mixed_text_falls_back_to_string() {
        let mut solver = ConstraintSolver::new("mixed");
        solver.add_value("100");
        solver.add_value("hello");

        match solver.get_result() {
            TypeInferenceResult::NoValidType {
                fallback,
                eliminations,
            } => {
                assert_eq!(fallback, JsonType::String);
                assert_eq!(eliminations.len(), 3);
                assert!(eliminations
                    .iter()
                    .all(|e| e.reason.description().contains("hello")));
            }
            other => panic!("expected NoValidType, got {}", other),
        }
    }

    #[test]
    fn test_evidence_row_index() {
        let mut solver = ConstraintSolver::new("col");
        solver.add_value("1");
        solver.add_value("");
        solver.add_value("1.5");

        let evidence = match solver.get_result() {
            TypeInferenceResult::Resolved { evidence, .. } => evidence,
            other => panic!("expected Resolved, got {}", other),
        };
        let integer = evidence
            .iter()
            .find(|e| e.eliminated == EliminatedItem::Type(JsonType::Integer))
            .unwrap();
        assert_eq!(integer.row_index, 2);
    }

    #[test]
    fn test_has_leading_zero() {
        assert!(has_leading_zero("007"));
        assert!(has_leading_zero("-0012"));
        assert!(!has_leading_zero("0"));
        assert!(!has_leading_zero("0.5"));
        assert!(!has_leading_zero("10"));
    }
}
