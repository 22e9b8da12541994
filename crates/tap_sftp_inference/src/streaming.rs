//! Streaming type inference
//!
//! Process sampled rows one at a time, stopping early once every column has
//! degraded to `string`.

use super::solver::ConstraintSolver;
use super::TypeInferenceResult;

/// Result of streaming type inference for all columns
#[derive(Debug)]
pub struct StreamingInferenceResult {
    /// Results per column, in input column order
    pub columns: Vec<(String, TypeInferenceResult)>,

    /// Total rows processed
    pub rows_processed: usize,

    /// Whether inference stopped before the input was exhausted because
    /// every column was already a string
    pub early_termination: bool,
}

impl StreamingInferenceResult {
    /// Look up a single column's result
    pub fn column(&self, name: &str) -> Option<&TypeInferenceResult> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, result)| result)
    }
}

/// Configuration for streaming inference
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// Maximum rows to process
    pub max_rows: usize,

    /// Stop once every column has settled on `string`
    pub early_termination: bool,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            max_rows: 100_000,
            early_termination: true,
        }
    }
}

/// Infer types from an iterator of rows (streaming)
///
/// Rows shorter than `column_names` leave the trailing columns untouched;
/// values beyond the last column are ignored.
///
/// # Example
///
/// ```
/// use tap_sftp_inference::{infer_types_streaming, JsonType, StreamingConfig};
///
/// let columns = ["id", "amount"];
/// let rows = vec![vec!["1", "100.50"], vec!["2", "200"]];
///
/// let result = infer_types_streaming(
///     &columns,
///     rows.iter().map(|r| r.as_slice()),
///     StreamingConfig::default(),
/// );
/// assert_eq!(result.column("id").unwrap().data_type(), JsonType::Integer);
/// assert_eq!(result.column("amount").unwrap().data_type(), JsonType::Number);
/// ```
pub fn infer_types_streaming<'a, I, R>(
    column_names: &[&str],
    rows: I,
    config: StreamingConfig,
) -> StreamingInferenceResult
where
    I: Iterator<Item = R>,
    R: AsRef<[&'a str]>,
{
    let mut solvers: Vec<ConstraintSolver> = column_names
        .iter()
        .map(|name| ConstraintSolver::new(*name))
        .collect();

    let mut rows_processed = 0;
    let mut early_termination = false;

    for row in rows {
        if rows_processed >= config.max_rows {
            break;
        }

        for (solver, value) in solvers.iter_mut().zip(row.as_ref().iter()) {
            solver.add_value(value);
        }
        rows_processed += 1;

        if config.early_termination && solvers.iter().all(|s| s.is_settled()) {
            early_termination = true;
            break;
        }
    }

    tracing::debug!(
        columns = solvers.len(),
        rows_processed,
        early_termination,
        "type inference finished"
    );

    let columns = solvers
        .into_iter()
        .map(|s| (s.column_name().to_string(), s.get_result()))
        .collect();

    StreamingInferenceResult {
        columns,
        rows_processed,
        early_termination,
    }
}
