// ============================================================
// Layer 3: Data Errors
// ============================================================
// Failures that originate in the data itself rather than in
// the tensor layer. All of them are fatal for a training run;
// the application layer wraps them in anyhow with context.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DataError {
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("column '{0}' not found in header")]
    MissingColumn(String),

    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("source table is empty")]
    EmptyTable,

    #[error("tokenizer error: {0}")]
    Tokenizer(String),
}
