// ============================================================
// Layer 3: Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits, so a
// CSV file, a database table or an in-memory fixture can all
// feed the same training pipeline.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::record::TextRecord;

// ─── RecordSource ─────────────────────────────────────────────────────────────
/// Any component that can produce the labelled rows of a table.
///
/// Implementations:
///   - CsvLoader → reads a comma-separated file with a header row
pub trait RecordSource {
    /// Load every row, in file order, with `row_id` set to its position.
    fn load_all(&self) -> Result<Vec<TextRecord>>;
}

// ─── TextClassifier ───────────────────────────────────────────────────────────
/// Any component that can assign a category to a piece of text.
///
/// Implementations:
///   - ClassifyUseCase → uses a trained checkpoint
pub trait TextClassifier {
    /// Returns the predicted category name and its probability.
    fn classify(&self, text: &str) -> Result<(String, f32)>;
}
