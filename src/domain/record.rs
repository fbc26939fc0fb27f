// ============================================================
// Layer 3: TextRecord Domain Type
// ============================================================
// One raw row of the source table: a free-text field paired
// with the name of its category. Tokenisation happens later,
// when the dataset adapter is asked for an example.

use serde::{Deserialize, Serialize};

/// A labelled row as it appears in the source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    /// 0-based position of the row in the source file.
    /// Identifies the row across shuffles and partitions.
    pub row_id: usize,

    /// Category name, e.g. "sport"
    pub category: String,

    /// The free-text body to classify
    pub text: String,
}

impl TextRecord {
    pub fn new(row_id: usize, category: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            row_id,
            category: category.into(),
            text:     text.into(),
        }
    }

    /// First `max_chars` characters of the text, for console previews
    pub fn preview(&self, max_chars: usize) -> String {
        let mut out: String = self.text.chars().take(max_chars).collect();
        if self.text.chars().count() > max_chars {
            out.push_str("...");
        }
        out
    }
}
