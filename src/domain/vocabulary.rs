// ============================================================
// Layer 3: Category Vocabulary
// ============================================================
// Maps category names to dense indices in [0, n).
//
// Built once from the distinct labels of the FULL table, before
// splitting, and shared read-only by every partition. Names are
// kept sorted so the same table always yields the same indices.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{error::DataError, record::TextRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryVocabulary {
    /// Sorted, deduplicated category names. Index == position.
    categories: Vec<String>,
}

impl CategoryVocabulary {
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let set: BTreeSet<&str> = labels.into_iter().collect();
        Self {
            categories: set.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn from_records(records: &[TextRecord]) -> Self {
        Self::from_labels(records.iter().map(|r| r.category.as_str()))
    }

    /// Dense index of `category`
    pub fn index_of(&self, category: &str) -> Result<usize, DataError> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(category))
            .map_err(|_| DataError::UnknownCategory(category.to_string()))
    }

    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.categories.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_dense_and_sorted() {
        let v = CategoryVocabulary::from_labels(["tech", "sport", "business", "sport"]);
        assert_eq!(v.len(), 3);
        assert_eq!(v.index_of("business").unwrap(), 0);
        assert_eq!(v.index_of("sport").unwrap(), 1);
        assert_eq!(v.index_of("tech").unwrap(), 2);
    }

    #[test]
    fn test_order_of_appearance_does_not_matter() {
        let a = CategoryVocabulary::from_labels(["b", "a", "c"]);
        let b = CategoryVocabulary::from_labels(["c", "c", "a", "b"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_category() {
        let v = CategoryVocabulary::from_labels(["tech"]);
        assert_eq!(
            v.index_of("politics"),
            Err(DataError::UnknownCategory("politics".into()))
        );
    }

    #[test]
    fn test_name_round_trip() {
        let v = CategoryVocabulary::from_labels(["politics", "tech"]);
        for (i, name) in v.names().iter().enumerate() {
            assert_eq!(v.name_of(i), Some(name.as_str()));
        }
        assert_eq!(v.name_of(2), None);
    }
}
