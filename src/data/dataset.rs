// ============================================================
// Layer 4: Text Classification Dataset
// ============================================================
// Random-access adapter over one partition of the table.
//
//   len()        → number of rows in the partition
//   example(i)   → tokenised text of row i + its category index
//
// Rows stay as raw text until they are asked for; encoding is
// pure, so asking twice gives the same example. The encoder and
// the category vocabulary are shared (Arc) between the train,
// validation and test partitions, which is what keeps label
// indices consistent across them.
//
// Also implements Burn's Dataset trait so the DataLoader can
// pull items by index.
//
// Reference: Burn Book §4 (Datasets)

use std::sync::Arc;

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::encoder::TextEncoder;
use crate::domain::{error::DataError, record::TextRecord, vocabulary::CategoryVocabulary};

/// One tokenised, padded training example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    /// Category index, always < number of categories
    pub label:          usize,
}

pub struct TextClassificationDataset {
    records:    Vec<TextRecord>,
    labels:     Vec<usize>,
    encoder:    Arc<TextEncoder>,
    vocabulary: Arc<CategoryVocabulary>,
}

impl TextClassificationDataset {
    /// Fails if any row's category is missing from `vocabulary`.
    pub fn new(
        records:    Vec<TextRecord>,
        encoder:    Arc<TextEncoder>,
        vocabulary: Arc<CategoryVocabulary>,
    ) -> Result<Self, DataError> {
        let labels = records
            .iter()
            .map(|r| vocabulary.index_of(&r.category))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { records, labels, encoder, vocabulary })
    }

    pub fn example(&self, index: usize) -> Result<LabeledExample, DataError> {
        let record = self.records.get(index).ok_or(DataError::IndexOutOfRange {
            index,
            len: self.records.len(),
        })?;
        let encoded = self.encoder.encode(&record.text)?;
        Ok(LabeledExample {
            input_ids:      encoded.input_ids,
            attention_mask: encoded.attention_mask,
            label:          self.labels[index],
        })
    }

    pub fn num_classes(&self) -> usize {
        self.vocabulary.len()
    }
}

impl Dataset<LabeledExample> for TextClassificationDataset {
    /// # Panics
    /// If the tokenizer fails on an in-range row. Encoding
    /// failures are fatal for a training run.
    fn get(&self, index: usize) -> Option<LabeledExample> {
        match self.example(index) {
            Ok(example) => Some(example),
            Err(DataError::IndexOutOfRange { .. }) => None,
            Err(e) => panic!("cannot encode row {index}: {e}"),
        }
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
