// ============================================================
// Layer 4: Data Pipeline
// ============================================================
// Everything from the raw CSV file to tensor batches.
//
//   bbc_text.csv
//       │
//       ▼
//   CsvLoader          → reads rows into TextRecords
//       │
//       ▼
//   split_partitions   → seeded shuffle, 80/10/10 cut
//       │
//       ▼
//   TextClassificationDataset
//                      → len/get over one partition, tokenising
//                        each row through the TextEncoder
//       │
//       ▼
//   ClassificationBatcher
//                      → stacks examples into tensor batches
//       │
//       ▼
//   DataLoader         → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the source table from a CSV file
pub mod loader;

/// Seeded train/validation/test split
pub mod splitter;

/// Fixed-length tokenisation with attention mask
pub mod encoder;

/// Implements Burn's Dataset trait over one partition
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
