// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the corpus file to tensor batches:
//
//   corpus.csv
//       │
//       ▼
//   CsvCorpusLoader   → reads rows (slides, summary, reflection)
//       │
//       ▼
//   Preprocessor      → cleans text, splits into tokens
//       │
//       ▼
//   Vocabulary        → token ↔ id mapping (domain layer)
//       │
//       ▼
//   SequenceEncoder   → fixed-length (encoder, decoder, label) ids
//       │
//       ▼
//   SummaryDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   SummaryBatcher    → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Loads corpus rows from a CSV file
pub mod loader;

/// Cleans raw text and tokenises it
pub mod preprocessor;

/// Fixed-length id sequences and teacher-forcing pairs
pub mod encoder;

/// Implements Burn's Dataset trait for summary samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
