// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From a JSON-lines file to padded tensor batches:
//
//   records.jsonl
//       │
//       ▼
//   load_records      → parses one TranslitRecord per line
//       │
//       ▼
//   split_train_test  → seeded shuffle + split
//       │
//       ▼
//   TranslitDataset   → validates, encodes lazily, caches
//       │
//       ▼
//   TranslitBatcher   → pads and stacks into tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop

/// Reads JSON-lines record files
pub mod loader;

/// Implements Burn's Dataset trait with the encoding cache
pub mod dataset;

/// Implements Burn's Batcher trait to create padded tensor batches
pub mod batcher;

/// Shuffles and splits records into train/test sets
pub mod splitter;
