// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the output directory or the config
// file:
//
//   config.rs      — YAML config loading, migration, validation
//   checkpoint.rs  — bounded per-label snapshot retention, plus
//                    burn record save/load for the model
//   lock.rs        — exclusive ownership of the output directory
//   metrics.rs     — scalar metric stream (CSV + log)
//   run_info.rs    — git revision and device of the run

/// YAML config loading and field migration
pub mod config;

/// Model checkpoint retention, saving, and loading
pub mod checkpoint;

/// Exclusive guard over the checkpoint directory
pub mod lock;

/// Training metrics CSV logger
pub mod metrics;

/// Run metadata record
pub mod run_info;
