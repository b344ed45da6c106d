// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one goal: training a model
// or converting words with a trained snapshot.
//
//   train_use_case.rs   — config → datasets → output dir → trainer
//   convert_use_case.rs — snapshot + config → Converter → words
//
// No model math here and no argument parsing; only workflow.

use serde::{Deserialize, Serialize};

// The training workflow
pub mod train_use_case;

// The word conversion workflow
pub mod convert_use_case;

/// Compute device, chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// NdArray backend
    #[default]
    Cpu,
    /// Wgpu backend
    Gpu,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Cpu => write!(f, "cpu"),
            DeviceKind::Gpu => write!(f, "gpu"),
        }
    }
}
