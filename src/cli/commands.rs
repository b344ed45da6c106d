// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `convert`, and their
// flags. Hyperparameters come from the YAML config, not from
// flags.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::application::DeviceKind;
use crate::ml::inferencer::DEFAULT_MAX_LENGTH;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a transliteration model from a YAML config
    Train(TrainArgs),

    /// Convert romanized words to katakana with a trained snapshot
    Convert(ConvertArgs),
}

/// Compute device for a run
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum DeviceArg {
    #[default]
    Cpu,
    Gpu,
}

/// The application layer never sees clap types.
impl From<DeviceArg> for DeviceKind {
    fn from(d: DeviceArg) -> Self {
        match d {
            DeviceArg::Cpu => DeviceKind::Cpu,
            DeviceArg::Gpu => DeviceKind::Gpu,
        }
    }
}

/// All arguments for the `train` command
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// YAML training config
    pub config: PathBuf,

    /// Output directory; defaults to outputs/<timestamp>_<config name>
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,
}

/// All arguments for the `convert` command
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Snapshot file written during training (model-<label>-e<epoch>.mpk)
    #[arg(long)]
    pub checkpoint: PathBuf,

    /// Run config; defaults to config.yml next to the snapshot
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Upper bound on generated symbols, end marker included (capped at 16)
    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_length: usize,

    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,

    /// Romanized words (a-z)
    #[arg(required = true)]
    pub words: Vec<String>,
}
