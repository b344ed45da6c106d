// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Load and migrate the YAML config     (Layer 6 - infra)
//   Step 2: Resolve and lock the output dir      (Layer 6 - infra)
//   Step 3: Write config.yml + train_info.yml    (Layer 6 - infra)
//   Step 4: Load records, split train/test,
//           load the subsampled eval set         (Layer 4 - data)
//   Step 5: Run the epoch loop on the backend    (Layer 5 - ml)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};
use serde::{Deserialize, Serialize};

use crate::application::DeviceKind;
use crate::data::{dataset::TranslitDataset, loader::load_records, splitter::split_train_test};
use crate::domain::error::TranslitError;
use crate::infra::{
    config::{load_config, save_config},
    lock::DirectoryLock,
    run_info::RunInfo,
};
use crate::ml::model::NUM_HEADS;
use crate::ml::trainer::{run_training, Splits};

// ─── Training Configuration ──────────────────────────────────────────────────
// Read from YAML after migration; unknown keys are rejected.
// The resolved copy written next to the snapshots is what the
// converter reads back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainConfig {
    pub train_data:              PathBuf,
    pub test_ratio:              f64,
    pub eval_data:               PathBuf,
    pub eval_max_words:          usize,
    pub dim:                     usize,
    pub max_epochs:              usize,
    pub num_last_models_to_keep: usize,
    pub num_best_models_to_keep: usize,
    pub seed:                    u64,
    pub optimizer_lr:            f64,
    pub weight_decay:            f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_data:              PathBuf::from("data/train.jsonl"),
            test_ratio:              0.1,
            eval_data:               PathBuf::from("data/eval.jsonl"),
            eval_max_words:          1000,
            dim:                     256,
            max_epochs:              30,
            num_last_models_to_keep: 3,
            num_best_models_to_keep: 3,
            seed:                    0,
            optimizer_lr:            1e-3,
            weight_decay:            0.0,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), TranslitError> {
        let fail = |msg: String| Err(TranslitError::Config(msg));

        if !(0.0..1.0).contains(&self.test_ratio) {
            return fail(format!("test_ratio must be in [0, 1), got {}", self.test_ratio));
        }
        if self.dim == 0 || self.dim % NUM_HEADS != 0 {
            return fail(format!("dim must be a positive multiple of {NUM_HEADS}, got {}", self.dim));
        }
        if self.max_epochs == 0 {
            return fail("max_epochs must be positive".into());
        }
        if !(self.optimizer_lr > 0.0) {
            return fail(format!("optimizer_lr must be positive, got {}", self.optimizer_lr));
        }
        if !(self.weight_decay >= 0.0) {
            return fail(format!("weight_decay must be non-negative, got {}", self.weight_decay));
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config_path: PathBuf,
    output_dir:  Option<PathBuf>,
    device:      DeviceKind,
}

impl TrainUseCase {
    pub fn new(config_path: PathBuf, output_dir: Option<PathBuf>, device: DeviceKind) -> Self {
        Self { config_path, output_dir, device }
    }

    /// Execute the full training pipeline end to end.
    /// Returns the output directory that holds the run's artifacts.
    pub fn execute(&self) -> Result<PathBuf> {
        // ── Step 1: Config ────────────────────────────────────────────────────
        let cfg = load_config(&self.config_path)
            .with_context(|| format!("loading config '{}'", self.config_path.display()))?;

        // ── Step 2: Output directory, owned for the whole run ─────────────────
        let output_dir = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => default_output_dir(&self.config_path),
        };
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("creating '{}'", output_dir.display()))?;
        let lock = DirectoryLock::acquire(&output_dir)?;
        tracing::debug!("Holding '{}'", lock.path().display());
        tracing::info!("Writing run artifacts to '{}'", output_dir.display());

        // ── Step 3: Run metadata ──────────────────────────────────────────────
        save_config(&cfg, output_dir.join("config.yml"))?;
        RunInfo::capture(self.device).save(output_dir.join("train_info.yml"))?;

        // ── Step 4: Datasets ──────────────────────────────────────────────────
        let splits = prepare_datasets(&cfg)?;

        // ── Step 5: Training loop (Layer 5) ───────────────────────────────────
        match self.device {
            DeviceKind::Cpu => {
                run_training::<Autodiff<NdArray>>(&cfg, splits, &output_dir, NdArrayDevice::default())?;
            }
            DeviceKind::Gpu => {
                run_training::<Autodiff<Wgpu>>(&cfg, splits, &output_dir, WgpuDevice::default())?;
            }
        }

        Ok(output_dir)
    }
}

/// `outputs/<YYYY_MM_DD_HH_MM_SS>_<config stem>`
fn default_output_dir(config_path: &Path) -> PathBuf {
    let stem = config_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());
    let stamp = chrono::Local::now().format("%Y_%m_%d_%H_%M_%S");
    PathBuf::from("outputs").join(format!("{stamp}_{stem}"))
}

/// Load the training file, split it, and load the subsampled eval file.
///
/// Each dataset draws references from its own seeded stream.
pub fn prepare_datasets(cfg: &TrainConfig) -> Result<Splits, TranslitError> {
    let records = load_records(&cfg.train_data)?;
    tracing::info!("Loaded {} training records", records.len());

    let (train, test) = split_train_test(records, cfg.test_ratio, cfg.seed);
    if test.is_empty() {
        return Err(TranslitError::Data(format!(
            "test split is empty (test_ratio = {})",
            cfg.test_ratio
        )));
    }
    tracing::info!("Split: {} train, {} test", train.len(), test.len());

    let eval = TranslitDataset::from_file(&cfg.eval_data, Some(cfg.eval_max_words), cfg.seed.wrapping_add(10))?;

    Ok(Splits {
        train: Arc::new(TranslitDataset::new(train, cfg.seed.wrapping_add(3))?),
        test:  Arc::new(TranslitDataset::new(test, cfg.seed.wrapping_add(4))?),
        eval:  Arc::new(eval),
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::data::dataset::Dataset;
    use std::fs;

    fn write_jsonl(dir: &Path, name: &str, words: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let lines: Vec<String> = words
            .iter()
            .map(|(w, k)| format!(r#"{{"word": "{w}", "kata": ["{k}"]}}"#))
            .collect();
        fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    const WORDS: [(&str, &str); 6] = [
        ("kana", "カナ"),
        ("piano", "ピアノ"),
        ("data", "データ"),
        ("tomato", "トマト"),
        ("banana", "バナナ"),
        ("radio", "ラジオ"),
    ];

    fn config_for(dir: &Path, test_ratio: f64, eval_max_words: usize) -> TrainConfig {
        TrainConfig {
            train_data: write_jsonl(dir, "train.jsonl", &WORDS),
            eval_data: write_jsonl(dir, "eval.jsonl", &WORDS[..4]),
            test_ratio,
            eval_max_words,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_prepare_datasets_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let splits = prepare_datasets(&config_for(dir.path(), 0.5, 2)).unwrap();
        assert_eq!(splits.train.len(), 3);
        assert_eq!(splits.test.len(), 3);
        assert_eq!(splits.eval.len(), 2);
    }

    #[test]
    fn test_zero_test_ratio_is_data_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            prepare_datasets(&config_for(dir.path(), 0.0, 2)),
            Err(TranslitError::Data(_))
        ));
    }

    #[test]
    fn test_empty_eval_is_data_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            prepare_datasets(&config_for(dir.path(), 0.5, 0)),
            Err(TranslitError::Data(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert!(TrainConfig::default().validate().is_ok());
        assert!(TrainConfig { dim: 6, ..TrainConfig::default() }.validate().is_err());
        assert!(TrainConfig { optimizer_lr: 0.0, ..TrainConfig::default() }.validate().is_err());
        assert!(TrainConfig { weight_decay: -1.0, ..TrainConfig::default() }.validate().is_err());
        assert!(TrainConfig { test_ratio: 1.0, ..TrainConfig::default() }.validate().is_err());
    }

    #[test]
    fn test_default_output_dir_uses_config_stem() {
        let dir = default_output_dir(Path::new("configs/small.yml"));
        let name = dir.file_name().unwrap().to_string_lossy().into_owned();
        assert!(dir.starts_with("outputs"));
        assert!(name.ends_with("_small"));
        // YYYY_MM_DD_HH_MM_SS_
        assert_eq!(name.len(), 20 + "small".len());
    }
}
