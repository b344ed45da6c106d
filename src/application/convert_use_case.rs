// ============================================================
// Layer 2 — Convert Use Case
// ============================================================
//   1. Resolve the run config (explicit path, or config.yml next
//      to the snapshot)
//   2. Rebuild the model shape and load the snapshot
//   3. Convert each word with the shared length budget

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu};
use burn::prelude::Backend;

use crate::application::{train_use_case::TrainConfig, DeviceKind};
use crate::infra::config::load_config;
use crate::ml::inferencer::{ConvertOutput, Converter};

pub struct ConvertUseCase {
    checkpoint: PathBuf,
    config:     Option<PathBuf>,
    device:     DeviceKind,
}

impl ConvertUseCase {
    pub fn new(checkpoint: PathBuf, config: Option<PathBuf>, device: DeviceKind) -> Self {
        Self { checkpoint, config, device }
    }

    fn config_path(&self) -> PathBuf {
        match &self.config {
            Some(path) => path.clone(),
            None => self
                .checkpoint
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("config.yml"),
        }
    }

    /// Convert every word, in order. The first failing word aborts the batch.
    pub fn execute(&self, words: &[String], max_length: usize) -> Result<Vec<ConvertOutput>> {
        let config_path = self.config_path();
        let cfg = load_config(&config_path)
            .with_context(|| format!("loading config '{}'", config_path.display()))?;

        match self.device {
            DeviceKind::Cpu => convert_all::<NdArray>(&cfg, &self.checkpoint, NdArrayDevice::default(), words, max_length),
            DeviceKind::Gpu => convert_all::<Wgpu>(&cfg, &self.checkpoint, WgpuDevice::default(), words, max_length),
        }
    }
}

fn convert_all<B: Backend>(
    cfg:        &TrainConfig,
    checkpoint: &Path,
    device:     B::Device,
    words:      &[String],
    max_length: usize,
) -> Result<Vec<ConvertOutput>> {
    let converter = Converter::<B>::from_checkpoint(cfg, checkpoint, device)
        .with_context(|| format!("loading snapshot '{}'", checkpoint.display()))?;

    words
        .iter()
        .map(|word| {
            converter
                .convert(word, max_length)
                .with_context(|| format!("converting {word:?}"))
        })
        .collect()
}
