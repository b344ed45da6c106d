// ============================================================
// Layer 5 — Training Loop
// ============================================================
// For epoch = 1..=max_epochs:
//   1. train   — shuffled batches, teacher-forced loss, Adam step,
//                per-step loss to the metric stream
//   2. evaluate — batch-size-weighted loss on test and eval splits,
//                corpus BLEU of greedy decodes on both
//   3. report  — four epoch scalars + one random decoded test word
//   4. checkpoint:
//        latest     Max, score = epoch      (most recent K)
//        best-bleu  Max, score = test BLEU
//        best-loss  Min, score = test loss
//
// Training runs on an AutodiffBackend; evaluation uses
// model.valid(), i.e. the inner backend with dropout disabled.

use std::{path::Path, sync::Arc};

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::TranslitBatcher, dataset::TranslitDataset};
use crate::domain::vocabulary::Vocabulary;
use crate::infra::checkpoint::{CheckpointManager, CompareMode, ModelSnapshot};
use crate::infra::metrics::{MetricsLogger, ScalarRecord};
use crate::ml::evaluator::{mean_loss, Evaluator};
use crate::ml::model::{TranslitModel, TranslitModelConfig, MAX_GENERATION_STEPS};

pub const BATCH_SIZE: usize = 256;
const NUM_WORKERS: usize = 1;

/// Datasets for one run. Train and test come from the same file.
pub struct Splits {
    pub train: Arc<TranslitDataset>,
    pub test:  Arc<TranslitDataset>,
    pub eval:  Arc<TranslitDataset>,
}

/// Scalars reported at the end of an epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    pub epoch:     usize,
    pub test_loss: f64,
    pub eval_loss: f64,
    pub test_bleu: f64,
    pub eval_bleu: f64,
}

pub fn run_training<B: AutodiffBackend>(
    cfg:        &TrainConfig,
    splits:     Splits,
    output_dir: &Path,
    device:     B::Device,
) -> Result<Vec<EpochReport>> {
    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = TranslitModelConfig::new(
        Vocabulary::source().len(),
        Vocabulary::target().len(),
        cfg.dim,
    );
    let mut model: TranslitModel<B> = model_cfg.init(&device);
    tracing::info!("Model ready: dim={}, {} parameters", cfg.dim, model.num_params());

    // ── Adam optimiser with optional L2 penalty ───────────────────────────────
    let weight_decay = (cfg.weight_decay > 0.0).then(|| WeightDecayConfig::new(cfg.weight_decay as f32));
    let mut optim = AdamConfig::new().with_weight_decay(weight_decay).init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(TranslitBatcher::<B>::new(device.clone()))
        .batch_size(BATCH_SIZE)
        .shuffle(cfg.seed)
        .num_workers(NUM_WORKERS)
        .build(splits.train.clone());

    let test_loader = DataLoaderBuilder::new(TranslitBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(BATCH_SIZE)
        .num_workers(NUM_WORKERS)
        .build(splits.test.clone());

    let eval_loader = DataLoaderBuilder::new(TranslitBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(BATCH_SIZE)
        .num_workers(NUM_WORKERS)
        .build(splits.eval.clone());

    tracing::info!(
        "Batch size {} | {} train, {} test, {} eval",
        BATCH_SIZE,
        splits.train.len(),
        splits.test.len(),
        splits.eval.len(),
    );

    // ── Checkpoint managers ───────────────────────────────────────────────────
    let mut latest_keeper = CheckpointManager::new(
        "latest", output_dir, cfg.num_last_models_to_keep, CompareMode::Max,
    )?;
    let mut bleu_keeper = CheckpointManager::new(
        "best-bleu", output_dir, cfg.num_best_models_to_keep, CompareMode::Max,
    )?;
    let mut loss_keeper = CheckpointManager::new(
        "best-loss", output_dir, cfg.num_best_models_to_keep, CompareMode::Min,
    )?;

    let metrics         = MetricsLogger::new(output_dir)?;
    tracing::info!("Metrics streaming to '{}'", metrics.csv_path().display());
    let test_evaluator  = Evaluator::new(splits.test.clone());
    let eval_evaluator  = Evaluator::new(splits.eval.clone());
    let mut sample_rng  = StdRng::seed_from_u64(cfg.seed.wrapping_add(2));
    let mut reports     = Vec::with_capacity(cfg.max_epochs);
    let mut steps       = 0usize;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.max_epochs {

        // ── Training phase ────────────────────────────────────────────────────
        for batch in train_loader.iter() {
            let (loss, _) = model.forward_loss(batch);
            steps += 1;
            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            metrics.log(&ScalarRecord::new("loss", "train", steps, loss_val))?;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.optimizer_lr, model, grads);
        }
        tracing::debug!("Epoch {} finished training at step {}", epoch, steps);

        // ── Evaluation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let report = EpochReport {
            epoch,
            test_loss: mean_loss(&model_valid, &test_loader),
            eval_loss: mean_loss(&model_valid, &eval_loader),
            test_bleu: test_evaluator.evaluate(&model_valid, &device)?,
            eval_bleu: eval_evaluator.evaluate(&model_valid, &device)?,
        };

        metrics.report_epoch("loss", "test", epoch, report.test_loss)?;
        metrics.report_epoch("loss", "eval", epoch, report.eval_loss)?;
        metrics.report_epoch("bleu", "test", epoch, report.test_bleu)?;
        metrics.report_epoch("bleu", "eval", epoch, report.eval_bleu)?;

        // ── One decoded test word for inspection ──────────────────────────────
        let index = sample_rng.gen_range(0..splits.test.len());
        if let Some(record) = splits.test.record(index) {
            let source = splits.test.source_vocab().encode(&record.word)?;
            let generation = model_valid.generate(&source, MAX_GENERATION_STEPS, &device)?;
            println!(
                "Epoch {} Sample: {:?} -> {:?}",
                epoch,
                splits.test.source_vocab().decode(&source),
                splits.test.target_vocab().decode(&generation.indices),
            );
        }

        // ── Checkpoints ───────────────────────────────────────────────────────
        let snapshot = ModelSnapshot(&model);
        latest_keeper.update(epoch, epoch as f64, &snapshot)?;
        bleu_keeper.update(epoch, report.test_bleu, &snapshot)?;
        loss_keeper.update(epoch, report.test_loss, &snapshot)?;

        if let Some(path) = latest_keeper.snapshot_path(epoch) {
            tracing::info!("Saved '{}'", path.display());
        }
        for keeper in [&bleu_keeper, &loss_keeper] {
            tracing::debug!("{} keeps {} (epoch, score) {:?}", keeper.label(), keeper.len(), keeper.entries());
        }

        reports.push(report);
    }

    tracing::info!("Training complete!");
    Ok(reports)
}
