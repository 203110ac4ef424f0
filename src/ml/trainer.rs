// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Epoch loop over a BatchGenerator with Adam and the CTC loss.
//
//   for each epoch:
//     reshuffle training order
//     for each batch:  logits → CTC (length-normalized mean)
//                      → backward → Adam step at the current lr
//     validation:      model.valid() (no dropout, batch norm uses
//                      running stats) → loss, CER, exact match
//     scheduler:       improvement?  save best_model
//                      plateau?      halve lr / stop early
//     metrics.csv  ← one row
//
// Burn backends:
//   - training runs on TrainBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on the inner backend (Wgpu)
//   - so the validation generator is built for the inner backend
//
// The loss is a plain function called here, not part of the
// model's forward pass; the saved model is the bare network.
//
// Interruption: the stop flag is checked before every batch. When
// it is set the current epoch is abandoned, final_model is written
// from the last completed step and best_model is left untouched.
//
// Reference: Burn Book §5 (Training), Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{activation::softmax, backend::AutodiffBackend},
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    augment::AugmentConfig,
    dataset::OcrDataset,
    generator::BatchGenerator,
    image::ImageNormalizer,
    pipeline::SamplePipeline,
};
use crate::domain::vocabulary::Vocabulary;
use crate::infra::{
    checkpoint::{BestCheckpoint, CheckpointManager},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    ctc::{CtcLoss, CtcLossConfig},
    decoder::GreedyDecoder,
    model::Crnn,
};

pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

// ─── Outcome ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainOutcome {
    /// All configured epochs ran
    Completed,
    /// Monitored loss stopped improving
    EarlyStopped,
    /// Stop flag was raised (Ctrl-C)
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub outcome:    TrainOutcome,
    /// Epochs fully completed
    pub epochs_run: usize,
    pub best:       Option<BestCheckpoint>,
    pub final_lr:   f64,
}

// ─── Plateau scheduler ────────────────────────────────────────────────────────
// Both counters reset on improvement. The lr counter also resets
// after each reduction, so a further halving needs another full
// patience window.
#[derive(Debug, Clone)]
pub struct PlateauScheduler {
    lr:              f64,
    factor:          f64,
    min_lr:          f64,
    reduce_patience: usize,
    stop_patience:   usize,
    best:            f64,
    since_reduce:    usize,
    since_best:      usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateauStep {
    pub improved:   bool,
    pub lr_reduced: bool,
    pub stop:       bool,
}

impl PlateauScheduler {
    pub fn new(lr: f64, factor: f64, min_lr: f64, reduce_patience: usize, stop_patience: usize) -> Self {
        Self {
            lr,
            factor,
            min_lr,
            reduce_patience,
            stop_patience,
            best: f64::INFINITY,
            since_reduce: 0,
            since_best: 0,
        }
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }

    /// Record the monitored loss of a finished epoch
    pub fn step(&mut self, loss: f64) -> PlateauStep {
        if loss < self.best {
            self.best         = loss;
            self.since_reduce = 0;
            self.since_best   = 0;
            return PlateauStep { improved: true, lr_reduced: false, stop: false };
        }

        self.since_reduce += 1;
        self.since_best   += 1;

        let mut lr_reduced = false;
        if self.since_reduce >= self.reduce_patience && self.lr > self.min_lr {
            self.lr           = (self.lr * self.factor).max(self.min_lr);
            self.since_reduce = 0;
            lr_reduced        = true;
        }

        PlateauStep {
            improved: false,
            lr_reduced,
            stop: self.since_best >= self.stop_patience,
        }
    }
}

// ─── Recognition metrics ──────────────────────────────────────────────────────
/// Levenshtein distance between two index sequences
pub fn edit_distance(a: &[usize], b: &[usize]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr             = vec![0; b.len() + 1];

    for (i, x) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, y) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(x != y);
            curr[j + 1]    = substitute.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Running totals over the validation set
#[derive(Debug, Default, Clone)]
pub struct EvalStats {
    loss_sum:    f64,
    batches:     usize,
    char_errors: usize,
    ref_chars:   usize,
    exact:       usize,
    samples:     usize,
}

impl EvalStats {
    pub fn add_loss(&mut self, loss: f64) {
        self.loss_sum += loss;
        self.batches  += 1;
    }

    pub fn add_prediction(&mut self, predicted: &[usize], reference: &[usize]) {
        self.char_errors += edit_distance(predicted, reference);
        self.ref_chars   += reference.len();
        self.exact       += usize::from(predicted == reference);
        self.samples     += 1;
    }

    pub fn loss(&self) -> f64 {
        if self.batches > 0 { self.loss_sum / self.batches as f64 } else { f64::NAN }
    }

    pub fn cer(&self) -> f64 {
        if self.samples > 0 { self.char_errors as f64 / self.ref_chars.max(1) as f64 } else { f64::NAN }
    }

    pub fn accuracy(&self) -> f64 {
        if self.samples > 0 { self.exact as f64 / self.samples as f64 } else { f64::NAN }
    }
}

// ─── Entry points ─────────────────────────────────────────────────────────────
pub fn run_training(
    cfg:        &TrainConfig,
    vocabulary: Arc<Vocabulary>,
    train:      OcrDataset,
    val:        OcrDataset,
    ckpt:       &CheckpointManager,
    stop:       Arc<AtomicBool>,
) -> Result<TrainSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_with_backend::<TrainBackend>(cfg, vocabulary, train, val, ckpt, stop, device)
}

/// Build generators and model for backend `B`, then run the loop
pub fn train_with_backend<B: AutodiffBackend>(
    cfg:        &TrainConfig,
    vocabulary: Arc<Vocabulary>,
    train:      OcrDataset,
    val:        OcrDataset,
    ckpt:       &CheckpointManager,
    stop:       Arc<AtomicBool>,
    device:     B::Device,
) -> Result<TrainSummary> {
    let model_cfg = cfg.crnn_config(vocabulary.num_classes());
    model_cfg.validate()?;
    let timesteps = model_cfg.timesteps();

    if train.sample_count() == 0 {
        bail!("No training samples - nothing to train on");
    }

    let normalizer = ImageNormalizer::new(cfg.img_height, cfg.img_width)?;

    let mut train_pipeline = SamplePipeline::new(normalizer, vocabulary.clone(), cfg.max_text_len, timesteps);
    if cfg.augment {
        train_pipeline = train_pipeline.with_augmenter(AugmentConfig::new().init());
    }
    let mut train_gen = BatchGenerator::<B>::new(train, train_pipeline, cfg.batch_size, device.clone(), cfg.seed);

    let val_gen = (val.sample_count() > 0).then(|| {
        let pipeline = SamplePipeline::new(normalizer, vocabulary.clone(), cfg.max_text_len, timesteps);
        BatchGenerator::<B::InnerBackend>::new(val, pipeline, cfg.batch_size, device.clone(), cfg.seed)
    });

    let model: Crnn<B> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {}x{} input, {} timesteps, {} classes",
        cfg.img_height,
        cfg.img_width,
        timesteps,
        model_cfg.num_classes
    );

    train_loop(cfg, model, &mut train_gen, val_gen.as_ref(), ckpt, &stop, &device)
}

fn train_loop<B: AutodiffBackend>(
    cfg:       &TrainConfig,
    mut model: Crnn<B>,
    train_gen: &mut BatchGenerator<B>,
    val_gen:   Option<&BatchGenerator<B::InnerBackend>>,
    ckpt:      &CheckpointManager,
    stop:      &AtomicBool,
    device:    &B::Device,
) -> Result<TrainSummary> {
    let blank   = train_gen.pipeline().vocabulary().blank_index();
    let ctc     = CtcLossConfig::new(blank).init();
    let decoder = GreedyDecoder::new(blank);
    let metrics = MetricsLogger::new(ckpt.dir())?;

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    let mut scheduler = PlateauScheduler::new(
        cfg.lr,
        cfg.lr_factor,
        cfg.min_lr,
        cfg.reduce_lr_patience,
        cfg.early_stopping_patience,
    );

    if val_gen.is_none() {
        tracing::warn!("No validation data - monitoring training loss instead");
    }

    let mut outcome    = TrainOutcome::Completed;
    let mut epochs_run = 0;
    let mut best       = None;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    'epochs: for epoch in 1..=cfg.epochs {
        train_gen.reshuffle();
        train_gen.reset_data_loss();
        let lr = scheduler.lr();

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for i in 0..train_gen.len() {
            if stop.load(Ordering::SeqCst) {
                outcome = TrainOutcome::Interrupted;
                break 'epochs;
            }

            let Some(batch) = train_gen.get_batch(i) else {
                continue;
            };

            let logits = model.forward_logits(batch.images);
            let loss   = ctc.forward_logits(logits, batch.targets, batch.target_lengths);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                tracing::warn!("Epoch {epoch}, batch {i}: non-finite loss, step skipped");
                continue;
            }
            train_loss_sum += loss_val;
            train_batches  += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else {
            f64::NAN
        };

        let loss_report = train_gen.data_loss();
        if !loss_report.is_clean() {
            tracing::warn!("Epoch {epoch} data loss: {loss_report:?}");
        }

        // ── Validation phase ──────────────────────────────────────────────────
        let stats = match val_gen {
            Some(gen) => {
                gen.reset_data_loss();
                let stats = evaluate(&model.valid(), gen, &ctc, &decoder);
                let val_report = gen.data_loss();
                if !val_report.is_clean() {
                    tracing::warn!("Epoch {epoch} validation data loss: {val_report:?}");
                }
                stats
            }
            None => EvalStats::default(),
        };

        let row = EpochMetrics {
            epoch,
            train_loss:   avg_train_loss,
            val_loss:     stats.loss(),
            val_cer:      stats.cer(),
            val_accuracy: stats.accuracy(),
            lr,
        };
        metrics.log(&row)?;
        epochs_run = epoch;

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_cer={:.3} | val_acc={:.1}% | lr={:.2e}",
            epoch,
            cfg.epochs,
            row.train_loss,
            row.val_loss,
            row.val_cer,
            row.val_accuracy * 100.0,
            lr,
        );

        // ── Scheduling and checkpoints ────────────────────────────────────────
        let monitored = row.monitored_loss();
        if !monitored.is_finite() {
            tracing::warn!("Epoch {epoch}: no finite loss to monitor");
            continue;
        }

        let step = scheduler.step(monitored);
        if step.improved {
            ckpt.save_best(&model, epoch, monitored)?;
            best = Some(BestCheckpoint { epoch, monitored_loss: monitored });
            tracing::info!("Epoch {epoch}: loss improved to {monitored:.4}, best model saved");
        }
        if step.lr_reduced {
            tracing::info!("Epoch {epoch}: learning rate reduced to {:.2e}", scheduler.lr());
        }
        if step.stop {
            tracing::info!(
                "Early stopping at epoch {epoch}: no improvement for {} epochs",
                cfg.early_stopping_patience
            );
            outcome = TrainOutcome::EarlyStopped;
            break;
        }
    }

    let model = final_weights(model, outcome, best, ckpt, device)?;
    ckpt.save_final(&model)?;

    match outcome {
        TrainOutcome::Interrupted => tracing::warn!("Training interrupted after {epochs_run} epoch(s)"),
        _ => tracing::info!("Training complete after {epochs_run} epoch(s)"),
    }

    Ok(TrainSummary { outcome, epochs_run, best, final_lr: scheduler.lr() })
}

/// Weights to keep once the loop ends. An early stop rolls back to
/// the best epoch; any other outcome keeps the last weights.
fn final_weights<B: Backend>(
    model:   Crnn<B>,
    outcome: TrainOutcome,
    best:    Option<BestCheckpoint>,
    ckpt:    &CheckpointManager,
    device:  &B::Device,
) -> Result<Crnn<B>> {
    match (outcome, best) {
        (TrainOutcome::EarlyStopped, Some(best)) => {
            let (restored, _) = ckpt.load_model(model, device)?;
            tracing::info!("Restored weights from epoch {}", best.epoch);
            Ok(restored)
        }
        _ => Ok(model),
    }
}

/// Loss, CER and exact-match accuracy over the validation generator
fn evaluate<B: Backend>(
    model:   &Crnn<B>,
    gen:     &BatchGenerator<B>,
    ctc:     &CtcLoss,
    decoder: &GreedyDecoder,
) -> EvalStats {
    let mut stats = EvalStats::default();

    for i in 0..gen.len() {
        let Some(batch) = gen.get_batch(i) else {
            continue;
        };

        let logits = model.forward_logits(batch.images);
        let [batch_size, steps, classes] = logits.dims();

        let loss: f64 = ctc
            .forward_logits(logits.clone(), batch.targets, batch.target_lengths)
            .into_scalar()
            .elem::<f64>();
        if loss.is_finite() {
            stats.add_loss(loss);
        }

        let probs = match softmax(logits, 2).into_data().convert::<f32>().to_vec::<f32>() {
            Ok(probs) => probs,
            Err(e) => {
                tracing::warn!("Cannot read validation output: {e:?}");
                continue;
            }
        };

        let row_len = steps * classes;
        for (n, reference) in batch.target_indices.iter().enumerate().take(batch_size) {
            let rows      = &probs[n * row_len..(n + 1) * row_len];
            let path: Vec<usize> = decoder.best_path(rows, steps, classes).into_iter().map(|(c, _)| c).collect();
            let predicted = decoder.collapse(&path);
            stats.add_prediction(&predicted, reference);
        }
    }

    stats
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::Sample;
    use burn::backend::{Autodiff, NdArray};
    use image::{GrayImage, Luma};
    use std::path::Path;

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance(&[], &[]), 0);
        assert_eq!(edit_distance(&[1, 2, 3], &[]), 3);
        assert_eq!(edit_distance(&[1, 2, 3], &[1, 3]), 1);
        assert_eq!(edit_distance(&[1, 2, 3], &[3, 2, 1]), 2);
        assert_eq!(edit_distance(&[4, 4], &[4, 4]), 0);
    }

    #[test]
    fn test_eval_stats() {
        let mut stats = EvalStats::default();
        assert!(stats.loss().is_nan());

        stats.add_loss(2.0);
        stats.add_loss(4.0);
        stats.add_prediction(&[1, 2], &[1, 2]);
        stats.add_prediction(&[1], &[1, 2]);

        assert_eq!(stats.loss(), 3.0);
        assert_eq!(stats.cer(), 0.25);
        assert_eq!(stats.accuracy(), 0.5);
    }

    #[test]
    fn test_scheduler_reduces_then_stops() {
        let mut s = PlateauScheduler::new(1e-3, 0.5, 3e-4, 2, 5);

        assert!(s.step(1.0).improved);
        assert!(!s.step(1.0).lr_reduced);
        assert!(s.step(1.1).lr_reduced);
        assert_eq!(s.lr(), 5e-4);

        assert!(!s.step(1.2).stop);
        let step = s.step(1.3);
        assert!(step.lr_reduced);
        assert_eq!(s.lr(), 3e-4);

        // already at the floor
        assert!(!s.step(1.4).lr_reduced);
        assert_eq!(s.lr(), 3e-4);
    }

    #[test]
    fn test_scheduler_improvement_resets_patience() {
        let mut s = PlateauScheduler::new(1e-3, 0.5, 1e-7, 3, 2);
        s.step(1.0);
        assert!(!s.step(1.5).stop);
        assert!(s.step(0.5).improved);
        assert!(!s.step(0.6).stop);
        assert!(s.step(0.7).stop);
    }

    fn dataset(dir: &Path, n: usize) -> OcrDataset {
        let samples = (0..n)
            .map(|i| {
                let name = format!("{i}.png");
                GrayImage::from_fn(40, 16, |x, _| Luma([if (x + i as u32) % 5 == 0 { 0 } else { 255 }]))
                    .save(dir.join(&name))
                    .unwrap();
                Sample::new(name, if i % 2 == 0 { "কখ" } else { "খ" })
            })
            .collect();
        OcrDataset::new(dir, samples)
    }

    fn tiny_config(checkpoint_dir: &Path) -> TrainConfig {
        TrainConfig {
            checkpoint_dir: checkpoint_dir.to_path_buf(),
            img_height: 16,
            img_width: 32,
            batch_size: 2,
            epochs: 2,
            lr: 1e-3,
            max_text_len: 4,
            embed_dim: 8,
            hidden_size: 4,
            augment: false,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_short_run_writes_checkpoints_and_metrics() {
        let data = tempfile::tempdir().unwrap();
        let out  = tempfile::tempdir().unwrap();
        let cfg  = tiny_config(out.path());
        let ckpt = CheckpointManager::new(out.path()).unwrap();

        let summary = train_with_backend::<TestBackend>(
            &cfg,
            Arc::new(Vocabulary::new("কখ").unwrap()),
            dataset(data.path(), 5),
            dataset(data.path(), 2),
            &ckpt,
            Arc::new(AtomicBool::new(false)),
            Default::default(),
        )
        .unwrap();

        assert_eq!(summary.outcome, TrainOutcome::Completed);
        assert_eq!(summary.epochs_run, 2);
        assert!(summary.best.is_some());
        assert!(ckpt.model_path(crate::infra::checkpoint::CheckpointKind::Final).is_file());

        let csv = std::fs::read_to_string(out.path().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_raised_stop_flag_interrupts() {
        let data = tempfile::tempdir().unwrap();
        let out  = tempfile::tempdir().unwrap();
        let cfg  = tiny_config(out.path());
        let ckpt = CheckpointManager::new(out.path()).unwrap();

        let summary = train_with_backend::<TestBackend>(
            &cfg,
            Arc::new(Vocabulary::new("কখ").unwrap()),
            dataset(data.path(), 3),
            OcrDataset::new(data.path(), Vec::new()),
            &ckpt,
            Arc::new(AtomicBool::new(true)),
            Default::default(),
        )
        .unwrap();

        assert_eq!(summary.outcome, TrainOutcome::Interrupted);
        assert_eq!(summary.epochs_run, 0);
        assert!(summary.best.is_none());
    }

    #[test]
    fn test_empty_training_set_is_rejected() {
        let data = tempfile::tempdir().unwrap();
        let out  = tempfile::tempdir().unwrap();
        let cfg  = tiny_config(out.path());
        let ckpt = CheckpointManager::new(out.path()).unwrap();

        let result = train_with_backend::<TestBackend>(
            &cfg,
            Arc::new(Vocabulary::new("কখ").unwrap()),
            OcrDataset::new(data.path(), Vec::new()),
            OcrDataset::new(data.path(), Vec::new()),
            &ckpt,
            Arc::new(AtomicBool::new(false)),
            Default::default(),
        );
        assert!(result.is_err());
    }

    fn outputs<B: Backend>(model: &Crnn<B>, input: Tensor<B, 4>) -> burn::tensor::TensorData {
        model.forward_logits(input).into_data()
    }

    #[test]
    fn test_early_stop_keeps_best_weights() {
        type B = NdArray;
        let out    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(out.path()).unwrap();
        let device = Default::default();
        let cfg    = tiny_config(out.path()).crnn_config(3);
        let input  = Tensor::<B, 4>::random(
            [1, 1, 16, 32],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );

        let best_model: Crnn<B> = cfg.init(&device);
        let last_model: Crnn<B> = cfg.init(&device);
        let best = BestCheckpoint { epoch: 3, monitored_loss: 0.7 };
        ckpt.save_best(&best_model, best.epoch, best.monitored_loss).unwrap();

        let kept = final_weights(last_model.clone(), TrainOutcome::Completed, Some(best), &ckpt, &device).unwrap();
        outputs(&kept, input.clone()).assert_approx_eq(&outputs(&last_model, input.clone()), 5);

        let kept = final_weights(last_model, TrainOutcome::EarlyStopped, Some(best), &ckpt, &device).unwrap();
        outputs(&kept, input.clone()).assert_approx_eq(&outputs(&best_model, input.clone()), 2);

        // final_model ends up holding the restored weights
        ckpt.save_final(&kept).unwrap();
        std::fs::remove_file(ckpt.model_path(crate::infra::checkpoint::CheckpointKind::Best)).unwrap();
        let (reloaded, kind) = ckpt.load_model(cfg.init::<B>(&device), &device).unwrap();
        assert_eq!(kind, crate::infra::checkpoint::CheckpointKind::Final);
        outputs(&reloaded, input.clone()).assert_approx_eq(&outputs(&best_model, input), 2);
    }

    #[test]
    fn test_validation_data_loss_is_counted() {
        let data = tempfile::tempdir().unwrap();
        let out  = tempfile::tempdir().unwrap();
        let mut cfg = tiny_config(out.path());
        cfg.epochs  = 1;
        let ckpt = CheckpointManager::new(out.path()).unwrap();

        let model_cfg = cfg.crnn_config(3);
        let vocabulary = Arc::new(Vocabulary::new("কখ").unwrap());
        let train = dataset(data.path(), 2);

        // 0.png and 1.png were written by `dataset` above
        let val = OcrDataset::new(
            data.path(),
            vec![
                Sample::new("0.png", "কখ"),
                Sample::new("1.png", "খ"),
                Sample::new("missing.png", "কখ"),
            ],
        );

        let normalizer = ImageNormalizer::new(cfg.img_height, cfg.img_width).unwrap();
        let device     = burn::backend::ndarray::NdArrayDevice::Cpu;
        let timesteps  = model_cfg.timesteps();
        let mut train_gen = BatchGenerator::<TestBackend>::new(
            train,
            SamplePipeline::new(normalizer, vocabulary.clone(), cfg.max_text_len, timesteps),
            cfg.batch_size,
            device,
            cfg.seed,
        );
        let val_gen = BatchGenerator::<NdArray>::new(
            val,
            SamplePipeline::new(normalizer, vocabulary, cfg.max_text_len, timesteps),
            cfg.batch_size,
            device,
            cfg.seed,
        );

        train_loop(
            &cfg,
            model_cfg.init::<TestBackend>(&device),
            &mut train_gen,
            Some(&val_gen),
            &ckpt,
            &AtomicBool::new(false),
            &device,
        )
        .unwrap();

        assert!(train_gen.data_loss().is_clean());
        assert_eq!(val_gen.data_loss().unreadable_images, 1);
    }
}
