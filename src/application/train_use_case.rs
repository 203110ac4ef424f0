// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Validate config, build vocabulary   (Layer 3 - domain)
//   Step 2: Load train/ and val/ manifests      (Layer 4 - data)
//   Step 3: Hold out validation if none given   (Layer 4 - data)
//   Step 4: Save config next to the checkpoint  (Layer 6 - infra)
//   Step 5: Install the Ctrl-C stop flag
//   Step 6: Run the training loop               (Layer 5 - ml)
//
// Structural problems (no training samples, image size the CRNN
// cannot reduce, labels longer than the output sequence) abort
// here, before any tensor is allocated.
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::data::{dataset::OcrDataset, loader::ManifestLoader, splitter::split_train_val};
use crate::domain::{
    traits::SampleSource,
    vocabulary::{Vocabulary, BANGLA_SYMBOLS},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    model::CrnnConfig,
    trainer::{run_training, TrainSummary},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Saved as
// train_config.json so inference rebuilds the same model and
// vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Directory holding train/ and val/ split directories
    pub data_dir:       PathBuf,
    pub checkpoint_dir: PathBuf,

    pub img_height:   usize,
    pub img_width:    usize,
    pub batch_size:   usize,
    pub epochs:       usize,
    pub lr:           f64,
    pub max_text_len: usize,

    /// Ordered symbol set; blank is appended implicitly
    pub vocabulary:     String,
    /// Substitute out-of-vocabulary characters with this symbol
    /// instead of dropping them
    pub unknown_symbol: Option<char>,

    pub early_stopping_patience: usize,
    pub reduce_lr_patience:      usize,
    pub lr_factor:               f64,
    pub min_lr:                  f64,

    pub augment:      bool,
    /// Share of train/ held out when val/ has no samples
    pub val_fraction: f64,
    pub seed:         u64,

    pub embed_dim:   usize,
    pub hidden_size: usize,
    pub dropout:     f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:       PathBuf::from("data"),
            checkpoint_dir: PathBuf::from("checkpoints"),

            img_height:   64,
            img_width:    512,
            batch_size:   16,
            epochs:       100,
            lr:           1e-4,
            max_text_len: 64,

            vocabulary:     BANGLA_SYMBOLS.to_string(),
            unknown_symbol: None,

            early_stopping_patience: 15,
            reduce_lr_patience:      7,
            lr_factor:               0.5,
            min_lr:                  1e-7,

            augment:      true,
            val_fraction: 0.1,
            seed:         42,

            embed_dim:   64,
            hidden_size: 256,
            dropout:     0.2,
        }
    }
}

impl TrainConfig {
    pub fn train_dir(&self) -> PathBuf {
        self.data_dir.join("train")
    }

    pub fn val_dir(&self) -> PathBuf {
        self.data_dir.join("val")
    }

    pub fn build_vocabulary(&self) -> Result<Vocabulary> {
        let vocab = Vocabulary::new(&self.vocabulary).context("Invalid vocabulary")?;
        match self.unknown_symbol {
            Some(symbol) => Ok(vocab.with_unknown_symbol(symbol)?),
            None => Ok(vocab),
        }
    }

    pub fn crnn_config(&self, num_classes: usize) -> CrnnConfig {
        CrnnConfig::new(num_classes)
            .with_img_height(self.img_height)
            .with_img_width(self.img_width)
            .with_embed_dim(self.embed_dim)
            .with_hidden_size(self.hidden_size)
            .with_dropout(self.dropout)
    }

    /// Reject settings that would fail deep inside training
    pub fn validate(&self) -> Result<()> {
        let model = self.crnn_config(2);
        model.validate()?;

        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.epochs == 0 {
            bail!("epochs must be at least 1");
        }
        if !(self.lr > 0.0) {
            bail!("lr must be positive, got {}", self.lr);
        }
        if !(self.lr_factor > 0.0 && self.lr_factor < 1.0) {
            bail!("lr_factor must be in (0, 1), got {}", self.lr_factor);
        }
        if !(0.0..1.0).contains(&self.val_fraction) {
            bail!("val_fraction must be in [0, 1), got {}", self.val_fraction);
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must be in [0, 1), got {}", self.dropout);
        }
        if self.max_text_len == 0 {
            bail!("max_text_len must be at least 1");
        }
        if self.max_text_len > model.timesteps() {
            bail!(
                "max_text_len {} exceeds the {} timesteps an image of width {} produces",
                self.max_text_len,
                model.timesteps(),
                self.img_width
            );
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Config and vocabulary ─────────────────────────────────────
        cfg.validate()?;
        let vocabulary = Arc::new(cfg.build_vocabulary()?);
        tracing::info!(
            "Vocabulary: {} symbols + blank = {} classes",
            vocabulary.len(),
            vocabulary.num_classes()
        );

        // ── Step 2: Manifests ─────────────────────────────────────────────────
        let train_samples = ManifestLoader::new(cfg.train_dir()).load_all()?;
        if train_samples.is_empty() {
            bail!(
                "No training samples found in '{}'. Expected an annotations.json there.",
                cfg.train_dir().display()
            );
        }
        let val_samples = ManifestLoader::new(cfg.val_dir()).load_all()?;

        // ── Step 3: Validation split ──────────────────────────────────────────
        // Held-out samples still live in train/, so both datasets
        // resolve image paths against the training directory.
        let (train, val) = if val_samples.is_empty() && cfg.val_fraction > 0.0 {
            let (train, val) = split_train_val(train_samples, cfg.val_fraction, cfg.seed);
            (OcrDataset::new(cfg.train_dir(), train), OcrDataset::new(cfg.train_dir(), val))
        } else {
            (
                OcrDataset::new(cfg.train_dir(), train_samples),
                OcrDataset::new(cfg.val_dir(), val_samples),
            )
        };
        tracing::info!(
            "Split: {} train, {} validation",
            train.sample_count(),
            val.sample_count()
        );

        // ── Step 4: Save config for inference ─────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;

        // ── Step 5: Ctrl-C ────────────────────────────────────────────────────
        let stop = Arc::new(AtomicBool::new(false));
        spawn_interrupt_listener(stop.clone());

        // ── Step 6: Training loop (Layer 5) ───────────────────────────────────
        run_training(cfg, vocabulary, train, val, &ckpt, stop)
    }
}

/// Exit status for a run aborted by a second Ctrl-C (128 + SIGINT)
const FORCED_EXIT_CODE: i32 = 130;

/// What a Ctrl-C should do given the current stop flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptAction {
    /// First press: finish gracefully
    Stop,
    /// Stop was already requested: abort now
    Exit,
}

fn on_interrupt(stop: &AtomicBool) -> InterruptAction {
    if stop.swap(true, Ordering::SeqCst) {
        InterruptAction::Exit
    } else {
        InterruptAction::Stop
    }
}

/// Raise `stop` on the first Ctrl-C. The loop polls it between
/// batches, so the in-flight batch is simply discarded. A second
/// Ctrl-C exits the process without waiting.
fn spawn_interrupt_listener(stop: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::warn!("Cannot listen for Ctrl-C: {e}");
                return;
            }
        };
        runtime.block_on(async {
            while tokio::signal::ctrl_c().await.is_ok() {
                match on_interrupt(&stop) {
                    InterruptAction::Stop => {
                        tracing::warn!("Interrupt received - stopping after the current batch (Ctrl-C again to abort)");
                    }
                    InterruptAction::Exit => {
                        tracing::warn!("Second interrupt - aborting without saving");
                        std::process::exit(FORCED_EXIT_CODE);
                    }
                }
            }
        });
    });
}
