// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores CRNN weights using Burn's CompactRecorder,
// plus the JSON side files inference needs to rebuild the model.
//
// Directory layout:
//   checkpoints/
//     train_config.json       ← architecture + vocabulary
//     best_model.mpk          ← weights at the best monitored loss
//     best_checkpoint.json    ← {"epoch": 12, "monitored_loss": 0.41}
//     final_model.mpk         ← weights when training ended
//     metrics.csv             ← written by MetricsLogger
//
// Every write goes to a temporary name first and is then renamed
// over the real one. A run killed mid-save leaves the previous
// best_model intact and loadable.
//
// Only the base network is recorded. The CTC loss has no weights,
// so a checkpoint loads straight into Crnn for inference.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, FileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::Crnn;

pub const CONFIG_FILE:    &str = "train_config.json";
pub const BEST_MODEL:     &str = "best_model";
pub const FINAL_MODEL:    &str = "final_model";
pub const BEST_META_FILE: &str = "best_checkpoint.json";

/// Extension CompactRecorder appends to every record path.
/// Must match `FileRecorder::file_extension`.
const RECORD_EXT: &str = "mpk";

/// Which weights file a model was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointKind {
    Best,
    Final,
}

impl CheckpointKind {
    fn stem(self) -> &'static str {
        match self {
            CheckpointKind::Best => BEST_MODEL,
            CheckpointKind::Final => FINAL_MODEL,
        }
    }
}

/// Epoch and loss of the saved best model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestCheckpoint {
    pub epoch:          usize,
    pub monitored_loss: f64,
}

#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Open (and create if needed) a checkpoint directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Use an existing directory without creating anything
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self, kind: CheckpointKind) -> PathBuf {
        self.dir.join(format!("{}.{RECORD_EXT}", kind.stem()))
    }

    /// True when either weights file exists
    pub fn has_model(&self) -> bool {
        self.model_path(CheckpointKind::Best).is_file() || self.model_path(CheckpointKind::Final).is_file()
    }

    // ─── Weights ──────────────────────────────────────────────────────────────

    /// Replace best_model with `model` and record epoch and loss
    pub fn save_best<B: Backend>(&self, model: &Crnn<B>, epoch: usize, monitored_loss: f64) -> Result<()> {
        self.save_model(model, CheckpointKind::Best)?;
        self.write_json(BEST_META_FILE, &BestCheckpoint { epoch, monitored_loss })?;
        tracing::debug!("Saved best model: epoch {epoch}, loss {monitored_loss:.4}");
        Ok(())
    }

    pub fn save_final<B: Backend>(&self, model: &Crnn<B>) -> Result<()> {
        self.save_model(model, CheckpointKind::Final)
    }

    fn save_model<B: Backend>(&self, model: &Crnn<B>, kind: CheckpointKind) -> Result<()> {
        // The recorder sets the extension itself, so the temp stem
        // must not contain a dot.
        let tmp_stem = self.dir.join(format!("{}_tmp", kind.stem()));
        let tmp_file = tmp_stem.with_extension(<CompactRecorder as FileRecorder<B>>::file_extension());
        let target   = self.model_path(kind);

        CompactRecorder::new()
            .record(model.clone().into_record(), tmp_stem)
            .with_context(|| format!("Failed to write checkpoint '{}'", tmp_file.display()))?;

        fs::rename(&tmp_file, &target)
            .with_context(|| format!("Failed to move checkpoint into '{}'", target.display()))?;

        Ok(())
    }

    /// Load best_model, falling back to final_model.
    ///
    /// `model` must have the architecture the weights were saved
    /// with; rebuild it from `load_config` first.
    pub fn load_model<B: Backend>(&self, model: Crnn<B>, device: &B::Device) -> Result<(Crnn<B>, CheckpointKind)> {
        let kind = [CheckpointKind::Best, CheckpointKind::Final]
            .into_iter()
            .find(|&k| self.model_path(k).is_file());

        let Some(kind) = kind else {
            bail!(
                "No model weights in '{}'. Have you run 'train' first?",
                self.dir.display()
            );
        };

        let path   = self.dir.join(kind.stem());
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}.{RECORD_EXT}'", path.display()))?;

        tracing::info!("Loaded {:?} checkpoint from '{}'", kind, self.dir.display());
        Ok((model.load_record(record), kind))
    }

    pub fn best_checkpoint(&self) -> Result<Option<BestCheckpoint>> {
        let path = self.dir.join(BEST_META_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    // ─── Config ───────────────────────────────────────────────────────────────

    /// Must be written before training so inference can rebuild the
    /// exact architecture and vocabulary.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(CONFIG_FILE, cfg)?;
        tracing::debug!("Saved training config to '{}'", self.dir.join(CONFIG_FILE).display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' first.",
                path.display()
            )
        })?;
        serde_json::from_str(&json).with_context(|| format!("Malformed config '{}'", path.display()))
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let target = self.dir.join(name);
        let tmp    = self.dir.join(format!("{name}.tmp"));

        fs::write(&tmp, serde_json::to_string_pretty(value)?)
            .with_context(|| format!("Cannot write '{}'", tmp.display()))?;
        fs::rename(&tmp, &target)
            .with_context(|| format!("Cannot move '{}' into place", target.display()))?;
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::CrnnConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny() -> CrnnConfig {
        CrnnConfig::new(4)
            .with_img_height(16)
            .with_img_width(16)
            .with_embed_dim(4)
            .with_hidden_size(2)
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg  = TrainConfig { epochs: 3, vocabulary: "কখ".into(), ..TrainConfig::default() };

        ckpt.save_config(&cfg).unwrap();
        let loaded = ckpt.load_config().unwrap();
        assert_eq!(loaded.epochs, 3);
        assert_eq!(loaded.vocabulary, "কখ");
        assert!(!dir.path().join(format!("{CONFIG_FILE}.tmp")).exists());
    }

    #[test]
    fn test_no_weights_is_an_error() {
        let dir   = tempfile::tempdir().unwrap();
        let ckpt  = CheckpointManager::new(dir.path()).unwrap();
        let model = tiny().init::<TestBackend>(&Default::default());
        assert!(!ckpt.has_model());
        assert!(ckpt.load_model(model, &Default::default()).is_err());
    }

    #[test]
    fn test_best_preferred_over_final() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let model  = tiny().init::<TestBackend>(&device);

        ckpt.save_final(&model).unwrap();
        let (_, kind) = ckpt.load_model(tiny().init::<TestBackend>(&device), &device).unwrap();
        assert_eq!(kind, CheckpointKind::Final);

        ckpt.save_best(&model, 4, 0.5).unwrap();
        let (_, kind) = ckpt.load_model(tiny().init::<TestBackend>(&device), &device).unwrap();
        assert_eq!(kind, CheckpointKind::Best);
        assert_eq!(
            ckpt.best_checkpoint().unwrap(),
            Some(BestCheckpoint { epoch: 4, monitored_loss: 0.5 })
        );
        assert!(!dir.path().join("best_model_tmp.mpk").exists());
    }

    #[test]
    fn test_extension_matches_recorder() {
        assert_eq!(RECORD_EXT, <CompactRecorder as FileRecorder<TestBackend>>::file_extension());
    }

    #[test]
    fn test_saved_weights_load_back() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let model  = tiny().init::<TestBackend>(&device);

        ckpt.save_final(&model).unwrap();
        assert!(ckpt.has_model());
        assert!(ckpt.model_path(CheckpointKind::Final).is_file());
        assert!(!dir.path().join(format!("{FINAL_MODEL}_tmp.{RECORD_EXT}")).exists());

        let (loaded, kind) = ckpt.load_model(tiny().init::<TestBackend>(&device), &device).unwrap();
        assert_eq!(kind, CheckpointKind::Final);

        let input = Tensor::<TestBackend, 4>::random(
            [2, 1, 16, 16],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );
        // Half-precision storage, so only approximately equal
        model
            .forward_logits(input.clone())
            .into_data()
            .assert_approx_eq(&loaded.forward_logits(input).into_data(), 2);
    }
}
