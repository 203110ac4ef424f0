// ============================================================
// Layer 2 - PredictUseCase
// ============================================================
// Loads a checkpoint once and recognises one or more images.
// A bad image fails only its own prediction, so a batch of paths
// given on the command line reports per-file results.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::domain::traits::{Recognition, TextRecognizer};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::Inferencer;

pub struct PredictUseCase {
    recognizer: Box<dyn TextRecognizer + Send>,
}

impl PredictUseCase {
    /// Load the trained model from `checkpoint_dir`
    pub fn load(checkpoint_dir: impl Into<PathBuf>) -> Result<Self> {
        let dir  = checkpoint_dir.into();
        let ckpt = CheckpointManager::open(&dir);
        if !ckpt.has_model() {
            bail!("No trained model in '{}'. Run `train` first.", dir.display());
        }
        let inferencer = Inferencer::load(&ckpt)?;
        Ok(Self::with_recognizer(Box::new(inferencer)))
    }

    pub fn with_recognizer(recognizer: Box<dyn TextRecognizer + Send>) -> Self {
        Self { recognizer }
    }

    /// Shared with the HTTP server
    pub fn into_recognizer(self) -> Box<dyn TextRecognizer + Send> {
        self.recognizer
    }

    pub fn predict(&self, image: &Path) -> Result<Recognition> {
        self.recognizer
            .recognize_path(image)
            .with_context(|| format!("Prediction failed for '{}'", image.display()))
    }

    pub fn predict_all<'a>(&self, images: &'a [PathBuf]) -> Vec<(&'a Path, Result<Recognition>)> {
        images
            .iter()
            .map(|path| (path.as_path(), self.predict(path)))
            .collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    struct EchoFileName;

    impl TextRecognizer for EchoFileName {
        fn recognize_path(&self, path: &Path) -> Result<Recognition> {
            if !path.exists() {
                bail!("image not found");
            }
            let text = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            Ok(Recognition { text, confidence: 1.0 })
        }

        fn recognize_bytes(&self, _bytes: &[u8]) -> Result<Recognition> {
            bail!("unused")
        }
    }

    #[test]
    fn test_bad_path_fails_only_itself() {
        let dir  = tempfile::tempdir().unwrap();
        let good = dir.path().join("কখ.png");
        std::fs::write(&good, b"x").unwrap();
        let paths = vec![good, dir.path().join("missing.png")];

        let results = PredictUseCase::with_recognizer(Box::new(EchoFileName)).predict_all(&paths);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1.as_ref().unwrap().text, "কখ");
        assert!(results[1].1.is_err());
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PredictUseCase::load(dir.path().join("nothing")).is_err());
    }
}
