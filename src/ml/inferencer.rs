// ============================================================
// Layer 5 - Inferencer
// ============================================================
// Loads a trained CRNN and turns single images into text:
//
//   image ──ImageNormalizer──▶ [1, 1, H, W]
//         ──Crnn::forward───▶ [1, T, V+1] probabilities
//         ──GreedyDecoder───▶ text + confidence
//
// The architecture and vocabulary come from train_config.json in
// the checkpoint directory, so inference always matches what was
// trained. A vocabulary whose size does not match the loaded
// classifier width is rejected up front.
//
// No augmentation, no dropout: the model is built on a plain
// (non-autodiff) backend.

use anyhow::{bail, Context, Result};
use burn::prelude::*;
use std::path::Path;

use crate::data::image::{ImageNormalizer, ImageTensor};
use crate::domain::traits::{Recognition, TextRecognizer};
use crate::domain::vocabulary::Vocabulary;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::decoder::{Decoded, GreedyDecoder};
use crate::ml::model::Crnn;

pub type InferBackend = burn::backend::Wgpu;

pub struct Inferencer<B: Backend> {
    model:      Crnn<B>,
    vocabulary: Vocabulary,
    normalizer: ImageNormalizer,
    decoder:    GreedyDecoder,
    device:     B::Device,
}

impl Inferencer<InferBackend> {
    /// Load on the default WGPU device
    pub fn load(ckpt: &CheckpointManager) -> Result<Self> {
        Self::from_checkpoint(ckpt, burn::backend::wgpu::WgpuDevice::default())
    }
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(ckpt: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg        = ckpt.load_config()?;
        let vocabulary = cfg.build_vocabulary()?;
        let model_cfg  = cfg.crnn_config(vocabulary.num_classes()).with_dropout(0.0);
        model_cfg.validate()?;

        let (model, kind) = ckpt.load_model(model_cfg.init::<B>(&device), &device)?;
        tracing::info!("Using {:?} weights", kind);

        let normalizer = ImageNormalizer::new(cfg.img_height, cfg.img_width)?;
        Self::new(model, vocabulary, normalizer, device)
    }

    /// Assemble from parts. Fails when the classifier width is not
    /// vocabulary size + 1.
    pub fn new(model: Crnn<B>, vocabulary: Vocabulary, normalizer: ImageNormalizer, device: B::Device) -> Result<Self> {
        let width = model.output_width();
        if width != vocabulary.num_classes() {
            bail!(
                "Checkpoint outputs {width} classes but the vocabulary needs {} ({} symbols + blank)",
                vocabulary.num_classes(),
                vocabulary.len()
            );
        }

        Ok(Self {
            decoder: GreedyDecoder::new(vocabulary.blank_index()),
            model,
            vocabulary,
            normalizer,
            device,
        })
    }

    pub fn predict_path(&self, path: &Path) -> Result<Decoded> {
        let image = self.normalizer.normalize(path)?;
        self.predict_tensor(&image)
    }

    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Decoded> {
        let image = self.normalizer.normalize_bytes(bytes)?;
        self.predict_tensor(&image)
    }

    pub fn predict_tensor(&self, image: &ImageTensor) -> Result<Decoded> {
        let input = Tensor::<B, 1>::from_floats(image.data.as_slice(), &self.device)
            .reshape([1, 1, image.height, image.width]);

        let probs = self.model.forward(input);
        let [_, steps, classes] = probs.dims();

        let probs: Vec<f32> = probs
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read model output: {e:?}"))
            .context("Inference failed")?;

        let decoded = self.decoder.decode(&self.vocabulary, &probs, steps, classes);
        tracing::debug!("Decoded '{}' (confidence {:.3})", decoded.text, decoded.confidence);
        Ok(decoded)
    }
}

impl<B: Backend> TextRecognizer for Inferencer<B> {
    fn recognize_path(&self, path: &Path) -> Result<Recognition> {
        self.predict_path(path).map(Recognition::from)
    }

    fn recognize_bytes(&self, bytes: &[u8]) -> Result<Recognition> {
        self.predict_bytes(bytes).map(Recognition::from)
    }
}

impl From<Decoded> for Recognition {
    fn from(d: Decoded) -> Self {
        Recognition { text: d.text, confidence: d.confidence }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use burn::backend::NdArray;
    use image::{GrayImage, Luma};
    use std::io::Cursor;

    type TestBackend = NdArray;

    fn tiny_config(dir: &Path) -> TrainConfig {
        TrainConfig {
            checkpoint_dir: dir.to_path_buf(),
            img_height: 16,
            img_width: 32,
            embed_dim: 8,
            hidden_size: 4,
            vocabulary: "কখগ".into(),
            ..TrainConfig::default()
        }
    }

    fn save_checkpoint(dir: &Path, cfg: &TrainConfig, num_classes: usize) -> CheckpointManager {
        let ckpt  = CheckpointManager::new(dir).unwrap();
        let model = cfg.crnn_config(num_classes).init::<TestBackend>(&Default::default());
        ckpt.save_config(cfg).unwrap();
        ckpt.save_best(&model, 1, 1.0).unwrap();
        ckpt
    }

    #[test]
    fn test_predicts_from_path_and_bytes() {
        let dir  = tempfile::tempdir().unwrap();
        let cfg  = tiny_config(dir.path());
        let ckpt = save_checkpoint(dir.path(), &cfg, 4);

        let inferencer = Inferencer::<TestBackend>::from_checkpoint(&ckpt, Default::default()).unwrap();

        let img  = GrayImage::from_pixel(64, 20, Luma([200]));
        let path = dir.path().join("line.png");
        img.save(&path).unwrap();

        let from_path = inferencer.recognize_path(&path).unwrap();
        assert!(from_path.text.chars().count() <= 4);
        assert!((0.0..=1.0).contains(&from_path.confidence));

        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png).unwrap();
        let from_bytes = inferencer.recognize_bytes(&bytes).unwrap();
        assert_eq!(from_path, from_bytes);
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let cfg  = tiny_config(dir.path());
        let ckpt = save_checkpoint(dir.path(), &cfg, 4);

        let model  = cfg.crnn_config(4).init::<TestBackend>(&Default::default());
        let (model, _) = ckpt.load_model(model, &Default::default()).unwrap();
        let result = Inferencer::new(
            model,
            Vocabulary::new("কখগঘ").unwrap(),
            ImageNormalizer::new(16, 32).unwrap(),
            Default::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unreadable_image_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let cfg  = tiny_config(dir.path());
        let ckpt = save_checkpoint(dir.path(), &cfg, 4);

        let inferencer = Inferencer::<TestBackend>::from_checkpoint(&ckpt, Default::default()).unwrap();
        assert!(inferencer.recognize_bytes(b"not an image").is_err());
        assert!(inferencer.recognize_path(&dir.path().join("missing.png")).is_err());
    }
}
