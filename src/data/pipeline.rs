// ============================================================
// Layer 4 - Per-Sample Pipeline
// ============================================================
// Everything that happens to ONE manifest entry before batching:
//
//   Sample { image, text }
//       │
//       ├── ImageNormalizer::load      (skip sample on failure)
//       ├── Augmenter::apply           (training only)
//       ├── ImageTensor::from_gray     ([0,1], H × W × 1)
//       │
//       └── Vocabulary::encode         (OOV dropped or substituted)
//           pad_label(max_text_len)    (truncate, then pad with 0)
//
// Nothing here raises: a bad image yields None, an odd label is
// still encoded. Every such event is counted in DataLossCounters
// so the trainer can report what was silently lost each epoch.
//
// The pipeline is shared by reference across rayon workers, so
// counters are atomics and the pipeline itself holds no mutable
// state.

use rand::Rng;
use serde::Serialize;
use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use crate::data::augment::Augmenter;
use crate::data::image::{ImageNormalizer, ImageTensor};
use crate::domain::sample::Sample;
use crate::domain::vocabulary::{pad_label, PaddedLabel, Vocabulary};

/// One sample ready for collation
#[derive(Debug, Clone)]
pub struct PreparedSample {
    pub image: ImageTensor,
    pub label: PaddedLabel,
}

// ─── Data-loss accounting ─────────────────────────────────────────────────────
#[derive(Debug, Default)]
pub struct DataLossCounters {
    unreadable_images: AtomicUsize,
    oov_characters:    AtomicUsize,
    truncated_labels:  AtomicUsize,
    infeasible_labels: AtomicUsize,
}

impl DataLossCounters {
    pub fn snapshot(&self) -> DataLossReport {
        DataLossReport {
            unreadable_images: self.unreadable_images.load(Ordering::Relaxed),
            oov_characters:    self.oov_characters.load(Ordering::Relaxed),
            truncated_labels:  self.truncated_labels.load(Ordering::Relaxed),
            infeasible_labels: self.infeasible_labels.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.unreadable_images.store(0, Ordering::Relaxed);
        self.oov_characters.store(0, Ordering::Relaxed);
        self.truncated_labels.store(0, Ordering::Relaxed);
        self.infeasible_labels.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataLossReport {
    /// Samples skipped because the image was missing or undecodable
    pub unreadable_images: usize,
    /// Characters dropped (or substituted) because they are not in the vocabulary
    pub oov_characters: usize,
    /// Labels cut at max_text_len
    pub truncated_labels: usize,
    /// Labels that need more timesteps than the network produces
    pub infeasible_labels: usize,
}

impl DataLossReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

// ─── SamplePipeline ───────────────────────────────────────────────────────────
#[derive(Debug)]
pub struct SamplePipeline {
    normalizer:   ImageNormalizer,
    augmenter:    Option<Augmenter>,
    vocabulary:   Arc<Vocabulary>,
    max_text_len: usize,
    timesteps:    usize,
    counters:     DataLossCounters,
}

impl SamplePipeline {
    /// `timesteps` is the network's output sequence length, used to
    /// flag labels the alignment loss can never produce.
    pub fn new(
        normalizer:   ImageNormalizer,
        vocabulary:   Arc<Vocabulary>,
        max_text_len: usize,
        timesteps:    usize,
    ) -> Self {
        Self {
            normalizer,
            augmenter: None,
            vocabulary,
            max_text_len,
            timesteps,
            counters: DataLossCounters::default(),
        }
    }

    /// Enable training-time augmentation
    pub fn with_augmenter(mut self, augmenter: Augmenter) -> Self {
        self.augmenter = Some(augmenter);
        self
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Process one sample. None when its image cannot be loaded.
    pub fn prepare<R: Rng>(&self, sample: &Sample, dir: &Path, rng: &mut R) -> Option<PreparedSample> {
        let path = sample.image_path(dir);

        let gray = match self.normalizer.load(&path) {
            Ok(gray) => gray,
            Err(e) => {
                tracing::debug!("Skipping sample: {e}");
                self.counters.unreadable_images.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let gray = match &self.augmenter {
            Some(augmenter) => augmenter.apply(gray, rng),
            None => gray,
        };

        Some(PreparedSample {
            image: ImageTensor::from_gray(&gray),
            label: self.encode_label(&sample.text),
        })
    }

    /// Encode, truncate and pad a transcription, counting losses.
    pub fn encode_label(&self, text: &str) -> PaddedLabel {
        let encoded = self.vocabulary.encode_with_stats(text);
        if encoded.oov > 0 {
            self.counters.oov_characters.fetch_add(encoded.oov, Ordering::Relaxed);
        }

        let label = pad_label(&encoded.indices, self.max_text_len);
        if label.truncated {
            tracing::debug!(
                "Label truncated from {} to {} symbols",
                encoded.indices.len(),
                self.max_text_len
            );
            self.counters.truncated_labels.fetch_add(1, Ordering::Relaxed);
        }
        if min_ctc_timesteps(label.genuine()) > self.timesteps {
            self.counters.infeasible_labels.fetch_add(1, Ordering::Relaxed);
        }

        label
    }

    pub fn data_loss(&self) -> DataLossReport {
        self.counters.snapshot()
    }

    pub fn reset_data_loss(&self) {
        self.counters.reset()
    }
}

/// Shortest input able to emit `label` under CTC: one step per
/// symbol plus a separating blank between equal neighbours.
pub fn min_ctc_timesteps(label: &[usize]) -> usize {
    let repeats = label.windows(2).filter(|w| w[0] == w[1]).count();
    label.len() + repeats
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use rand::{rngs::StdRng, SeedableRng};

    fn pipeline(max_text_len: usize, timesteps: usize) -> SamplePipeline {
        SamplePipeline::new(
            ImageNormalizer::new(16, 32).unwrap(),
            Arc::new(Vocabulary::new("কখ").unwrap()),
            max_text_len,
            timesteps,
        )
    }

    #[test]
    fn test_min_ctc_timesteps() {
        assert_eq!(min_ctc_timesteps(&[]), 0);
        assert_eq!(min_ctc_timesteps(&[0, 1, 0]), 3);
        assert_eq!(min_ctc_timesteps(&[0, 0, 1, 1]), 6);
    }

    #[test]
    fn test_label_losses_are_counted() {
        let p = pipeline(3, 4);
        let label = p.encode_label("কxখখকখ");
        assert_eq!(label.length, 3);
        assert_eq!(label.indices, vec![0, 1, 1]);

        let report = p.data_loss();
        assert_eq!(report.oov_characters, 1);
        assert_eq!(report.truncated_labels, 1);
        // [0, 1, 1] needs 4 steps: fits
        assert_eq!(report.infeasible_labels, 0);

        p.encode_label("ককক");
        assert_eq!(p.data_loss().infeasible_labels, 1);

        p.reset_data_loss();
        assert!(p.data_loss().is_clean());
    }

    #[test]
    fn test_missing_image_is_skipped_and_counted() {
        let p      = pipeline(4, 8);
        let dir    = tempfile::tempdir().unwrap();
        let sample = Sample::new("missing.png", "ক");

        assert!(p.prepare(&sample, dir.path(), &mut StdRng::seed_from_u64(0)).is_none());
        assert_eq!(p.data_loss().unreadable_images, 1);
    }

    #[test]
    fn test_prepared_sample_has_fixed_shapes() {
        let p   = pipeline(4, 8);
        let dir = tempfile::tempdir().unwrap();
        GrayImage::from_pixel(90, 20, Luma([128])).save(dir.path().join("a.png")).unwrap();

        let prepared = p
            .prepare(&Sample::new("a.png", "কখ"), dir.path(), &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(prepared.image.shape(), [16, 32, 1]);
        assert_eq!(prepared.label.indices, vec![0, 1, 0, 0]);
        assert_eq!(prepared.label.length, 2);
    }
}
