// ============================================================
// Layer 4 - Batch Generator
// ============================================================
// Epoch-level view of one split: a fixed list of samples, a
// permutation over them, and a batch size.
//
//   order      [7, 2, 9, 0, 4, 1, 8, 3, 6, 5]   (after reshuffle)
//   batch 0     └──────┘                         samples 7 2 9 0
//   batch 1                 └──────┘             samples 4 1 8 3
//   batch 2                             └──┘     samples 6 5
//
// len()        = ceil(samples / batch_size)
// get_batch(i) = prepare every sample of slice i in parallel,
//                drop the ones whose image failed, collate the rest
//
// Shuffling is explicit: the training loop calls reshuffle() once
// at each epoch boundary. It takes &mut self while get_batch takes
// &self, so the permutation can never change under a batch that is
// still being assembled.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            rayon documentation (par_iter)

use burn::{data::dataloader::batcher::Batcher, data::dataset::Dataset, prelude::*};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rayon::prelude::*;

use crate::data::batcher::{OcrBatch, OcrBatcher};
use crate::data::dataset::OcrDataset;
use crate::data::pipeline::{DataLossReport, PreparedSample, SamplePipeline};

pub struct BatchGenerator<B: Backend> {
    dataset:    OcrDataset,
    pipeline:   SamplePipeline,
    batcher:    OcrBatcher<B>,
    batch_size: usize,
    order:      Vec<usize>,
    rng:        StdRng,
}

impl<B: Backend> BatchGenerator<B> {
    /// Samples start in manifest order; call `reshuffle` to permute.
    /// A zero batch size is treated as one.
    pub fn new(
        dataset:    OcrDataset,
        pipeline:   SamplePipeline,
        batch_size: usize,
        device:     B::Device,
        seed:       u64,
    ) -> Self {
        let order = (0..dataset.len()).collect();
        Self {
            dataset,
            pipeline,
            batcher: OcrBatcher::new(device),
            batch_size: batch_size.max(1),
            order,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Number of batches per epoch
    pub fn len(&self) -> usize {
        self.order.len().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn pipeline(&self) -> &SamplePipeline {
        &self.pipeline
    }

    /// Permute the sample order for the next epoch
    pub fn reshuffle(&mut self) {
        self.order.shuffle(&mut self.rng);
    }

    /// Sample indices of batch `i` in the current order
    pub fn slice(&self, i: usize) -> &[usize] {
        let start = (i * self.batch_size).min(self.order.len());
        let end   = (start + self.batch_size).min(self.order.len());
        &self.order[start..end]
    }

    /// Assemble batch `i`. None when `i` is out of range or when
    /// every image in the slice failed to load.
    pub fn get_batch(&self, i: usize) -> Option<OcrBatch<B>> {
        if i >= self.len() {
            return None;
        }

        let dir = self.dataset.dir();
        let prepared: Vec<PreparedSample> = self
            .slice(i)
            .par_iter()
            .filter_map(|&idx| {
                let sample = self.dataset.get(idx)?;
                self.pipeline.prepare(&sample, dir, &mut rand::thread_rng())
            })
            .collect();

        let dropped = self.slice(i).len() - prepared.len();
        if dropped > 0 {
            tracing::debug!("Batch {i}: {dropped} sample(s) skipped (unreadable image)");
        }
        if prepared.is_empty() {
            return None;
        }

        Some(self.batcher.batch(prepared))
    }

    /// Losses accumulated since construction or the last reset
    pub fn data_loss(&self) -> DataLossReport {
        self.pipeline.data_loss()
    }

    pub fn reset_data_loss(&self) {
        self.pipeline.reset_data_loss()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::image::ImageNormalizer;
    use crate::domain::{sample::Sample, vocabulary::Vocabulary};
    use burn::backend::NdArray;
    use image::{GrayImage, Luma};
    use std::{path::Path, sync::Arc};

    type TestBackend = NdArray;

    fn write_images(dir: &Path, n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let name = format!("{i}.png");
                GrayImage::from_pixel(20, 8, Luma([(i * 20) as u8]))
                    .save(dir.join(&name))
                    .unwrap();
                Sample::new(name, "কখ")
            })
            .collect()
    }

    fn generator(dir: &Path, samples: Vec<Sample>, batch_size: usize) -> BatchGenerator<TestBackend> {
        let pipeline = SamplePipeline::new(
            ImageNormalizer::new(8, 16).unwrap(),
            Arc::new(Vocabulary::new("কখ").unwrap()),
            4,
            2,
        );
        BatchGenerator::new(
            OcrDataset::new(dir, samples),
            pipeline,
            batch_size,
            Default::default(),
            42,
        )
    }

    #[test]
    fn test_ten_samples_batch_four() {
        let dir     = tempfile::tempdir().unwrap();
        let samples = write_images(dir.path(), 10);
        let gen     = generator(dir.path(), samples, 4);

        assert_eq!(gen.len(), 3);
        let sizes: Vec<usize> = (0..gen.len()).map(|i| gen.get_batch(i).unwrap().size()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert!(gen.get_batch(3).is_none());
    }

    #[test]
    fn test_missing_image_shrinks_batch() {
        let dir         = tempfile::tempdir().unwrap();
        let mut samples = write_images(dir.path(), 4);
        samples[2]      = Sample::new("gone.png", "ক");
        let gen         = generator(dir.path(), samples, 4);

        let batch = gen.get_batch(0).unwrap();
        assert_eq!(batch.size(), 3);
        assert_eq!(batch.images.dims(), [3, 1, 8, 16]);
        assert_eq!(gen.data_loss().unreadable_images, 1);
    }

    #[test]
    fn test_all_missing_gives_no_batch() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(dir.path(), vec![Sample::new("x.png", "ক")], 4);
        assert!(gen.get_batch(0).is_none());
    }

    #[test]
    fn test_reshuffle_is_a_permutation() {
        let dir     = tempfile::tempdir().unwrap();
        let mut gen = generator(dir.path(), vec![Sample::new("x.png", "ক"); 50], 8);

        let before: Vec<usize> = (0..gen.len()).flat_map(|i| gen.slice(i).to_vec()).collect();
        gen.reshuffle();
        let mut after: Vec<usize> = (0..gen.len()).flat_map(|i| gen.slice(i).to_vec()).collect();

        assert_ne!(before, after);
        after.sort_unstable();
        assert_eq!(before, after);
    }

    #[test]
    fn test_empty_split() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(dir.path(), Vec::new(), 4);
        assert!(gen.is_empty());
        assert_eq!(gen.len(), 0);
        assert!(gen.get_batch(0).is_none());
    }
}
