// ============================================================
// Layer 4 - OCR Batcher
// ============================================================
// Implements Burn's Batcher trait to stack PreparedSamples into
// the tensors one training step consumes.
//
//   Input:  Vec of N PreparedSamples
//             image  H × W × 1 f32 in [0,1]
//             label  max_text_len indices, padded with 0
//   Output: OcrBatch
//             images          [N, 1, H, W]   channels-first for Conv2d
//             targets         [N, L]         Int, padded with 0
//             target_lengths  [N]            Int, genuine label length
//
// The padding value 0 is also a real symbol (the first character
// of the vocabulary), so target_lengths is the only thing that
// tells the loss where a label ends. Never infer length from the
// padding.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::pipeline::PreparedSample;

// ─── OcrBatch ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct OcrBatch<B: Backend> {
    /// Normalized grayscale images - shape: [batch, 1, height, width]
    pub images: Tensor<B, 4>,

    /// Padded label indices - shape: [batch, max_text_len]
    pub targets: Tensor<B, 2, Int>,

    /// Genuine label lengths - shape: [batch]
    pub target_lengths: Tensor<B, 1, Int>,

    /// Genuine label indices per sample, kept on the host for
    /// decoding comparisons (CER, accuracy) without a device read.
    pub target_indices: Vec<Vec<usize>>,
}

impl<B: Backend> OcrBatch<B> {
    pub fn size(&self) -> usize {
        self.target_indices.len()
    }
}

// ─── OcrBatcher ───────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct OcrBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> OcrBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<PreparedSample, OcrBatch<B>> for OcrBatcher<B> {
    /// Callers guarantee a non-empty batch with uniform image and
    /// label shapes (the pipeline produces nothing else).
    fn batch(&self, items: Vec<PreparedSample>) -> OcrBatch<B> {
        let batch_size = items.len();
        let height     = items[0].image.height;
        let width      = items[0].image.width;
        let max_len    = items[0].label.indices.len();

        // ── Images ────────────────────────────────────────────────────────────
        // Each ImageTensor is already row-major H × W, so concatenating
        // them gives exactly the [N, 1, H, W] layout.
        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.image.data.iter().copied())
            .collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, 1, height, width]);

        // ── Labels ────────────────────────────────────────────────────────────
        let targets_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.label.indices.iter().map(|&x| x as i32))
            .collect();

        let lengths: Vec<i32> = items.iter().map(|s| s.label.length as i32).collect();

        let targets = Tensor::<B, 1, Int>::from_ints(targets_flat.as_slice(), &self.device)
            .reshape([batch_size, max_len]);

        let target_lengths = Tensor::<B, 1, Int>::from_ints(lengths.as_slice(), &self.device);

        let target_indices = items.iter().map(|s| s.label.genuine().to_vec()).collect();

        OcrBatch { images, targets, target_lengths, target_indices }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::image::ImageTensor;
    use crate::domain::vocabulary::pad_label;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn prepared(fill: f32, label: &[usize]) -> PreparedSample {
        PreparedSample {
            image: ImageTensor { height: 2, width: 3, data: vec![fill; 6] },
            label: pad_label(label, 4),
        }
    }

    #[test]
    fn test_batch_shapes() {
        let batcher = OcrBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(vec![prepared(0.0, &[1, 2]), prepared(1.0, &[0])]);

        assert_eq!(batch.images.dims(), [2, 1, 2, 3]);
        assert_eq!(batch.targets.dims(), [2, 4]);
        assert_eq!(batch.target_lengths.dims(), [2]);
        assert_eq!(batch.size(), 2);
    }

    #[test]
    fn test_lengths_are_not_inferred_from_padding() {
        let batcher = OcrBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(vec![prepared(0.5, &[0, 0, 3]), prepared(0.5, &[])]);

        let lengths = batch
            .target_lengths
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .unwrap();
        assert_eq!(lengths, vec![3, 0]);
        assert_eq!(batch.target_indices, vec![vec![0, 0, 3], vec![]]);
    }

    #[test]
    fn test_pixels_keep_sample_order() {
        let batcher = OcrBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(vec![prepared(0.25, &[1]), prepared(0.75, &[1])]);

        let means = batch.images.mean_dim(3).mean_dim(2).reshape([2]);
        let means = means.into_data().to_vec::<f32>().unwrap();
        assert!((means[0] - 0.25).abs() < 1e-6);
        assert!((means[1] - 0.75).abs() < 1e-6);
    }
}
