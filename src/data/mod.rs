// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from an annotation manifest on disk to tensor
// batches on the training device:
//
//   annotations.json
//       │
//       ▼
//   ManifestLoader    → Vec<Sample>
//       │
//       ▼
//   OcrDataset        → burn Dataset over the samples of one split
//       │
//       ▼
//   SamplePipeline    → ImageNormalizer + Augmenter + Vocabulary
//       │                (one PreparedSample per readable image)
//       ▼
//   OcrBatcher        → stacks PreparedSamples into an OcrBatch
//       │
//       ▼
//   BatchGenerator    → epoch order, batch slicing, reshuffle
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads annotations.json from a split directory
pub mod loader;

/// Decode, grayscale, resize and rescale images
pub mod image;

/// Training-time image perturbations
pub mod augment;

/// Implements Burn's Dataset trait for OCR samples
pub mod dataset;

/// Per-sample processing and data-loss counters
pub mod pipeline;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Epoch-level batching with explicit reshuffle
pub mod generator;

/// Holds out a validation set when none is provided
pub mod splitter;
