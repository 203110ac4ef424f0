// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// All tensor math lives here. Other layers hand in host data
// (PreparedSample batches, image bytes) and get host data back
// (losses, decoded text).
//
//   model.rs      - CRNN: conv stack → BiLSTM ×2 → per-step classes
//   ctc.rs        - CTC alignment loss, log-space forward recursion
//   decoder.rs    - greedy best-path decoding (collapse, drop blank)
//   trainer.rs    - epoch loop, Adam, plateau scheduling,
//                   validation CER/accuracy, checkpointing
//   inferencer.rs - checkpoint loading and single-image prediction
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// CRNN architecture
pub mod model;

/// CTC loss
pub mod ctc;

/// Greedy CTC decoding
pub mod decoder;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Inference engine - loads checkpoint and recognises images
pub mod inferencer;
