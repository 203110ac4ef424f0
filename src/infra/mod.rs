// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Persistence shared by training and inference:
//
//   checkpoint.rs - model weights (Burn CompactRecorder), the
//                   training config as JSON, best-epoch metadata.
//                   Inference rebuilds the model from these alone.
//
//   metrics.rs    - one CSV row per epoch (losses, CER, accuracy,
//                   learning rate) for plotting learning curves.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
