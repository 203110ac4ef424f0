// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Each use case orchestrates the other layers for one goal:
// training a model, recognising images, or auditing a dataset.
//
// Rules for this layer:
//   - No tensor math or model code here (Layer 5)
//   - No argument parsing or printing here (Layer 1)
//   - File formats belong to Layers 4 and 6
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// Checkpoint loading and image recognition
pub mod predict_use_case;

// Dataset quality report
pub mod inspect_use_case;
