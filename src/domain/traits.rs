// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits instead of
// concrete types:
//
//   - ManifestLoader implements SampleSource
//   - Inferencer     implements TextRecognizer
//
// The HTTP layer only sees `dyn TextRecognizer`, so handlers can
// be exercised with a stub recogniser and no trained model.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use std::path::Path;

use crate::domain::sample::Sample;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can produce labelled samples.
pub trait SampleSource {
    /// Load every available sample. A missing source yields an
    /// empty Vec, not an error.
    fn load_all(&self) -> Result<Vec<Sample>>;
}

// ─── Recognition ──────────────────────────────────────────────────────────────
/// Text recognised from one image
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// Mean probability of the emitted characters, in [0, 1]
    pub confidence: f32,
}

/// Any component that turns a single handwriting image into text.
pub trait TextRecognizer {
    fn recognize_path(&self, path: &Path) -> Result<Recognition>;

    fn recognize_bytes(&self, bytes: &[u8]) -> Result<Recognition>;
}
