// ============================================================
// Layer 3 - Sample Domain Type
// ============================================================
// One entry of an `annotations.json` manifest:
//
//   [{"image": "img_001.jpg", "text": "বাংলা"}, ...]
//
// `image` is a file name relative to the directory the manifest
// lives in; `text` is the transcription, arbitrary length.
//
// Reference: Rust Book §5 (Structs and Methods)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A labelled handwriting sample as written in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Image file name, relative to the split directory
    pub image: String,

    /// Ground-truth transcription
    pub text: String,
}

impl Sample {
    /// Create a new Sample.
    ///
    /// Example:
    ///   let s = Sample::new("img_001.png", "আমার");
    pub fn new(image: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            text:  text.into(),
        }
    }

    /// Resolve the image path against the split directory
    pub fn image_path(&self, split_dir: &Path) -> PathBuf {
        split_dir.join(&self.image)
    }

    /// Length of the transcription in Unicode scalar values
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
