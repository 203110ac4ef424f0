// ============================================================
// Layer 4 - Split Dataset
// ============================================================
// One split's samples paired with the directory their image paths
// resolve against, exposed through Burn's `Dataset` trait.
//
// Reference: Burn Book §3 (Dataset)

use burn::data::dataset::Dataset;
use std::path::{Path, PathBuf};

use crate::domain::sample::Sample;

/// The samples of one split plus the directory their image paths
/// are relative to.
#[derive(Debug, Clone)]
pub struct OcrDataset {
    dir:     PathBuf,
    samples: Vec<Sample>,
}

impl OcrDataset {
    pub fn new(dir: impl Into<PathBuf>, samples: Vec<Sample>) -> Self {
        Self { dir: dir.into(), samples }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl Dataset<Sample> for OcrDataset {
    fn get(&self, index: usize) -> Option<Sample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> OcrDataset {
        OcrDataset::new(
            "data/train",
            vec![Sample::new("a.png", "কখ"), Sample::new("b.png", "গ")],
        )
    }

    #[test]
    fn test_get_by_index() {
        let ds = dataset();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.sample_count(), 2);
        assert_eq!(ds.get(1), Some(Sample::new("b.png", "গ")));
        assert_eq!(ds.get(2), None);
    }

    #[test]
    fn test_images_resolve_against_split_dir() {
        let ds     = dataset();
        let sample = ds.get(0).unwrap();
        assert_eq!(ds.dir(), Path::new("data/train"));
        assert_eq!(sample.image_path(ds.dir()), Path::new("data/train/a.png"));
    }

    #[test]
    fn test_empty_split() {
        let ds = OcrDataset::new("data/val", Vec::new());
        assert!(ds.is_empty());
        assert_eq!(ds.get(0), None);
    }
}
