// ============================================================
// Layer 4 - Annotation Manifest Loader
// ============================================================
// Loads `annotations.json` from a dataset split directory:
//
//   data/
//     train/
//       annotations.json   [{"image": "a.jpg", "text": "..."}, ...]
//       a.jpg
//       ...
//     val/
//       annotations.json
//
// Image paths in the manifest are relative to the split directory.
//
// A missing manifest is NOT an error here: it simply means zero
// samples. Whether zero samples is acceptable is decided by the
// caller (training aborts, inspection just reports it).
// A manifest that exists but does not parse IS an error.
//
// Reference: serde_json documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::sample::Sample;
use crate::domain::traits::SampleSource;

/// File name of the manifest inside each split directory
pub const MANIFEST_FILE: &str = "annotations.json";

/// Loads the annotation manifest of one split directory.
/// Implements the SampleSource trait from Layer 3.
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    /// Split directory, e.g. data/train
    dir: PathBuf,
}

impl ManifestLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }
}

impl SampleSource for ManifestLoader {
    fn load_all(&self) -> Result<Vec<Sample>> {
        let path = self.manifest_path();

        if !path.exists() {
            tracing::warn!(
                "Manifest '{}' does not exist - treating split as empty",
                path.display()
            );
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read manifest '{}'", path.display()))?;

        let samples: Vec<Sample> = serde_json::from_str(&json)
            .with_context(|| format!("Malformed manifest '{}'", path.display()))?;

        tracing::info!("Loaded {} samples from '{}'", samples.len(), path.display());
        Ok(samples)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_manifest_is_empty() {
        let dir     = tempfile::tempdir().unwrap();
        let samples = ManifestLoader::new(dir.path()).load_all().unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_loads_entries_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"[{"image": "1.png", "text": "ক"}, {"image": "2.png", "text": "খ"}]"#,
        )
        .unwrap();

        let samples = ManifestLoader::new(dir.path()).load_all().unwrap();
        assert_eq!(samples, vec![Sample::new("1.png", "ক"), Sample::new("2.png", "খ")]);
    }

    #[test]
    fn test_malformed_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "{not json").unwrap();
        assert!(ManifestLoader::new(dir.path()).load_all().is_err());
    }
}
