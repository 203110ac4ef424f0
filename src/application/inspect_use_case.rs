// ============================================================
// Layer 2 - InspectUseCase
// ============================================================
// Audits the dataset before a long training run. For every split
// directory (train/, val/, test/) it reports:
//
//   - how many samples the manifest lists
//   - images that are missing or whose header does not decode
//   - empty or placeholder transcriptions left by auto-labelling
//   - suspiciously short transcriptions
//   - average transcription length
//   - characters the vocabulary would drop or substitute
//   - labels that would be cut at max_text_len
//   - share of characters from the Bangla Unicode block
//
// Nothing is modified; this only reads manifests and image headers.

use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::data::loader::ManifestLoader;
use crate::domain::{sample::Sample, traits::SampleSource, vocabulary::Vocabulary};

/// Split directories inspected, in report order
pub const SPLITS: [&str; 3] = ["train", "val", "test"];

/// Transcriptions written by labelling tools when they had nothing
pub const PLACEHOLDER_TEXTS: [&str; 3] = ["NO_TEXT_DETECTED", "ERROR", "LABEL_NEEDED"];

const SHORT_TEXT_CHARS: usize = 3;

const BANGLA_BLOCK: std::ops::RangeInclusive<char> = '\u{0980}'..='\u{09FF}';

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SplitReport {
    pub split:              String,
    pub manifest_found:     bool,
    pub samples:            usize,
    pub missing_images:     usize,
    pub undecodable_images: usize,
    /// Empty text or one of PLACEHOLDER_TEXTS
    pub placeholder_texts:  usize,
    pub short_texts:        usize,
    /// Mean transcription length in characters
    pub avg_text_len:       f64,
    pub oov_characters:     usize,
    pub truncated_labels:   usize,
    /// Bangla-block characters over all characters, 0 when there is no text
    pub bangla_fraction:    f64,
}

impl SplitReport {
    /// Samples that cannot contribute anything to training
    pub fn unusable(&self) -> usize {
        self.missing_images + self.undecodable_images + self.placeholder_texts
    }
}

impl fmt::Display for SplitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.manifest_found {
            return write!(f, "{}: no annotations.json", self.split);
        }

        let pct = |n: usize| {
            if self.samples == 0 { 0.0 } else { 100.0 * n as f64 / self.samples as f64 }
        };

        writeln!(f, "{}: {} samples", self.split, self.samples)?;
        writeln!(f, "  missing images:     {:>6}", self.missing_images)?;
        writeln!(f, "  undecodable images: {:>6}", self.undecodable_images)?;
        writeln!(
            f,
            "  placeholder texts:  {:>6} ({:.1}%)",
            self.placeholder_texts,
            pct(self.placeholder_texts)
        )?;
        writeln!(
            f,
            "  short texts (<{SHORT_TEXT_CHARS}):   {:>6} ({:.1}%)",
            self.short_texts,
            pct(self.short_texts)
        )?;
        writeln!(f, "  average length:     {:>6.1} chars", self.avg_text_len)?;
        writeln!(f, "  OOV characters:     {:>6}", self.oov_characters)?;
        writeln!(f, "  truncated labels:   {:>6}", self.truncated_labels)?;
        write!(f, "  Bangla characters:  {:>5.1}%", 100.0 * self.bangla_fraction)
    }
}

enum ImageStatus {
    Ok,
    Missing,
    Undecodable,
}

pub struct InspectUseCase {
    data_dir:     PathBuf,
    vocabulary:   Vocabulary,
    max_text_len: usize,
}

impl InspectUseCase {
    pub fn new(data_dir: impl Into<PathBuf>, vocabulary: Vocabulary, max_text_len: usize) -> Self {
        Self { data_dir: data_dir.into(), vocabulary, max_text_len }
    }

    pub fn execute(&self) -> Result<Vec<SplitReport>> {
        SPLITS.iter().map(|split| self.inspect_split(split)).collect()
    }

    pub fn inspect_split(&self, split: &str) -> Result<SplitReport> {
        let loader = ManifestLoader::new(self.data_dir.join(split));
        let mut report = SplitReport {
            split: split.to_string(),
            manifest_found: loader.manifest_path().exists(),
            ..SplitReport::default()
        };
        if !report.manifest_found {
            return Ok(report);
        }

        let samples = loader.load_all()?;
        report.samples = samples.len();

        // Header-only check, parallel over files
        let statuses: Vec<ImageStatus> = samples
            .par_iter()
            .map(|s| {
                let path = s.image_path(loader.dir());
                if !path.is_file() {
                    ImageStatus::Missing
                } else if !header_decodes(&path) {
                    ImageStatus::Undecodable
                } else {
                    ImageStatus::Ok
                }
            })
            .collect();
        for status in &statuses {
            match status {
                ImageStatus::Ok => {}
                ImageStatus::Missing => report.missing_images += 1,
                ImageStatus::Undecodable => report.undecodable_images += 1,
            }
        }

        let mut total_chars  = 0usize;
        let mut bangla_chars = 0usize;
        for sample in &samples {
            let chars = sample.char_len();
            total_chars  += chars;
            bangla_chars += sample.text.chars().filter(|c| BANGLA_BLOCK.contains(c)).count();

            if is_placeholder(sample) {
                report.placeholder_texts += 1;
            }
            if chars < SHORT_TEXT_CHARS {
                report.short_texts += 1;
            }

            let encoded = self.vocabulary.encode_with_stats(&sample.text);
            report.oov_characters += encoded.oov;
            if encoded.indices.len() > self.max_text_len {
                report.truncated_labels += 1;
            }
        }

        if !samples.is_empty() {
            report.avg_text_len = total_chars as f64 / samples.len() as f64;
        }
        if total_chars > 0 {
            report.bangla_fraction = bangla_chars as f64 / total_chars as f64;
        }

        tracing::debug!("Inspected split '{split}': {} unusable", report.unusable());
        Ok(report)
    }
}

fn is_placeholder(sample: &Sample) -> bool {
    let text = sample.text.trim();
    text.is_empty() || PLACEHOLDER_TEXTS.contains(&text)
}

/// Reads only the header, picking the format from the file contents
/// the same way training does.
fn header_decodes(path: &Path) -> bool {
    image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map(|reader| reader.into_dimensions().is_ok())
        .unwrap_or(false)
}
