// ============================================================
// Layer 5 - Greedy CTC Decoder
// ============================================================
// Best-path decoding of one [T, C] probability matrix:
//
//   argmax per step   a a - b b b - a
//   collapse repeats  a   - b     - a
//   drop blanks       a     b       a   →  Vocabulary::decode
//
// Runs on host memory (a row-major f32 slice) so it is independent
// of the backend; the inferencer reads the softmax output back
// once and hands it over.
//
// Confidence is the mean winning probability over the steps that
// actually emitted a symbol, 0.0 when nothing was emitted.
//
// Reference: Graves et al. (2006) §3.2 best path decoding

use crate::domain::vocabulary::Vocabulary;

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub text:       String,
    pub indices:    Vec<usize>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct GreedyDecoder {
    blank: usize,
}

impl GreedyDecoder {
    pub fn new(blank: usize) -> Self {
        Self { blank }
    }

    /// Winning (class, probability) at each of the `steps` rows of a
    /// row-major `[steps, classes]` matrix.
    pub fn best_path(&self, probs: &[f32], steps: usize, classes: usize) -> Vec<(usize, f32)> {
        if classes == 0 {
            return Vec::new();
        }

        probs
            .chunks_exact(classes)
            .take(steps)
            .map(|row| {
                row.iter()
                    .copied()
                    .enumerate()
                    .fold((self.blank, f32::NEG_INFINITY), |best, (i, p)| {
                        if p > best.1 { (i, p) } else { best }
                    })
            })
            .collect()
    }

    /// Merge runs of the same class, then remove blanks
    pub fn collapse(&self, path: &[usize]) -> Vec<usize> {
        let mut out  = Vec::new();
        let mut prev = None;
        for &idx in path {
            if prev != Some(idx) && idx != self.blank {
                out.push(idx);
            }
            prev = Some(idx);
        }
        out
    }

    pub fn decode(&self, vocabulary: &Vocabulary, probs: &[f32], steps: usize, classes: usize) -> Decoded {
        let path = self.best_path(probs, steps, classes);

        let mut indices = Vec::new();
        let mut scores  = Vec::new();
        let mut prev    = None;
        for &(idx, p) in &path {
            if prev != Some(idx) && idx != self.blank {
                indices.push(idx);
                scores.push(p);
            }
            prev = Some(idx);
        }

        let confidence = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f32>() / scores.len() as f32
        };

        Decoded {
            text: vocabulary.decode(&indices),
            indices,
            confidence,
        }
    }
}
