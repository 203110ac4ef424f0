// ============================================================
// Layer 3 - Vocabulary (Text Codec)
// ============================================================
// Bidirectional mapping between characters and class indices.
//
//   symbols:  ['ক', 'খ', ...]      index = position in the list
//   blank:    V = symbols.len()    reserved for CTC, never a target
//   classes:  V + 1                must equal the network's output width
//
// A Vocabulary is an immutable value built once at startup and
// passed by reference to every component that encodes or decodes.
//
// Out-of-vocabulary characters are dropped by default. Setting an
// unknown symbol switches to substitution instead; either way the
// number of affected characters is reported back to the caller.
//
// Labels are padded with PAD_INDEX (0), which is also a genuine
// symbol index. The real label length therefore always travels
// next to the padded array (see PaddedLabel) and is never inferred
// by counting non-zero entries.

use std::collections::HashMap;

use thiserror::Error;

/// Value written into padded label positions
pub const PAD_INDEX: usize = 0;

/// Default Bangla character set: vowels, consonants, nukta and
/// modifiers, vowel signs and hasant, digits, dari, space.
pub const BANGLA_SYMBOLS: &str = concat!(
    "অআইঈউঊঋএঐওঔ",
    "কখগঘঙচছজঝঞটঠডঢণতথদধনপফবভমযরলশষসহ",
    "\u{09BC}\u{09CE}\u{0982}\u{0983}\u{0981}",
    "\u{09BE}\u{09BF}\u{09C0}\u{09C1}\u{09C2}\u{09C3}\u{09C7}\u{09C8}\u{09CB}\u{09CC}\u{09CD}",
    "০১২৩৪৫৬৭৮৯",
    "\u{0964} ",
);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("vocabulary must contain at least one symbol")]
    Empty,

    #[error("unknown symbol {0:?} is not part of the vocabulary")]
    UnknownSymbol(char),
}

/// What `encode` does with characters outside the vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OovPolicy {
    /// Skip the character (default)
    Drop,
    /// Replace it with this vocabulary index
    Substitute(usize),
}

/// Result of encoding one text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub indices: Vec<usize>,
    /// Characters that were dropped or substituted
    pub oov: usize,
}

/// A label right-padded (or truncated) to a fixed length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedLabel {
    /// Exactly `max_len` entries
    pub indices: Vec<usize>,
    /// Number of genuine entries at the front of `indices`
    pub length: usize,
    /// True when trailing characters were cut off
    pub truncated: bool,
}

impl PaddedLabel {
    /// The genuine (unpadded) part of the label
    pub fn genuine(&self) -> &[usize] {
        &self.indices[..self.length]
    }
}

#[derive(Debug, Clone)]
pub struct Vocabulary {
    symbols: Vec<char>,
    lookup:  HashMap<char, usize>,
    policy:  OovPolicy,
}

impl Vocabulary {
    /// Build a vocabulary from a symbol string. Repeated characters
    /// keep the index of their first occurrence.
    pub fn new(symbols: &str) -> Result<Self, VocabularyError> {
        let vocab = Self::build(symbols);
        if vocab.is_empty() {
            return Err(VocabularyError::Empty);
        }
        Ok(vocab)
    }

    /// The default Bangla vocabulary
    pub fn bangla() -> Self {
        Self::build(BANGLA_SYMBOLS)
    }

    fn build(symbols: &str) -> Self {
        let mut ordered = Vec::new();
        let mut lookup  = HashMap::new();

        for c in symbols.chars() {
            if !lookup.contains_key(&c) {
                lookup.insert(c, ordered.len());
                ordered.push(c);
            }
        }

        Self { symbols: ordered, lookup, policy: OovPolicy::Drop }
    }

    /// Substitute out-of-vocabulary characters with `symbol`
    /// instead of dropping them.
    pub fn with_unknown_symbol(mut self, symbol: char) -> Result<Self, VocabularyError> {
        let index = self
            .index_of(symbol)
            .ok_or(VocabularyError::UnknownSymbol(symbol))?;
        self.policy = OovPolicy::Substitute(index);
        Ok(self)
    }

    /// Number of symbols, V
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Index of the CTC blank class (V)
    pub fn blank_index(&self) -> usize {
        self.symbols.len()
    }

    /// Symbols plus blank (V + 1)
    pub fn num_classes(&self) -> usize {
        self.symbols.len() + 1
    }

    pub fn index_of(&self, c: char) -> Option<usize> {
        self.lookup.get(&c).copied()
    }

    pub fn symbol(&self, index: usize) -> Option<char> {
        self.symbols.get(index).copied()
    }

    /// Map each character to its index, applying the OOV policy
    pub fn encode(&self, text: &str) -> Vec<usize> {
        self.encode_with_stats(text).indices
    }

    pub fn encode_with_stats(&self, text: &str) -> Encoded {
        let mut indices = Vec::with_capacity(text.len());
        let mut oov     = 0usize;

        for c in text.chars() {
            match (self.index_of(c), self.policy) {
                (Some(i), _) => indices.push(i),
                (None, OovPolicy::Drop) => oov += 1,
                (None, OovPolicy::Substitute(unknown)) => {
                    oov += 1;
                    indices.push(unknown);
                }
            }
        }

        Encoded { indices, oov }
    }

    /// Map indices back to text. Indices outside [0, V-1],
    /// including blank, are skipped.
    pub fn decode(&self, indices: &[usize]) -> String {
        indices.iter().filter_map(|&i| self.symbol(i)).collect()
    }
}

/// Truncate `indices` to `max_len` and right-pad with PAD_INDEX.
pub fn pad_label(indices: &[usize], max_len: usize) -> PaddedLabel {
    let length    = indices.len().min(max_len);
    let truncated = indices.len() > max_len;

    let mut padded = Vec::with_capacity(max_len);
    padded.extend_from_slice(&indices[..length]);
    padded.resize(max_len, PAD_INDEX);

    PaddedLabel { indices: padded, length, truncated }
}
