// ============================================================
// Layer 4 - Train/Validation Splitter
// ============================================================
// Used only when a dataset ships without its own val/ manifest:
// the training samples are shuffled with a seeded rng and the
// tail becomes the validation set.
//
// Shuffling first matters here. Manifests are usually written in
// the order files were scanned, so consecutive samples tend to
// share a writer; taking the tail unshuffled would validate on a
// handful of writers only.
//
// At least one sample stays on the training side whenever the
// input is non-empty.
//
// Reference: Rust Book §8 (Vectors)
//            rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation),
/// where validation holds `val_fraction` of the samples (rounded).
pub fn split_train_val<T>(mut samples: Vec<T>, val_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let val_len  = ((total as f64) * val_fraction.clamp(0.0, 1.0)).round() as usize;
    let split_at = total.saturating_sub(val_len).max(total.min(1));

    let val = samples.split_off(split_at);

    tracing::info!(
        "Held out {} of {} training samples for validation",
        val.len(),
        total
    );

    (samples, val)
}
