// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust structs and traits that define what the OCR system
// works with: labelled samples, the character vocabulary, and
// the seams other layers plug into.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Everything here is unit-testable without a GPU or a dataset.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// One labelled (image, text) entry of an annotation manifest
pub mod sample;

// The character vocabulary: text <-> class index codec
pub mod vocabulary;

// Core abstractions (traits) that other layers implement
pub mod traits;
