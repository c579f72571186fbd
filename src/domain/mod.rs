// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits that define what the system
// works with: the vocabulary, corpus rows, the description
// state owned by the web layer, and the error taxonomy.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// One (slides, summary, reflection) training row
pub mod corpus_row;

// Absent / placeholder / finalized description field
pub mod description;

// Error taxonomy shared by every layer
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;

// Token <-> id mapping with reserved special tokens
pub mod vocabulary;
