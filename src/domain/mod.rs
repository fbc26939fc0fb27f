// ============================================================
// Layer 3: Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that define the core
// concepts of the system. No Burn types, no file I/O.
//
//   record.rs     - one labelled row of the source table
//   vocabulary.rs - category name <-> dense index mapping
//   error.rs      - typed data errors
//   traits.rs     - abstractions other layers implement
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

pub mod error;
pub mod record;
pub mod traits;
pub mod vocabulary;
