// ============================================================
// Layer 6: Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several other layers:
//
//   checkpoint.rs      - model weights (Burn CompactRecorder),
//                        train config and category vocabulary
//                        as JSON
//
//   tokenizer_store.rs - resolves, builds and persists the
//                        tokenizer so training and inference
//                        share one vocabulary
//
//   metrics.rs         - per-epoch loss/accuracy totals, the
//                        console summary line and metrics.csv
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer resolution, saving, and loading
pub mod tokenizer_store;

/// Epoch metrics and CSV logger
pub mod metrics;
