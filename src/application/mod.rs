// ============================================================
// Layer 2: Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// goal each: fine-tuning a classifier, or classifying text
// with a finished checkpoint.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No clap types here (that's Layer 1)
//   - Only workflow coordination and the console report
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The fine-tuning workflow
pub mod train_use_case;

// The inference workflow
pub mod classify_use_case;
