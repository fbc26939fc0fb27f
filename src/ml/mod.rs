// ============================================================
// Layer 5: ML / Model Layer (Burn)
// ============================================================
// All model, optimiser and backend code lives here. The data
// layer only builds tensors through the Batcher; nothing above
// this layer touches a Burn module directly.
//
//   model.rs      - BERT-shaped encoder with a classification
//                   head, behind the SequenceClassifier trait
//
//   backend.rs    - picks Wgpu or NdArray once per run
//
//   trainer.rs    - the generic epoch loop: shuffled training,
//                   validation, per-epoch summary, test scoring
//
//   inferencer.rs - rebuilds a checkpoint and classifies text
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Devlin et al. (2019) BERT

/// Transformer sequence classifier
pub mod model;

/// Compute backend selection with GPU detection
pub mod backend;

/// Generic training loop with validation and checkpointing
pub mod trainer;

/// Inference engine: loads a checkpoint and predicts categories
pub mod inferencer;
