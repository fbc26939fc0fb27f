// ============================================================
// Layer 2: Classify Use Case
// ============================================================
// Loads everything a finished training run left in its
// checkpoint directory and assigns a category to new text.
//
// The concrete model and backend are hidden behind the
// TextClassifier trait once construction is done.

use anyhow::Result;

use crate::domain::traits::TextClassifier;
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::{
    backend::{BackendChoice, ComputeBackend, CpuBackend, GpuBackend},
    inferencer::Inferencer,
};

pub struct ClassifyUseCase {
    classifier: Box<dyn TextClassifier>,
}

impl ClassifyUseCase {
    pub fn new(checkpoint_dir: &str, backend: BackendChoice) -> Result<Self> {
        let ckpt      = CheckpointManager::open(checkpoint_dir)?;
        let tokenizer = TokenizerStore::new(checkpoint_dir).load()?;

        let classifier: Box<dyn TextClassifier> = match ComputeBackend::resolve(backend) {
            ComputeBackend::Wgpu => Box::new(Inferencer::<GpuBackend>::from_checkpoint(
                &ckpt, tokenizer, ComputeBackend::wgpu_device(),
            )?),
            ComputeBackend::Cpu => Box::new(Inferencer::<CpuBackend>::from_checkpoint(
                &ckpt, tokenizer, ComputeBackend::cpu_device(),
            )?),
        };

        Ok(Self { classifier })
    }

    /// Predicted category and its probability.
    pub fn classify(&self, text: &str) -> Result<(String, f32)> {
        anyhow::ensure!(!text.trim().is_empty(), "Nothing to classify: text is empty");
        self.classifier.classify(text)
    }
}
