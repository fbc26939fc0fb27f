// ============================================================
// Layer 5: Inferencer
// ============================================================
// Rebuilds a trained classifier from its checkpoint directory
// and scores new text:
//
//   model_config.json + model_epoch_N.mpk → TransformerClassifier
//   train_config.json                     → max_seq_len
//   categories.json                       → index → category name
//   tokenizer (passed in)                 → TextEncoder
//
// Scores are turned into probabilities with a softmax over the
// category axis; the prediction is the most probable category.

use anyhow::{Context, Result};
use burn::{prelude::*, tensor::activation::softmax};
use tokenizers::Tokenizer;

use crate::data::encoder::TextEncoder;
use crate::domain::{traits::TextClassifier, vocabulary::CategoryVocabulary};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{SequenceClassifier, TransformerClassifier, TransformerClassifierConfig};

/// One scored piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub category:      String,
    pub index:         usize,
    pub probability:   f32,
    /// One probability per category, in vocabulary order
    pub probabilities: Vec<f32>,
}

pub struct Inferencer<B: Backend> {
    model:      TransformerClassifier<B>,
    encoder:    TextEncoder,
    vocabulary: CategoryVocabulary,
    device:     B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        tokenizer:    Tokenizer,
        device:       B::Device,
    ) -> Result<Self> {
        let train_cfg  = ckpt_manager.load_config()?;
        let vocabulary = ckpt_manager.load_vocabulary()?;
        let model_cfg  = TransformerClassifierConfig {
            dropout:         0.0,
            encoder_dropout: 0.0,
            ..ckpt_manager.load_model_config()?
        };

        anyhow::ensure!(
            model_cfg.num_classes == vocabulary.len(),
            "Checkpoint has {} output classes but {} categories",
            model_cfg.num_classes,
            vocabulary.len()
        );

        let encoder = TextEncoder::new(tokenizer, train_cfg.max_seq_len)?;
        anyhow::ensure!(
            encoder.id_space() <= model_cfg.vocab_size,
            "Tokenizer produces ids up to {} but the model embeds only {}. Wrong tokenizer?",
            encoder.id_space(),
            model_cfg.vocab_size
        );

        let model: TransformerClassifier<B> = model_cfg.init(&device);
        let model = ckpt_manager.load_model::<B, _>(model, &device)?;
        tracing::info!("Model loaded from checkpoint ({} categories)", vocabulary.len());

        Ok(Self { model, encoder, vocabulary, device })
    }

    pub fn predict(&self, text: &str) -> Result<Prediction> {
        let encoded = self.encoder.encode(text)?;
        let seq_len = encoded.input_ids.len();

        let to_tensor = |values: &[u32]| {
            let flat: Vec<i32> = values.iter().map(|&v| v as i32).collect();
            Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape([1, seq_len])
        };
        let input_ids      = to_tensor(&encoded.input_ids);
        let attention_mask = to_tensor(&encoded.attention_mask);

        let scores = self.model.classify(input_ids, attention_mask);
        let probabilities: Vec<f32> = softmax(scores, 1)
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow::anyhow!("Cannot read probabilities: {e:?}"))?;

        let (index, probability) = probabilities
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .context("Model returned no scores")?;

        let category = self
            .vocabulary
            .name_of(index)
            .with_context(|| format!("Class index {index} has no category"))?
            .to_string();

        tracing::debug!("Predicted '{}' (p={:.4})", category, probability);
        Ok(Prediction { category, index, probability, probabilities })
    }

    pub fn vocabulary(&self) -> &CategoryVocabulary {
        &self.vocabulary
    }
}

impl<B: Backend> TextClassifier for Inferencer<B> {
    fn classify(&self, text: &str) -> Result<(String, f32)> {
        let p = self.predict(text)?;
        Ok((p.category, p.probability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::infra::tokenizer_store::build_word_level;

    type TestBackend = burn::backend::NdArray;

    fn checkpoint_with_tiny_model(dir: &std::path::Path) -> (CheckpointManager, Tokenizer) {
        let texts: Vec<String> = ["stocks fell sharply", "the team won the match"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let tokenizer = build_word_level(&texts, 50).unwrap();
        let id_space  = TextEncoder::new(tokenizer.clone(), 8).unwrap().id_space();

        let ckpt  = CheckpointManager::new(dir).unwrap();
        let vocab = CategoryVocabulary::from_labels(["business", "sport", "tech"]);
        let cfg   = TrainConfig { max_seq_len: 8, ..TrainConfig::default() };
        let model_cfg = TransformerClassifierConfig::new(id_space, 8, 8, 2, 1, 16, vocab.len(), 0.1);

        let model: TransformerClassifier<TestBackend> = model_cfg.init(&Default::default());
        ckpt.save_config(&cfg).unwrap();
        ckpt.save_vocabulary(&vocab).unwrap();
        ckpt.save_model_config(&model_cfg).unwrap();
        ckpt.save_model::<TestBackend, _>(&model, 1).unwrap();

        (ckpt, tokenizer)
    }

    #[test]
    fn test_prediction_is_a_distribution_over_categories() {
        let dir = tempfile::tempdir().unwrap();
        let (ckpt, tokenizer) = checkpoint_with_tiny_model(dir.path());

        let inferencer =
            Inferencer::<TestBackend>::from_checkpoint(&ckpt, tokenizer, Default::default()).unwrap();
        let p = inferencer.predict("stocks won the match").unwrap();

        assert_eq!(p.probabilities.len(), 3);
        let total: f32 = p.probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert_eq!(inferencer.vocabulary().name_of(p.index), Some(p.category.as_str()));
        assert!(p.probabilities.iter().all(|&q| q <= p.probability));
    }

    #[test]
    fn test_classify_trait_matches_predict() {
        let dir = tempfile::tempdir().unwrap();
        let (ckpt, tokenizer) = checkpoint_with_tiny_model(dir.path());
        let inferencer =
            Inferencer::<TestBackend>::from_checkpoint(&ckpt, tokenizer, Default::default()).unwrap();

        let (category, probability) = inferencer.classify("stocks fell").unwrap();
        let p = inferencer.predict("stocks fell").unwrap();
        assert_eq!(category, p.category);
        assert!((probability - p.probability).abs() < 1e-6);
    }

    #[test]
    fn test_mismatched_category_count_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (ckpt, tokenizer) = checkpoint_with_tiny_model(dir.path());
        ckpt.save_vocabulary(&CategoryVocabulary::from_labels(["only"])).unwrap();

        let result = Inferencer::<TestBackend>::from_checkpoint(&ckpt, tokenizer, Default::default());
        assert!(result.is_err());
    }
}
