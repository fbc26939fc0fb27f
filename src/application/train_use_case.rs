// ============================================================
// Layer 2: TrainUseCase
// ============================================================
// Orchestrates the full fine-tuning pipeline in order:
//
//   Step 1: Load the CSV table          (Layer 4 - data)
//   Step 2: Build category vocabulary   (Layer 3 - domain)
//   Step 3: Seeded 80/10/10 split       (Layer 4 - data)
//   Step 4: Resolve tokenizer           (Layer 6 - infra)
//   Step 5: Build the three datasets    (Layer 4 - data)
//   Step 6: Save config + vocabulary    (Layer 6 - infra)
//   Step 7: Pick backend, run training  (Layer 5 - ml)
//
// The vocabulary is built from the WHOLE table before the split,
// so every partition shares one label space.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use std::{path::PathBuf, sync::Arc};

use anyhow::{ensure, Result};
use burn::backend::Autodiff;
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::TextClassificationDataset,
    encoder::TextEncoder,
    loader::{head, CsvLoader},
    splitter::{split_partitions, SplitFractions},
};
use crate::domain::{traits::RecordSource, vocabulary::CategoryVocabulary};
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::{
    backend::{BackendChoice, ComputeBackend, CpuBackend, GpuBackend},
    model::TransformerClassifierConfig,
    trainer::{ensure_compatible_checkpoint, run_training, LoopConfig, TrainingReport},
};

const HEAD_ROWS: usize = 5;

// ─── TrainConfig ──────────────────────────────────────────────────────────────
// All hyperparameters of a run. Saved as train_config.json so
// `classify` can rebuild the encoder with the same settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:      String,
    pub checkpoint_dir: String,
    pub text_column:    String,
    pub label_column:   String,
    /// Pretrained tokenizer.json; built from the data when absent
    pub tokenizer:      Option<String>,
    /// Checkpoint directory to initialise the weights from
    pub init_from:      Option<String>,
    pub max_seq_len:    usize,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub split_seed:     u64,
    pub shuffle_seed:   u64,
    pub d_model:        usize,
    pub num_heads:      usize,
    pub num_layers:     usize,
    pub d_ff:           usize,
    /// Dropout in front of the classification head
    pub dropout:        f64,
    /// Dropout inside the encoder
    pub encoder_dropout: f64,
    pub vocab_size:     usize,
    pub backend:        BackendChoice,
    pub show_progress:  bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:      "data/bbc_text.csv".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            text_column:    "text".to_string(),
            label_column:   "category".to_string(),
            tokenizer:      None,
            init_from:      None,
            max_seq_len:    512,
            batch_size:     2,
            epochs:         5,
            lr:             1e-6,
            split_seed:     42,
            shuffle_seed:   112,
            d_model:        256,
            num_heads:      8,
            num_layers:     6,
            d_ff:           1024,
            dropout:        0.5,
            encoder_dropout: 0.1,
            vocab_size:     30522,
            backend:        BackendChoice::Auto,
            show_progress:  true,
        }
    }
}

impl TrainConfig {
    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            learning_rate: self.lr,
            epochs:        self.epochs,
            batch_size:    self.batch_size,
            shuffle_seed:  self.shuffle_seed,
            show_progress: self.show_progress,
        }
    }

    /// `id_space` is the tokenizer's largest id + 1
    pub fn model_config(&self, id_space: usize, num_classes: usize) -> TransformerClassifierConfig {
        TransformerClassifierConfig::new(
            id_space,
            self.max_seq_len,
            self.d_model,
            self.num_heads,
            self.num_layers,
            self.d_ff,
            num_classes,
            self.dropout,
        )
        .with_encoder_dropout(self.encoder_dropout)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.num_heads > 0 && self.d_model % self.num_heads == 0,
            "d_model ({}) must be divisible by num_heads ({})",
            self.d_model,
            self.num_heads
        );
        for (name, rate) in [("dropout", self.dropout), ("encoder dropout", self.encoder_dropout)] {
            ensure!((0.0..1.0).contains(&rate), "{name} must be in [0, 1) (got {rate})");
        }
        self.loop_config().validate()
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingReport> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Load the table ────────────────────────────────────────────
        let loader  = CsvLoader::new(&cfg.data_path, &cfg.text_column, &cfg.label_column);
        let records = loader.load_all()?;
        println!("{}", head(&records, HEAD_ROWS));

        // ── Step 2: Category vocabulary ───────────────────────────────────────
        let vocabulary = Arc::new(CategoryVocabulary::from_records(&records));
        tracing::info!("{} categories: {:?}", vocabulary.len(), vocabulary.names());

        // ── Step 3: Split 80/10/10 ────────────────────────────────────────────
        let parts = split_partitions(records, SplitFractions::default(), cfg.split_seed);
        let (n_train, n_val, n_test) = parts.sizes();
        println!("{n_train} {n_val} {n_test}");

        // ── Step 4: Tokenizer ─────────────────────────────────────────────────
        // Built from training texts only when no tokenizer is supplied.
        // Initialising from a checkpoint pins its tokenizer and
        // categories, so embedding rows and output rows keep their meaning.
        let init_source = cfg.init_from.as_deref().map(CheckpointManager::open).transpose()?;
        if let Some(source) = &init_source {
            ensure_same_categories(source, &vocabulary)?;
        }

        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let train_texts: Vec<String> = parts.train.iter().map(|r| r.text.clone()).collect();
        let pretrained = match &init_source {
            Some(source) => Some(TokenizerStore::new(source.dir()).path()),
            None => cfg.tokenizer.as_deref().map(PathBuf::from),
        };
        let tokenizer = TokenizerStore::new(&cfg.checkpoint_dir).resolve(
            pretrained.as_deref(),
            &train_texts,
            cfg.vocab_size,
        )?;

        // ── Step 5: Datasets ──────────────────────────────────────────────────
        let encoder   = Arc::new(TextEncoder::new(tokenizer, cfg.max_seq_len)?);
        let model_cfg = cfg.model_config(encoder.id_space(), vocabulary.len());
        if let Some(source) = &init_source {
            // Checked before Step 6, which may overwrite the same directory
            ensure_compatible_checkpoint(source, &model_cfg)?;
        }

        let build = |rows| TextClassificationDataset::new(rows, encoder.clone(), vocabulary.clone());
        let train_ds = build(parts.train)?;
        let val_ds   = build(parts.validation)?;
        let test_ds  = build(parts.test)?;

        // ── Step 6: Save what inference needs ─────────────────────────────────
        ckpt_manager.save_config(cfg)?;
        ckpt_manager.save_vocabulary(&vocabulary)?;
        ckpt_manager.save_model_config(&model_cfg)?;

        // ── Step 7: Train on the chosen backend ───────────────────────────────
        let report = match ComputeBackend::resolve(cfg.backend) {
            ComputeBackend::Wgpu => run_training::<Autodiff<GpuBackend>, _>(
                cfg, &model_cfg, train_ds, val_ds, test_ds, &ckpt_manager,
                ComputeBackend::wgpu_device(),
            )?,
            ComputeBackend::Cpu => run_training::<Autodiff<CpuBackend>, _>(
                cfg, &model_cfg, train_ds, val_ds, test_ds, &ckpt_manager,
                ComputeBackend::cpu_device(),
            )?,
        };

        if let Some((loss, accuracy)) = report.test {
            println!("Test Loss: {loss:.3} | Test Accuracy: {accuracy:.3}");
        }

        Ok(report)
    }
}

/// The init checkpoint must have been trained on exactly these categories.
fn ensure_same_categories(source: &CheckpointManager, vocabulary: &CategoryVocabulary) -> Result<()> {
    let saved = source.load_vocabulary()?;
    ensure!(
        saved == *vocabulary,
        "Cannot initialise from '{}': it was trained on categories {:?}, this data has {:?}",
        source.dir().display(),
        saved.names(),
        vocabulary.names()
    );
    Ok(())
}
