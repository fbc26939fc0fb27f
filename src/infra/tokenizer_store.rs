// ============================================================
// Layer 6: Tokenizer Store
// ============================================================
// Resolves the tokenizer for a training run and persists it
// next to the checkpoints, so `classify` tokenises exactly the
// way training did.
//
// Resolution order:
//   1. a pretrained tokenizer.json passed with --tokenizer
//   2. tokenizer.json already in the checkpoint directory
//   3. a word-level tokenizer built from the training texts
//
// In tokenizers 0.15, train_from_files requires Trainer::Model
// to equal ModelWrapper. Building the tokenizer JSON by hand and
// parsing it sidesteps that type mismatch.
//
// Reference: HuggingFace tokenizers JSON format

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use tokenizers::Tokenizer;

const TOKENIZER_FILE: &str = "tokenizer.json";

/// Ids below this are reserved for special tokens (BERT layout).
const FIRST_WORD_ID: usize = 104;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Pick a tokenizer for training and make sure a copy is
    /// saved in the store directory.
    pub fn resolve(
        &self,
        pretrained: Option<&Path>,
        texts:      &[String],
        vocab_size: usize,
    ) -> Result<Tokenizer> {
        let tokenizer = match pretrained {
            Some(path) => {
                tracing::info!("Using pretrained tokenizer '{}'", path.display());
                load_file(path)?
            }
            None if self.path().exists() => {
                tracing::info!("Loading existing tokenizer from disk");
                self.load()?
            }
            None => {
                tracing::info!("Building word-level tokenizer (vocab_size={})", vocab_size);
                build_word_level(texts, vocab_size)?
            }
        };
        self.save(&tokenizer)?;
        Ok(tokenizer)
    }

    pub fn load(&self) -> Result<Tokenizer> {
        load_file(&self.path())
    }

    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.path();
        tokenizer
            .save(&path, true)
            .map_err(|e| anyhow::anyhow!("Cannot save tokenizer to '{}': {e}", path.display()))?;
        tracing::debug!("Saved tokenizer to '{}'", path.display());
        Ok(())
    }
}

fn load_file(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {e}", path.display()))
}

/// Build a lowercase word-level tokenizer from `texts`, keeping
/// at most `vocab_size - 5` of the most frequent words.
pub fn build_word_level(texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for word in text.split_whitespace() {
            let w = word.to_lowercase();
            let w = w.trim_matches(|c: char| !c.is_alphanumeric());
            if !w.is_empty() {
                *freq.entry(w.to_string()).or_insert(0) += 1;
            }
        }
    }

    // Frequency descending, ties broken alphabetically so the
    // same corpus always yields the same ids.
    let mut words: Vec<(String, usize)> = freq.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(vocab_size.saturating_sub(5));

    let mut vocab = serde_json::json!({
        "[PAD]":  0,
        "[UNK]":  1,
        "[CLS]":  101,
        "[SEP]":  102,
        "[MASK]": 103,
    });
    let mut next_id = FIRST_WORD_ID;
    for (word, _) in &words {
        if vocab.get(word).is_none() {
            vocab[word] = serde_json::json!(next_id);
            next_id += 1;
        }
    }

    let special = |id: u32, content: &str| serde_json::json!({
        "id": id, "content": content, "single_word": false, "lstrip": false,
        "rstrip": false, "normalized": false, "special": true
    });

    let tokenizer_json = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            special(0, "[PAD]"),
            special(1, "[UNK]"),
            special(101, "[CLS]"),
            special(102, "[SEP]"),
            special(103, "[MASK]"),
        ],
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": true
        },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "[UNK]"
        }
    });

    let tokenizer = Tokenizer::from_str(&tokenizer_json.to_string())
        .map_err(|e| anyhow::anyhow!("Cannot build tokenizer: {e}"))?;

    tracing::info!("Tokenizer built with {} words", next_id - FIRST_WORD_ID);
    Ok(tokenizer)
}
