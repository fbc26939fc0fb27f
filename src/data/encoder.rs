// ============================================================
// Layer 4: Text Encoder
// ============================================================
// Turns a raw text string into the fixed-length model input:
//
//   [CLS] tok tok tok ... [SEP] [PAD] [PAD] ...
//    1    1   1   1  ...  1     0     0   ...   ← attention mask
//
// Longer texts are truncated so that [CLS] and [SEP] always
// fit; shorter texts are padded. Every encoding therefore has
// exactly `max_seq_len` ids, which is what lets the batcher
// stack samples without dynamic padding.
//
// Special token ids are looked up in the tokenizer's own
// vocabulary, falling back to the BERT convention.

use tokenizers::Tokenizer;

use crate::domain::error::DataError;

const DEFAULT_PAD_ID: u32 = 0;
const DEFAULT_CLS_ID: u32 = 101;
const DEFAULT_SEP_ID: u32 = 102;

/// Token ids plus attention mask, both `max_seq_len` long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedText {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
}

pub struct TextEncoder {
    tokenizer:   Tokenizer,
    max_seq_len: usize,
    pad_id:      u32,
    cls_id:      u32,
    sep_id:      u32,
}

impl TextEncoder {
    /// # Errors
    /// `max_seq_len` must leave room for [CLS] and [SEP].
    pub fn new(tokenizer: Tokenizer, max_seq_len: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(
            max_seq_len >= 2,
            "max_seq_len must be at least 2 (got {max_seq_len})"
        );
        let id = |tok: &str, default: u32| tokenizer.token_to_id(tok).unwrap_or(default);
        let pad_id = id("[PAD]", DEFAULT_PAD_ID);
        let cls_id = id("[CLS]", DEFAULT_CLS_ID);
        let sep_id = id("[SEP]", DEFAULT_SEP_ID);
        Ok(Self { tokenizer, max_seq_len, pad_id, cls_id, sep_id })
    }

    pub fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// One past the largest id this encoder can emit. The model's
    /// token embedding table must be at least this large.
    pub fn id_space(&self) -> usize {
        let vocab_max = self
            .tokenizer
            .get_vocab(true)
            .values()
            .copied()
            .max()
            .unwrap_or(0);
        [vocab_max, self.pad_id, self.cls_id, self.sep_id]
            .into_iter()
            .max()
            .unwrap_or(0) as usize
            + 1
    }

    pub fn encode(&self, text: &str) -> Result<EncodedText, DataError> {
        let enc = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| DataError::Tokenizer(e.to_string()))?;

        let body = self.max_seq_len - 2;
        let mut input_ids = Vec::with_capacity(self.max_seq_len);
        input_ids.push(self.cls_id);
        input_ids.extend(enc.get_ids().iter().take(body));
        input_ids.push(self.sep_id);

        let real = input_ids.len();
        input_ids.resize(self.max_seq_len, self.pad_id);

        let mut attention_mask = vec![1u32; real];
        attention_mask.resize(self.max_seq_len, 0);

        Ok(EncodedText { input_ids, attention_mask })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::build_word_level;

    fn encoder(max_seq_len: usize) -> TextEncoder {
        let corpus = vec!["the cat sat on the mat".to_string()];
        TextEncoder::new(build_word_level(&corpus, 100).unwrap(), max_seq_len).unwrap()
    }

    #[test]
    fn test_short_text_is_padded() {
        let e   = encoder(8);
        let out = e.encode("the cat").unwrap();
        assert_eq!(out.input_ids.len(), 8);
        assert_eq!(out.attention_mask, vec![1, 1, 1, 1, 0, 0, 0, 0]);
        assert_eq!(out.input_ids[0], DEFAULT_CLS_ID);
        assert_eq!(out.input_ids[3], DEFAULT_SEP_ID);
        assert!(out.input_ids[4..].iter().all(|&id| id == DEFAULT_PAD_ID));
    }

    #[test]
    fn test_long_text_is_truncated() {
        let e   = encoder(4);
        let out = e.encode("the cat sat on the mat").unwrap();
        assert_eq!(out.input_ids.len(), 4);
        assert_eq!(out.attention_mask, vec![1, 1, 1, 1]);
        assert_eq!(*out.input_ids.last().unwrap(), DEFAULT_SEP_ID);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let e = encoder(16);
        assert_eq!(e.encode("the mat").unwrap(), e.encode("the mat").unwrap());
    }

    #[test]
    fn test_unknown_words_still_encode() {
        let e   = encoder(6);
        let out = e.encode("zebra").unwrap();
        assert_eq!(out.attention_mask, vec![1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_id_space_covers_special_tokens() {
        let e = encoder(8);
        assert!(e.id_space() > DEFAULT_SEP_ID as usize);
    }

    #[test]
    fn test_rejects_tiny_max_len() {
        let corpus = vec!["x".to_string()];
        assert!(TextEncoder::new(build_word_level(&corpus, 10).unwrap(), 1).is_err());
    }
}
