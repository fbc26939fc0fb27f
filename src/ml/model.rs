// ============================================================
// Layer 5: Transformer Text Classifier
// ============================================================
// A BERT-shaped encoder with a sequence classification head:
//
//   token embedding + position embedding
//       │
//       ▼
//   N × EncoderBlock   (masked self-attention + GELU FFN,
//                       post-norm residuals)
//       │
//       ▼
//   final LayerNorm → hidden state at [CLS] (position 0)
//       │
//       ▼
//   pooler (Linear + tanh) → dropout → Linear → class scores
//
// Two dropout rates: `dropout` sits only in front of the final
// Linear, `encoder_dropout` inside the embeddings and blocks.
//
// Padding positions are excluded from attention via the mask,
// so the scores do not depend on what ids sit in the padding.
//
// The training loop does not depend on this concrete model,
// only on the SequenceClassifier trait below.
//
// Reference: Devlin et al. (2019) BERT
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::gelu,
};

/// A model that maps a batch of token ids plus attention mask to
/// one score per category.
pub trait SequenceClassifier<B: Backend>: Module<B> {
    /// input_ids, attention_mask: [batch, seq_len] → scores: [batch, num_classes]
    fn classify(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2>;
}

/// Architecture of the whole classifier.
#[derive(Config, Debug)]
pub struct TransformerClassifierConfig {
    /// Size of the token-id space (largest id + 1)
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
    pub num_classes: usize,
    /// Dropout in front of the classification head
    pub dropout:     f64,
    /// Dropout inside the encoder
    #[config(default = 0.1)]
    pub encoder_dropout: f64,
}

impl TransformerClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerClassifier<B> {
        let block = EncoderBlockConfig::new(self.d_model, self.num_heads, self.d_ff, self.encoder_dropout);

        TransformerClassifier {
            token_embedding:    EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            position_embedding: EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device),
            layers:             (0..self.num_layers).map(|_| block.init(device)).collect(),
            final_norm:         LayerNormConfig::new(self.d_model).init(device),
            pooler:             LinearConfig::new(self.d_model, self.d_model).init(device),
            classifier:         LinearConfig::new(self.d_model, self.num_classes).init(device),
            embedding_dropout:  DropoutConfig::new(self.encoder_dropout).init(),
            dropout:            DropoutConfig::new(self.dropout).init(),
            num_classes:        self.num_classes,
        }
    }

    /// Fails unless weights saved under `self` load into a model
    /// built from `other`. Dropout rates don't affect the weights.
    pub fn ensure_compatible(&self, other: &Self) -> anyhow::Result<()> {
        let shape = |c: &Self| {
            [
                ("vocab_size", c.vocab_size),
                ("max_seq_len", c.max_seq_len),
                ("d_model", c.d_model),
                ("num_heads", c.num_heads),
                ("num_layers", c.num_layers),
                ("d_ff", c.d_ff),
                ("num_classes", c.num_classes),
            ]
        };
        for ((name, saved), (_, wanted)) in shape(self).into_iter().zip(shape(other)) {
            anyhow::ensure!(saved == wanted, "{name} is {saved} in the checkpoint but {wanted} in this run");
        }
        Ok(())
    }
}

#[derive(Config, Debug)]
pub struct EncoderBlockConfig {
    pub d_model:   usize,
    pub num_heads: usize,
    pub d_ff:      usize,
    pub dropout:   f64,
}

impl EncoderBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            attention: MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .with_dropout(self.dropout)
                .init(device),
            attention_norm: LayerNormConfig::new(self.d_model).init(device),
            expand:         LinearConfig::new(self.d_model, self.d_ff).init(device),
            contract:       LinearConfig::new(self.d_ff, self.d_model).init(device),
            output_norm:    LayerNormConfig::new(self.d_model).init(device),
            dropout:        DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Post-norm transformer encoder layer.
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub attention:      MultiHeadAttention<B>,
    pub attention_norm: LayerNorm<B>,
    pub expand:         Linear<B>,
    pub contract:       Linear<B>,
    pub output_norm:    LayerNorm<B>,
    pub dropout:        Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `pad_mask` is true at padding positions
    pub fn forward(&self, hidden: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attended = self
            .attention
            .forward(MhaInput::self_attn(hidden.clone()).mask_pad(pad_mask))
            .context;
        let hidden = self.attention_norm.forward(hidden + self.dropout.forward(attended));

        let intermediate = gelu(self.expand.forward(hidden.clone()));
        let projected    = self.dropout.forward(self.contract.forward(intermediate));
        self.output_norm.forward(hidden + projected)
    }
}

#[derive(Module, Debug)]
pub struct TransformerClassifier<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub pooler:             Linear<B>,
    pub classifier:         Linear<B>,
    pub embedding_dropout:  Dropout,
    pub dropout:            Dropout,
    pub num_classes:        usize,
}

impl<B: Backend> TransformerClassifier<B> {
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let [batch_size, seq_len] = input_ids.dims();
        let device   = input_ids.device();
        let pad_mask = attention_mask.equal_elem(0);

        let position_ids = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let embedded = self.token_embedding.forward(input_ids)
            + self.position_embedding.forward(position_ids);

        let encoded = self
            .layers
            .iter()
            .fold(self.embedding_dropout.forward(embedded), |hidden, layer| {
                layer.forward(hidden, pad_mask.clone())
            });
        let encoded = self.final_norm.forward(encoded); // [batch, seq_len, d_model]

        // Hidden state of the [CLS] token summarises the sequence
        let cls_state: Tensor<B, 2> = encoded.narrow(1, 0, 1).squeeze(1);
        let pooled = self.pooler.forward(cls_state).tanh();

        self.classifier.forward(self.dropout.forward(pooled)) // [batch, num_classes]
    }
}

impl<B: Backend> SequenceClassifier<B> for TransformerClassifier<B> {
    fn classify(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        self.forward(input_ids, attention_mask)
    }
}
