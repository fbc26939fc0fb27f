// ============================================================
// Layer 1: CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `classify`, and all
// their configurable flags.
//
// clap's derive macros generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enum, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::ml::backend::BackendChoice;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune a text classifier on a labelled CSV table
    Train(TrainArgs),

    /// Classify a piece of text using a trained checkpoint
    Classify(ClassifyArgs),
}

/// Where tensors are computed
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendArg {
    /// GPU if one can be initialised, otherwise CPU
    Auto,
    Wgpu,
    Cpu,
}

impl From<BackendArg> for BackendChoice {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Auto => BackendChoice::Auto,
            BackendArg::Wgpu => BackendChoice::Wgpu,
            BackendArg::Cpu  => BackendChoice::Cpu,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV file with a header row
    #[arg(long, default_value = "data/bbc_text.csv")]
    pub data: String,

    /// Directory to save checkpoints, tokenizer and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Column holding the text to classify
    #[arg(long, default_value = "text")]
    pub text_column: String,

    /// Column holding the category name
    #[arg(long, default_value = "category")]
    pub label_column: String,

    /// Pretrained tokenizer.json (HuggingFace format).
    /// A word-level tokenizer is built from the data when omitted.
    #[arg(long)]
    pub tokenizer: Option<String>,

    /// Checkpoint directory whose latest weights initialise the model
    #[arg(long)]
    pub init_from: Option<String>,

    /// Tokens per input, including [CLS] and [SEP]
    #[arg(long, default_value_t = 512)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = 2)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-6)]
    pub lr: f64,

    /// Seed of the 80/10/10 split shuffle
    #[arg(long, default_value_t = 42)]
    pub split_seed: u64,

    /// Seed of the per-epoch training batch order
    #[arg(long, default_value_t = 112)]
    pub shuffle_seed: u64,

    /// Hidden dimension of the encoder
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    /// Attention heads; d_model must be divisible by this
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    /// Dropout in front of the classification head
    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    /// Dropout inside the encoder (embeddings, attention, FFN)
    #[arg(long, default_value_t = 0.1)]
    pub encoder_dropout: f64,

    /// Vocabulary cap for a tokenizer built from the data
    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,

    #[arg(long, value_enum, default_value_t = BackendArg::Auto)]
    pub backend: BackendArg,

    /// Hide the per-epoch progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_path:      a.data,
            checkpoint_dir: a.checkpoint_dir,
            text_column:    a.text_column,
            label_column:   a.label_column,
            tokenizer:      a.tokenizer,
            init_from:      a.init_from,
            max_seq_len:    a.max_seq_len,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            split_seed:     a.split_seed,
            shuffle_seed:   a.shuffle_seed,
            d_model:        a.d_model,
            num_heads:      a.num_heads,
            num_layers:     a.num_layers,
            d_ff:           a.d_ff,
            dropout:        a.dropout,
            encoder_dropout: a.encoder_dropout,
            vocab_size:     a.vocab_size,
            backend:        a.backend.into(),
            show_progress:  !a.no_progress,
        }
    }
}

/// All arguments for the `classify` command
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// The text to classify
    #[arg(long)]
    pub text: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, value_enum, default_value_t = BackendArg::Auto)]
    pub backend: BackendArg,
}
