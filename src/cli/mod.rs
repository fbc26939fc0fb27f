// ============================================================
// Layer 1: CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`    - fine-tunes a classifier on a CSV table
//   2. `classify` - loads a checkpoint and labels a text
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{ClassifyArgs, Commands, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "text-classifier-trainer",
    version = "0.1.0",
    about = "Fine-tune a transformer text classifier on a labelled CSV, then classify text."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. Routing only.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Classify(args) => run_classify(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.data);

    let checkpoint_dir = args.checkpoint_dir.clone();
    TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Checkpoints saved to '{checkpoint_dir}'.");
    Ok(())
}

fn run_classify(args: ClassifyArgs) -> Result<()> {
    use crate::application::classify_use_case::ClassifyUseCase;

    let use_case = ClassifyUseCase::new(&args.checkpoint_dir, args.backend.into())?;
    let (category, probability) = use_case.classify(&args.text)?;

    println!("\nCategory: {category} (p={probability:.3})");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::ml::backend::BackendChoice;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["text-classifier-trainer", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg, TrainConfig::default());
    }

    #[test]
    fn test_train_flags_reach_config() {
        let cli = Cli::try_parse_from([
            "text-classifier-trainer", "train",
            "--data", "news.csv",
            "--epochs", "3",
            "--lr", "0.001",
            "--backend", "cpu",
            "--encoder-dropout", "0.2",
            "--no-progress",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.data_path, "news.csv");
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.lr, 0.001);
        assert_eq!(cfg.backend, BackendChoice::Cpu);
        assert_eq!((cfg.dropout, cfg.encoder_dropout), (0.5, 0.2));
        assert!(!cfg.show_progress);
    }

    #[test]
    fn test_classify_requires_text() {
        assert!(Cli::try_parse_from(["text-classifier-trainer", "classify"]).is_err());
        let cli = Cli::try_parse_from(["text-classifier-trainer", "classify", "--text", "hi"]).unwrap();
        assert!(matches!(cli.command, Commands::Classify(ref a) if a.text == "hi"));
    }
}
