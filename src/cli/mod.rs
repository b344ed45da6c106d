// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All work is delegated to Layer 2 (application).
//
//   train   <config.yml> [output_dir] [--device cpu|gpu]
//   convert --checkpoint <snapshot> [--config] [--max-length]
//           [--device cpu|gpu] <words...>

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ConvertArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "kana-translit",
    version,
    about = "Train a romanized-to-katakana transliteration model, then convert words with it."
)]
pub struct Cli {
    /// The subcommand to run (train or convert)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the use case. The CLI layer only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Convert(args) => run_convert(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training from config: {}", args.config.display());

    let use_case = TrainUseCase::new(args.config, args.output, args.device.into());
    let output_dir = use_case.execute()?;

    println!("Training complete. Snapshots in {}", output_dir.display());
    Ok(())
}

fn run_convert(args: ConvertArgs) -> Result<()> {
    use crate::application::convert_use_case::ConvertUseCase;

    let use_case = ConvertUseCase::new(args.checkpoint, args.config, args.device.into());
    let outputs = use_case.execute(&args.words, args.max_length)?;

    for (word, output) in args.words.iter().zip(&outputs) {
        if output.complete {
            println!("{word}\t{}", output.text);
        } else {
            println!("{word}\t{}\t(truncated)", output.text);
        }
    }
    Ok(())
}
