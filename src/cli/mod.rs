// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
// Four commands are supported:
//   1. `train`   - trains the CRNN on an annotated dataset
//   2. `predict` - loads a checkpoint and recognises image files
//   3. `serve`   - exposes the checkpoint over HTTP
//   4. `inspect` - prints a dataset quality report
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, InspectArgs, PredictArgs, ServeArgs, TrainArgs};
use std::net::SocketAddr;

use crate::ml::trainer::TrainOutcome;

#[derive(Parser, Debug)]
#[command(
    name = "bangla-ocr",
    version = "0.1.0",
    about = "Train a CRNN + CTC recogniser on handwritten Bangla lines, then read images with it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
            Commands::Serve(args)   => run_serve(args),
            Commands::Inspect(args) => run_inspect(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on dataset in: {}", args.data_dir.display());

    let checkpoint_dir = args.checkpoint_dir.clone();
    let summary = TrainUseCase::new(args.into()).execute()?;

    match summary.outcome {
        TrainOutcome::Completed => println!("Training complete after {} epochs.", summary.epochs_run),
        TrainOutcome::EarlyStopped => println!("Early stopping after {} epochs.", summary.epochs_run),
        TrainOutcome::Interrupted => println!("Training interrupted after {} epochs.", summary.epochs_run),
    }
    if let Some(best) = summary.best {
        println!("Best epoch {} (loss {:.4}).", best.epoch, best.monitored_loss);
    }
    println!("Checkpoints saved in {}", checkpoint_dir.display());
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let use_case = PredictUseCase::load(&args.checkpoint_dir)?;
    let mut failures = 0usize;

    for (path, result) in use_case.predict_all(&args.image) {
        match result {
            Ok(r) => println!("{}\t{}\t(confidence {:.3})", path.display(), r.text, r.confidence),
            Err(e) => {
                failures += 1;
                eprintln!("{}\terror: {e:#}", path.display());
            }
        }
    }

    if failures == args.image.len() {
        anyhow::bail!("No image could be recognised");
    }
    Ok(())
}

fn run_serve(args: ServeArgs) -> Result<()> {
    use crate::api::{serve, AppState};
    use crate::application::predict_use_case::PredictUseCase;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid address {}:{}", args.host, args.port))?;

    // A missing model is reported per request (503), not fatal
    let state = match PredictUseCase::load(&args.checkpoint_dir) {
        Ok(use_case) => AppState::with_recognizer(use_case.into_recognizer()),
        Err(e) => {
            tracing::warn!("Starting without a model: {e:#}");
            AppState::without_model()
        }
    };

    let runtime = tokio::runtime::Runtime::new().context("Cannot start async runtime")?;
    runtime.block_on(serve(addr, state))
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;
    use crate::domain::vocabulary::Vocabulary;

    let vocabulary = Vocabulary::new(&args.vocabulary).context("Invalid vocabulary")?;
    let reports = InspectUseCase::new(&args.data_dir, vocabulary, args.max_text_len).execute()?;

    for report in &reports {
        println!("{report}\n");
    }

    let train_ready = reports.first().map(|r| r.manifest_found && r.samples > 0).unwrap_or(false);
    if train_ready {
        println!("Dataset is ready for training.");
    } else {
        println!(
            "No training samples. Create {}/train/annotations.json first.",
            args.data_dir.display()
        );
    }
    Ok(())
}
