// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the subcommands `train`, `predict`, `serve` and
// `inspect` and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, PathBuf, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::domain::vocabulary::BANGLA_SYMBOLS;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the CRNN on data/train (and data/val)
    Train(TrainArgs),

    /// Recognise text in one or more images
    Predict(PredictArgs),

    /// Serve the trained model over HTTP
    Serve(ServeArgs),

    /// Report dataset problems before training
    Inspect(InspectArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory containing train/ and val/, each with annotations.json
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory to save weights, config and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Input image height; must be a multiple of 16
    #[arg(long, default_value_t = 64)]
    pub img_height: usize,

    /// Input image width; must be a multiple of 8.
    /// The model emits img_width / 8 timesteps.
    #[arg(long, default_value_t = 512)]
    pub img_width: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Maximum number of full passes through the training data
    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    /// Initial Adam learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Labels are truncated to this many characters
    #[arg(long, default_value_t = 64)]
    pub max_text_len: usize,

    /// Ordered character set; the blank class is added automatically
    #[arg(long, default_value = BANGLA_SYMBOLS)]
    pub vocabulary: String,

    /// Replace characters outside the vocabulary with this symbol
    /// instead of dropping them
    #[arg(long)]
    pub unknown_symbol: Option<char>,

    /// Stop after this many epochs without improvement
    #[arg(long, default_value_t = 15)]
    pub early_stopping_patience: usize,

    /// Reduce the learning rate after this many epochs without improvement
    #[arg(long, default_value_t = 7)]
    pub reduce_lr_patience: usize,

    #[arg(long, default_value_t = 0.5)]
    pub lr_factor: f64,

    #[arg(long, default_value_t = 1e-7)]
    pub min_lr: f64,

    /// Disable training-time augmentation
    #[arg(long)]
    pub no_augment: bool,

    /// Share of train/ held out when val/ has no samples
    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,

    /// Seed for shuffling and the validation split
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 64)]
    pub embed_dim: usize,

    /// Hidden units per LSTM direction
    #[arg(long, default_value_t = 256)]
    pub hidden_size: usize,

    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:                a.data_dir,
            checkpoint_dir:          a.checkpoint_dir,
            img_height:              a.img_height,
            img_width:               a.img_width,
            batch_size:              a.batch_size,
            epochs:                  a.epochs,
            lr:                      a.lr,
            max_text_len:            a.max_text_len,
            vocabulary:              a.vocabulary,
            unknown_symbol:          a.unknown_symbol,
            early_stopping_patience: a.early_stopping_patience,
            reduce_lr_patience:      a.reduce_lr_patience,
            lr_factor:               a.lr_factor,
            min_lr:                  a.min_lr,
            augment:                 !a.no_augment,
            val_fraction:            a.val_fraction,
            seed:                    a.seed,
            embed_dim:               a.embed_dim,
            hidden_size:             a.hidden_size,
            dropout:                 a.dropout,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Image file(s) to recognise
    #[arg(long, required = true, num_args = 1..)]
    pub image: Vec<PathBuf>,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,
}

/// All arguments for the `serve` command
#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, default_value_t = 5000)]
    pub port: u16,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,
}

/// All arguments for the `inspect` command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Directory containing train/, val/ and test/
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Character set used to count out-of-vocabulary characters
    #[arg(long, default_value = BANGLA_SYMBOLS)]
    pub vocabulary: String,

    /// Length above which labels would be truncated
    #[arg(long, default_value_t = 64)]
    pub max_text_len: usize,
}
