// ============================================================
// Layer 6 - Metrics Logger
// ============================================================
// Appends one CSV row per epoch so learning curves can be plotted
// after (or during) a run.
//
// Output file: checkpoints/metrics.csv
//
//   epoch,train_loss,val_loss,val_cer,val_accuracy,lr
//   1,2.931400,2.875100,0.981200,0.000000,0.00010000
//   2,2.410800,2.398300,0.902700,0.000000,0.00010000
//   ...
//
// Losses are length-normalized CTC losses. val_cer is the
// character error rate (edit distance / reference length) and
// val_accuracy the fraction of exact transcriptions. Validation
// columns are NaN when the run has no validation data.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const METRICS_FILE: &str = "metrics.csv";

const HEADER: &str = "epoch,train_loss,val_loss,val_cer,val_accuracy,lr";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Starts at 1
    pub epoch:        usize,
    pub train_loss:   f64,
    pub val_loss:     f64,
    /// Character error rate on the validation set, 0.0 is perfect
    pub val_cer:      f64,
    /// Fraction of validation samples transcribed exactly
    pub val_accuracy: f64,
    /// Learning rate used during this epoch
    pub lr:           f64,
}

impl EpochMetrics {
    /// Loss the scheduler and checkpointing watch: validation loss,
    /// or training loss when the run has no validation data.
    pub fn monitored_loss(&self) -> f64 {
        if self.val_loss.is_finite() {
            self.val_loss
        } else {
            self.train_loss
        }
    }

    pub fn is_improvement(&self, best_loss: f64) -> bool {
        self.monitored_loss() < best_loss
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet, so
    /// resumed runs keep appending to the same log.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let csv_path = dir.join(METRICS_FILE);

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.8}",
            m.epoch, m.train_loss, m.val_loss, m.val_cer, m.val_accuracy, m.lr,
        )?;

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(train_loss: f64, val_loss: f64) -> EpochMetrics {
        EpochMetrics { epoch: 2, train_loss, val_loss, val_cer: 0.3, val_accuracy: 0.1, lr: 1e-4 }
    }

    #[test]
    fn test_is_improvement() {
        let m = metrics(2.5, 2.3);
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
    }

    #[test]
    fn test_falls_back_to_train_loss() {
        let m = metrics(1.5, f64::NAN);
        assert_eq!(m.monitored_loss(), 1.5);
        assert!(m.is_improvement(f64::INFINITY));
    }

    #[test]
    fn test_rows_are_appended_under_one_header() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&metrics(2.0, 1.9)).unwrap();

        // Reopening must not write a second header
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&metrics(1.0, 0.9)).unwrap();

        let csv   = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert!(lines[2].starts_with("2,1.000000,0.900000,"));
    }
}
