// ============================================================
// Layer 6: Epoch Metrics
// ============================================================
// Per-epoch loss/accuracy bookkeeping and its two outputs:
//
//   1. the console summary line printed after every epoch
//   2. an optional metrics.csv, one row per epoch
//
// Losses are summed per batch (each batch loss is already the
// batch mean) and accuracies are counted per example. Both are
// normalised by the PARTITION SIZE, not by the number of
// batches, when reported.
//
// Example CSV output:
//   epoch,train_loss,train_acc,val_loss,val_acc
//   1,0.805012,0.200000,0.801234,0.200000
//
// Reference: Rust Book §12 (I/O and File Handling)

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Running totals for one phase (train, validation or test).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTotals {
    pub loss_sum: f64,
    pub correct:  usize,
    pub batches:  usize,
}

impl PhaseTotals {
    pub fn record_batch(&mut self, loss: f64, correct: usize) {
        self.loss_sum += loss;
        self.correct  += correct;
        self.batches  += 1;
    }

    /// `loss_sum / size`, or 0 for an empty partition
    pub fn loss(&self, size: usize) -> f64 {
        ratio(self.loss_sum, size)
    }

    /// `correct / size`, or 0 for an empty partition
    pub fn accuracy(&self, size: usize) -> f64 {
        ratio(self.correct as f64, size)
    }
}

fn ratio(num: f64, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num / den as f64 }
}

/// Everything measured during one epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based epoch number
    pub epoch: usize,

    pub train_loss_sum: f64,
    pub train_correct:  usize,
    pub train_size:     usize,

    pub val_loss_sum: f64,
    pub val_correct:  usize,
    pub val_size:     usize,
}

impl EpochMetrics {
    pub fn new(
        epoch:      usize,
        train:      PhaseTotals,
        train_size: usize,
        val:        PhaseTotals,
        val_size:   usize,
    ) -> Self {
        Self {
            epoch,
            train_loss_sum: train.loss_sum,
            train_correct:  train.correct,
            train_size,
            val_loss_sum:   val.loss_sum,
            val_correct:    val.correct,
            val_size,
        }
    }

    pub fn train_loss(&self) -> f64 {
        ratio(self.train_loss_sum, self.train_size)
    }

    pub fn train_accuracy(&self) -> f64 {
        ratio(self.train_correct as f64, self.train_size)
    }

    pub fn val_loss(&self) -> f64 {
        ratio(self.val_loss_sum, self.val_size)
    }

    pub fn val_accuracy(&self) -> f64 {
        ratio(self.val_correct as f64, self.val_size)
    }

    /// The console line printed after each epoch.
    pub fn summary_line(&self) -> String {
        format!(
            "Epochs: {} | Train Loss: {:.3} | Train Accuracy: {:.3} | Val Loss: {:.3} | Val Accuracy: {:.3}",
            self.epoch,
            self.train_loss(),
            self.train_accuracy(),
            self.val_loss(),
            self.val_accuracy(),
        )
    }
}

/// Appends epoch metrics to `metrics.csv`.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Starts a fresh `metrics.csv` holding only the header, so a
    /// rerun into the same directory never mixes rows of two runs.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "epoch,train_loss,train_acc,val_loss,val_acc")?;
        tracing::debug!("Started metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss(),
            m.train_accuracy(),
            m.val_loss(),
            m.val_accuracy(),
        )?;

        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EpochMetrics {
        let mut train = PhaseTotals::default();
        train.record_batch(1.2, 1);
        train.record_batch(0.8, 2);
        let mut val = PhaseTotals::default();
        val.record_batch(0.5, 1);
        EpochMetrics::new(1, train, 4, val, 2)
    }

    #[test]
    fn test_normalises_by_partition_size_not_batches() {
        let m = sample();
        // (1.2 + 0.8) / 4 examples, not / 2 batches
        assert!((m.train_loss() - 0.5).abs() < 1e-12);
        assert!((m.train_accuracy() - 0.75).abs() < 1e-12);
        assert!((m.val_loss() - 0.25).abs() < 1e-12);
        assert!((m.val_accuracy() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_summary_line_has_four_fields_at_three_decimals() {
        let line = sample().summary_line();
        assert_eq!(
            line,
            "Epochs: 1 | Train Loss: 0.500 | Train Accuracy: 0.750 | Val Loss: 0.250 | Val Accuracy: 0.500"
        );
    }

    #[test]
    fn test_empty_partition_reports_zero() {
        let m = EpochMetrics::new(1, PhaseTotals::default(), 0, PhaseTotals::default(), 0);
        assert_eq!(m.train_loss(), 0.0);
        assert_eq!(m.val_accuracy(), 0.0);
    }

    #[test]
    fn test_csv_appends_rows() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&sample()).unwrap();
        logger.log(&EpochMetrics { epoch: 2, ..sample() }).unwrap();

        let text = std::fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,train_loss,train_acc,val_loss,val_acc");
        assert_eq!(lines[1], "1,0.500000,0.750000,0.250000,0.500000");
        assert!(lines[2].starts_with("2,"));
    }

    #[test]
    fn test_new_run_starts_a_fresh_csv() {
        let dir = tempfile::tempdir().unwrap();
        let first = MetricsLogger::new(dir.path()).unwrap();
        first.log(&sample()).unwrap();
        first.log(&EpochMetrics { epoch: 2, ..sample() }).unwrap();

        let second = MetricsLogger::new(dir.path()).unwrap();
        second.log(&sample()).unwrap();

        let text = std::fs::read_to_string(second.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["epoch,train_loss,train_acc,val_loss,val_acc", "1,0.500000,0.750000,0.250000,0.500000"]);
    }
}
