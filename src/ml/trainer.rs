// ============================================================
// Layer 5: Training Loop
// ============================================================
// Generic mini-batch supervised training driver.
//
// For each epoch, in order:
//   1. training phase   - shuffled batches; forward, cross-entropy,
//                         fresh gradients, one optimiser step per
//                         batch, strictly one batch after another
//   2. validation phase - unshuffled batches on model.valid()
//                         (inner backend: no autodiff, no dropout)
//   3. one summary line - losses and accuracies normalised by
//                         the partition sizes
//
// The driver only knows the SequenceClassifier trait and Burn's
// Optimizer trait, so any classifier / optimiser pair plugs in.
//
// Key Burn insight:
//   - Training runs on B (Autodiff<...>) for gradients
//   - model.valid() returns the module on B::InnerBackend
//   - so the validation batcher must build InnerBackend tensors
//   - argmax(1) returns [batch, 1]; flatten before .equal()
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{ClassificationBatch, ClassificationBatcher},
    dataset::LabeledExample,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger, PhaseTotals},
};
use crate::ml::model::{SequenceClassifier, TransformerClassifier, TransformerClassifierConfig};

pub type BatchLoader<B> = Arc<dyn DataLoader<ClassificationBatch<B>>>;

/// Knobs of the epoch loop itself.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub learning_rate: f64,
    pub epochs:        usize,
    pub batch_size:    usize,
    /// Seed for the per-epoch shuffle of the training partition
    pub shuffle_seed:  u64,
    pub show_progress: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-6,
            epochs:        5,
            batch_size:    2,
            shuffle_seed:  112,
            show_progress: true,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.epochs >= 1, "epochs must be at least 1 (got {})", self.epochs);
        ensure!(
            self.learning_rate > 0.0 && self.learning_rate.is_finite(),
            "learning rate must be positive (got {})",
            self.learning_rate
        );
        ensure!(self.batch_size >= 1, "batch size must be at least 1");
        Ok(())
    }
}

/// What one training batch contributed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchOutcome {
    /// Mean cross-entropy over the batch
    pub loss:    f64,
    pub correct: usize,
    pub size:    usize,
}

/// Mean cross-entropy of `logits` [batch, classes] against `labels` [batch].
pub fn cross_entropy<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    CrossEntropyLossConfig::new()
        .init(&logits.device())
        .forward(logits, labels)
}

/// Number of rows whose highest score sits at the label index.
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

/// Forward, loss, backward and one optimiser step on a single batch.
pub fn train_step<B, M, O>(
    model: M,
    optim: &mut O,
    batch: ClassificationBatch<B>,
    lr:    f64,
) -> (M, BatchOutcome)
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SequenceClassifier<B>,
    O: Optimizer<M, B>,
{
    let size   = batch.len();
    let logits = model.classify(batch.input_ids, batch.attention_mask);
    let loss   = cross_entropy(logits.clone(), batch.labels.clone());

    let loss_value = loss.clone().into_scalar().elem::<f64>();
    let correct    = count_correct(logits.detach(), batch.labels);

    // backward() returns a new gradient container for this loss
    // only, and the step consumes it: nothing is carried into the
    // next batch.
    let grads = GradientsParams::from_grads(loss.backward(), &model);
    let model = optim.step(lr, model, grads);

    (model, BatchOutcome { loss: loss_value, correct, size })
}

/// One pass over `loader`, updating the model after every batch.
pub fn train_epoch<B, M, O>(
    mut model: M,
    optim:     &mut O,
    loader:    &dyn DataLoader<ClassificationBatch<B>>,
    lr:        f64,
    progress:  &ProgressBar,
) -> (M, PhaseTotals)
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SequenceClassifier<B>,
    O: Optimizer<M, B>,
{
    let mut totals = PhaseTotals::default();

    for batch in loader.iter() {
        let (next, outcome) = train_step(model, optim, batch, lr);
        model = next;
        totals.record_batch(outcome.loss, outcome.correct);
        progress.inc(outcome.size as u64);
    }

    (model, totals)
}

/// Loss and correct-count totals over `loader`, without updates.
pub fn evaluate<B, M>(model: &M, loader: &dyn DataLoader<ClassificationBatch<B>>) -> PhaseTotals
where
    B: Backend,
    M: SequenceClassifier<B>,
{
    let mut totals = PhaseTotals::default();

    for batch in loader.iter() {
        let logits = model.classify(batch.input_ids, batch.attention_mask);
        let loss   = cross_entropy(logits.clone(), batch.labels.clone())
            .into_scalar()
            .elem::<f64>();
        totals.record_batch(loss, count_correct(logits, batch.labels));
    }

    totals
}

/// Shuffled loader for the training partition. Single-threaded.
pub fn shuffled_loader<B, D>(dataset: D, batch_size: usize, seed: u64, device: &B::Device) -> BatchLoader<B>
where
    B: Backend,
    D: Dataset<LabeledExample> + 'static,
{
    DataLoaderBuilder::new(ClassificationBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .shuffle(seed)
        .build(dataset)
}

/// In-order loader for validation and test partitions.
pub fn sequential_loader<B, D>(dataset: D, batch_size: usize, device: &B::Device) -> BatchLoader<B>
where
    B: Backend,
    D: Dataset<LabeledExample> + 'static,
{
    DataLoaderBuilder::new(ClassificationBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .build(dataset)
}

fn progress_bar(items: usize, epoch: usize, epochs: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(items as u64);
    pb.set_style(
        ProgressStyle::with_template("epoch {msg} [{bar:40}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.set_message(format!("{epoch}/{epochs}"));
    pb
}

/// Run the full epoch loop.
///
/// Returns the trained model and one `EpochMetrics` per epoch.
/// `on_epoch` runs after each epoch's summary line is printed.
///
/// # Errors
/// Invalid loop settings, an empty partition, or an error
/// returned by `on_epoch`. Shape or numeric failures inside the
/// tensor layer panic.
pub fn train<B, M, O, D>(
    model:        M,
    optim:        &mut O,
    train_set:    D,
    val_set:      D,
    cfg:          &LoopConfig,
    device:       &B::Device,
    mut on_epoch: impl FnMut(&M, &EpochMetrics) -> Result<()>,
) -> Result<(M, Vec<EpochMetrics>)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SequenceClassifier<B>,
    M::InnerModule: SequenceClassifier<B::InnerBackend>,
    O: Optimizer<M, B>,
    D: Dataset<LabeledExample> + 'static,
{
    cfg.validate()?;
    ensure!(!train_set.is_empty(), "training partition is empty");
    ensure!(!val_set.is_empty(), "validation partition is empty");

    let train_size = train_set.len();
    let val_size   = val_set.len();

    let train_loader = shuffled_loader::<B, _>(train_set, cfg.batch_size, cfg.shuffle_seed, device);
    let val_loader   = sequential_loader::<B::InnerBackend, _>(val_set, cfg.batch_size, device);

    let mut model   = model;
    let mut history = Vec::with_capacity(cfg.epochs);

    for epoch in 1..=cfg.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let progress = progress_bar(train_size, epoch, cfg.epochs, cfg.show_progress);
        let (next, train_totals) =
            train_epoch(model, optim, train_loader.as_ref(), cfg.learning_rate, &progress);
        model = next;
        progress.finish_and_clear();

        // ── Validation phase ──────────────────────────────────────────────────
        let val_totals = evaluate(&model.valid(), val_loader.as_ref());

        let metrics = EpochMetrics::new(epoch, train_totals, train_size, val_totals, val_size);
        println!("{}", metrics.summary_line());
        tracing::info!(
            epoch,
            train_batches = train_totals.batches,
            val_batches = val_totals.batches,
            "epoch finished"
        );

        on_epoch(&model, &metrics)?;
        history.push(metrics);
    }

    Ok((model, history))
}

/// Fails unless the weights saved in `source` fit a model built
/// from `model_cfg`.
pub fn ensure_compatible_checkpoint(
    source:    &CheckpointManager,
    model_cfg: &TransformerClassifierConfig,
) -> Result<()> {
    source
        .load_model_config()?
        .ensure_compatible(model_cfg)
        .with_context(|| format!("Cannot initialise from '{}'", source.dir().display()))
}

/// Final numbers of a `run_training` call.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub history:       Vec<EpochMetrics>,
    /// (loss, accuracy) on the test partition, if it has rows
    pub test:          Option<(f64, f64)>,
    pub num_params:    usize,
}

/// Build the classifier on backend `B`, fine-tune it, checkpoint
/// every epoch and score the held-out test partition.
pub fn run_training<B, D>(
    cfg:          &TrainConfig,
    model_cfg:    &TransformerClassifierConfig,
    train_set:    D,
    val_set:      D,
    test_set:     D,
    ckpt_manager: &CheckpointManager,
    device:       B::Device,
) -> Result<TrainingReport>
where
    B: AutodiffBackend,
    D: Dataset<LabeledExample> + 'static,
{
    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: TransformerClassifier<B> = model_cfg.init(&device);
    if let Some(dir) = &cfg.init_from {
        // load_record does not check shapes; a mismatch would only
        // surface as a panic inside the first batch
        let source = CheckpointManager::open(dir)?;
        ensure_compatible_checkpoint(&source, model_cfg)?;
        model = source.load_model::<B, _>(model, &device)?;
    }
    let num_params = model.num_params();
    tracing::info!(
        "Model ready: {} layers, d_model={}, {} classes, {} parameters",
        model_cfg.num_layers, model_cfg.d_model, model_cfg.num_classes, num_params
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    let metrics_log = MetricsLogger::new(ckpt_manager.dir())?;
    let loop_cfg    = cfg.loop_config();

    let (model, history) = train(
        model,
        &mut optim,
        train_set,
        val_set,
        &loop_cfg,
        &device,
        |model, metrics| {
            ckpt_manager.save_model::<B, _>(model, metrics.epoch)?;
            metrics_log.log(metrics)
        },
    )?;

    // ── Test partition ────────────────────────────────────────────────────────
    let test_size = test_set.len();
    let test = if test_size > 0 {
        let loader = sequential_loader::<B::InnerBackend, _>(test_set, cfg.batch_size, &device);
        let totals = evaluate(&model.valid(), loader.as_ref());
        Some((totals.loss(test_size), totals.accuracy(test_size)))
    } else {
        None
    };

    tracing::info!("Training complete!");
    Ok(TrainingReport { history, test, num_params })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        data::{dataloader::batcher::Batcher, dataset::InMemDataset},
        optim::SgdConfig,
    };

    type Inner = burn::backend::NdArray;
    type TestBackend = burn::backend::Autodiff<Inner>;

    const SEQ: usize = 6;
    const CLASSES: usize = 4;

    fn tiny_model() -> TransformerClassifier<TestBackend> {
        TransformerClassifierConfig::new(40, SEQ, 8, 2, 1, 16, CLASSES, 0.0)
            .init(&Default::default())
    }

    fn example(tokens: &[u32], label: usize) -> LabeledExample {
        let mut input_ids = vec![1u32];
        input_ids.extend_from_slice(tokens);
        input_ids.push(2);
        let real = input_ids.len();
        input_ids.resize(SEQ, 0);
        let mut attention_mask = vec![1u32; real];
        attention_mask.resize(SEQ, 0);
        LabeledExample { input_ids, attention_mask, label }
    }

    fn examples(n: usize) -> Vec<LabeledExample> {
        (0..n)
            .map(|i| example(&[10 + (i % 7) as u32, 20 + (i % 3) as u32], i % CLASSES))
            .collect()
    }

    fn quiet(epochs: usize, lr: f64) -> LoopConfig {
        LoopConfig { learning_rate: lr, epochs, batch_size: 2, shuffle_seed: 3, show_progress: false }
    }

    fn weights(model: &TransformerClassifier<TestBackend>) -> burn::tensor::TensorData {
        model.classifier.weight.val().into_data()
    }

    #[test]
    fn test_count_correct_with_fixed_scores() {
        let device = Default::default();
        let scores = Tensor::<Inner, 2>::from_floats(
            [[0.1, 0.9, 0.0, 0.0, 0.0], [0.0, 0.2, 0.1, 0.7, 0.0]],
            &device,
        );
        let labels = Tensor::<Inner, 1, Int>::from_ints([1, 3], &device);
        assert_eq!(count_correct(scores, labels), 2);
    }

    #[test]
    fn test_count_correct_partial() {
        let device = Default::default();
        let scores = Tensor::<Inner, 2>::from_floats([[2.0, 1.0], [2.0, 1.0], [0.0, 3.0]], &device);
        let labels = Tensor::<Inner, 1, Int>::from_ints([0, 1, 0], &device);
        assert_eq!(count_correct(scores, labels), 1);
    }

    #[test]
    fn test_cross_entropy_is_non_negative() {
        let device = Default::default();
        let scores = Tensor::<Inner, 2>::from_floats([[5.0, -3.0], [0.0, 0.0]], &device);
        let labels = Tensor::<Inner, 1, Int>::from_ints([0, 1], &device);
        let loss: f64 = cross_entropy(scores, labels).into_scalar().elem();
        assert!(loss >= 0.0);
        // mean of (~0.000335, ln 2)
        assert!((loss - (0.000335 + std::f64::consts::LN_2) / 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_batches_leave_parameters_unchanged() {
        let device = Default::default();
        let model  = tiny_model();
        let before = weights(&model);

        let mut optim = AdamConfig::new().init();
        let loader = shuffled_loader::<TestBackend, _>(
            InMemDataset::<LabeledExample>::new(Vec::new()), 2, 1, &device,
        );
        let (model, totals) = train_epoch(model, &mut optim, loader.as_ref(), 1e-2, &ProgressBar::hidden());

        assert_eq!(totals.batches, 0);
        assert_eq!(weights(&model), before);
    }

    #[test]
    fn test_gradients_are_reset_between_batches() {
        // With plain SGD, step 2 must move the weights by exactly
        // lr * grad(weights after step 1). Any gradient left over
        // from step 1 would show up as an extra term.
        let device  = Default::default();
        let lr      = 0.5;
        let batcher = ClassificationBatcher::<TestBackend>::new(device);
        let batch   = batcher.batch(examples(2));

        let mut optim = SgdConfig::new().init();
        let (model1, _) = train_step(tiny_model(), &mut optim, batch.clone(), lr);

        // Gradient of the loss at the post-step-1 parameters, taken independently
        let logits = model1.classify(batch.input_ids.clone(), batch.attention_mask.clone());
        let grads  = cross_entropy(logits, batch.labels.clone()).backward();
        let g1     = model1.classifier.weight.val().grad(&grads).unwrap();
        let w1     = model1.classifier.weight.val().inner();

        let (model2, _) = train_step(model1, &mut optim, batch, lr);
        let w2 = model2.classifier.weight.val().inner();

        let expected = w1 - g1.mul_scalar(lr);
        let diff: f32 = (w2 - expected).abs().max().into_scalar().elem();
        assert!(diff < 1e-5, "stale gradient detected (diff {diff})");
    }

    #[test]
    fn test_train_step_reports_batch_outcome() {
        let device  = Default::default();
        let batcher = ClassificationBatcher::<TestBackend>::new(device);
        let mut optim = AdamConfig::new().init();
        let (_, outcome) = train_step(tiny_model(), &mut optim, batcher.batch(examples(2)), 1e-3);
        assert_eq!(outcome.size, 2);
        assert!(outcome.correct <= 2);
        assert!(outcome.loss >= 0.0);
    }

    #[test]
    fn test_single_epoch_single_batch_each() {
        let device    = Default::default();
        let mut optim = AdamConfig::new().init();
        let mut seen  = Vec::new();

        let (_, history) = train(
            tiny_model(),
            &mut optim,
            InMemDataset::new(examples(2)),
            InMemDataset::new(examples(2)),
            &quiet(1, 1e-3),
            &device,
            |_, m| {
                seen.push(m.summary_line());
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(seen.len(), 1);

        let m = &history[0];
        assert_eq!(m.epoch, 1);
        assert_eq!((m.train_size, m.val_size), (2, 2));

        // four numeric fields, each with exactly three decimals
        let fields: Vec<&str> = seen[0].split(" | ").skip(1).collect();
        assert_eq!(fields.len(), 4);
        for field in fields {
            let value = field.rsplit(": ").next().unwrap();
            let (_, decimals) = value.split_once('.').unwrap();
            assert_eq!(decimals.len(), 3, "field '{field}'");
        }
    }

    #[test]
    fn test_metrics_stay_in_range_over_epochs() {
        let device    = Default::default();
        let mut optim = AdamConfig::new().init();

        let (_, history) = train(
            tiny_model(),
            &mut optim,
            InMemDataset::new(examples(9)),
            InMemDataset::new(examples(3)),
            &quiet(3, 1e-2),
            &device,
            |_, _| Ok(()),
        )
        .unwrap();

        assert_eq!(history.len(), 3);
        for (i, m) in history.iter().enumerate() {
            assert_eq!(m.epoch, i + 1);
            assert!((0.0..=1.0).contains(&m.train_accuracy()));
            assert!((0.0..=1.0).contains(&m.val_accuracy()));
            assert!(m.train_loss() >= 0.0);
            assert!(m.val_loss() >= 0.0);
        }
    }

    #[test]
    fn test_training_changes_parameters() {
        let device    = Default::default();
        let model     = tiny_model();
        let before    = weights(&model);
        let mut optim = AdamConfig::new().init();

        let (model, _) = train(
            model,
            &mut optim,
            InMemDataset::new(examples(4)),
            InMemDataset::new(examples(2)),
            &quiet(1, 1e-2),
            &device,
            |_, _| Ok(()),
        )
        .unwrap();

        assert_ne!(weights(&model), before);
    }

    #[test]
    fn test_hook_error_stops_training() {
        let device    = Default::default();
        let mut optim = AdamConfig::new().init();
        let mut calls = 0;

        let result = train(
            tiny_model(),
            &mut optim,
            InMemDataset::new(examples(2)),
            InMemDataset::new(examples(2)),
            &quiet(3, 1e-3),
            &device,
            |_, _| {
                calls += 1;
                anyhow::bail!("disk full")
            },
        );

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_rejects_invalid_settings() {
        let device = Default::default();
        for cfg in [quiet(0, 1e-3), quiet(1, 0.0), quiet(1, -1.0)] {
            let mut optim = AdamConfig::new().init();
            let result = train(
                tiny_model(),
                &mut optim,
                InMemDataset::new(examples(2)),
                InMemDataset::new(examples(2)),
                &cfg,
                &device,
                |_, _| Ok(()),
            );
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_rejects_empty_partitions() {
        let device    = Default::default();
        let mut optim = AdamConfig::new().init();
        let result = train(
            tiny_model(),
            &mut optim,
            InMemDataset::new(Vec::new()),
            InMemDataset::new(examples(2)),
            &quiet(1, 1e-3),
            &device,
            |_, _| Ok(()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_evaluate_counts_every_example() {
        let device = Default::default();
        let model  = tiny_model().valid();
        let loader = sequential_loader::<Inner, _>(InMemDataset::new(examples(5)), 2, &device);
        let totals = evaluate(&model, loader.as_ref());
        // 5 examples in batches of 2 → 3 batches
        assert_eq!(totals.batches, 3);
        assert!(totals.correct <= 5);
    }

    #[test]
    fn test_incompatible_init_checkpoint_is_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let saved = TransformerClassifierConfig::new(40, SEQ, 8, 2, 1, 16, CLASSES, 0.0);
        ckpt.save_model_config(&saved).unwrap();

        assert!(ensure_compatible_checkpoint(&ckpt, &saved).is_ok());

        let other = TransformerClassifierConfig::new(40, SEQ, 8, 2, 1, 16, 2, 0.0);
        let err = format!("{:#}", ensure_compatible_checkpoint(&ckpt, &other).unwrap_err());
        assert!(err.contains("Cannot initialise from"), "{err}");
        assert!(err.contains("num_classes"), "{err}");
    }
}
