//! Training orchestration: historical records in, fitted model and evaluation report out.

use super::catalog::TrainingRecord;
use super::domain::Label;
use super::features::{self, FeatureVector};
use super::geo::DistanceResolver;
use super::model::{ModelError, ScoringModel, Trainer};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    /// Share of each class held out for evaluation.
    pub test_fraction: f64,
    pub seed: u64,
    /// Probability above which a held-out pair counts as predicted accepted; a tie is rejected.
    pub threshold: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            threshold: 0.5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("no usable training rows ({dropped} dropped for missing fields or locations)")]
    NoUsableRows { dropped: usize },
    #[error("every usable row is labelled '{}'; need both outcomes to train", .label.label())]
    SingleClass { label: Label },
    #[error("only {rows} row(s) labelled '{}'; need at least 2 to split", .label.label())]
    ClassTooSmall { label: Label, rows: usize },
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Summary of one training run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub total_records: usize,
    pub dropped_rows: usize,
    pub usable_rows: usize,
    pub accepted_rows: usize,
    pub rejected_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub predicted_positive: usize,
    pub true_positive: usize,
    /// `tp / (tp + fp)` on the held-out split; zero when nothing was predicted accepted.
    pub precision: f64,
}

#[derive(Debug)]
pub struct TrainingOutcome<M> {
    pub model: M,
    pub report: TrainingReport,
}

pub struct TrainingOrchestrator<T> {
    trainer: T,
    config: TrainingConfig,
}

impl<T: Trainer> TrainingOrchestrator<T> {
    pub fn new(trainer: T, config: TrainingConfig) -> Self {
        Self { trainer, config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn run<R>(
        &self,
        records: &[TrainingRecord],
        resolver: &R,
    ) -> Result<TrainingOutcome<T::Model>, TrainingError>
    where
        R: DistanceResolver + ?Sized,
    {
        let (rows, labels) = usable_rows(records, resolver);
        let dropped = records.len() - rows.len();
        info!(
            total = records.len(),
            usable = rows.len(),
            dropped,
            "prepared training rows"
        );

        if rows.is_empty() {
            return Err(TrainingError::NoUsableRows { dropped });
        }

        let accepted = labels
            .iter()
            .filter(|label| **label == Label::Accepted)
            .count();
        let rejected = labels.len() - accepted;
        for (label, count) in [(Label::Accepted, accepted), (Label::Rejected, rejected)] {
            if count == 0 {
                let present = match label {
                    Label::Accepted => Label::Rejected,
                    Label::Rejected => Label::Accepted,
                };
                return Err(TrainingError::SingleClass { label: present });
            }
        }
        for (label, count) in [(Label::Accepted, accepted), (Label::Rejected, rejected)] {
            if count < 2 {
                return Err(TrainingError::ClassTooSmall { label, rows: count });
            }
        }

        let (train_index, test_index) =
            stratified_split(&labels, self.config.test_fraction, self.config.seed);
        let train_rows: Vec<FeatureVector> =
            train_index.iter().map(|&index| rows[index].clone()).collect();
        let train_labels: Vec<Label> = train_index.iter().map(|&index| labels[index]).collect();

        let model = self.trainer.train(&train_rows, &train_labels)?;

        let mut predicted_positive = 0;
        let mut true_positive = 0;
        for &index in &test_index {
            let probability =
                ScoringModel::checked_score(&model, &rows[index]).map_err(ModelError::from)?;
            if probability > self.config.threshold {
                predicted_positive += 1;
                if labels[index] == Label::Accepted {
                    true_positive += 1;
                }
            }
        }

        let report = TrainingReport {
            total_records: records.len(),
            dropped_rows: dropped,
            usable_rows: rows.len(),
            accepted_rows: accepted,
            rejected_rows: rejected,
            train_rows: train_index.len(),
            test_rows: test_index.len(),
            predicted_positive,
            true_positive,
            precision: precision(true_positive, predicted_positive),
        };
        info!(
            train = report.train_rows,
            test = report.test_rows,
            precision = report.precision,
            "training complete"
        );

        Ok(TrainingOutcome { model, report })
    }
}

/// Feature rows and labels for every record with all inputs present and a resolvable distance.
fn usable_rows<R>(records: &[TrainingRecord], resolver: &R) -> (Vec<FeatureVector>, Vec<Label>)
where
    R: DistanceResolver + ?Sized,
{
    records
        .iter()
        .filter_map(|record| {
            let (candidate, vacancy, label) = record.labelled_pair()?;
            let row = features::extract(&candidate, &vacancy, resolver);
            row.distance_km.is_some().then_some((row, label))
        })
        .unzip()
}

/// Splits row indices into `(train, test)` while preserving class balance.
///
/// Each class contributes `round(n × test_fraction)` rows to the test side, clamped so both
/// sides keep at least one row of every class with two or more members. Indices are returned
/// in ascending order.
pub fn stratified_split(
    labels: &[Label],
    test_fraction: f64,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [Label::Rejected, Label::Accepted] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == class)
            .map(|(index, _)| index)
            .collect();
        if members.is_empty() {
            continue;
        }
        members.shuffle(&mut rng);

        let wanted = (members.len() as f64 * test_fraction).round() as usize;
        let held_out = if members.len() < 2 {
            0
        } else {
            wanted.clamp(1, members.len() - 1)
        };
        test.extend_from_slice(&members[..held_out]);
        train.extend_from_slice(&members[held_out..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

fn precision(true_positive: usize, predicted_positive: usize) -> f64 {
    if predicted_positive == 0 {
        0.0
    } else {
        true_positive as f64 / predicted_positive as f64
    }
}
