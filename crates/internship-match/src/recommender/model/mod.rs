//! Scoring model contract and the boosted-tree implementation behind it.

mod artifact;
mod encoder;
mod gbdt;

pub use artifact::{ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use encoder::FeatureEncoder;
pub use gbdt::{BoostingParams, GradientBoostedTrees, GradientBoostingTrainer};

use super::domain::Label;
use super::features::FeatureVector;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Acceptance-probability model consumed by the ranking engine.
///
/// Implementations are loaded once and shared read-only across requests, hence `Send + Sync`.
pub trait ScoringModel: Send + Sync {
    /// Probability in `0.0..=1.0` that the candidate accepts the vacancy.
    fn score(&self, features: &FeatureVector) -> Result<f64, ScoringError>;

    /// Scores and rejects anything that is not a finite probability.
    fn checked_score(&self, features: &FeatureVector) -> Result<f64, ScoringError> {
        let probability = self.score(features)?;
        if probability.is_finite() && (0.0..=1.0).contains(&probability) {
            Ok(probability)
        } else {
            Err(ScoringError::InvalidProbability(probability))
        }
    }
}

/// Fits a scoring model from labelled feature vectors.
pub trait Trainer {
    type Model: ScoringModel;

    fn train(
        &self,
        features: &[FeatureVector],
        labels: &[Label],
    ) -> Result<Self::Model, ModelError>;
}

/// Placeholder used when no artifact could be found at startup. Every score fails, so
/// rankings degrade to the neutral fallback instead of refusing to serve.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableModel;

impl ScoringModel for UnavailableModel {
    fn score(&self, _features: &FeatureVector) -> Result<f64, ScoringError> {
        Err(ScoringError::Unavailable)
    }
}

/// Loads the artifact at `path` for serving.
///
/// A missing file yields [`UnavailableModel`] so the service still answers with neutral scores;
/// an artifact that exists but cannot be read or validated is an error.
pub fn load_for_serving(path: &Path) -> Result<Arc<dyn ScoringModel>, ModelError> {
    match ModelArtifact::load(path) {
        Ok(artifact) => {
            info!(
                path = %path.display(),
                trained_at = %artifact.trained_at,
                trees = artifact.ensemble().tree_count(),
                "loaded model artifact"
            );
            Ok(Arc::new(artifact))
        }
        Err(ModelError::Io(error)) if error.kind() == ErrorKind::NotFound => {
            warn!(
                path = %path.display(),
                "model artifact not found, serving neutral scores"
            );
            Ok(Arc::new(UnavailableModel))
        }
        Err(error) => Err(error),
    }
}

/// Per-pair scoring failure. Recovered by the ranking engine, never surfaced to callers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("no scoring model is loaded")]
    Unavailable,
    #[error("feature '{name}' is not a finite number")]
    NonFiniteFeature { name: &'static str },
    #[error("feature '{name}' must be 0 or 1, got {value}")]
    NonBinaryFlag { name: &'static str, value: u8 },
    #[error("model produced invalid probability {0}")]
    InvalidProbability(f64),
}

/// Failures while fitting, loading, or persisting a model artifact.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to access model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed model artifact: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported model artifact version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("model artifact expects columns {found:?}, serving extracts {expected:?}")]
    SchemaMismatch {
        found: Vec<String>,
        expected: Vec<String>,
    },
    #[error("encoder produces {encoder} columns but the ensemble was fitted on {ensemble}")]
    WidthMismatch { encoder: usize, ensemble: usize },
    #[error("model artifact contains a malformed tree ensemble")]
    CorruptEnsemble,
    #[error("cannot train on an empty feature set")]
    EmptyTrainingSet,
    #[error("got {features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },
    #[error("feature matrix rows must all have {expected} columns")]
    RaggedMatrix { expected: usize },
    #[error(transparent)]
    Encoding(#[from] ScoringError),
}
