use super::encoder::FeatureEncoder;
use super::gbdt::GradientBoostedTrees;
use super::{ModelError, ScoringError, ScoringModel};
use crate::recommender::features::{FeatureVector, FEATURE_COLUMNS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Persisted, self-describing scoring model: fitted encoder plus ensemble.
///
/// Stored as JSON so an artifact can be inspected by hand. `feature_columns` records the
/// schema the encoder was fitted against; loading refuses artifacts built for another one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    pub feature_columns: Vec<String>,
    encoder: FeatureEncoder,
    ensemble: GradientBoostedTrees,
}

impl ModelArtifact {
    pub fn new(encoder: FeatureEncoder, ensemble: GradientBoostedTrees) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            trained_at: Utc::now(),
            feature_columns: FEATURE_COLUMNS.iter().map(|name| name.to_string()).collect(),
            encoder,
            ensemble,
        }
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn ensemble(&self) -> &GradientBoostedTrees {
        &self.ensemble
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ModelError> {
        let artifact: Self = serde_json::from_reader(reader)?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), ModelError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: self.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        if self.feature_columns.iter().map(String::as_str).ne(FEATURE_COLUMNS) {
            return Err(ModelError::SchemaMismatch {
                found: self.feature_columns.clone(),
                expected: FEATURE_COLUMNS.iter().map(|name| name.to_string()).collect(),
            });
        }
        if self.encoder.width() != self.ensemble.width() {
            return Err(ModelError::WidthMismatch {
                encoder: self.encoder.width(),
                ensemble: self.ensemble.width(),
            });
        }
        if !self.ensemble.is_well_formed() {
            return Err(ModelError::CorruptEnsemble);
        }
        Ok(())
    }
}

impl ScoringModel for ModelArtifact {
    fn score(&self, features: &FeatureVector) -> Result<f64, ScoringError> {
        let row = self.encoder.encode(features)?;
        Ok(self.ensemble.predict_proba(&row))
    }
}
