//! Internship vacancy recommendation: feature derivation, scoring, ranking and training.

pub mod catalog;
pub mod domain;
pub mod features;
pub mod geo;
pub mod model;
pub mod ranking;
pub mod router;
pub mod training;

pub use catalog::{CatalogError, TrainingRecord};
pub use domain::{
    CandidateProfile, GeoPoint, Label, Pincode, Qualification, VacancyId, VacancyListing,
};
pub use features::{FeatureVector, FEATURE_COLUMNS};
pub use geo::{DistanceResolver, PincodeDirectory};
pub use model::{ModelArtifact, ModelError, ScoringError, ScoringModel, Trainer, UnavailableModel};
pub use ranking::{RecommendError, RecommendationEntry, Recommender, DEFAULT_TOP_K, NEUTRAL_SCORE};
pub use router::recommendation_router;
pub use training::{TrainingConfig, TrainingError, TrainingOrchestrator, TrainingReport};
