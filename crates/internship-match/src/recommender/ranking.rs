//! Ranking engine: score every catalog vacancy for one candidate and keep the best `top_k`.

use super::domain::{CandidateProfile, Pincode, Qualification, VacancyId, VacancyListing};
use super::features;
use super::geo::{DistanceResolver, PincodeDirectory};
use super::model::ScoringModel;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Score assigned when the model cannot produce a probability for a pair.
pub const NEUTRAL_SCORE: f64 = 0.5;

pub const DEFAULT_TOP_K: usize = 10;

/// One ranked vacancy as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationEntry {
    pub vacancy_id: VacancyId,
    pub title: String,
    pub required_qualification: Qualification,
    pub required_branch: String,
    pub pincode: Pincode,
    pub stipend: u32,
    /// `null` when either location is missing from the pincode table.
    pub distance_km: Option<f64>,
    pub score: f64,
}

/// Scores each vacancy and returns at most `top_k` entries by descending score.
///
/// Equal scores keep catalog order. Scoring failures are logged and replaced by
/// [`NEUTRAL_SCORE`], so a single bad pair never aborts the ranking.
pub fn rank_vacancies<R, M>(
    candidate: &CandidateProfile,
    vacancies: &[VacancyListing],
    resolver: &R,
    model: &M,
    top_k: usize,
) -> Vec<RecommendationEntry>
where
    R: DistanceResolver + ?Sized,
    M: ScoringModel + ?Sized,
{
    let mut entries: Vec<RecommendationEntry> = vacancies
        .iter()
        .map(|vacancy| {
            let features = features::extract(candidate, vacancy, resolver);
            let score = match model.checked_score(&features) {
                Ok(score) => score,
                Err(error) => {
                    warn!(
                        vacancy_id = %vacancy.vacancy_id,
                        %error,
                        "scoring failed, using neutral score"
                    );
                    NEUTRAL_SCORE
                }
            };

            RecommendationEntry {
                vacancy_id: vacancy.vacancy_id,
                title: vacancy.title.clone(),
                required_qualification: vacancy.required_qualification.clone(),
                required_branch: vacancy.required_branch.clone(),
                pincode: vacancy.pincode,
                stipend: vacancy.stipend,
                distance_km: features.distance_km,
                score,
            }
        })
        .collect();

    entries.sort_by(|a, b| b.score.total_cmp(&a.score));
    entries.truncate(top_k);
    entries
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecommendError {
    #[error("vacancy catalog is empty")]
    EmptyCatalog,
}

/// Immutable serving snapshot shared across request handlers.
#[derive(Clone)]
pub struct Recommender {
    catalog: Arc<Vec<VacancyListing>>,
    directory: Arc<PincodeDirectory>,
    model: Arc<dyn ScoringModel>,
    top_k: usize,
}

impl Recommender {
    /// `top_k` of zero is raised to one.
    pub fn new(
        catalog: Vec<VacancyListing>,
        directory: PincodeDirectory,
        model: Arc<dyn ScoringModel>,
        top_k: usize,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            directory: Arc::new(directory),
            model,
            top_k: top_k.max(1),
        }
    }

    pub fn catalog_len(&self) -> usize {
        self.catalog.len()
    }

    pub fn pincode_count(&self) -> usize {
        self.directory.len()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn recommend(
        &self,
        candidate: &CandidateProfile,
    ) -> Result<Vec<RecommendationEntry>, RecommendError> {
        if self.catalog.is_empty() {
            return Err(RecommendError::EmptyCatalog);
        }

        let entries = rank_vacancies(
            candidate,
            &self.catalog,
            self.directory.as_ref(),
            self.model.as_ref(),
            self.top_k,
        );
        debug!(
            pincode = %candidate.pincode,
            returned = entries.len(),
            "ranked vacancies"
        );
        Ok(entries)
    }
}

impl std::fmt::Debug for Recommender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recommender")
            .field("catalog", &self.catalog.len())
            .field("pincodes", &self.directory.len())
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}
