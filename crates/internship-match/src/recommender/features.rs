//! Canonical feature derivation shared by training and serving.
//!
//! The scoring model is fitted against exactly these definitions, so any change here must be
//! paired with retraining. [`FEATURE_COLUMNS`] fixes the field order the model consumes.

use super::domain::{CandidateProfile, Qualification, VacancyListing};
use super::geo::DistanceResolver;
use serde::{Deserialize, Serialize};

/// Vacancies further than this from the candidate fail the distance rule.
pub const MAX_PREFERRED_DISTANCE_KM: f64 = 100.0;

/// Sentinel branch value that matches every candidate branch.
pub const ANY_BRANCH: &str = "any";

pub const FEATURE_COLUMNS: [&str; 7] = [
    "qualification",
    "branch",
    "interest_emoji",
    "distance_km",
    "rule_qualification_met",
    "rule_distance_ok",
    "rule_branch_match",
];

/// Fixed-schema representation of one candidate/vacancy pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub qualification: String,
    pub branch: String,
    pub interest_emoji: String,
    pub distance_km: Option<f64>,
    pub rule_qualification_met: u8,
    pub rule_distance_ok: u8,
    pub rule_branch_match: u8,
}

impl FeatureVector {
    /// Numeric pass-through columns in schema order; a missing distance becomes NaN.
    pub fn numeric_columns(&self) -> [f64; 4] {
        [
            self.distance_km.unwrap_or(f64::NAN),
            f64::from(self.rule_qualification_met),
            f64::from(self.rule_distance_ok),
            f64::from(self.rule_branch_match),
        ]
    }
}

pub fn qualification_met(candidate: &Qualification, required: &Qualification) -> bool {
    match (candidate.rank(), required.rank()) {
        (Some(have), Some(need)) => have >= need,
        _ => false,
    }
}

pub fn branch_matches(candidate_branch: &str, required_branch: &str) -> bool {
    candidate_branch == required_branch || required_branch.to_lowercase() == ANY_BRANCH
}

pub fn distance_ok(distance_km: Option<f64>) -> bool {
    distance_km.is_some_and(|distance| distance <= MAX_PREFERRED_DISTANCE_KM)
}

/// Derives the feature vector for a pair. Never fails: unknown locations produce a missing
/// distance and unranked qualifications fail the qualification rule.
pub fn extract<R>(
    candidate: &CandidateProfile,
    vacancy: &VacancyListing,
    resolver: &R,
) -> FeatureVector
where
    R: DistanceResolver + ?Sized,
{
    let distance_km = resolver.distance_km(candidate.pincode, vacancy.pincode);

    FeatureVector {
        qualification: candidate.qualification.label().to_string(),
        branch: candidate.branch.clone(),
        interest_emoji: candidate.interest_emoji.clone(),
        distance_km,
        rule_qualification_met: flag(qualification_met(
            &candidate.qualification,
            &vacancy.required_qualification,
        )),
        rule_distance_ok: flag(distance_ok(distance_km)),
        rule_branch_match: flag(branch_matches(&candidate.branch, &vacancy.required_branch)),
    }
}

fn flag(value: bool) -> u8 {
    u8::from(value)
}
