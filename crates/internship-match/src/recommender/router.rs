use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{CandidateProfile, Pincode, Qualification};
use super::ranking::{RecommendError, RecommendationEntry, Recommender};

/// Candidate attributes accepted by `POST /recommend`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendRequest {
    pub qualification: String,
    pub branch: String,
    pub interest_emoji: String,
    /// Forms submit `null` for a blank pincode; the candidate still ranks without distances.
    #[serde(default)]
    pub pincode: Option<u32>,
}

impl From<RecommendRequest> for CandidateProfile {
    fn from(request: RecommendRequest) -> Self {
        Self {
            qualification: Qualification::parse(&request.qualification),
            branch: request.branch,
            interest_emoji: request.interest_emoji,
            pincode: request.pincode.map_or(Pincode::UNSPECIFIED, Pincode),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<RecommendationEntry>,
}

/// Router builder exposing the scoring request.
pub fn recommendation_router(recommender: Arc<Recommender>) -> Router {
    Router::new()
        .route("/recommend", post(recommend_handler))
        .with_state(recommender)
}

pub(crate) async fn recommend_handler(
    State(recommender): State<Arc<Recommender>>,
    Json(request): Json<RecommendRequest>,
) -> Response {
    let candidate = CandidateProfile::from(request);
    match recommender.recommend(&candidate) {
        Ok(recommendations) => {
            (StatusCode::OK, Json(RecommendResponse { recommendations })).into_response()
        }
        Err(error @ RecommendError::EmptyCatalog) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(payload)).into_response()
        }
    }
}
