use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use internship_match::recommender::{recommendation_router, Recommender};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_recommendation_routes(recommender: Arc<Recommender>) -> axum::Router {
    recommendation_router(recommender)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use internship_match::recommender::{
        GeoPoint, Pincode, PincodeDirectory, Qualification, UnavailableModel, VacancyId,
        VacancyListing,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let directory: PincodeDirectory = [(
            Pincode(110001),
            GeoPoint {
                latitude: 28.6139,
                longitude: 77.2090,
            },
        )]
        .into_iter()
        .collect();
        let catalog = vec![VacancyListing {
            vacancy_id: VacancyId(208),
            title: "Data Analyst".to_string(),
            required_qualification: Qualification::Ba,
            required_branch: "any".to_string(),
            pincode: Pincode(110001),
            stipend: 10000,
        }];
        let recommender = Arc::new(Recommender::new(
            catalog,
            directory,
            Arc::new(UnavailableModel),
            10,
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_recommendation_routes(recommender).layer(Extension(state))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let response = app(true)
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "healthy" }));
    }

    #[tokio::test]
    async fn readiness_reflects_startup_flag() {
        let response = app(false)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app(true)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ready");
    }

    #[tokio::test]
    async fn metrics_are_plain_text() {
        let response = app(true)
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn recommend_route_is_mounted() {
        let request = Request::post("/recommend")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "qualification": "B.Tech",
                    "branch": "CS",
                    "interest_emoji": "💻",
                    "pincode": 110001
                })
                .to_string(),
            ))
            .expect("request");
        let response = app(true).oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["recommendations"][0]["vacancy_id"], 208);
        assert_eq!(body["recommendations"][0]["score"], 0.5);
    }
}
