use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Extension;
use axum::Json;
use donor_match::matching::{match_router, InferenceGateway};
use serde_json::json;
use std::sync::atomic::Ordering;

pub(crate) fn with_match_routes(gateway: InferenceGateway) -> axum::Router {
    match_router(gateway)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready once the listener is bound and a model is loaded.
pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let listening = state.readiness.load(Ordering::Relaxed);

    let (status, label) = match (listening, state.model_loaded) {
        (true, true) => (StatusCode::OK, "ready"),
        (true, false) => (StatusCode::SERVICE_UNAVAILABLE, "model_unavailable"),
        (false, _) => (StatusCode::SERVICE_UNAVAILABLE, "initializing"),
    };

    (
        status,
        Json(json!({ "status": label, "modelLoaded": state.model_loaded })),
    )
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
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(listening: bool, model_loaded: bool) -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState {
            readiness: Arc::new(AtomicBool::new(listening)),
            metrics: Arc::new(recorder.handle()),
            model_loaded,
        }
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        serde_json::from_slice(&body).expect("json")
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_requires_listener_and_model() {
        let response = readiness_endpoint(Extension(state(true, true)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let response = readiness_endpoint(Extension(state(true, false)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(read_json(response).await["status"], "model_unavailable");

        let response = readiness_endpoint(Extension(state(false, true)))
            .await
            .into_response();
        assert_eq!(read_json(response).await["status"], "initializing");
    }

    #[tokio::test]
    async fn unloaded_service_answers_predict_with_service_unavailable() {
        let app = with_match_routes(InferenceGateway::unloaded())
            .layer(Extension(state(true, false)));

        let request = Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"bloodMatch":1,"organMatch":1,"ageDiff":4,"urgency":3,"cityMatch":1,"consent":1}"#,
            ))
            .expect("request");

        let response = app.oneshot(request).await.expect("router dispatch");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let payload = read_json(response).await;
        assert!(payload.get("error").is_some());
    }

    #[tokio::test]
    async fn operational_routes_are_mounted() {
        let app = with_match_routes(InferenceGateway::unloaded())
            .layer(Extension(state(true, false)));

        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("router dispatch");
        assert_eq!(read_json(response).await["status"], "ok");
    }
}
