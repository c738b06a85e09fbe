use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use super::inference::{InferenceError, InferenceGateway};
use super::ranking::{rank_donors, RankQuery};

/// Router builder exposing prediction and donor ranking endpoints.
pub fn match_router(gateway: InferenceGateway) -> Router {
    Router::new()
        .route("/predict", post(predict_handler).fallback(method_not_allowed))
        .route(
            "/api/v1/match/donors",
            post(rank_handler).fallback(method_not_allowed),
        )
        .fallback(route_not_found)
        .with_state(gateway)
}

async fn method_not_allowed(method: Method, uri: Uri) -> Response {
    let payload = json!({
        "error": format!("method {method} is not allowed on {}", uri.path()),
    });
    (StatusCode::METHOD_NOT_ALLOWED, Json(payload)).into_response()
}

async fn route_not_found(uri: Uri) -> Response {
    let payload = json!({
        "error": format!("no route for {}", uri.path()),
    });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}

pub(crate) async fn predict_handler(
    State(gateway): State<InferenceGateway>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match gateway.predict_payload(payload) {
        Ok(prediction) => (StatusCode::OK, Json(prediction)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn rank_handler(
    State(gateway): State<InferenceGateway>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    let query: RankQuery = match serde_json::from_value(payload) {
        Ok(query) => query,
        Err(error) => {
            return error_response(InferenceError::MalformedInput(error.to_string()));
        }
    };
    let today = query.today.unwrap_or_else(|| Utc::now().date_naive());

    match rank_donors(&gateway, &query.request, &query.donors, today) {
        Ok(ranked) => (StatusCode::OK, Json(json!({ "matchedDonors": ranked }))).into_response(),
        Err(error) => error_response(error),
    }
}

fn rejection_response(rejection: JsonRejection) -> Response {
    let payload = json!({
        "error": format!("malformed input: {}", rejection.body_text()),
    });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn error_response(error: InferenceError) -> Response {
    let status = match &error {
        InferenceError::MalformedInput(_) => StatusCode::BAD_REQUEST,
        InferenceError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    };
    warn!(status = status.as_u16(), %error, "match request rejected");
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}
