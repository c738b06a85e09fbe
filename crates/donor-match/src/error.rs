use crate::config::ConfigError;
use crate::matching::classifier::{ModelStoreError, TrainingError};
use crate::matching::dataset::RecordError;
use crate::matching::inference::InferenceError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Records(RecordError),
    Dataset(csv::Error),
    Training(TrainingError),
    ModelStore(ModelStoreError),
    Inference(InferenceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Records(err) => write!(f, "record import error: {}", err),
            AppError::Dataset(err) => write!(f, "dataset artifact error: {}", err),
            AppError::Training(err) => write!(f, "training error: {}", err),
            AppError::ModelStore(err) => write!(f, "model store error: {}", err),
            AppError::Inference(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Records(err) => Some(err),
            AppError::Dataset(err) => Some(err),
            AppError::Training(err) => Some(err),
            AppError::ModelStore(err) => Some(err),
            AppError::Inference(err) => Some(err),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Inference(InferenceError::MalformedInput(_)) | AppError::Records(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Inference(InferenceError::ModelUnavailable) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Dataset(_)
            | AppError::Training(_)
            | AppError::ModelStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<RecordError> for AppError {
    fn from(value: RecordError) -> Self {
        Self::Records(value)
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        Self::Dataset(value)
    }
}

impl From<TrainingError> for AppError {
    fn from(value: TrainingError) -> Self {
        Self::Training(value)
    }
}

impl From<ModelStoreError> for AppError {
    fn from(value: ModelStoreError) -> Self {
        Self::ModelStore(value)
    }
}

impl From<InferenceError> for AppError {
    fn from(value: InferenceError) -> Self {
        Self::Inference(value)
    }
}
