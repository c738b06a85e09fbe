use chrono::NaiveDate;
use donor_match::matching::dataset::{read_donors_csv_path, read_donors_json};
use donor_match::matching::{load_model, Donor, InferenceGateway, RecordError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) model_loaded: bool,
}

/// Loads the persisted model once. A missing or invalid artifact leaves the
/// gateway unloaded so the service still starts and answers 503.
pub(crate) fn load_gateway(path: &Path) -> InferenceGateway {
    match load_model(path) {
        Ok(model) => {
            info!(
                path = %path.display(),
                trained_rows = model.trained_rows,
                constant = model.is_constant(),
                "match model loaded"
            );
            InferenceGateway::new(Arc::new(model))
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "match model unavailable; predictions will be rejected"
            );
            InferenceGateway::unloaded()
        }
    }
}

/// Reads a donor export, choosing the JSON reader for `.json` files and the
/// CSV reader otherwise.
pub(crate) fn read_donors(path: &Path) -> Result<Vec<Donor>, RecordError> {
    let is_json = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    if is_json {
        read_donors_json(BufReader::new(File::open(path)?))
    } else {
        read_donors_csv_path(path)
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
