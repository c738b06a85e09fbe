//! Request-time scoring through the shared feature encoder.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::classifier::{MatchScorer, DECISION_THRESHOLD};
use super::domain::{Donor, FeatureVector, OrganRequest, FEATURE_NAMES};
use super::features::encode;

const DONOR_REQUIRED: [&str; 2] = ["donorId", "bloodGroup"];
const REQUEST_REQUIRED: [&str; 2] = ["patientId", "bloodGroup"];

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("match model is not loaded")]
    ModelUnavailable,
}

fn malformed(detail: impl Into<String>) -> InferenceError {
    InferenceError::MalformedInput(detail.into())
}

/// Match probability plus the thresholded decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "prediction")]
    pub decision: u8,
    pub probability: f64,
}

impl Prediction {
    pub fn from_probability(probability: f64) -> Self {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        Self {
            decision: u8::from(probability > DECISION_THRESHOLD),
            probability,
        }
    }
}

/// Accepted request bodies: raw records, or the six precomputed comparison fields.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictPayload {
    Pair {
        donor: Box<Donor>,
        request: Box<OrganRequest>,
    },
    Features(FeatureVector),
}

impl PredictPayload {
    pub fn from_value(value: Value) -> Result<Self, InferenceError> {
        let Value::Object(mut body) = value else {
            return Err(malformed("payload must be a JSON object"));
        };

        if body.contains_key("donor") || body.contains_key("request") {
            let donor = take_record(&mut body, "donor", &DONOR_REQUIRED)?;
            let request = take_record(&mut body, "request", &REQUEST_REQUIRED)?;
            let donor: Donor = serde_json::from_value(donor)
                .map_err(|err| malformed(format!("invalid donor record: {err}")))?;
            let request: OrganRequest = serde_json::from_value(request)
                .map_err(|err| malformed(format!("invalid request record: {err}")))?;
            return Ok(Self::Pair {
                donor: Box::new(donor),
                request: Box::new(request),
            });
        }

        require_fields(&body, None, &FEATURE_NAMES)?;
        let features: FeatureVector = serde_json::from_value(Value::Object(body))
            .map_err(|err| malformed(format!("invalid feature vector: {err}")))?;
        if let Some(field) = features.out_of_range_field() {
            return Err(malformed(format!("field `{field}` is out of range")));
        }
        Ok(Self::Features(features))
    }
}

fn take_record(
    body: &mut Map<String, Value>,
    section: &str,
    required: &[&str],
) -> Result<Value, InferenceError> {
    match body.remove(section) {
        Some(Value::Object(record)) => {
            require_fields(&record, Some(section), required)?;
            Ok(Value::Object(record))
        }
        Some(Value::Null) | None => Err(malformed(format!("missing required field `{section}`"))),
        Some(_) => Err(malformed(format!("field `{section}` must be an object"))),
    }
}

fn require_fields(
    record: &Map<String, Value>,
    section: Option<&str>,
    required: &[&str],
) -> Result<(), InferenceError> {
    for field in required {
        if record.get(*field).map_or(true, Value::is_null) {
            let path = match section {
                Some(section) => format!("{section}.{field}"),
                None => (*field).to_string(),
            };
            return Err(malformed(format!("missing required field `{path}`")));
        }
    }
    Ok(())
}

/// Scores payloads against an explicitly supplied, immutable model handle.
///
/// Cloning shares the handle; a gateway built with [`InferenceGateway::unloaded`]
/// answers every prediction with [`InferenceError::ModelUnavailable`].
#[derive(Clone, Default)]
pub struct InferenceGateway {
    model: Option<Arc<dyn MatchScorer>>,
}

impl std::fmt::Debug for InferenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceGateway")
            .field("model_loaded", &self.is_ready())
            .finish()
    }
}

impl InferenceGateway {
    pub fn new(model: Arc<dyn MatchScorer>) -> Self {
        Self { model: Some(model) }
    }

    pub fn unloaded() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }

    pub fn predict(
        &self,
        donor: &Donor,
        request: &OrganRequest,
    ) -> Result<Prediction, InferenceError> {
        let features = encode(donor, request);
        let prediction = self.predict_features(&features)?;
        debug!(
            donor_id = %donor.donor_id,
            patient_id = %request.patient_id,
            probability = prediction.probability,
            "scored donor/request pair"
        );
        Ok(prediction)
    }

    pub fn predict_features(&self, features: &FeatureVector) -> Result<Prediction, InferenceError> {
        let model = self.model.as_ref().ok_or(InferenceError::ModelUnavailable)?;
        Ok(Prediction::from_probability(model.score(features)))
    }

    /// Validates a raw JSON body before scoring; malformed input is reported
    /// ahead of model availability.
    pub fn predict_payload(&self, payload: Value) -> Result<Prediction, InferenceError> {
        match PredictPayload::from_value(payload)? {
            PredictPayload::Pair { donor, request } => self.predict(&donor, &request),
            PredictPayload::Features(features) => self.predict_features(&features),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedScorer(f64);

    impl MatchScorer for FixedScorer {
        fn score(&self, _features: &FeatureVector) -> f64 {
            self.0
        }
    }

    fn gateway(probability: f64) -> InferenceGateway {
        InferenceGateway::new(Arc::new(FixedScorer(probability)))
    }

    fn pair_payload() -> Value {
        json!({
            "donor": {
                "donorId": "DNR-1",
                "bloodGroup": "O+",
                "livingOrgans": "Kidney",
                "age": 40,
                "city": "Chennai",
                "consent": true
            },
            "request": {
                "patientId": "PTR-1",
                "patientAge": 38,
                "bloodGroup": "o+",
                "organNeeded": "kidney",
                "urgency": "High",
                "city": "Chennai"
            }
        })
    }

    #[test]
    fn decision_threshold_is_strict() {
        assert_eq!(Prediction::from_probability(0.5).decision, 0);
        assert_eq!(Prediction::from_probability(0.51).decision, 1);
        assert_eq!(Prediction::from_probability(f64::NAN).probability, 0.0);
    }

    #[test]
    fn pair_payload_is_encoded_then_scored() {
        let payload = PredictPayload::from_value(pair_payload()).expect("valid payload");
        let PredictPayload::Pair { donor, request } = &payload else {
            panic!("expected pair payload");
        };
        assert_eq!(encode(donor, request).blood_match, 1);

        let prediction = gateway(0.8).predict_payload(pair_payload()).expect("prediction");
        assert_eq!(prediction.decision, 1);
        assert!((prediction.probability - 0.8).abs() < 1e-12);
    }

    #[test]
    fn missing_blood_group_is_malformed_input() {
        let mut payload = pair_payload();
        payload["donor"]
            .as_object_mut()
            .expect("donor object")
            .remove("bloodGroup");

        let error = gateway(0.8).predict_payload(payload).expect_err("rejected");
        match error {
            InferenceError::MalformedInput(detail) => {
                assert!(detail.contains("donor.bloodGroup"), "{detail}")
            }
            other => panic!("expected malformed input, got {other:?}"),
        }
    }

    #[test]
    fn feature_payload_requires_all_fields_in_range() {
        let valid = json!({
            "bloodMatch": 1, "organMatch": 0, "ageDiff": 10,
            "urgency": 3, "cityMatch": 1, "consent": 1
        });
        let prediction = gateway(0.2).predict_payload(valid.clone()).expect("prediction");
        assert_eq!(prediction.decision, 0);

        let mut missing = valid.clone();
        missing.as_object_mut().expect("object").remove("consent");
        assert!(matches!(
            gateway(0.2).predict_payload(missing),
            Err(InferenceError::MalformedInput(_))
        ));

        let mut out_of_range = valid;
        out_of_range["urgency"] = json!(7);
        assert!(matches!(
            gateway(0.2).predict_payload(out_of_range),
            Err(InferenceError::MalformedInput(_))
        ));
    }

    #[test]
    fn non_object_payload_is_malformed() {
        assert!(matches!(
            gateway(0.2).predict_payload(json!([1, 2, 3])),
            Err(InferenceError::MalformedInput(_))
        ));
    }

    #[test]
    fn unloaded_gateway_reports_model_unavailable() {
        let gateway = InferenceGateway::unloaded();
        assert!(!gateway.is_ready());
        assert!(matches!(
            gateway.predict_payload(pair_payload()),
            Err(InferenceError::ModelUnavailable)
        ));
    }
}
