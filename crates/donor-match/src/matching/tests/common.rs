use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::{json, Value};

use crate::config::TrainingConfig;
use crate::matching::classifier::MatchScorer;
use crate::matching::domain::{
    ConsentField, Donor, DonorId, FeatureVector, OrganRequest, PatientId, RequestKind,
};
use crate::matching::inference::InferenceGateway;

/// Scores a pair as a match when blood, organ, and consent all line up.
pub(super) struct RuleScorer;

impl MatchScorer for RuleScorer {
    fn score(&self, features: &FeatureVector) -> f64 {
        if features.blood_match == 1 && features.organ_match == 1 && features.consent == 1 {
            0.9
        } else {
            0.1
        }
    }
}

pub(super) fn rule_gateway() -> InferenceGateway {
    InferenceGateway::new(Arc::new(RuleScorer))
}

pub(super) fn donor(id: &str, blood_group: &str, organs: &str, age: u32) -> Donor {
    Donor {
        donor_id: DonorId(id.to_string()),
        blood_group: blood_group.to_string(),
        living_organs: Some(organs.to_string()),
        age,
        city: "Chennai".to_string(),
        consent: ConsentField::Flag(true),
        donated_organs: Vec::new(),
        last_blood_donation: None,
    }
}

pub(super) fn request(patient: &str, blood_group: &str, organ: &str, matched: &[&str]) -> OrganRequest {
    OrganRequest {
        patient_id: PatientId(patient.to_string()),
        patient_age: 45,
        blood_group: blood_group.to_string(),
        organ_needed: organ.to_string(),
        urgency: "High".to_string(),
        city: "Chennai".to_string(),
        matched_donors: matched.iter().map(|id| DonorId(id.to_string())).collect(),
        request_type: RequestKind::Organ,
    }
}

/// A registry where O+ kidney donors were historically matched to O+ kidney
/// requests and nothing else was.
pub(super) fn registry() -> (Vec<Donor>, Vec<OrganRequest>) {
    let mut donors = Vec::new();
    for i in 0..12 {
        donors.push(donor(&format!("DNR-K{i}"), "O+", "Kidney", 30 + i));
        donors.push(donor(&format!("DNR-L{i}"), "B+", "Liver", 30 + i));
    }
    let kidney_matches: Vec<String> = (0..12).map(|i| format!("DNR-K{i}")).collect();
    let kidney_matches: Vec<&str> = kidney_matches.iter().map(String::as_str).collect();

    let requests = vec![
        request("PTR-1", "O+", "kidney", &kidney_matches),
        request("PTR-2", "O+", "kidney", &kidney_matches),
        request("PTR-3", "AB-", "heart", &[]),
    ];
    (donors, requests)
}

pub(super) fn training_config() -> TrainingConfig {
    TrainingConfig {
        trees: 15,
        ..TrainingConfig::default()
    }
}

pub(super) fn predict_body() -> Value {
    json!({
        "donor": {
            "donorId": "DNR-K1",
            "bloodGroup": "O+",
            "livingOrgans": "Kidney;Liver",
            "age": 31,
            "city": "Chennai",
            "consent": { "consentChecked": true }
        },
        "request": {
            "patientId": "PTR-1",
            "patientAge": 45,
            "bloodGroup": "O+",
            "organNeeded": "Kidney",
            "urgency": "High",
            "city": "Chennai"
        }
    })
}

pub(super) fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serialize body")))
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
