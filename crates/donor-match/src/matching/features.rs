//! Donor/request feature encoding.
//!
//! These functions are the single definition of the comparison features: the
//! dataset builder, the trainer, and the inference gateway all go through
//! [`encode`], so training-time and serving-time vectors are bit-identical.
//! Every function is total; missing fields arrive here as empty strings or
//! zero and fall into the documented default bucket.

use std::collections::HashSet;

use super::domain::{ConsentField, Donor, FeatureVector, OrganRequest};

const ORGAN_DELIMITER: char = ';';

pub fn encode(donor: &Donor, request: &OrganRequest) -> FeatureVector {
    FeatureVector {
        blood_match: blood_match(&request.blood_group, &donor.blood_group),
        organ_match: organ_match(donor.living_organs.as_deref(), &request.organ_needed),
        age_diff: age_diff(request.patient_age, donor.age),
        urgency: urgency_bucket(&request.urgency),
        city_match: city_match(&request.city, &donor.city),
        consent: consent_flag(&donor.consent),
    }
}

/// Case- and whitespace-insensitive blood group equality.
///
/// Two empty values compare equal, so a pair with no recorded blood group on
/// either side scores as a match.
pub fn blood_match(required: &str, offered: &str) -> u8 {
    u8::from(required.trim().to_uppercase() == offered.trim().to_uppercase())
}

pub fn organ_match(offers: Option<&str>, needed: &str) -> u8 {
    let needed = needed.trim().to_lowercase();
    u8::from(offer_set(offers).contains(&needed))
}

pub(crate) fn offer_set(offers: Option<&str>) -> HashSet<String> {
    offers
        .map(|raw| {
            raw.split(ORGAN_DELIMITER)
                .map(|organ| organ.trim().to_lowercase())
                .filter(|organ| !organ.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

pub fn age_diff(patient_age: u32, donor_age: u32) -> u32 {
    patient_age.abs_diff(donor_age)
}

/// Ordinal urgency: high=3, medium=2, low=1, anything else=0.
pub fn urgency_bucket(urgency: &str) -> u8 {
    match urgency.trim().to_lowercase().as_str() {
        "high" => 3,
        "medium" => 2,
        "low" => 1,
        _ => 0,
    }
}

/// Two empty cities compare equal, mirroring [`blood_match`].
pub fn city_match(required: &str, offered: &str) -> u8 {
    u8::from(required.trim().to_lowercase() == offered.trim().to_lowercase())
}

pub fn consent_flag(consent: &ConsentField) -> u8 {
    match consent {
        ConsentField::Flag(flag) => u8::from(*flag),
        ConsentField::Text(text) => u8::from(text.to_lowercase() == "true"),
        ConsentField::Absent => 0,
    }
}
