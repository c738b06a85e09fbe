//! Ranks a donor pool for a single request using the match classifier.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::coerce;
use super::domain::{Donor, OrganRequest, RequestKind};
use super::features::{consent_flag, offer_set};
use super::inference::{InferenceError, InferenceGateway};

/// Candidates must score strictly above this to be ranked.
pub const MIN_MATCH_PROBABILITY: f64 = 0.4;
pub const BLOOD_DONATION_COOLDOWN_DAYS: i64 = 90;
pub const MAX_RANKED_DONORS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedDonor {
    #[serde(flatten)]
    pub donor: Donor,
    pub probability: f64,
    pub age_gap: u32,
}

/// Body of a ranking call: one request, the pool to rank, and an optional
/// reference date for the blood donation cooldown.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankQuery {
    pub request: OrganRequest,
    #[serde(default)]
    pub donors: Vec<Donor>,
    #[serde(default, deserialize_with = "coerce::optional_date")]
    pub today: Option<NaiveDate>,
}

pub fn rank_donors(
    gateway: &InferenceGateway,
    request: &OrganRequest,
    donors: &[Donor],
    today: NaiveDate,
) -> Result<Vec<RankedDonor>, InferenceError> {
    if !gateway.is_ready() {
        return Err(InferenceError::ModelUnavailable);
    }

    let mut ranked = Vec::new();
    for donor in donors.iter().filter(|donor| is_eligible(donor, request)) {
        let prediction = gateway.predict(donor, request)?;
        if prediction.probability <= MIN_MATCH_PROBABILITY {
            continue;
        }
        if request.request_type == RequestKind::Blood && in_cooldown(donor, today) {
            continue;
        }
        ranked.push(RankedDonor {
            donor: donor.clone(),
            probability: prediction.probability,
            age_gap: donor.age.abs_diff(request.patient_age),
        });
    }

    ranked.sort_by_key(|candidate| candidate.age_gap);
    ranked.truncate(MAX_RANKED_DONORS);

    info!(
        patient_id = %request.patient_id,
        pool = donors.len(),
        ranked = ranked.len(),
        "ranked donor pool"
    );
    Ok(ranked)
}

fn is_eligible(donor: &Donor, request: &OrganRequest) -> bool {
    let required = request.blood_group.trim();
    if required.is_empty() || required != donor.blood_group.trim() {
        return false;
    }
    if consent_flag(&donor.consent) == 0 {
        return false;
    }

    match request.request_type {
        RequestKind::Blood => true,
        RequestKind::Organ => {
            let needed = request.organ_needed.trim().to_lowercase();
            let already_donated = donor
                .donated_organs
                .iter()
                .any(|organ| organ.trim().to_lowercase() == needed);
            offer_set(donor.living_organs.as_deref()).contains(&needed) && !already_donated
        }
    }
}

fn in_cooldown(donor: &Donor, today: NaiveDate) -> bool {
    donor
        .last_blood_donation
        .is_some_and(|last| (today - last).num_days() < BLOOD_DONATION_COOLDOWN_DAYS)
}
