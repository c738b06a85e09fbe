use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::coerce;

/// Identifier wrapper for registered donors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DonorId(pub String);

/// Identifier wrapper for organ requests, keyed by patient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PatientId(pub String);

impl<'de> Deserialize<'de> for DonorId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        coerce::required_text(deserializer).map(Self)
    }
}

impl<'de> Deserialize<'de> for PatientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        coerce::required_text(deserializer).map(Self)
    }
}

impl std::fmt::Display for DonorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for PatientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Donor record as exported by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donor {
    pub donor_id: DonorId,
    #[serde(default, deserialize_with = "coerce::lenient_text")]
    pub blood_group: String,
    /// Semicolon-delimited living-organ offers, `None` when the donor offers nothing.
    #[serde(default, deserialize_with = "coerce::organ_offers")]
    pub living_organs: Option<String>,
    #[serde(default, deserialize_with = "coerce::lenient_age")]
    pub age: u32,
    #[serde(default, deserialize_with = "coerce::lenient_text")]
    pub city: String,
    #[serde(default)]
    pub consent: ConsentField,
    #[serde(default, deserialize_with = "coerce::organ_names")]
    pub donated_organs: Vec<String>,
    #[serde(default, deserialize_with = "coerce::optional_date")]
    pub last_blood_donation: Option<NaiveDate>,
}

/// Consent exactly as recorded; interpretation happens in the feature encoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConsentField {
    Flag(bool),
    Text(String),
    #[default]
    Absent,
}

impl<'de> Deserialize<'de> for ConsentField {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(Self::from_value(value))
    }
}

impl ConsentField {
    fn from_value(value: Option<Value>) -> Self {
        match value {
            Some(Value::Bool(flag)) => Self::Flag(flag),
            Some(Value::String(text)) => Self::Text(text),
            Some(Value::Number(number)) => Self::Text(number.to_string()),
            // Record store documents nest the flag as `{ "consentChecked": bool }`.
            Some(Value::Object(mut fields)) => {
                Self::from_value(fields.remove("consentChecked"))
            }
            _ => Self::Absent,
        }
    }

    /// Parses the textual form used by flat CSV exports.
    pub fn from_text(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Self::Absent
        } else {
            Self::Text(raw.to_string())
        }
    }
}

/// Whether the request is for a living organ or for blood.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    #[default]
    #[serde(alias = "organ", alias = "ORGAN")]
    Organ,
    #[serde(alias = "blood", alias = "BLOOD")]
    Blood,
}

/// Organ request raised on behalf of a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganRequest {
    pub patient_id: PatientId,
    #[serde(default, deserialize_with = "coerce::lenient_age")]
    pub patient_age: u32,
    #[serde(default, deserialize_with = "coerce::lenient_text")]
    pub blood_group: String,
    #[serde(default, deserialize_with = "coerce::lenient_text")]
    pub organ_needed: String,
    #[serde(default, deserialize_with = "coerce::lenient_text")]
    pub urgency: String,
    #[serde(default, deserialize_with = "coerce::lenient_text")]
    pub city: String,
    /// Donors already matched to this request; append-only in the record store.
    #[serde(default, deserialize_with = "matched_donor_ids")]
    pub matched_donors: Vec<DonorId>,
    #[serde(default, alias = "type")]
    pub request_type: RequestKind,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MatchedDonorEntry {
    Id(DonorId),
    Record {
        #[serde(rename = "donorId")]
        donor_id: DonorId,
    },
}

fn matched_donor_ids<'de, D>(deserializer: D) -> Result<Vec<DonorId>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<MatchedDonorEntry>>::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| match entry {
            MatchedDonorEntry::Id(donor_id) | MatchedDonorEntry::Record { donor_id } => donor_id,
        })
        .collect())
}

/// Number of comparison features fed to the classifier.
pub const FEATURE_COUNT: usize = 6;

/// Column order shared by the dataset artifact, the model schema, and inference.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "bloodMatch",
    "organMatch",
    "ageDiff",
    "urgency",
    "cityMatch",
    "consent",
];

/// Fixed-order numeric encoding of one donor/request comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    pub blood_match: u8,
    pub organ_match: u8,
    pub age_diff: u32,
    pub urgency: u8,
    pub city_match: u8,
    pub consent: u8,
}

impl FeatureVector {
    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        [
            f64::from(self.blood_match),
            f64::from(self.organ_match),
            f64::from(self.age_diff),
            f64::from(self.urgency),
            f64::from(self.city_match),
            f64::from(self.consent),
        ]
    }

    /// Checks the bounded fields; `ageDiff` is unbounded above.
    pub fn out_of_range_field(&self) -> Option<&'static str> {
        if self.blood_match > 1 {
            Some("bloodMatch")
        } else if self.organ_match > 1 {
            Some("organMatch")
        } else if self.urgency > 3 {
            Some("urgency")
        } else if self.city_match > 1 {
            Some("cityMatch")
        } else if self.consent > 1 {
            Some("consent")
        } else {
            None
        }
    }
}

/// One training row: a comparison plus its ground-truth label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub donor_id: DonorId,
    pub patient_id: PatientId,
    pub features: FeatureVector,
    pub label: u8,
}
