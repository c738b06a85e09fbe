//! Readers for the record-store exports consumed by the dataset builder.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::matching::coerce;
use crate::matching::domain::{ConsentField, Donor, DonorId, OrganRequest};

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("failed to read record export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid donor CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid record JSON data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("donor row {row} is missing its donorId")]
    MissingDonorId { row: usize },
}

/// Donor export row (`donorId,age,bloodGroup,livingOrgans,...,consent`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DonorRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    donor_id: Option<String>,
    #[serde(default)]
    age: String,
    #[serde(default)]
    blood_group: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    living_organs: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    last_blood_donation: Option<String>,
    #[serde(default)]
    city: String,
    #[serde(default)]
    consent: String,
}

impl DonorRow {
    fn into_donor(self, row: usize) -> Result<Donor, RecordError> {
        let donor_id = self.donor_id.ok_or(RecordError::MissingDonorId { row })?;

        Ok(Donor {
            donor_id: DonorId(donor_id),
            blood_group: self.blood_group,
            living_organs: self.living_organs,
            age: coerce::age_from_text(&self.age),
            city: self.city,
            consent: ConsentField::from_text(&self.consent),
            donated_organs: Vec::new(),
            last_blood_donation: self
                .last_blood_donation
                .as_deref()
                .and_then(coerce::parse_date),
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

pub fn read_donors_csv<R: Read>(reader: R) -> Result<Vec<Donor>, RecordError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);
    let mut donors = Vec::new();

    for (index, record) in csv_reader.deserialize::<DonorRow>().enumerate() {
        let row = record?;
        donors.push(row.into_donor(index + 1)?);
    }

    Ok(donors)
}

pub fn read_donors_csv_path<P: AsRef<Path>>(path: P) -> Result<Vec<Donor>, RecordError> {
    let file = std::fs::File::open(path)?;
    read_donors_csv(file)
}

pub fn read_donors_json<R: Read>(reader: R) -> Result<Vec<Donor>, RecordError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn read_requests_json<R: Read>(reader: R) -> Result<Vec<OrganRequest>, RecordError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn read_requests_json_path<P: AsRef<Path>>(path: P) -> Result<Vec<OrganRequest>, RecordError> {
    let file = std::fs::File::open(path)?;
    read_requests_json(std::io::BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Cursor;

    const DONORS: &str = "donorId,age,bloodGroup,livingOrgans,posthumousOrgans,medicalHistory,lastBloodDonation,city,state,consent\n\
DNR-1,40,O+,Kidney;Liver,Eyes,,2025-01-10,Chennai,TN,true\n\
DNR-2,,A+,,,,,Mumbai,MH,false\n";

    #[test]
    fn donors_csv_maps_export_columns() {
        let donors = read_donors_csv(Cursor::new(DONORS)).expect("csv parses");
        assert_eq!(donors.len(), 2);

        let first = &donors[0];
        assert_eq!(first.donor_id.0, "DNR-1");
        assert_eq!(first.age, 40);
        assert_eq!(first.living_organs.as_deref(), Some("Kidney;Liver"));
        assert_eq!(first.consent, ConsentField::Text("true".to_string()));
        assert_eq!(first.last_blood_donation, NaiveDate::from_ymd_opt(2025, 1, 10));

        let second = &donors[1];
        assert_eq!(second.age, 0);
        assert!(second.living_organs.is_none());
        assert!(second.last_blood_donation.is_none());
    }

    #[test]
    fn donors_csv_requires_identifier() {
        let csv = "donorId,age,bloodGroup\n,30,B+\n";
        let error = read_donors_csv(Cursor::new(csv)).expect_err("missing id rejected");
        assert!(matches!(error, RecordError::MissingDonorId { row: 1 }));
    }

    #[test]
    fn requests_json_parses_export_array() {
        let json = r#"[
            {"patientId": "PTR-1001", "patientAge": 35, "bloodGroup": "A+", "organNeeded": "Partial Liver", "urgency": "High", "city": "Bengaluru", "matchedDonors": ["DNR-1"]},
            {"patientId": "PTR-1002", "patientAge": 60, "bloodGroup": "B-", "organNeeded": "Kidney", "urgency": "Medium", "city": "Chennai"}
        ]"#;
        let requests = read_requests_json(Cursor::new(json)).expect("json parses");
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].matched_donors.len(), 1);
        assert!(requests[1].matched_donors.is_empty());
    }

    #[test]
    fn request_path_reader_propagates_io_errors() {
        let error = read_requests_json_path("./does-not-exist.json").expect_err("io error");
        match error {
            RecordError::Io(_) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
