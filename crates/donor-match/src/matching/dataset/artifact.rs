use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::matching::domain::{DonorId, FeatureVector, LabeledExample, PatientId};

/// Header of the dataset CSV, in column order.
pub const DATASET_COLUMNS: [&str; 9] = [
    "donorId",
    "patientId",
    "bloodMatch",
    "organMatch",
    "ageDiff",
    "urgency",
    "cityMatch",
    "consent",
    "label",
];

/// Flat dataset row; column order is the on-disk contract.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetRow {
    donor_id: String,
    patient_id: String,
    blood_match: u8,
    organ_match: u8,
    age_diff: u32,
    urgency: u8,
    city_match: u8,
    consent: u8,
    label: u8,
}

impl From<&LabeledExample> for DatasetRow {
    fn from(example: &LabeledExample) -> Self {
        let features = &example.features;
        Self {
            donor_id: example.donor_id.0.clone(),
            patient_id: example.patient_id.0.clone(),
            blood_match: features.blood_match,
            organ_match: features.organ_match,
            age_diff: features.age_diff,
            urgency: features.urgency,
            city_match: features.city_match,
            consent: features.consent,
            label: example.label,
        }
    }
}

impl From<DatasetRow> for LabeledExample {
    fn from(row: DatasetRow) -> Self {
        Self {
            donor_id: DonorId(row.donor_id),
            patient_id: PatientId(row.patient_id),
            features: FeatureVector {
                blood_match: row.blood_match,
                organ_match: row.organ_match,
                age_diff: row.age_diff,
                urgency: row.urgency,
                city_match: row.city_match,
                consent: row.consent,
            },
            label: row.label,
        }
    }
}

pub fn write_dataset<W: Write>(writer: W, examples: &[LabeledExample]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    // Serialized rows carry their own header; an empty dataset still needs one.
    if examples.is_empty() {
        csv_writer.write_record(DATASET_COLUMNS)?;
    }
    for example in examples {
        csv_writer.serialize(DatasetRow::from(example))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_dataset_path<P: AsRef<Path>>(
    path: P,
    examples: &[LabeledExample],
) -> Result<(), csv::Error> {
    let file = std::fs::File::create(path)?;
    write_dataset(file, examples)
}

pub fn read_dataset<R: Read>(reader: R) -> Result<Vec<LabeledExample>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader
        .deserialize::<DatasetRow>()
        .map(|row| row.map(LabeledExample::from))
        .collect()
}

pub fn read_dataset_path<P: AsRef<Path>>(path: P) -> Result<Vec<LabeledExample>, csv::Error> {
    let file = std::fs::File::open(path)?;
    read_dataset(file)
}
