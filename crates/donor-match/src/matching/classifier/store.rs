use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::{Estimator, MatchModel};
use crate::matching::domain::FEATURE_NAMES;

#[derive(Debug, thiserror::Error)]
pub enum ModelStoreError {
    #[error("failed to access model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid model artifact: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model feature schema {found:?} does not match the encoder's feature order")]
    SchemaMismatch { found: Vec<String> },
    #[error("model artifact is structurally invalid: {0}")]
    Corrupt(&'static str),
}

pub fn save_model<P: AsRef<Path>>(model: &MatchModel, path: P) -> Result<(), ModelStoreError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, model)?;
    writer.flush()?;
    Ok(())
}

/// Loads an artifact and rejects it unless its feature schema is exactly the
/// encoder's column order.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<MatchModel, ModelStoreError> {
    let reader = BufReader::new(File::open(path)?);
    let model: MatchModel = serde_json::from_reader(reader)?;
    validate(&model)?;
    Ok(model)
}

fn validate(model: &MatchModel) -> Result<(), ModelStoreError> {
    let schema_matches = model.feature_names.len() == FEATURE_NAMES.len()
        && model
            .feature_names
            .iter()
            .zip(FEATURE_NAMES)
            .all(|(found, expected)| found == expected);
    if !schema_matches {
        return Err(ModelStoreError::SchemaMismatch {
            found: model.feature_names.clone(),
        });
    }

    match &model.estimator {
        Estimator::Forest(forest) if !forest.is_well_formed() => {
            Err(ModelStoreError::Corrupt("forest contains malformed trees"))
        }
        Estimator::Constant {
            positive_probability,
        } if !(0.0..=1.0).contains(positive_probability) => {
            Err(ModelStoreError::Corrupt("constant probability outside [0, 1]"))
        }
        _ => Ok(()),
    }
}
