//! Donor/recipient match pipeline: record import, feature encoding, label
//! assignment, dataset construction, classifier training, and inference.
//!
//! Training and serving share [`features::encode`]; the trained model is an
//! immutable [`MatchModel`] threaded explicitly through [`InferenceGateway`].

pub mod classifier;
pub(crate) mod coerce;
pub mod dataset;
pub mod domain;
pub mod features;
pub mod inference;
pub mod labels;
pub mod ranking;
pub mod router;

#[cfg(test)]
mod tests;

pub use classifier::{
    load_model, save_model, train, train_examples, ClassificationReport, MatchModel, MatchScorer,
    ModelStoreError, TrainingError, DECISION_THRESHOLD,
};
pub use dataset::{build, build_partitioned, RecordError};
pub use domain::{
    ConsentField, Donor, DonorId, FeatureVector, LabeledExample, OrganRequest, PatientId,
    RequestKind, FEATURE_COUNT, FEATURE_NAMES,
};
pub use features::encode;
pub use inference::{InferenceError, InferenceGateway, PredictPayload, Prediction};
pub use labels::{label, MatchedDonorSnapshot};
pub use ranking::{rank_donors, RankQuery, RankedDonor};
pub use router::match_router;
