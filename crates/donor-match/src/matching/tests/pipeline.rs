use std::sync::Arc;

use super::common::*;
use crate::matching::classifier::{train_examples, DECISION_THRESHOLD};
use crate::matching::dataset::build;
use crate::matching::features::encode;
use crate::matching::inference::InferenceGateway;

#[test]
fn registry_trains_a_model_that_serves_through_the_gateway() {
    let (donors, requests) = registry();
    let examples = build(&donors, &requests);
    assert_eq!(examples.len(), donors.len() * requests.len());
    assert_eq!(examples.iter().filter(|example| example.label == 1).count(), 24);

    let model = train_examples(&examples, &training_config()).expect("model trains");
    assert!(!model.is_constant());
    assert!(model.holdout().expect("holdout evaluated").accuracy > 0.9);

    let gateway = InferenceGateway::new(Arc::new(model));
    let kidney = gateway
        .predict(&donors[2], &requests[0])
        .expect("kidney donor scored");
    let liver = gateway
        .predict(&donors[3], &requests[0])
        .expect("liver donor scored");

    assert_eq!(kidney.decision, 1);
    assert!(kidney.probability > DECISION_THRESHOLD);
    assert_eq!(liver.decision, 0);
}

#[test]
fn gateway_and_dataset_share_the_encoder() {
    let (donors, requests) = registry();
    let examples = build(&donors, &requests);

    for (row, example) in examples.iter().enumerate() {
        let donor = &donors[row / requests.len()];
        let request = &requests[row % requests.len()];
        assert_eq!(example.donor_id, donor.donor_id);
        assert_eq!(example.features, encode(donor, request));
    }
}

#[test]
fn single_class_registry_still_produces_bounded_scores() {
    let (donors, mut requests) = registry();
    for request in &mut requests {
        request.matched_donors.clear();
    }
    let examples = build(&donors, &requests);
    let model = train_examples(&examples, &training_config()).expect("model trains");
    assert!(model.is_constant());

    let gateway = InferenceGateway::new(Arc::new(model));
    let prediction = gateway
        .predict(&donors[0], &requests[0])
        .expect("constant model scores");
    assert!((0.0..=1.0).contains(&prediction.probability));
    assert_eq!(prediction.decision, 0);
}
