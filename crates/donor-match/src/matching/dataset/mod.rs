//! Labeled dataset construction from donor and request exports.

pub mod artifact;
pub mod records;

use std::num::NonZeroUsize;
use std::thread;

use tracing::{info, warn};

use super::domain::{Donor, LabeledExample, OrganRequest};
use super::features::encode;
use super::labels::MatchedDonorSnapshot;

pub use artifact::{read_dataset, read_dataset_path, write_dataset, write_dataset_path};
pub use records::{
    read_donors_csv, read_donors_csv_path, read_donors_json, read_requests_json,
    read_requests_json_path, RecordError,
};

/// Cross-joins every donor against every request.
///
/// No eligibility filtering happens here; the classifier learns which pairs
/// matter. Rows are ordered donor-major, request-minor. Either input being
/// empty yields an empty dataset and a warning.
pub fn build(donors: &[Donor], requests: &[OrganRequest]) -> Vec<LabeledExample> {
    if is_empty_input(donors, requests) {
        return Vec::new();
    }

    let snapshots: Vec<MatchedDonorSnapshot> =
        requests.iter().map(MatchedDonorSnapshot::capture).collect();

    let mut examples = Vec::with_capacity(donors.len() * requests.len());
    for donor in donors {
        for (request, snapshot) in requests.iter().zip(&snapshots) {
            examples.push(example(donor, request, snapshot));
        }
    }

    log_summary(&examples, donors.len(), requests.len());
    examples
}

/// Same output as [`build`], with the request list split across scoped workers.
pub fn build_partitioned(
    donors: &[Donor],
    requests: &[OrganRequest],
    workers: NonZeroUsize,
) -> Vec<LabeledExample> {
    if is_empty_input(donors, requests) {
        return Vec::new();
    }

    let snapshots: Vec<MatchedDonorSnapshot> =
        requests.iter().map(MatchedDonorSnapshot::capture).collect();
    let chunk_len = requests.len().div_ceil(workers.get());

    // One column (all donors, in order) per request.
    let columns: Vec<Vec<LabeledExample>> = thread::scope(|scope| {
        let handles: Vec<_> = requests
            .chunks(chunk_len)
            .zip(snapshots.chunks(chunk_len))
            .map(|(request_chunk, snapshot_chunk)| {
                scope.spawn(move || {
                    request_chunk
                        .iter()
                        .zip(snapshot_chunk)
                        .map(|(request, snapshot)| {
                            donors
                                .iter()
                                .map(|donor| example(donor, request, snapshot))
                                .collect::<Vec<_>>()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(columns) => columns,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    let mut cursors: Vec<_> = columns.into_iter().map(Vec::into_iter).collect();
    let mut examples = Vec::with_capacity(donors.len() * requests.len());
    for _ in donors {
        for cursor in cursors.iter_mut() {
            examples.extend(cursor.next());
        }
    }

    log_summary(&examples, donors.len(), requests.len());
    examples
}

fn example(donor: &Donor, request: &OrganRequest, snapshot: &MatchedDonorSnapshot) -> LabeledExample {
    LabeledExample {
        donor_id: donor.donor_id.clone(),
        patient_id: request.patient_id.clone(),
        features: encode(donor, request),
        label: snapshot.label(&donor.donor_id),
    }
}

fn is_empty_input(donors: &[Donor], requests: &[OrganRequest]) -> bool {
    if donors.is_empty() || requests.is_empty() {
        warn!(
            donors = donors.len(),
            requests = requests.len(),
            "no data: dataset build skipped"
        );
        return true;
    }
    false
}

fn log_summary(examples: &[LabeledExample], donors: usize, requests: usize) {
    let positives = examples.iter().filter(|example| example.label == 1).count();
    info!(
        donors,
        requests,
        rows = examples.len(),
        positives,
        "labeled dataset built"
    );
}
