use std::collections::HashSet;

use super::domain::{DonorId, OrganRequest, PatientId};

/// Matched-donor set of one request, captured once per dataset pass.
///
/// Labels computed from a snapshot never observe later appends to the
/// request's matched-donor list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedDonorSnapshot {
    patient_id: PatientId,
    matched: HashSet<DonorId>,
}

impl MatchedDonorSnapshot {
    pub fn capture(request: &OrganRequest) -> Self {
        Self {
            patient_id: request.patient_id.clone(),
            matched: request.matched_donors.iter().cloned().collect(),
        }
    }

    pub fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    pub fn label(&self, donor_id: &DonorId) -> u8 {
        u8::from(self.matched.contains(donor_id))
    }

    pub fn len(&self) -> usize {
        self.matched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }
}

/// One-off label for a single pair; batch callers should reuse a snapshot.
pub fn label(donor_id: &DonorId, request: &OrganRequest) -> u8 {
    MatchedDonorSnapshot::capture(request).label(donor_id)
}
