use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trial_proofs::aggregate::AggregatedResult;
use trial_proofs::descriptor::StudyDescriptor;
use trial_proofs::disclosure::PrivacyLevel;
use trial_proofs::predicates::PublicSignals;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct StudyCreateRequest {
    pub descriptor: StudyDescriptor,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudyCreateResponse {
    pub study_id: Uuid,
    pub fingerprint_hex: String,
    pub methodology_fingerprint_hex: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudyGetResponse {
    pub study_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub fingerprint_hex: String,
    pub methodology_fingerprint_hex: String,
    pub contributions_total: u64,
    pub contributions_verified: u64,
    pub quorum_met: bool,
}

/// Witness fields as submitted by a hospital.
///
/// Deliberately derives only `Deserialize`: the raw values exist for the
/// duration of one proof-generation call and are never echoed, logged, or
/// persisted.
#[derive(Deserialize)]
pub struct WitnessInput {
    pub patient_count: u64,
    pub treatment_success: u64,
    pub control_success: u64,
    pub control_count: u64,
    pub p_value: f64,
    pub adverse_events: u64,
    pub data_quality_score: u8,
    /// Hospital secret key, 32 bytes hex.
    pub secret_key_hex: String,
}

#[derive(Deserialize)]
pub struct ContributionRequest {
    pub hospital_id: String,
    pub statistics: WitnessInput,
    /// Fresh salt per proving run; generated when absent. Retries after a
    /// failure must supply a new one.
    pub salt: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContributionResponse {
    pub study_id: Uuid,
    pub hospital_id: String,
    pub position: u64,
    pub commitment_hex: String,
    pub proof_hash: String,
    pub verified: bool,
    pub public_signals: PublicSignals,
    pub efficacy_bucket: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AggregateRequest {
    /// Override the default quorum for this aggregation run.
    pub min_verified: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AggregateResponse {
    pub aggregation_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub result: AggregatedResult,
}

#[derive(Debug, Deserialize)]
pub struct DisclosureParams {
    pub level: PrivacyLevel,
}
