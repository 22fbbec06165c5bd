//! Proof artifacts and per-hospital contributions.
//!
//! An artifact is immutable once created; regenerating one requires a fresh
//! salt. Raw witness values appear only in `ProofMetadata`, which stays on
//! the hospital side; the shared `HospitalContribution` carries derived
//! values exclusively.

use crate::constants::efficacy_bucket;
use crate::predicates::PublicSignals;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hospital-side summary attached to an artifact.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofMetadata {
    /// Rounded-down efficacy percent.
    pub efficacy_rate: u64,
    pub sample_size: u64,
    pub p_value: f64,
    pub generated_at: DateTime<Utc>,
}

/// Everything a verifier needs for one hospital's claim.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofArtifact {
    /// Study fingerprint, lowercase hex.
    pub commitment_hex: String,
    pub public_signals: PublicSignals,
    /// Opaque proving-backend output, base64.
    pub proof_b64: String,
    /// Hex digest of the proof blob.
    pub proof_hash: String,
    pub verified: bool,
    pub metadata: ProofMetadata,
}

impl ProofArtifact {
    /// Project the artifact into the study-shared contribution record.
    ///
    /// `safety_flag` comes from the witness store; the artifact itself never
    /// holds the raw adverse-event count.
    pub fn contribution(&self, hospital_id: &str, safety_flag: bool) -> HospitalContribution {
        HospitalContribution {
            hospital_id: hospital_id.to_string(),
            commitment_hex: self.commitment_hex.clone(),
            proof_hash: self.proof_hash.clone(),
            verified: self.verified,
            signals: self.public_signals,
            efficacy_bucket: efficacy_bucket(self.metadata.efficacy_rate),
            safety_flag,
        }
    }
}

/// One hospital's entry in a study. One per hospital per study.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HospitalContribution {
    pub hospital_id: String,
    pub commitment_hex: String,
    pub proof_hash: String,
    pub verified: bool,
    pub signals: PublicSignals,
    /// Index into `constants::EFFICACY_BUCKETS`, not the raw rate.
    pub efficacy_bucket: usize,
    /// Thresholded adverse-event boolean, never the raw count.
    pub safety_flag: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicates::{evaluate, Thresholds};
    use crate::witness::{sample_statistics, PrivateWitnessStore};

    #[test]
    fn contribution_carries_bucket_not_rate() {
        let witness = PrivateWitnessStore::new(sample_statistics()).unwrap();
        let out = evaluate(&witness, &Thresholds::default(), 3).unwrap();

        let artifact = ProofArtifact {
            commitment_hex: "00".repeat(32),
            public_signals: out.signals,
            proof_b64: "AAAA".to_string(),
            proof_hash: "ff".repeat(32),
            verified: true,
            metadata: ProofMetadata {
                efficacy_rate: out.efficacy_rate,
                sample_size: witness.patient_count(),
                p_value: witness.p_value(),
                generated_at: Utc::now(),
            },
        };

        let c = artifact.contribution("hospital-a", witness.safety_flag());
        // 79% lands in the 70-79 bucket.
        assert_eq!(c.efficacy_bucket, 2);
        assert!(c.verified);

        let json = serde_json::to_string(&c).unwrap();
        assert!(!json.contains("\"efficacy_rate\""));
        assert!(!json.contains("\"sample_size\""));
    }
}
