//! Proof assembly: fingerprint, predicates, backend call, artifact.
//!
//! Local validation always runs first, so malformed descriptors and invalid
//! witnesses never reach the proving backend. The backend is probed for
//! readiness once per assembler lifetime; afterwards failures surface
//! immediately.

use crate::prover::{PrivateData, ProofRequest, ProverError, ProvingBackend, PublicMetadata};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use trial_proofs::artifact::{ProofArtifact, ProofMetadata};
use trial_proofs::canonical;
use trial_proofs::descriptor::StudyDescriptor;
use trial_proofs::errors::ProofError;
use trial_proofs::predicates::{self, Thresholds};
use trial_proofs::witness::PrivateWitnessStore;

/// Readiness poll: one probe per interval, bounded attempts.
const READY_POLL_ATTEMPTS: u32 = 30;
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error(transparent)]
    Core(#[from] ProofError),

    #[error(transparent)]
    Prover(#[from] ProverError),
}

/// Identifies the statement's study and hospital for the backend.
pub struct StatementMeta {
    pub study_id: String,
    pub hospital_id: String,
}

pub struct ProofAssembler {
    backend: Arc<dyn ProvingBackend>,
    thresholds: Thresholds,
    ready: OnceCell<()>,
}

impl ProofAssembler {
    pub fn new(backend: Arc<dyn ProvingBackend>, thresholds: Thresholds) -> Self {
        Self {
            backend,
            thresholds,
            ready: OnceCell::new(),
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Wait for the backend's first readiness signal.
    ///
    /// Runs at most once per assembler; concurrent callers share the wait.
    async fn ensure_ready(&self) -> Result<(), ProverError> {
        self.ready
            .get_or_try_init(|| async {
                for attempt in 1..=READY_POLL_ATTEMPTS {
                    match self.backend.health().await {
                        Ok(h) if h.status == "ready" => {
                            tracing::info!(contract = %h.contract, "proving backend ready");
                            return Ok(());
                        }
                        Ok(h) => {
                            tracing::debug!(status = %h.status, attempt, "proving backend not ready")
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, attempt, "proving backend probe failed")
                        }
                    }
                    tokio::time::sleep(READY_POLL_INTERVAL).await;
                }
                Err(ProverError::Unavailable(format!(
                    "backend not ready after {READY_POLL_ATTEMPTS} probes"
                )))
            })
            .await
            .map(|_| ())
    }

    /// Build a verifiable artifact for one hospital's witness.
    ///
    /// Idempotent per (descriptor, witness, salt): the public signals are
    /// computed locally and identical across reruns; the backend only has to
    /// re-verify, not reproduce bit-identical proof bytes. Callers retrying a
    /// failed run must pick a fresh salt.
    pub async fn assemble(
        &self,
        descriptor: &StudyDescriptor,
        witness: &PrivateWitnessStore,
        salt: u64,
        meta: &StatementMeta,
    ) -> Result<ProofArtifact, AssembleError> {
        let fingerprint = canonical::fingerprint(descriptor)?;
        let outcome = predicates::evaluate(witness, &self.thresholds, salt)?;

        self.ensure_ready().await?;

        let request = ProofRequest {
            private_data: PrivateData {
                patient_count: witness.patient_count(),
                treatment_success: witness.treatment_success(),
                control_success: witness.control_success(),
                control_count: witness.control_count(),
                p_value: witness.p_value(),
            },
            public_metadata: PublicMetadata {
                study_id: meta.study_id.clone(),
                hospital_id: meta.hospital_id.clone(),
                study_type: descriptor.design.study_type.clone(),
                condition: descriptor.condition.code.clone(),
                timestamp: Utc::now().to_rfc3339(),
            },
            public_signals: outcome.signals.to_vec().to_vec(),
        };

        let response = self.backend.submit(&request).await?;

        // The backend must attest to exactly the statement it was given.
        if response.public_signals != request.public_signals {
            return Err(ProverError::Contract(
                "backend returned a different public signal vector".to_string(),
            )
            .into());
        }

        if !response.verified {
            tracing::warn!(
                hospital = %meta.hospital_id,
                "backend returned an unverified proof"
            );
        }

        Ok(ProofArtifact {
            commitment_hex: hex::encode(fingerprint),
            public_signals: outcome.signals,
            proof_b64: response.proof,
            proof_hash: response.proof_hash,
            verified: response.verified,
            metadata: ProofMetadata {
                efficacy_rate: outcome.efficacy_rate,
                sample_size: witness.patient_count(),
                p_value: witness.p_value(),
                generated_at: Utc::now(),
            },
        })
    }
}
