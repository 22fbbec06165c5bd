//! Proving-backend capability interface.
//!
//! The real cryptographic prover is an external service; this module pins the
//! request/response contract it must satisfy and provides two adapters: an
//! HTTP client for a deployed backend and a deterministic mock for local
//! runs. Swapping in a real zero-knowledge prover touches nothing outside
//! this file.

use async_trait::async_trait;
use base64::Engine;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use trial_proofs::constants::NUM_PUBLIC_SIGNALS;
use trial_proofs::predicates::PublicSignals;

/// Mock proof blob length in bytes.
const MOCK_PROOF_LEN: usize = 192;

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("proving backend unavailable: {0}")]
    Unavailable(String),

    #[error("proving backend rejected statement: {0}")]
    Rejected(String),

    #[error("proving backend contract violation: {0}")]
    Contract(String),
}

/// Witness fields submitted to the prover. Never persisted or logged.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateData {
    pub patient_count: u64,
    pub treatment_success: u64,
    pub control_success: u64,
    pub control_count: u64,
    pub p_value: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicMetadata {
    pub study_id: String,
    pub hospital_id: String,
    pub study_type: String,
    pub condition: String,
    pub timestamp: String,
}

/// The statement handed to the prover: witness plus the public-signal vector
/// it must attest to.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub private_data: PrivateData,
    pub public_metadata: PublicMetadata,
    pub public_signals: Vec<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResponse {
    /// Opaque proof bytes, base64.
    pub proof: String,
    pub public_signals: Vec<u64>,
    /// Hex digest of the proof bytes.
    pub proof_hash: String,
    pub verified: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendHealth {
    pub status: String,
    pub contract: String,
}

#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    error: String,
}

#[async_trait]
pub trait ProvingBackend: Send + Sync {
    async fn health(&self) -> Result<BackendHealth, ProverError>;

    async fn submit(&self, request: &ProofRequest) -> Result<ProofResponse, ProverError>;
}

/// Client for a deployed proving backend.
pub struct HttpProvingBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpProvingBackend {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ProvingBackend for HttpProvingBackend {
    async fn health(&self) -> Result<BackendHealth, ProverError> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProverError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ProverError::Unavailable(format!(
                "health probe returned {}",
                resp.status()
            )));
        }

        resp.json::<BackendHealth>()
            .await
            .map_err(|e| ProverError::Contract(format!("invalid health body: {e}")))
    }

    async fn submit(&self, request: &ProofRequest) -> Result<ProofResponse, ProverError> {
        let url = format!("{}/prove", self.base_url);
        let resp = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProverError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let msg = match resp.json::<BackendErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => format!("status {status}"),
            };
            return Err(ProverError::Rejected(msg));
        }

        resp.json::<ProofResponse>()
            .await
            .map_err(|e| ProverError::Contract(format!("invalid proof body: {e}")))
    }
}

/// Deterministic proof-shape generator for local runs and tests.
///
/// The blob is derived from the statement, so resubmitting the same
/// (witness, signals) statement reproduces the same artifact. The output has
/// the shape of a proof, NOT the security of one; a real backend must honor
/// the same signal contract.
#[derive(Default)]
pub struct MockProvingBackend;

impl MockProvingBackend {
    fn statement_seed(request: &ProofRequest) -> Result<[u8; 32], ProverError> {
        let bytes = serde_json::to_vec(request)
            .map_err(|e| ProverError::Contract(format!("unserializable statement: {e}")))?;
        Ok(Sha256::digest(&bytes).into())
    }

    /// Re-derive the predicate bits from the witness and compare with the
    /// claimed signals. A real prover enforces this inside the circuit.
    fn check_statement(request: &ProofRequest) -> Result<(), ProverError> {
        let signals = PublicSignals::from_vec(&request.public_signals)
            .map_err(|e| ProverError::Rejected(e.to_string()))?;

        let data = &request.private_data;
        if data.patient_count == 0 {
            return Err(ProverError::Rejected(
                "statement has zero patients".to_string(),
            ));
        }

        let efficacy_rate = 100 * data.treatment_success / data.patient_count;
        let p_scaled = (data.p_value * 10_000.0).floor() as u64;

        let valid_sample_size = data.patient_count >= signals.min_patients;
        let valid_efficacy = efficacy_rate >= signals.min_efficacy_rate;
        let valid_significance = p_scaled < signals.max_p_value_scaled;
        let overall = valid_sample_size && valid_efficacy && valid_significance;

        if signals.valid_sample_size != valid_sample_size
            || signals.valid_efficacy != valid_efficacy
            || signals.valid_significance != valid_significance
            || signals.overall_valid != overall
        {
            return Err(ProverError::Rejected(
                "public signals inconsistent with witness".to_string(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl ProvingBackend for MockProvingBackend {
    async fn health(&self) -> Result<BackendHealth, ProverError> {
        Ok(BackendHealth {
            status: "ready".to_string(),
            contract: "trial-validity-v1".to_string(),
        })
    }

    async fn submit(&self, request: &ProofRequest) -> Result<ProofResponse, ProverError> {
        if request.public_signals.len() != NUM_PUBLIC_SIGNALS {
            return Err(ProverError::Rejected("malformed signal vector".to_string()));
        }
        Self::check_statement(request)?;

        let mut rng = ChaCha20Rng::from_seed(Self::statement_seed(request)?);
        let mut blob = vec![0u8; MOCK_PROOF_LEN];
        rng.fill_bytes(&mut blob);

        let proof_hash: [u8; 32] = Sha256::digest(&blob).into();

        Ok(ProofResponse {
            proof: base64::engine::general_purpose::STANDARD.encode(&blob),
            public_signals: request.public_signals.clone(),
            proof_hash: hex::encode(proof_hash),
            verified: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(public_signals: Vec<u64>) -> ProofRequest {
        ProofRequest {
            private_data: PrivateData {
                patient_count: 1200,
                treatment_success: 950,
                control_success: 310,
                control_count: 600,
                p_value: 0.02,
            },
            public_metadata: PublicMetadata {
                study_id: "study-1".to_string(),
                hospital_id: "hospital-a".to_string(),
                study_type: "interventional".to_string(),
                condition: "E11".to_string(),
                timestamp: "2026-08-07T00:00:00Z".to_string(),
            },
            public_signals,
        }
    }

    fn consistent_signals() -> Vec<u64> {
        // 79% efficacy, p_scaled 200, all predicates true.
        vec![100, 70, 500, 12345, 1, 1, 1, 1]
    }

    #[tokio::test]
    async fn mock_is_deterministic_per_statement() {
        let backend = MockProvingBackend;
        let req = request(consistent_signals());

        let a = backend.submit(&req).await.unwrap();
        let b = backend.submit(&req).await.unwrap();
        assert_eq!(a.proof, b.proof);
        assert_eq!(a.proof_hash, b.proof_hash);
        assert!(a.verified);

        // A different commitment scalar changes the statement and the blob.
        let mut other_signals = consistent_signals();
        other_signals[3] = 54321;
        let c = backend.submit(&request(other_signals)).await.unwrap();
        assert_ne!(a.proof, c.proof);
    }

    #[tokio::test]
    async fn mock_rejects_inconsistent_signals() {
        let backend = MockProvingBackend;
        let mut signals = consistent_signals();
        signals[4] = 0; // claim inadequate sample size for a 1200-patient cohort
        let err = backend.submit(&request(signals)).await.unwrap_err();
        assert!(matches!(err, ProverError::Rejected(_)));
    }

    #[tokio::test]
    async fn mock_echoes_the_signal_vector() {
        let backend = MockProvingBackend;
        let req = request(consistent_signals());
        let resp = backend.submit(&req).await.unwrap();
        assert_eq!(resp.public_signals, req.public_signals);
    }

    #[tokio::test]
    async fn mock_reports_ready() {
        let health = MockProvingBackend.health().await.unwrap();
        assert_eq!(health.status, "ready");
    }

    #[test]
    fn wire_shapes_are_camel_case() {
        let req = request(consistent_signals());
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"privateData\""));
        assert!(json.contains("\"patientCount\""));
        assert!(json.contains("\"publicMetadata\""));
        assert!(json.contains("\"publicSignals\""));
    }
}
