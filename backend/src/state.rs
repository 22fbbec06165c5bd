use crate::assembler::ProofAssembler;
use crate::db::Db;
use crate::prover::ProvingBackend;
use std::sync::Arc;
use trial_proofs::aggregate::QuorumPolicy;
use trial_proofs::predicates::Thresholds;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    /// One assembler per process: owns the proving-backend handle and the
    /// one-time readiness gate. Witness stores are created per request and
    /// never live here.
    pub assembler: Arc<ProofAssembler>,
    pub quorum: QuorumPolicy,
}

impl AppState {
    pub fn new(db: Db, backend: Arc<dyn ProvingBackend>) -> Self {
        Self {
            db,
            assembler: Arc::new(ProofAssembler::new(backend, Thresholds::default())),
            quorum: QuorumPolicy::default(),
        }
    }
}
