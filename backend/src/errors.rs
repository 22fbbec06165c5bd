use crate::assembler::AssembleError;
use crate::prover::ProverError;
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use thiserror::Error;
use trial_proofs::errors::ProofError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("proving backend unavailable: {0}")]
    Unavailable(String),

    #[error("internal error")]
    Internal,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
        };

        (status, Json(ErrorBody { error: msg })).into_response()
    }
}

impl From<ProofError> for ApiError {
    fn from(err: ProofError) -> Self {
        match err {
            ProofError::MalformedDescriptor(_)
            | ProofError::InvalidWitness(_)
            | ProofError::DivideByZero => ApiError::BadRequest(err.to_string()),
            ProofError::SignalMismatch(_) | ProofError::Serialization(_) => ApiError::Internal,
        }
    }
}

impl From<ProverError> for ApiError {
    fn from(err: ProverError) -> Self {
        match err {
            ProverError::Unavailable(m) => ApiError::Unavailable(m),
            ProverError::Rejected(m) => ApiError::BadRequest(m),
            ProverError::Contract(_) => ApiError::Internal,
        }
    }
}

impl From<AssembleError> for ApiError {
    fn from(err: AssembleError) -> Self {
        match err {
            AssembleError::Core(e) => e.into(),
            AssembleError::Prover(e) => e.into(),
        }
    }
}
