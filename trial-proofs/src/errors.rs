use thiserror::Error;

/// Errors raised by the proof layer.
///
/// Messages name the offending field or predicate, never the private value
/// that triggered the failure.
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("invalid witness: {0}")]
    InvalidWitness(String),

    #[error("efficacy rate undefined: patient count is zero")]
    DivideByZero,

    #[error("public signal vector mismatch: {0}")]
    SignalMismatch(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
