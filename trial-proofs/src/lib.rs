//! Proof layer for the multi-hospital clinical-trial verification ledger.
//!
//! This crate contains:
//! - Canonical serialization + fingerprinting of public study descriptors.
//! - The private witness store and the validity predicates evaluated over it.
//! - Proof-artifact and contribution types shared with the coordinator.
//! - Study-level aggregation and the tiered disclosure filter.
//!
//! Everything here is pure: no I/O, no async. The external proving backend is
//! driven from the coordinator crate and only its data contract appears here.

pub mod constants;
pub mod errors;
pub mod descriptor;
pub mod canonical;
pub mod witness;
pub mod predicates;
pub mod artifact;
pub mod aggregate;
pub mod disclosure;
