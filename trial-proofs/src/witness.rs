//! Private per-hospital witness store.
//!
//! The store is the privacy boundary: it is never serialized or logged
//! wholesale, and only derived values (predicates, buckets, hashes) cross it.
//! Each hospital session owns exactly one store; stores are never shared or
//! merged across hospitals.

use crate::constants::{ADVERSE_EVENT_ALERT_PER_MILLE, PVALUE_SCALE};
use crate::errors::ProofError;
use sha2::{Digest, Sha256};
use std::fmt;

/// One hospital's raw trial statistics plus the key binding them to the
/// hospital's identity.
///
/// Intentionally derives neither `Serialize` nor `Debug`.
#[derive(Clone)]
pub struct PrivateStatistics {
    pub patient_count: u64,
    pub treatment_success: u64,
    pub control_success: u64,
    pub control_count: u64,
    /// Real p-value in [0, 1].
    pub p_value: f64,
    pub adverse_events: u64,
    /// Data quality score in [0, 100].
    pub data_quality_score: u8,
    /// Hospital secret key. Leaves the store only through `secret_key` and
    /// the derived `binding_tag`.
    pub secret_key: [u8; 32],
}

pub struct PrivateWitnessStore {
    stats: PrivateStatistics,
}

impl PrivateWitnessStore {
    /// Validate sanity bounds and take ownership of the witness.
    ///
    /// Error messages name the violated bound, never the values.
    pub fn new(stats: PrivateStatistics) -> Result<Self, ProofError> {
        if !stats.p_value.is_finite() || stats.p_value < 0.0 || stats.p_value > 1.0 {
            return Err(ProofError::InvalidWitness(
                "p_value outside [0, 1]".to_string(),
            ));
        }
        if stats.patient_count < stats.treatment_success {
            return Err(ProofError::InvalidWitness(
                "patient_count below treatment_success".to_string(),
            ));
        }
        if stats.patient_count < stats.control_count {
            return Err(ProofError::InvalidWitness(
                "patient_count below control_count".to_string(),
            ));
        }
        if stats.control_success > stats.control_count {
            return Err(ProofError::InvalidWitness(
                "control_success exceeds control_count".to_string(),
            ));
        }
        if stats.data_quality_score > 100 {
            return Err(ProofError::InvalidWitness(
                "data_quality_score exceeds 100".to_string(),
            ));
        }
        Ok(Self { stats })
    }

    pub fn patient_count(&self) -> u64 {
        self.stats.patient_count
    }

    pub fn treatment_success(&self) -> u64 {
        self.stats.treatment_success
    }

    pub fn control_success(&self) -> u64 {
        self.stats.control_success
    }

    pub fn control_count(&self) -> u64 {
        self.stats.control_count
    }

    pub fn p_value(&self) -> f64 {
        self.stats.p_value
    }

    /// p-value scaled by 10,000 and floored.
    pub fn p_value_scaled(&self) -> u64 {
        (self.stats.p_value * PVALUE_SCALE as f64).floor() as u64
    }

    pub fn adverse_events(&self) -> u64 {
        self.stats.adverse_events
    }

    pub fn data_quality_score(&self) -> u8 {
        self.stats.data_quality_score
    }

    /// Explicit key accessor; no other path exposes the key.
    pub fn secret_key(&self) -> &[u8; 32] {
        &self.stats.secret_key
    }

    /// Bind this witness to a hospital identity without exposing the key.
    pub fn binding_tag(&self, hospital_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.stats.secret_key);
        hasher.update(hospital_id.as_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        hex::encode(digest)
    }

    /// Thresholded adverse-event boolean for the regulatory tier.
    ///
    /// The raw count never leaves the store.
    pub fn safety_flag(&self) -> bool {
        self.stats.adverse_events * 1000
            > self.stats.patient_count * ADVERSE_EVENT_ALERT_PER_MILLE
    }
}

impl fmt::Debug for PrivateWitnessStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateWitnessStore(..)")
    }
}

/// Fixture used across this crate's tests.
#[cfg(test)]
pub(crate) fn sample_statistics() -> PrivateStatistics {
    PrivateStatistics {
        patient_count: 1200,
        treatment_success: 950,
        control_success: 310,
        control_count: 600,
        p_value: 0.02,
        adverse_events: 23,
        data_quality_score: 94,
        secret_key: [7u8; 32],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_witness_constructs() {
        let store = PrivateWitnessStore::new(sample_statistics()).unwrap();
        assert_eq!(store.patient_count(), 1200);
        assert_eq!(store.p_value_scaled(), 200);
    }

    #[test]
    fn treatment_success_above_patient_count_is_invalid() {
        let mut stats = sample_statistics();
        stats.treatment_success = stats.patient_count + 1;
        assert!(matches!(
            PrivateWitnessStore::new(stats).unwrap_err(),
            ProofError::InvalidWitness(_)
        ));
    }

    #[test]
    fn control_count_above_patient_count_is_invalid() {
        let mut stats = sample_statistics();
        stats.control_count = stats.patient_count + 1;
        assert!(PrivateWitnessStore::new(stats).is_err());
    }

    #[test]
    fn p_value_out_of_range_is_invalid() {
        for p in [-0.1, 1.5, f64::NAN] {
            let mut stats = sample_statistics();
            stats.p_value = p;
            assert!(PrivateWitnessStore::new(stats).is_err());
        }
    }

    #[test]
    fn invalid_witness_error_never_echoes_values() {
        let mut stats = sample_statistics();
        stats.treatment_success = 987_654;
        stats.patient_count = 123_456;
        let err = PrivateWitnessStore::new(stats).unwrap_err();
        let msg = err.to_string();
        assert!(!msg.contains("987654"));
        assert!(!msg.contains("123456"));
    }

    #[test]
    fn debug_output_is_redacted() {
        let store = PrivateWitnessStore::new(sample_statistics()).unwrap();
        assert_eq!(format!("{store:?}"), "PrivateWitnessStore(..)");
    }

    #[test]
    fn binding_tag_depends_on_hospital_and_key() {
        let store = PrivateWitnessStore::new(sample_statistics()).unwrap();
        let a = store.binding_tag("hospital-a");
        let b = store.binding_tag("hospital-b");
        assert_ne!(a, b);

        let mut other = sample_statistics();
        other.secret_key = [9u8; 32];
        let other_store = PrivateWitnessStore::new(other).unwrap();
        assert_ne!(a, other_store.binding_tag("hospital-a"));
    }

    #[test]
    fn safety_flag_trips_on_high_adverse_rate() {
        let mut stats = sample_statistics();
        stats.adverse_events = 61; // 61/1200 > 5%
        let store = PrivateWitnessStore::new(stats).unwrap();
        assert!(store.safety_flag());

        let calm = PrivateWitnessStore::new(sample_statistics()).unwrap();
        assert!(!calm.safety_flag());
    }
}
