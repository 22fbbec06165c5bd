//! Validity predicates and the public-signal vector.
//!
//! The signal ordering in `PublicSignals::to_vec` is the statement a proving
//! backend attests to. ORDERING MUST NOT CHANGE without bumping
//! `constants::SIGNAL_VECTOR_VERSION`.

use crate::constants::{
    MAX_PVALUE_SCALED, MIN_EFFICACY_RATE_PERCENT, MIN_PATIENTS, NUM_PUBLIC_SIGNALS,
};
use crate::errors::ProofError;
use crate::witness::PrivateWitnessStore;
use serde::{Deserialize, Serialize};

/// Public thresholds every hospital proves against.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thresholds {
    pub min_patients: u64,
    pub min_efficacy_rate_percent: u64,
    pub max_p_value_scaled: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_patients: MIN_PATIENTS,
            min_efficacy_rate_percent: MIN_EFFICACY_RATE_PERCENT,
            max_p_value_scaled: MAX_PVALUE_SCALED,
        }
    }
}

/// The disclosed statement: thresholds, binding commitment, predicate bits.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicSignals {
    pub min_patients: u64,
    pub min_efficacy_rate: u64,
    pub max_p_value_scaled: u64,
    /// Additive binding scalar (counts + scaled p + salt, wrapping).
    ///
    /// A non-cryptographic binding of the proof run to one witness instance.
    /// Independent of the descriptor fingerprint hash.
    pub commitment: u64,
    pub valid_sample_size: bool,
    pub valid_efficacy: bool,
    pub valid_significance: bool,
    pub overall_valid: bool,
}

impl PublicSignals {
    /// Fixed wire order:
    /// `[min_patients, min_efficacy_rate, max_p_value_scaled, commitment,
    ///   valid_sample_size, valid_efficacy, valid_significance, overall_valid]`.
    pub fn to_vec(&self) -> [u64; NUM_PUBLIC_SIGNALS] {
        [
            self.min_patients,
            self.min_efficacy_rate,
            self.max_p_value_scaled,
            self.commitment,
            self.valid_sample_size as u64,
            self.valid_efficacy as u64,
            self.valid_significance as u64,
            self.overall_valid as u64,
        ]
    }

    /// Parse a backend-returned vector, checking length and boolean slots.
    pub fn from_vec(v: &[u64]) -> Result<Self, ProofError> {
        if v.len() != NUM_PUBLIC_SIGNALS {
            return Err(ProofError::SignalMismatch(format!(
                "expected {NUM_PUBLIC_SIGNALS} signals, got {}",
                v.len()
            )));
        }
        for (i, s) in v[4..].iter().enumerate() {
            if *s > 1 {
                return Err(ProofError::SignalMismatch(format!(
                    "signal {} is not boolean",
                    i + 4
                )));
            }
        }
        Ok(Self {
            min_patients: v[0],
            min_efficacy_rate: v[1],
            max_p_value_scaled: v[2],
            commitment: v[3],
            valid_sample_size: v[4] == 1,
            valid_efficacy: v[5] == 1,
            valid_significance: v[6] == 1,
            overall_valid: v[7] == 1,
        })
    }
}

/// Full evaluation output, including values that stay hospital-side.
#[derive(Clone, Copy, Debug)]
pub struct PredicateOutcome {
    pub signals: PublicSignals,
    /// Rounded-down efficacy percent. Disclosed only as a bucket.
    pub efficacy_rate: u64,
    pub p_value_scaled: u64,
}

/// Evaluate all validity predicates for one witness.
///
/// Fails with `DivideByZero` before touching any backend when the witness
/// has no patients.
pub fn evaluate(
    witness: &PrivateWitnessStore,
    thresholds: &Thresholds,
    salt: u64,
) -> Result<PredicateOutcome, ProofError> {
    let patient_count = witness.patient_count();
    if patient_count == 0 {
        return Err(ProofError::DivideByZero);
    }

    let efficacy_rate = 100 * witness.treatment_success() / patient_count;
    let p_value_scaled = witness.p_value_scaled();

    let valid_sample_size = patient_count >= thresholds.min_patients;
    let valid_efficacy = efficacy_rate >= thresholds.min_efficacy_rate_percent;
    let valid_significance = p_value_scaled < thresholds.max_p_value_scaled;
    let overall_valid = valid_sample_size && valid_efficacy && valid_significance;

    let commitment = patient_count
        .wrapping_add(witness.treatment_success())
        .wrapping_add(witness.control_success())
        .wrapping_add(witness.control_count())
        .wrapping_add(p_value_scaled)
        .wrapping_add(salt);

    Ok(PredicateOutcome {
        signals: PublicSignals {
            min_patients: thresholds.min_patients,
            min_efficacy_rate: thresholds.min_efficacy_rate_percent,
            max_p_value_scaled: thresholds.max_p_value_scaled,
            commitment,
            valid_sample_size,
            valid_efficacy,
            valid_significance,
            overall_valid,
        },
        efficacy_rate,
        p_value_scaled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::witness::{sample_statistics, PrivateStatistics};

    fn store(patient_count: u64, treatment_success: u64, p_value: f64) -> PrivateWitnessStore {
        PrivateWitnessStore::new(PrivateStatistics {
            patient_count,
            treatment_success,
            control_success: 0,
            control_count: 0,
            p_value,
            adverse_events: 0,
            data_quality_score: 90,
            secret_key: [1u8; 32],
        })
        .unwrap()
    }

    #[test]
    fn reference_scenario_all_predicates_pass() {
        let witness = PrivateWitnessStore::new(sample_statistics()).unwrap();
        let out = evaluate(&witness, &Thresholds::default(), 42).unwrap();

        assert_eq!(out.efficacy_rate, 79);
        assert_eq!(out.p_value_scaled, 200);
        assert!(out.signals.valid_sample_size);
        assert!(out.signals.valid_efficacy);
        assert!(out.signals.valid_significance);
        assert!(out.signals.overall_valid);
    }

    #[test]
    fn small_cohort_fails_overall_regardless_of_other_predicates() {
        let witness = store(50, 48, 0.001);
        let out = evaluate(&witness, &Thresholds::default(), 0).unwrap();
        assert!(!out.signals.valid_sample_size);
        assert!(out.signals.valid_efficacy);
        assert!(out.signals.valid_significance);
        assert!(!out.signals.overall_valid);
    }

    #[test]
    fn zero_patients_is_divide_by_zero() {
        let witness = store(0, 0, 0.01);
        assert!(matches!(
            evaluate(&witness, &Thresholds::default(), 0).unwrap_err(),
            ProofError::DivideByZero
        ));
    }

    #[test]
    fn significance_bound_is_strict() {
        let at_bound = store(200, 150, 0.05);
        let out = evaluate(&at_bound, &Thresholds::default(), 0).unwrap();
        assert_eq!(out.p_value_scaled, 500);
        assert!(!out.signals.valid_significance);

        let below = store(200, 150, 0.0499);
        assert!(
            evaluate(&below, &Thresholds::default(), 0)
                .unwrap()
                .signals
                .valid_significance
        );
    }

    #[test]
    fn sample_size_predicate_is_monotonic_in_patient_count() {
        let thresholds = Thresholds::default();
        let mut last = false;
        for n in [50u64, 99, 100, 1000, 100_000] {
            let out = evaluate(&store(n, n / 2, 0.2), &thresholds, 0).unwrap();
            // Once true, increasing patient_count never flips it back.
            assert!(out.signals.valid_sample_size >= last);
            last = out.signals.valid_sample_size;
        }
        assert!(last);
    }

    #[test]
    fn signal_vector_order_is_the_wire_contract() {
        let witness = PrivateWitnessStore::new(sample_statistics()).unwrap();
        let out = evaluate(&witness, &Thresholds::default(), 7).unwrap();
        let v = out.signals.to_vec();

        assert_eq!(v[0], 100);
        assert_eq!(v[1], 70);
        assert_eq!(v[2], 500);
        assert_eq!(v[3], out.signals.commitment);
        assert_eq!(&v[4..], &[1, 1, 1, 1]);

        assert_eq!(PublicSignals::from_vec(&v).unwrap(), out.signals);
    }

    #[test]
    fn from_vec_rejects_bad_shapes() {
        assert!(PublicSignals::from_vec(&[1, 2, 3]).is_err());
        let mut v = [100, 70, 500, 9, 1, 1, 1, 1];
        v[5] = 2;
        assert!(PublicSignals::from_vec(&v).is_err());
    }

    #[test]
    fn commitment_binds_salt() {
        let witness = PrivateWitnessStore::new(sample_statistics()).unwrap();
        let a = evaluate(&witness, &Thresholds::default(), 1).unwrap();
        let b = evaluate(&witness, &Thresholds::default(), 2).unwrap();
        assert_ne!(a.signals.commitment, b.signals.commitment);
        // Same salt, same commitment.
        let c = evaluate(&witness, &Thresholds::default(), 1).unwrap();
        assert_eq!(a.signals.commitment, c.signals.commitment);
    }
}
