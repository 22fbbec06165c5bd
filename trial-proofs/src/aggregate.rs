//! Study-level aggregation over an ordered snapshot of contributions.
//!
//! Aggregation is deterministic for a given ordered input and never exposes a
//! single hospital's raw counts: sample size is a lower bound derived from
//! the public threshold, efficacy is a mean over disclosure buckets, and the
//! p-value is a threshold bound rather than a combined raw statistic.
//! Unverified contributions are excluded and recorded, not fatal: a partial
//! result is a valid result.

use crate::artifact::HospitalContribution;
use crate::constants::{efficacy_bucket_midpoint, DEFAULT_QUORUM, PVALUE_SCALE};
use crate::predicates::Thresholds;
use serde::{Deserialize, Serialize};

/// Privacy-safe study statistics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregatedStatistics {
    /// Verified-and-adequately-sized contribution count times the public
    /// minimum-patients threshold. A lower bound, never the true sum.
    pub total_patients_lower_bound: u64,
    /// Unweighted mean of efficacy-bucket midpoints, percent.
    pub overall_efficacy: f64,
    /// Normal-approximation proportion CI around the bucketed mean, percent.
    pub confidence_interval: [f64; 2],
    /// Conservative upper bound: the public significance threshold when every
    /// included contribution is significant, 1.0 otherwise.
    pub p_value: f64,
    /// One-sided power of detecting the bucketed efficacy against the
    /// efficacy threshold at the lower-bound sample size.
    pub statistical_power: f64,
}

/// Flags describing what the aggregate deliberately withholds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrivacyGuarantees {
    pub raw_counts_withheld: bool,
    pub efficacy_bucketed: bool,
    pub sample_size_lower_bound: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExcludedContribution {
    pub hospital_id: String,
    pub reason: String,
}

/// Immutable aggregation output. Re-aggregation builds a new instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub study_id: String,
    /// Included contributions in submission order.
    pub contributions: Vec<HospitalContribution>,
    pub statistics: AggregatedStatistics,
    pub privacy_guarantees: PrivacyGuarantees,
    pub excluded: Vec<ExcludedContribution>,
    pub excluded_count: usize,
}

/// Minimum verified contributions before the coordinator aggregates.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct QuorumPolicy {
    pub min_verified: usize,
}

impl Default for QuorumPolicy {
    fn default() -> Self {
        Self {
            min_verified: DEFAULT_QUORUM,
        }
    }
}

pub fn meets_quorum(contributions: &[HospitalContribution], policy: &QuorumPolicy) -> bool {
    contributions.iter().filter(|c| c.verified).count() >= policy.min_verified
}

/// Merge an ordered snapshot of contributions into one study-level result.
pub fn aggregate(
    study_id: &str,
    contributions: &[HospitalContribution],
    thresholds: &Thresholds,
) -> AggregatedResult {
    let mut included = Vec::with_capacity(contributions.len());
    let mut excluded = Vec::new();

    for c in contributions {
        if c.verified {
            included.push(c.clone());
        } else {
            excluded.push(ExcludedContribution {
                hospital_id: c.hospital_id.clone(),
                reason: "proof not verified".to_string(),
            });
        }
    }

    let adequately_sized = included
        .iter()
        .filter(|c| c.signals.valid_sample_size)
        .count() as u64;
    let total_patients_lower_bound = adequately_sized * thresholds.min_patients;

    let overall_efficacy = if included.is_empty() {
        0.0
    } else {
        included
            .iter()
            .map(|c| efficacy_bucket_midpoint(c.efficacy_bucket))
            .sum::<f64>()
            / included.len() as f64
    };

    let confidence_interval = proportion_interval(
        overall_efficacy,
        total_patients_lower_bound.max(included.len() as u64),
    );

    let all_significant =
        !included.is_empty() && included.iter().all(|c| c.signals.valid_significance);
    let p_value = if all_significant {
        thresholds.max_p_value_scaled as f64 / PVALUE_SCALE as f64
    } else {
        1.0
    };

    let statistical_power = power_estimate(
        overall_efficacy,
        thresholds.min_efficacy_rate_percent as f64,
        total_patients_lower_bound,
    );

    let excluded_count = excluded.len();

    AggregatedResult {
        study_id: study_id.to_string(),
        contributions: included,
        statistics: AggregatedStatistics {
            total_patients_lower_bound,
            overall_efficacy,
            confidence_interval,
            p_value,
            statistical_power,
        },
        privacy_guarantees: PrivacyGuarantees {
            raw_counts_withheld: true,
            efficacy_bucketed: true,
            sample_size_lower_bound: true,
        },
        excluded,
        excluded_count,
    }
}

/// 95% normal-approximation CI for a proportion, in percent.
fn proportion_interval(efficacy_percent: f64, n: u64) -> [f64; 2] {
    if n == 0 {
        return [0.0, 0.0];
    }
    let p = (efficacy_percent / 100.0).clamp(0.0, 1.0);
    let half = 1.96 * (p * (1.0 - p) / n as f64).sqrt();
    [
        ((p - half).max(0.0) * 100.0),
        ((p + half).min(1.0) * 100.0),
    ]
}

/// One-sided power of detecting `efficacy_percent` against `null_percent`
/// with `n` patients at alpha = 0.05.
fn power_estimate(efficacy_percent: f64, null_percent: f64, n: u64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = (efficacy_percent / 100.0).clamp(0.0, 1.0);
    let p0 = (null_percent / 100.0).clamp(f64::EPSILON, 1.0 - f64::EPSILON);
    let se = (p0 * (1.0 - p0) / n as f64).sqrt();
    let z = (p - p0) / se;
    normal_cdf(z - 1.645).clamp(0.0, 1.0)
}

fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Abramowitz & Stegun 7.1.26 rational approximation, |error| < 1.5e-7.
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));

    sign * (1.0 - poly * (-x * x).exp())
}
