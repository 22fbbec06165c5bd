//! Crate-wide constants: disclosure thresholds, scale factors, bucket tables.

/// Minimum enrolled patients for the sample-size predicate.
pub const MIN_PATIENTS: u64 = 100;

/// Minimum efficacy rate (percent) for the efficacy predicate.
pub const MIN_EFFICACY_RATE_PERCENT: u64 = 70;

/// p-values are carried as integers scaled by this factor.
pub const PVALUE_SCALE: u64 = 10_000;

/// Scaled significance bound: p < 0.05.
pub const MAX_PVALUE_SCALED: u64 = 500;

/// Version of the public-signal vector layout.
///
/// The ordering in `predicates::PublicSignals::to_vec` is a wire contract;
/// any change to it requires bumping this.
pub const SIGNAL_VECTOR_VERSION: u32 = 1;

/// Length of the public-signal vector.
pub const NUM_PUBLIC_SIGNALS: usize = 8;

/// Number of efficacy disclosure buckets.
pub const NUM_EFFICACY_BUCKETS: usize = 5;

/// Inclusive (min, max) efficacy-rate percent bounds per bucket.
///
/// Hospitals disclose the bucket, never the exact rate. Aggregation works on
/// bucket midpoints.
pub const EFFICACY_BUCKETS: [(u64, u64); NUM_EFFICACY_BUCKETS] = [
    (0, 49),
    (50, 69),
    (70, 79),
    (80, 89),
    (90, 100),
];

/// Inclusive (min, max) bounds for the regulatory sample-size range bucket.
pub const SAMPLE_SIZE_BUCKETS: [(u64, u64); 5] = [
    (0, 99),
    (100, 499),
    (500, 999),
    (1000, 4999),
    (5000, u64::MAX),
];

/// Adverse-event alert threshold, in events per 1000 patients.
///
/// A hospital's safety flag is set when its adverse-event rate exceeds this.
/// Only the boolean leaves the hospital boundary.
pub const ADVERSE_EVENT_ALERT_PER_MILLE: u64 = 50;

/// Default minimum number of verified contributions before aggregation.
pub const DEFAULT_QUORUM: usize = 2;

/// Map an efficacy rate (percent) to its disclosure bucket index.
pub fn efficacy_bucket(rate_percent: u64) -> usize {
    for (i, (min, max)) in EFFICACY_BUCKETS.iter().enumerate() {
        if rate_percent >= *min && rate_percent <= *max {
            return i;
        }
    }
    // Rates are bounded by 100 upstream; anything else lands in the top bucket.
    NUM_EFFICACY_BUCKETS - 1
}

/// Midpoint (percent) of an efficacy bucket, used for aggregate means.
pub fn efficacy_bucket_midpoint(bucket: usize) -> f64 {
    let (min, max) = EFFICACY_BUCKETS[bucket.min(NUM_EFFICACY_BUCKETS - 1)];
    (min + max) as f64 / 2.0
}

/// Render an inclusive bucket range as a label, e.g. "100-499" or "5000+".
pub fn bucket_label(range: (u64, u64)) -> String {
    if range.1 == u64::MAX {
        format!("{}+", range.0)
    } else {
        format!("{}-{}", range.0, range.1)
    }
}

/// Label of the sample-size bucket containing `n`.
pub fn sample_size_bucket_label(n: u64) -> String {
    for range in SAMPLE_SIZE_BUCKETS.iter() {
        if n >= range.0 && n <= range.1 {
            return bucket_label(*range);
        }
    }
    bucket_label(SAMPLE_SIZE_BUCKETS[SAMPLE_SIZE_BUCKETS.len() - 1])
}

/// Label of the efficacy bucket containing `rate_percent`.
pub fn efficacy_bucket_label(rate_percent: u64) -> String {
    bucket_label(EFFICACY_BUCKETS[efficacy_bucket(rate_percent)])
}
