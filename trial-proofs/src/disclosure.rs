//! Tiered disclosure of aggregated results.
//!
//! Projection is pure and total: every privacy level has a defined view, and
//! each tier is a strict superset of the one below
//! (Research ⊇ Regulatory ⊇ Public).

use crate::aggregate::{AggregatedResult, AggregatedStatistics};
use crate::constants::{efficacy_bucket_label, sample_size_bucket_label};
use crate::descriptor::StudyDescriptor;
use serde::{Deserialize, Serialize};

/// Disclosure tiers in increasing order of privilege.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    Public,
    Regulatory,
    Research,
}

/// Public, descriptor-derived context captured at study registration.
///
/// Keeping this separate from the aggregate makes `project` total: no
/// fallible descriptor work happens at disclosure time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StudyContext {
    pub treatment_category: String,
    pub compliance_attestations: Vec<String>,
    pub methodology_fingerprint: String,
}

impl StudyContext {
    pub fn new(descriptor: &StudyDescriptor, methodology_fingerprint: String) -> Self {
        Self {
            treatment_category: descriptor.treatment.display.clone(),
            compliance_attestations: descriptor
                .regulatory_ids
                .iter()
                .map(|id| format!("registered:{id}"))
                .collect(),
            methodology_fingerprint,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicView {
    pub study_exists: bool,
    pub study_valid: bool,
    pub treatment_category: String,
    pub hospital_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegulatoryView {
    #[serde(flatten)]
    pub public: PublicView,
    pub sample_size_bucket: String,
    pub efficacy_bucket: String,
    pub compliance_attestations: Vec<String>,
    pub safety_signal: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResearchView {
    #[serde(flatten)]
    pub regulatory: RegulatoryView,
    pub detailed_statistics: AggregatedStatistics,
    pub methodology_fingerprint: String,
    pub peer_review_access: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum DisclosureView {
    Public(PublicView),
    Regulatory(RegulatoryView),
    Research(ResearchView),
}

/// Project an aggregated result to the requested tier.
pub fn project(
    result: &AggregatedResult,
    context: &StudyContext,
    level: PrivacyLevel,
) -> DisclosureView {
    let public = PublicView {
        study_exists: true,
        study_valid: !result.contributions.is_empty()
            && result.contributions.iter().all(|c| c.signals.overall_valid),
        treatment_category: context.treatment_category.clone(),
        hospital_count: result.contributions.len(),
    };

    if level == PrivacyLevel::Public {
        return DisclosureView::Public(public);
    }

    let regulatory = RegulatoryView {
        public,
        sample_size_bucket: sample_size_bucket_label(
            result.statistics.total_patients_lower_bound,
        ),
        efficacy_bucket: efficacy_bucket_label(result.statistics.overall_efficacy.round() as u64),
        compliance_attestations: context.compliance_attestations.clone(),
        safety_signal: result.contributions.iter().any(|c| c.safety_flag),
    };

    if level == PrivacyLevel::Regulatory {
        return DisclosureView::Regulatory(regulatory);
    }

    DisclosureView::Research(ResearchView {
        regulatory,
        detailed_statistics: result.statistics.clone(),
        methodology_fingerprint: context.methodology_fingerprint.clone(),
        peer_review_access: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, QuorumPolicy};
    use crate::artifact::HospitalContribution;
    use crate::descriptor::sample_descriptor;
    use crate::predicates::{PublicSignals, Thresholds};

    fn contribution(hospital_id: &str, overall_valid: bool, safety_flag: bool) -> HospitalContribution {
        HospitalContribution {
            hospital_id: hospital_id.to_string(),
            commitment_hex: "ab".repeat(32),
            proof_hash: "cd".repeat(32),
            verified: true,
            signals: PublicSignals {
                min_patients: 100,
                min_efficacy_rate: 70,
                max_p_value_scaled: 500,
                commitment: 5,
                valid_sample_size: true,
                valid_efficacy: overall_valid,
                valid_significance: true,
                overall_valid,
            },
            efficacy_bucket: 2,
            safety_flag,
        }
    }

    fn context() -> StudyContext {
        StudyContext::new(&sample_descriptor(), "aa".repeat(32))
    }

    #[test]
    fn levels_are_totally_ordered() {
        assert!(PrivacyLevel::Public < PrivacyLevel::Regulatory);
        assert!(PrivacyLevel::Regulatory < PrivacyLevel::Research);
    }

    #[test]
    fn tiers_are_upward_compatible_supersets() {
        let contributions = vec![contribution("a", true, false), contribution("b", true, true)];
        let result = aggregate("study-1", &contributions, &Thresholds::default());
        assert!(crate::aggregate::meets_quorum(
            &contributions,
            &QuorumPolicy::default()
        ));
        let ctx = context();

        let public = serde_json::to_value(project(&result, &ctx, PrivacyLevel::Public)).unwrap();
        let regulatory =
            serde_json::to_value(project(&result, &ctx, PrivacyLevel::Regulatory)).unwrap();
        let research =
            serde_json::to_value(project(&result, &ctx, PrivacyLevel::Research)).unwrap();

        for (narrow, wide) in [(&public, &regulatory), (&regulatory, &research)] {
            for (k, v) in narrow.as_object().unwrap() {
                assert_eq!(wide.get(k), Some(v), "field {k} lost at higher tier");
            }
        }
    }

    #[test]
    fn public_view_hides_buckets_and_statistics() {
        let contributions = vec![contribution("a", true, false)];
        let result = aggregate("study-1", &contributions, &Thresholds::default());

        let v = serde_json::to_value(project(&result, &context(), PrivacyLevel::Public)).unwrap();
        let obj = v.as_object().unwrap();
        assert!(obj.contains_key("study_valid"));
        assert!(obj.contains_key("treatment_category"));
        assert!(!obj.contains_key("sample_size_bucket"));
        assert!(!obj.contains_key("detailed_statistics"));
    }

    #[test]
    fn regulatory_view_buckets_sample_size() {
        let contributions = vec![
            contribution("a", true, false),
            contribution("b", true, false),
            contribution("c", true, false),
        ];
        let result = aggregate("study-1", &contributions, &Thresholds::default());

        let DisclosureView::Regulatory(view) =
            project(&result, &context(), PrivacyLevel::Regulatory)
        else {
            panic!("expected regulatory view");
        };
        // Lower bound is 300, which lands in the 100-499 bucket.
        assert_eq!(view.sample_size_bucket, "100-499");
        assert!(!view.safety_signal);
        assert_eq!(view.compliance_attestations, vec!["registered:NCT04000165"]);
    }

    #[test]
    fn safety_signal_is_any_hospital_flag() {
        let contributions = vec![contribution("a", true, false), contribution("b", true, true)];
        let result = aggregate("study-1", &contributions, &Thresholds::default());

        let DisclosureView::Regulatory(view) =
            project(&result, &context(), PrivacyLevel::Regulatory)
        else {
            panic!("expected regulatory view");
        };
        assert!(view.safety_signal);
    }

    #[test]
    fn research_view_exposes_methodology_fingerprint() {
        let contributions = vec![contribution("a", false, false)];
        let result = aggregate("study-1", &contributions, &Thresholds::default());

        let DisclosureView::Research(view) = project(&result, &context(), PrivacyLevel::Research)
        else {
            panic!("expected research view");
        };
        assert_eq!(view.methodology_fingerprint, "aa".repeat(32));
        assert!(view.peer_review_access);
        // One invalid contribution makes the study invalid at every tier.
        assert!(!view.regulatory.public.study_valid);
    }
}
