//! Public study descriptor: the canonicalizable record every hospital and
//! verifier agrees on before any proof is generated.
//!
//! Descriptors are immutable once fingerprinted; the API only ever takes
//! shared references and nothing here mutates one after registration.

use crate::errors::ProofError;
use serde::{Deserialize, Serialize};

/// A coded clinical concept (condition, comparator).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodedConcept {
    pub code: String,
    pub display: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Treatment {
    pub code: String,
    pub display: String,
    pub dosing: String,
}

/// Inclusive biomarker bound required for enrollment.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BiomarkerRange {
    pub name: String,
    pub min: i64,
    pub max: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InclusionCriteria {
    pub age_min: u8,
    pub age_max: u8,
    pub gender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biomarkers: Option<Vec<BiomarkerRange>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrimaryEndpoint {
    pub measure: String,
    pub timepoint: String,
}

/// Study-design section. This is also the preimage of the methodology
/// fingerprint disclosed at the research tier.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudyDesign {
    pub study_type: String,
    pub duration_weeks: u32,
    pub blinding: String,
    pub randomized: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Enrollment {
    pub target: u64,
    pub actual: u64,
}

/// The public description of one study.
///
/// Optional fields must be omitted (not null) so that semantically identical
/// descriptors canonicalize to byte-identical form; `canonical` additionally
/// drops nulls that arrive through untyped JSON.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudyDescriptor {
    pub condition: CodedConcept,
    pub treatment: Treatment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparator: Option<CodedConcept>,
    pub inclusion: InclusionCriteria,
    pub endpoint: PrimaryEndpoint,
    pub design: StudyDesign,
    pub enrollment: Enrollment,
    pub regulatory_ids: Vec<String>,
}

impl StudyDescriptor {
    /// Check required fields before fingerprinting.
    ///
    /// Rejected descriptors never reach the proving backend.
    pub fn validate(&self) -> Result<(), ProofError> {
        fn required(field: &str, value: &str) -> Result<(), ProofError> {
            if value.trim().is_empty() {
                return Err(ProofError::MalformedDescriptor(format!("{field} is empty")));
            }
            Ok(())
        }

        required("condition.code", &self.condition.code)?;
        required("condition.display", &self.condition.display)?;
        required("treatment.code", &self.treatment.code)?;
        required("treatment.display", &self.treatment.display)?;
        required("endpoint.measure", &self.endpoint.measure)?;
        required("endpoint.timepoint", &self.endpoint.timepoint)?;
        required("design.study_type", &self.design.study_type)?;

        if self.inclusion.age_min > self.inclusion.age_max {
            return Err(ProofError::MalformedDescriptor(
                "inclusion.age_min exceeds age_max".to_string(),
            ));
        }

        if let Some(biomarkers) = &self.inclusion.biomarkers {
            for b in biomarkers {
                required("biomarker.name", &b.name)?;
                if b.min > b.max {
                    return Err(ProofError::MalformedDescriptor(format!(
                        "biomarker {} min exceeds max",
                        b.name
                    )));
                }
            }
        }

        if self.enrollment.target == 0 {
            return Err(ProofError::MalformedDescriptor(
                "enrollment.target is zero".to_string(),
            ));
        }

        if self.design.duration_weeks == 0 {
            return Err(ProofError::MalformedDescriptor(
                "design.duration_weeks is zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Fixture used across this crate's tests.
#[cfg(test)]
pub(crate) fn sample_descriptor() -> StudyDescriptor {
    StudyDescriptor {
        condition: CodedConcept {
            code: "E11".to_string(),
            display: "Type 2 diabetes mellitus".to_string(),
        },
        treatment: Treatment {
            code: "A10BJ02".to_string(),
            display: "Liraglutide".to_string(),
            dosing: "1.8 mg daily".to_string(),
        },
        comparator: None,
        inclusion: InclusionCriteria {
            age_min: 18,
            age_max: 75,
            gender: "any".to_string(),
            biomarkers: None,
        },
        endpoint: PrimaryEndpoint {
            measure: "HbA1c reduction".to_string(),
            timepoint: "26 weeks".to_string(),
        },
        design: StudyDesign {
            study_type: "interventional".to_string(),
            duration_weeks: 26,
            blinding: "double".to_string(),
            randomized: true,
        },
        enrollment: Enrollment {
            target: 1200,
            actual: 1200,
        },
        regulatory_ids: vec!["NCT04000165".to_string()],
    }
}
