//! Canonical serialization + fingerprinting of study descriptors.
//!
//! Canonical form: UTF-8 JSON with object keys sorted ascending at every
//! nesting level, no insignificant whitespace, null object members dropped.
//! Sequences keep their order. The fingerprint is the SHA-256 digest of that
//! byte string, rendered lowercase hex on the wire.

use crate::descriptor::StudyDescriptor;
use crate::errors::ProofError;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Serialize `value` to its canonical byte string.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, ProofError> {
    let v = serde_json::to_value(value).map_err(|e| ProofError::Serialization(e.to_string()))?;
    let normalized = normalize(v);
    let s =
        serde_json::to_string(&normalized).map_err(|e| ProofError::Serialization(e.to_string()))?;
    Ok(s.into_bytes())
}

/// Recursively sort object keys and drop null members.
///
/// Dropping nulls keeps "absent" and "explicitly null" optionals on the same
/// canonical form.
fn normalize(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: BTreeMap<String, Value> = BTreeMap::new();
            for (k, vv) in map {
                if vv.is_null() {
                    continue;
                }
                sorted.insert(k, normalize(vv));
            }
            // serde_json::Map preserves insertion order; rebuild in sorted order.
            let mut out = serde_json::Map::new();
            for (k, vv) in sorted {
                out.insert(k, vv);
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(normalize).collect()),
        other => other,
    }
}

/// Fingerprint a validated study descriptor.
pub fn fingerprint(descriptor: &StudyDescriptor) -> Result<[u8; 32], ProofError> {
    descriptor.validate()?;
    let bytes = canonical_bytes(descriptor)?;
    Ok(Sha256::digest(&bytes).into())
}

/// Lowercase-hex wire form of the study fingerprint.
pub fn fingerprint_hex(descriptor: &StudyDescriptor) -> Result<String, ProofError> {
    Ok(hex::encode(fingerprint(descriptor)?))
}

/// Fingerprint of the study-design section only.
///
/// Disclosed at the research tier so reviewers can compare methodology
/// without learning the rest of the descriptor. Distinct from the study
/// fingerprint.
pub fn methodology_fingerprint_hex(descriptor: &StudyDescriptor) -> Result<String, ProofError> {
    descriptor.validate()?;
    let bytes = canonical_bytes(&descriptor.design)?;
    let digest: [u8; 32] = Sha256::digest(&bytes).into();
    Ok(hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::sample_descriptor;
    use serde_json::json;

    #[test]
    fn key_order_does_not_change_canonical_form() {
        let mut a = serde_json::Map::new();
        a.insert("zeta".to_string(), json!({"b": 2, "a": 1}));
        a.insert("alpha".to_string(), json!([3, 2, 1]));

        let mut b = serde_json::Map::new();
        b.insert("alpha".to_string(), json!([3, 2, 1]));
        b.insert("zeta".to_string(), json!({"a": 1, "b": 2}));

        let ca = canonical_bytes(&Value::Object(a)).unwrap();
        let cb = canonical_bytes(&Value::Object(b)).unwrap();
        assert_eq!(ca, cb);
        // Sequences keep their order.
        assert!(String::from_utf8(ca).unwrap().contains("[3,2,1]"));
    }

    #[test]
    fn nested_reordering_yields_identical_fingerprint() {
        let d = sample_descriptor();
        let direct = canonical_bytes(&d).unwrap();

        // Round-trip through an untyped value and scramble key order by
        // rebuilding maps in reverse.
        fn reverse_keys(v: Value) -> Value {
            match v {
                Value::Object(map) => {
                    let pairs: Vec<(String, Value)> = map.into_iter().collect();
                    let mut out = serde_json::Map::new();
                    for (k, vv) in pairs.into_iter().rev() {
                        out.insert(k, reverse_keys(vv));
                    }
                    Value::Object(out)
                }
                Value::Array(arr) => Value::Array(arr.into_iter().map(reverse_keys).collect()),
                other => other,
            }
        }

        let scrambled = reverse_keys(serde_json::to_value(&d).unwrap());
        assert_eq!(direct, canonical_bytes(&scrambled).unwrap());
    }

    #[test]
    fn explicit_null_and_absent_optional_agree() {
        let d = sample_descriptor();
        let mut with_null = serde_json::to_value(&d).unwrap();
        with_null
            .as_object_mut()
            .unwrap()
            .insert("comparator".to_string(), Value::Null);

        assert_eq!(
            canonical_bytes(&d).unwrap(),
            canonical_bytes(&with_null).unwrap()
        );
    }

    #[test]
    fn canonical_form_has_no_whitespace() {
        let bytes = canonical_bytes(&sample_descriptor()).unwrap();
        let s = String::from_utf8(bytes).unwrap();
        assert!(!s.contains(": "));
        assert!(!s.contains(", "));
        assert!(!s.contains('\n'));
    }

    #[test]
    fn fingerprint_is_stable_and_hex() {
        let d = sample_descriptor();
        let h1 = fingerprint_hex(&d).unwrap();
        let h2 = fingerprint_hex(&d.clone()).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn methodology_fingerprint_differs_from_study_fingerprint() {
        let d = sample_descriptor();
        assert_ne!(
            fingerprint_hex(&d).unwrap(),
            methodology_fingerprint_hex(&d).unwrap()
        );
    }

    #[test]
    fn methodology_fingerprint_ignores_non_design_fields() {
        let d = sample_descriptor();
        let mut renamed = d.clone();
        renamed.treatment.display = "Semaglutide".to_string();
        assert_eq!(
            methodology_fingerprint_hex(&d).unwrap(),
            methodology_fingerprint_hex(&renamed).unwrap()
        );
    }

    #[test]
    fn malformed_descriptor_is_rejected_before_hashing() {
        let mut d = sample_descriptor();
        d.enrollment.target = 0;
        assert!(matches!(
            fingerprint(&d).unwrap_err(),
            ProofError::MalformedDescriptor(_)
        ));
    }
}
