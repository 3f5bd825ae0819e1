//! Record validation: one raw extraction payload in, one
//! [`ValidatedRecord`] out.
//!
//! Validation is total. It never fails as a whole and never panics on
//! malformed input: every schema field gets exactly one outcome (a typed
//! value or [`TypedValue::Missing`] plus a [`FieldError`]), so downstream
//! aggregation can rely on a uniform row shape.

use crate::coerce::{coerce, coerce_amount};
use crate::error::{CoercionError, FieldError};
use crate::record::{CurrencyTag, RawValue, TypedValue, ValidatedRecord};
use crate::schema::{FieldSpec, SemanticType};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Validate one raw record against the schema.
///
/// Walks the schema in declared order. Keys in `raw` that are not in the
/// schema never reach the output values; they are collected in
/// `unknown_keys` and logged at debug level.
pub fn validate(
    raw: &HashMap<String, RawValue>,
    schema: &[FieldSpec],
    source_ref: &str,
) -> ValidatedRecord {
    let mut values = BTreeMap::new();
    let mut errors = Vec::new();

    for spec in schema {
        let (value, error) = validate_field(spec, raw.get(spec.name));
        if let Some(reason) = error {
            errors.push(FieldError::new(spec.name, reason));
        }
        values.insert(spec.name.to_string(), value);
    }

    let mut unknown_keys: Vec<String> = raw
        .keys()
        .filter(|k| !schema.iter().any(|f| f.name == k.as_str()))
        .cloned()
        .collect();
    unknown_keys.sort();
    if !unknown_keys.is_empty() {
        debug!(
            source = source_ref,
            keys = ?unknown_keys,
            "dropping keys not in the schema"
        );
    }

    ValidatedRecord {
        source_ref: source_ref.to_string(),
        values,
        errors,
        unknown_keys,
    }
}

/// One field's outcome: always a value (possibly `Missing`), at most one
/// error alongside it.
fn validate_field(
    spec: &FieldSpec,
    raw: Option<&RawValue>,
) -> (TypedValue, Option<CoercionError>) {
    let raw = match raw {
        Some(v) if !v.is_absent() => v,
        _ => {
            let error = spec.required.then_some(CoercionError::MissingRequired);
            return (TypedValue::Missing, error);
        }
    };

    // A currency-amount without a detectable currency keeps its value; the
    // CurrencyUnknown error is informational, not disqualifying.
    if spec.semantic_type == SemanticType::CurrencyAmount {
        return match coerce_amount(raw) {
            Ok((value, CurrencyTag::Unknown)) => (
                TypedValue::Amount {
                    value,
                    currency: CurrencyTag::Unknown,
                },
                Some(CoercionError::CurrencyUnknown),
            ),
            Ok((value, currency)) => (TypedValue::Amount { value, currency }, None),
            Err(e) => (TypedValue::Missing, Some(e)),
        };
    }

    match coerce(spec, raw) {
        Ok(value) => (value, None),
        Err(e) => (TypedValue::Missing, Some(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::schema;

    fn raw_of(pairs: &[(&str, RawValue)]) -> HashMap<String, RawValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    /// A raw map with every required field present, plus `pairs`.
    fn raw_with_required(pairs: &[(&str, RawValue)]) -> HashMap<String, RawValue> {
        let mut raw = raw_of(&[
            ("NAV_Date", text("2025-06-30")),
            ("FONDO_TARGET_ASSET", text("FOF Uno - Fondo Alpha - AlphaCo")),
            ("OICR_FONDO_TARGET", text("FOF Uno - Fondo Alpha")),
            ("OICR", text("FOF Uno")),
            ("Nome_Fondo_Target", text("Fondo Alpha")),
        ]);
        for (k, v) in pairs {
            raw.insert(k.to_string(), v.clone());
        }
        raw
    }

    #[test]
    fn output_is_total_over_the_schema() {
        let record = validate(&HashMap::new(), schema(), "empty.pdf");
        assert_eq!(record.values.len(), schema().len());
        assert!(record
            .values
            .values()
            .all(|v| matches!(v, TypedValue::Missing)));
    }

    #[test]
    fn missing_required_fields_are_reported() {
        let record = validate(&HashMap::new(), schema(), "empty.pdf");
        let missing: Vec<&str> = record
            .errors
            .iter()
            .filter(|e| e.reason == CoercionError::MissingRequired)
            .map(|e| e.field.as_str())
            .collect();
        assert!(missing.contains(&"NAV_Date"));
        assert!(missing.contains(&"Nome_Fondo_Target"));
        // Optional fields are simply Missing, with no error.
        assert!(!missing.contains(&"IRR"));
    }

    #[test]
    fn failed_coercion_yields_missing_plus_error() {
        let raw = raw_of(&[("NAV_Date", text("sometime soon"))]);
        let record = validate(&raw, schema(), "doc.pdf");
        assert_eq!(record.value("NAV_Date"), &TypedValue::Missing);
        assert!(record
            .errors
            .iter()
            .any(|e| e.field == "NAV_Date" && e.reason == CoercionError::UnparseableDate));
    }

    #[test]
    fn currency_unknown_keeps_the_amount() {
        let raw = raw_with_required(&[("Commitment_Fondo_Target", text("1.2M"))]);
        let record = validate(&raw, schema(), "doc.pdf");
        assert_eq!(
            record.value("Commitment_Fondo_Target"),
            &TypedValue::Amount {
                value: 1_200_000.0,
                currency: CurrencyTag::Unknown
            }
        );
        // The error is recorded but informational: with all required fields
        // present it is the only error and does not count as a hard error.
        assert_eq!(record.errors.len(), 1);
        assert_eq!(record.errors[0].reason, CoercionError::CurrencyUnknown);
        assert_eq!(record.error_count(), 0);
    }

    #[test]
    fn tagged_currency_has_no_error() {
        let raw = raw_with_required(&[("Commitment_Fondo_Target", text("$1.2M"))]);
        let record = validate(&raw, schema(), "doc.pdf");
        assert!(record.errors.is_empty());
        assert_eq!(
            record.value("Commitment_Fondo_Target"),
            &TypedValue::Amount {
                value: 1_200_000.0,
                currency: CurrencyTag::iso("USD")
            }
        );
    }

    #[test]
    fn unknown_keys_are_collected_not_kept() {
        let raw = raw_of(&[
            ("Nome_Fondo_Target", text("Fondo Alpha")),
            ("totally_novel_field", text("x")),
        ]);
        let record = validate(&raw, schema(), "doc.pdf");
        assert_eq!(record.unknown_keys, vec!["totally_novel_field"]);
        assert!(!record.values.contains_key("totally_novel_field"));
    }

    #[test]
    fn unknown_keys_are_judged_against_the_given_schema() {
        // A field outside the validated subset is drift, even though the
        // full schema knows it.
        let subset = &schema()[..2];
        let raw = raw_of(&[("IRR", RawValue::Number(0.15))]);
        let record = validate(&raw, subset, "doc.pdf");
        assert_eq!(record.unknown_keys, vec!["IRR"]);
        assert_eq!(record.values.len(), 2);
    }

    #[test]
    fn explicit_null_equals_absent() {
        let raw = raw_with_required(&[("IRR", RawValue::Absent)]);
        let record = validate(&raw, schema(), "doc.pdf");
        assert_eq!(record.value("IRR"), &TypedValue::Missing);
        assert!(record.errors.is_empty());
    }

    #[test]
    fn revalidation_of_raw_form_is_identity() {
        let raw = raw_of(&[
            ("NAV_Date", text("Q2 2025")),
            ("Nome_Fondo_Target", text("Fondo Alpha")),
            ("IRR", text("15%")),
            ("TVPI", text("2.7x")),
            ("Commitment_Fondo_Target", text("$350K")),
        ]);
        let first = validate(&raw, schema(), "doc.pdf");

        let reraw: HashMap<String, RawValue> = first
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_raw()))
            .collect();
        let second = validate(&reraw, schema(), "doc.pdf");

        assert_eq!(first.values, second.values);
    }
}
