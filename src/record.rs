//! Value and record types flowing through the normalization core.
//!
//! [`RawValue`] is the untrusted side: whatever the extraction stage emitted
//! for one field, modelled as an explicit tagged union rather than an open
//! dynamic type so every consumer handles the absent and wrong-shape cases.
//! [`TypedValue`] is the trusted side: a value that passed its coercer.
//! [`ValidatedRecord`] pairs one document's typed values with the field-level
//! errors collected while producing them; it is immutable after construction.

use crate::error::FieldError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An untyped value as emitted by the extraction stage. No invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Key missing, JSON null, or a shape the flattener could not represent.
    Absent,
}

impl RawValue {
    /// Map one JSON scalar to a raw value. Arrays and objects have no place
    /// in a flat record and come back as [`RawValue::Absent`]; the flattener
    /// logs them before they get here.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RawValue::Absent,
            serde_json::Value::Bool(b) => RawValue::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(RawValue::Number)
                .unwrap_or(RawValue::Absent),
            serde_json::Value::String(s) => {
                if s.trim().is_empty() {
                    RawValue::Absent
                } else {
                    RawValue::Text(s.clone())
                }
            }
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => RawValue::Absent,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, RawValue::Absent)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

/// The currency tag on a [`TypedValue::Amount`].
///
/// `Unknown` is an explicit state, not a default: when neither a symbol nor
/// an ISO code is detectable the amount is never assigned a guessed currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrencyTag {
    /// ISO 4217 code, e.g. `USD`.
    Iso(String),
    Unknown,
}

impl CurrencyTag {
    pub fn iso(code: impl Into<String>) -> Self {
        CurrencyTag::Iso(code.into())
    }
}

impl std::fmt::Display for CurrencyTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurrencyTag::Iso(code) => f.write_str(code),
            CurrencyTag::Unknown => f.write_str("unknown"),
        }
    }
}

/// A value that passed coercion, or the explicit `Missing` marker.
///
/// `Missing` is a first-class state so every record keeps a uniform shape:
/// the validator stores it for absent fields and failed coercions alike, and
/// the exporter renders it distinguishably from a genuinely-empty text value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
    Number(f64),
    /// Ratio stored as a decimal fraction (`5%` → 0.05).
    Percent(f64),
    Date(NaiveDate),
    Text(String),
    /// Canonical value from the field's enum domain.
    EnumValue(String),
    Amount { value: f64, currency: CurrencyTag },
    Bool(bool),
    Missing,
}

/// Marker the exporter writes for [`TypedValue::Missing`]. Deliberately not
/// an empty string: a blank cell must always mean "valid but empty".
pub const MISSING_MARKER: &str = "(missing)";

impl TypedValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, TypedValue::Missing)
    }

    /// Render the value for a flat-text export cell.
    pub fn render(&self) -> String {
        match self {
            TypedValue::Number(v) | TypedValue::Percent(v) => format!("{v}"),
            TypedValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            TypedValue::Text(s) => s.clone(),
            TypedValue::EnumValue(s) => s.clone(),
            TypedValue::Amount { value, currency } => match currency {
                CurrencyTag::Iso(code) => format!("{value} {code}"),
                CurrencyTag::Unknown => format!("{value}"),
            },
            TypedValue::Bool(b) => b.to_string(),
            TypedValue::Missing => MISSING_MARKER.to_string(),
        }
    }

    /// Re-express the typed value as a raw value.
    ///
    /// Round-trip contract: coercing the result under the same field spec
    /// yields this value again (idempotence of validation).
    pub fn to_raw(&self) -> RawValue {
        match self {
            TypedValue::Number(v) => RawValue::Number(*v),
            // Marked form: an unmarked 1.5 would re-coerce as percent-scale
            // and divide again, but "150%" round-trips at any magnitude.
            TypedValue::Percent(v) => RawValue::Text(format!("{}%", v * 100.0)),
            TypedValue::Date(d) => RawValue::Text(d.format("%Y-%m-%d").to_string()),
            TypedValue::Text(s) | TypedValue::EnumValue(s) => RawValue::Text(s.clone()),
            TypedValue::Amount { value, currency } => match currency {
                CurrencyTag::Iso(code) => RawValue::Text(format!("{value} {code}")),
                CurrencyTag::Unknown => RawValue::Number(*value),
            },
            TypedValue::Bool(b) => RawValue::Bool(*b),
            TypedValue::Missing => RawValue::Absent,
        }
    }
}

/// One document/asset's fully-typed, error-annotated output row.
///
/// Created once per raw extraction result and never mutated; corrections
/// produce a new record. The `values` map is total over the schema: exactly
/// one entry per [`crate::schema::FieldSpec`], [`TypedValue::Missing`]
/// included, so every row has a uniform shape regardless of how many fields
/// failed.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedRecord {
    /// Identifier of the originating document, for traceability.
    pub source_ref: String,
    pub values: BTreeMap<String, TypedValue>,
    /// Field-level failures, in schema order.
    pub errors: Vec<FieldError>,
    /// Raw keys that matched no schema field. Flagged for schema-drift
    /// detection, never fatal.
    pub unknown_keys: Vec<String>,
}

impl ValidatedRecord {
    /// The typed value for a field, [`TypedValue::Missing`] if never set.
    pub fn value(&self, field: &str) -> &TypedValue {
        self.values.get(field).unwrap_or(&TypedValue::Missing)
    }

    /// Count of non-informational field errors.
    pub fn error_count(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| !e.reason.is_informational())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_scalars() {
        assert_eq!(RawValue::from_json(&json!("Buyout")), RawValue::Text("Buyout".into()));
        assert_eq!(RawValue::from_json(&json!(2.5)), RawValue::Number(2.5));
        assert_eq!(RawValue::from_json(&json!(true)), RawValue::Bool(true));
        assert_eq!(RawValue::from_json(&json!(null)), RawValue::Absent);
    }

    #[test]
    fn from_json_rejects_nested_shapes() {
        assert_eq!(RawValue::from_json(&json!([1, 2])), RawValue::Absent);
        assert_eq!(RawValue::from_json(&json!({"a": 1})), RawValue::Absent);
    }

    #[test]
    fn from_json_blank_string_is_absent() {
        assert_eq!(RawValue::from_json(&json!("")), RawValue::Absent);
        assert_eq!(RawValue::from_json(&json!("   ")), RawValue::Absent);
    }

    #[test]
    fn render_distinguishes_missing_from_empty_text() {
        assert_eq!(TypedValue::Missing.render(), MISSING_MARKER);
        assert_eq!(TypedValue::Text(String::new()).render(), "");
    }

    #[test]
    fn render_amount_with_and_without_currency() {
        let known = TypedValue::Amount {
            value: 350_000.0,
            currency: CurrencyTag::iso("USD"),
        };
        assert_eq!(known.render(), "350000 USD");

        let unknown = TypedValue::Amount {
            value: 350_000.0,
            currency: CurrencyTag::Unknown,
        };
        assert_eq!(unknown.render(), "350000");
    }

    #[test]
    fn percent_to_raw_keeps_the_marker() {
        assert_eq!(
            TypedValue::Percent(0.15).to_raw(),
            RawValue::Text("15%".into())
        );
        // Above 100% the unmarked form would be re-scaled on re-coercion.
        assert_eq!(
            TypedValue::Percent(1.5).to_raw(),
            RawValue::Text("150%".into())
        );
    }

    #[test]
    fn record_and_errors_serialise_to_json() {
        let record = crate::validate::validate(
            &std::collections::HashMap::new(),
            crate::schema::schema(),
            "doc.pdf",
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"source_ref\":\"doc.pdf\""));
        assert!(json.contains("MissingRequired"));
    }

    #[test]
    fn currency_tag_display() {
        assert_eq!(CurrencyTag::iso("EUR").to_string(), "EUR");
        assert_eq!(CurrencyTag::Unknown.to_string(), "unknown");
    }
}
