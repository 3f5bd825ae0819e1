//! Prompt templates for the extraction stage.
//!
//! The system prompt is assembled from the schema rather than hand-kept, so
//! the field list, required markers, and enum domains the model sees are
//! always the ones the validator enforces.

use crate::schema::{schema, FieldSpec, SemanticType};
use once_cell::sync::Lazy;
use std::fmt::Write as _;

const EXTRACTION_RULES: &str = r#"You are an extraction agent for fund-of-funds quarterly reports.
Input: the plain text of one investor report (arbitrary layout).
Output: a JSON array. Each element is one flat JSON object describing one
underlying asset exposure, keyed EXACTLY by the field names listed below.

STRICT RULES
- One report in, one JSON array out. No prose, no markdown fences, no comments.
- If the report contains no asset exposures, return an empty array: [].
- Never invent values. If a field is not found, use null.
- Numbers: emit as JSON numbers (no quotes). Parse K/M/B suffixes
  (e.g. 1.2M -> 1200000).
- Percents and ratios: decimals (5% -> 0.05, 250bp -> 0.025). Ownership
  fields too.
- Dates: ISO "YYYY-MM-DD" strings.
- Currency amounts: a number plus the ISO code when stated or implied by a
  symbol (e.g. "350000 USD"); a bare number when the currency is unclear.
- Enumerated fields: use one of the exact values listed for that field. If
  unsure, use null.
- Keep keys exactly as listed. Do not add keys of your own."#;

/// Default system prompt for the extraction call.
pub static EXTRACTION_SYSTEM_PROMPT: Lazy<String> = Lazy::new(|| {
    let mut out = String::with_capacity(8 * 1024);
    out.push_str(EXTRACTION_RULES);
    out.push_str("\n\nFIELD SET (exact keys)\n");
    for spec in schema() {
        describe_field(&mut out, spec);
    }
    out
});

fn describe_field(out: &mut String, spec: &FieldSpec) {
    let kind = match spec.semantic_type {
        SemanticType::Decimal => "number",
        SemanticType::Percentage => "decimal fraction",
        SemanticType::Date => "date",
        SemanticType::Enum => "one of",
        SemanticType::CurrencyAmount => "amount",
        SemanticType::Text => "text",
        SemanticType::Boolean => "boolean",
    };
    let _ = write!(out, "- {} ({kind}", spec.name);
    if spec.semantic_type == SemanticType::Enum {
        let _ = write!(out, " {:?}", spec.enum_domain);
    }
    out.push(')');
    if spec.required {
        out.push_str(" [required]");
    }
    out.push('\n');
}

/// User message wrapping one document's extracted text.
pub fn extraction_user_prompt(document_text: &str) -> String {
    format!("Here is the report text:\n\n{document_text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_every_schema_field() {
        let prompt = &*EXTRACTION_SYSTEM_PROMPT;
        for spec in schema() {
            assert!(
                prompt.contains(spec.name),
                "prompt is missing field {}",
                spec.name
            );
        }
    }

    #[test]
    fn prompt_carries_enum_domains_and_required_markers() {
        let prompt = &*EXTRACTION_SYSTEM_PROMPT;
        assert!(prompt.contains("V.C."));
        assert!(prompt.contains("Industrial & Logistics"));
        assert!(prompt.contains("- NAV_Date (date) [required]"));
    }

    #[test]
    fn user_prompt_embeds_the_document() {
        let p = extraction_user_prompt("NAV as of Q2 2025");
        assert!(p.contains("NAV as of Q2 2025"));
    }
}
