//! Value coercers: pure rules turning one [`RawValue`] into one typed value.
//!
//! ## Why coercion at all?
//!
//! Even a well-prompted extraction model emits values that are *semantically
//! right* but *lexically loose* — `"$350K"` where a number is wanted,
//! `"Q2 2025"` where a date is wanted, `"buyout"` where the domain says
//! `"Buyout"`. These rules are cheap, deterministic, and referentially
//! transparent: no I/O, no shared state, each independently testable.
//!
//! ## Fixed policies
//!
//! Three inputs are inherently ambiguous; each gets one deterministic rule
//! rather than a guess from sample data:
//!
//! - **Percent scale**: a `%` or `bp` marker always divides (by 100 / 10 000).
//!   Without a marker, |v| ≤ 1 is taken as an already-fractional value and
//!   anything larger as percent-scale (divided by 100).
//! - **Day/month order**: `DD/MM/YYYY` is tried before `MM/DD/YYYY`, so
//!   day-first wins when both parse.
//! - **Enum matching**: values are canonicalised to lowercase alphanumerics
//!   before exact comparison (`"VC"` matches the domain value `"V.C."`);
//!   failing that, token overlap ≥ [`FUZZY_MATCH_THRESHOLD`] picks the best
//!   domain value, ties broken by domain order. Below threshold the coercion
//!   fails — there is no silent default.

use crate::error::CoercionError;
use crate::record::{CurrencyTag, RawValue, TypedValue};
use crate::schema::{FieldSpec, SemanticType};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Minimum token-overlap (Jaccard) score for a fuzzy enum match.
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.5;

/// Currency symbols mapped to their dominant ISO code.
const CURRENCY_SYMBOLS: &[(char, &str)] = &[
    ('$', "USD"),
    ('€', "EUR"),
    ('£', "GBP"),
    ('¥', "JPY"),
];

/// ISO 4217 codes recognised as standalone tokens.
const ISO_CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CHF", "AUD", "CAD", "SEK", "NOK", "DKK", "HKD", "SGD", "CNY",
    "NZD",
];

/// Apply the coercer declared by `spec` to one raw value.
pub fn coerce(spec: &FieldSpec, raw: &RawValue) -> Result<TypedValue, CoercionError> {
    match spec.semantic_type {
        SemanticType::Decimal => coerce_decimal(raw).map(TypedValue::Number),
        SemanticType::Percentage => coerce_percentage(raw).map(TypedValue::Percent),
        SemanticType::Date => coerce_date(raw).map(TypedValue::Date),
        SemanticType::Enum => coerce_enum(raw, spec.enum_domain).map(TypedValue::EnumValue),
        SemanticType::CurrencyAmount => {
            coerce_amount(raw).map(|(value, currency)| TypedValue::Amount { value, currency })
        }
        SemanticType::Text => coerce_text(raw).map(TypedValue::Text),
        SemanticType::Boolean => coerce_bool(raw).map(TypedValue::Bool),
    }
}

// ── Decimal-with-magnitude ───────────────────────────────────────────────

/// Parse a number from text like `4,570M`, `$174M`, `2.7x`, `12%`, `250 bp`.
///
/// Magnitude suffixes multiply the mantissa (`K` 10³, `M` 10⁶, `B` 10⁹);
/// ratio markers divide (`%` by 100, `bp` by 10 000); `x` multiples are taken
/// at face value; currency symbols and thousands separators are stripped.
pub fn coerce_decimal(raw: &RawValue) -> Result<f64, CoercionError> {
    match raw {
        RawValue::Number(n) => Ok(*n),
        RawValue::Text(s) => decimal_from_text(s),
        RawValue::Bool(_) => Err(CoercionError::WrongShape { expected: "number" }),
        RawValue::Absent => Err(CoercionError::NotNumeric),
    }
}

fn decimal_from_text(s: &str) -> Result<f64, CoercionError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(CoercionError::NotNumeric);
    }

    // Ratio markers first: they bind tighter than magnitude suffixes.
    if let Some(rest) = s.strip_suffix('%') {
        return plain_number(rest).map(|v| v / 100.0);
    }
    let lower = s.to_ascii_lowercase();
    if let Some(rest) = lower.strip_suffix("bp") {
        return plain_number(rest).map(|v| v / 10_000.0);
    }
    // Multiples like `2.7x`.
    if let Some(rest) = lower.strip_suffix('x') {
        if let Ok(v) = plain_number(rest) {
            return Ok(v);
        }
    }

    let (body, _currency) = split_currency(s);
    let body = body.trim();
    if let Some(last) = body.chars().last() {
        if let Some(mult) = magnitude(last) {
            let head = &body[..body.len() - last.len_utf8()];
            if let Ok(v) = plain_number(head) {
                return Ok(v * mult);
            }
        }
    }
    plain_number(body)
}

/// The multiplier for a magnitude suffix, if `c` is one.
fn magnitude(c: char) -> Option<f64> {
    match c.to_ascii_uppercase() {
        'K' => Some(1e3),
        'M' => Some(1e6),
        'B' => Some(1e9),
        _ => None,
    }
}

/// Strict numeric parse after removing thousands separators.
fn plain_number(s: &str) -> Result<f64, CoercionError> {
    let cleaned = s.trim().replace(',', "");
    if cleaned.is_empty() {
        return Err(CoercionError::NotNumeric);
    }
    cleaned.parse::<f64>().map_err(|_| CoercionError::NotNumeric)
}

/// Remove currency markers from `s`, reporting what was found.
///
/// Symbols are detected anywhere in the string; ISO codes only as standalone
/// tokens (so the `M` in `174M` is never mistaken for a code). The first
/// marker wins when several are present.
fn split_currency(s: &str) -> (String, Option<String>) {
    let mut tag: Option<String> = None;

    let mut without_symbols = String::with_capacity(s.len());
    for ch in s.chars() {
        if let Some((_, code)) = CURRENCY_SYMBOLS.iter().find(|(sym, _)| *sym == ch) {
            if tag.is_none() {
                tag = Some((*code).to_string());
            }
        } else {
            without_symbols.push(ch);
        }
    }

    let mut kept: Vec<&str> = Vec::new();
    for tok in without_symbols.split_whitespace() {
        let is_code = tok.len() == 3
            && tok.chars().all(|c: char| c.is_ascii_alphabetic())
            && ISO_CURRENCIES.iter().any(|c| c.eq_ignore_ascii_case(tok));
        if is_code {
            if tag.is_none() {
                tag = Some(tok.to_ascii_uppercase());
            }
        } else {
            kept.push(tok);
        }
    }

    (kept.join(" "), tag)
}

// ── Percentage ───────────────────────────────────────────────────────────

/// Parse a ratio into a decimal fraction.
///
/// `5%` → 0.05, `250 bp` → 0.025, `0.05` → 0.05, `12` → 0.12. The unmarked
/// branch follows the fixed scale rule documented at module level.
pub fn coerce_percentage(raw: &RawValue) -> Result<f64, CoercionError> {
    match raw {
        RawValue::Number(n) => Ok(fraction_scale(*n)),
        RawValue::Text(s) => {
            let t = s.trim();
            let marked = t.ends_with('%') || t.to_ascii_lowercase().ends_with("bp");
            let v = decimal_from_text(t)?;
            if marked {
                // decimal_from_text already divided.
                Ok(v)
            } else {
                Ok(fraction_scale(v))
            }
        }
        RawValue::Bool(_) => Err(CoercionError::WrongShape { expected: "ratio" }),
        RawValue::Absent => Err(CoercionError::NotNumeric),
    }
}

fn fraction_scale(v: f64) -> f64 {
    if v.abs() <= 1.0 {
        v
    } else {
        v / 100.0
    }
}

// ── Date ─────────────────────────────────────────────────────────────────

static RE_QUARTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^Q([1-4])\s*(\d{4})$").unwrap());
static RE_AS_OF: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bas\s+of\b").unwrap());
static RE_YEAR_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").unwrap());

/// Formats tried in order after the quarter and year-month patterns.
/// Day-first comes before month-first, so `03/04/2023` is 3 April.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%B %d, %Y", "%d %B %Y"];

/// Parse `YYYY-MM-DD`, `YYYY-MM`, `Qn YYYY`, slashed and spelled-out dates,
/// with an optional leading `as of`.
///
/// Quarter and year-month forms map to the last calendar day of the period.
pub fn coerce_date(raw: &RawValue) -> Result<NaiveDate, CoercionError> {
    let s = match raw {
        RawValue::Text(s) => s,
        RawValue::Number(_) | RawValue::Bool(_) => {
            return Err(CoercionError::WrongShape { expected: "date text" })
        }
        RawValue::Absent => return Err(CoercionError::UnparseableDate),
    };
    let s = RE_AS_OF.replace(s.trim(), "");
    let s = s.trim();

    if let Some(caps) = RE_QUARTER.captures(s) {
        let quarter: u32 = caps[1].parse().map_err(|_| CoercionError::UnparseableDate)?;
        let year: i32 = caps[2].parse().map_err(|_| CoercionError::UnparseableDate)?;
        return last_day_of_month(year, quarter * 3).ok_or(CoercionError::UnparseableDate);
    }

    if let Some(caps) = RE_YEAR_MONTH.captures(s) {
        let year: i32 = caps[1].parse().map_err(|_| CoercionError::UnparseableDate)?;
        let month: u32 = caps[2].parse().map_err(|_| CoercionError::UnparseableDate)?;
        return last_day_of_month(year, month).ok_or(CoercionError::UnparseableDate);
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }

    Err(CoercionError::UnparseableDate)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

// ── Enum ─────────────────────────────────────────────────────────────────

/// Match a raw value against a fixed domain, returning the canonical domain
/// value.
///
/// Exact match (after punctuation/case canonicalisation) wins; otherwise the
/// domain value with the highest token overlap at or above
/// [`FUZZY_MATCH_THRESHOLD`] is picked. Below threshold the match fails —
/// never a default.
pub fn coerce_enum(raw: &RawValue, domain: &[&str]) -> Result<String, CoercionError> {
    let s = match raw {
        RawValue::Text(s) => s,
        RawValue::Number(_) | RawValue::Bool(_) => {
            return Err(CoercionError::WrongShape { expected: "enum text" })
        }
        RawValue::Absent => return Err(CoercionError::NoEnumMatch),
    };

    let trimmed = s.trim();
    // Literal (case-insensitive) before canonical: "core+" must prefer
    // "Core+" even though both it and "Core" canonicalise to "core".
    if let Some(exact) = domain.iter().find(|d| d.eq_ignore_ascii_case(trimmed)) {
        return Ok((*exact).to_string());
    }

    let canon_input = canon(s);
    if canon_input.is_empty() {
        return Err(CoercionError::NoEnumMatch);
    }

    if let Some(exact) = domain.iter().find(|d| canon(d) == canon_input) {
        return Ok((*exact).to_string());
    }

    let input_tokens = tokens(s);
    let mut best: Option<(f64, &str)> = None;
    for d in domain {
        let score = jaccard(&input_tokens, &tokens(d));
        // Strictly greater keeps the earliest domain value on ties.
        if best.map_or(true, |(b, _)| score > b) {
            best = Some((score, d));
        }
    }

    match best {
        Some((score, d)) if score >= FUZZY_MATCH_THRESHOLD => Ok(d.to_string()),
        _ => Err(CoercionError::NoEnumMatch),
    }
}

/// Lowercase alphanumerics only: `"V.C."` → `"vc"`.
fn canon(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn tokens(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

// ── Currency-amount ──────────────────────────────────────────────────────

/// Decimal-with-magnitude plus a detected currency tag.
///
/// A bare number carries [`CurrencyTag::Unknown`] — the validator records an
/// informational `CurrencyUnknown` for it, but the amount itself is kept.
pub fn coerce_amount(raw: &RawValue) -> Result<(f64, CurrencyTag), CoercionError> {
    match raw {
        RawValue::Number(n) => Ok((*n, CurrencyTag::Unknown)),
        RawValue::Text(s) => {
            let (_, tag) = split_currency(s);
            let value = decimal_from_text(s)?;
            Ok((value, tag.map(CurrencyTag::Iso).unwrap_or(CurrencyTag::Unknown)))
        }
        RawValue::Bool(_) => Err(CoercionError::WrongShape { expected: "amount" }),
        RawValue::Absent => Err(CoercionError::NotNumeric),
    }
}

// ── Text and boolean ─────────────────────────────────────────────────────

pub fn coerce_text(raw: &RawValue) -> Result<String, CoercionError> {
    match raw {
        RawValue::Text(s) => Ok(s.trim().to_string()),
        // Models occasionally emit a bare number for a text column (ISINs,
        // watchlist positions); accept rather than drop the value.
        RawValue::Number(n) => Ok(format!("{n}")),
        RawValue::Bool(b) => Ok(b.to_string()),
        RawValue::Absent => Err(CoercionError::WrongShape { expected: "text" }),
    }
}

pub fn coerce_bool(raw: &RawValue) -> Result<bool, CoercionError> {
    match raw {
        RawValue::Bool(b) => Ok(*b),
        RawValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => Ok(true),
            "false" | "no" | "n" => Ok(false),
            _ => Err(CoercionError::NotBoolean),
        },
        RawValue::Number(_) | RawValue::Absent => Err(CoercionError::NotBoolean),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    // Decimal-with-magnitude

    #[test]
    fn decimal_magnitude_suffixes() {
        assert_eq!(coerce_decimal(&text("1.2M")).unwrap(), 1_200_000.0);
        assert_eq!(coerce_decimal(&text("350K")).unwrap(), 350_000.0);
        assert_eq!(coerce_decimal(&text("2B")).unwrap(), 2_000_000_000.0);
        assert_eq!(coerce_decimal(&text("1.2m")).unwrap(), 1_200_000.0);
    }

    #[test]
    fn decimal_suffix_equals_stripped_times_magnitude() {
        // coerce("1.2M") == coerce("1.2") * 1e6
        let with_suffix = coerce_decimal(&text("1.2M")).unwrap();
        let stripped = coerce_decimal(&text("1.2")).unwrap();
        assert_eq!(with_suffix, stripped * 1e6);
    }

    #[test]
    fn decimal_thousands_separators_and_currency() {
        assert_eq!(coerce_decimal(&text("4,570M")).unwrap(), 4_570_000_000.0);
        assert_eq!(coerce_decimal(&text("$174M")).unwrap(), 174_000_000.0);
        assert_eq!(coerce_decimal(&text("€ 1,250")).unwrap(), 1_250.0);
        assert_eq!(coerce_decimal(&text("EUR 500K")).unwrap(), 500_000.0);
    }

    #[test]
    fn decimal_ratio_and_multiple_forms() {
        assert_eq!(coerce_decimal(&text("12%")).unwrap(), 0.12);
        assert_eq!(coerce_decimal(&text("250 bp")).unwrap(), 0.025);
        assert_eq!(coerce_decimal(&text("2.7x")).unwrap(), 2.7);
    }

    #[test]
    fn decimal_plain_and_negative() {
        assert_eq!(coerce_decimal(&text("42")).unwrap(), 42.0);
        assert_eq!(coerce_decimal(&text("-3.5")).unwrap(), -3.5);
        assert_eq!(coerce_decimal(&RawValue::Number(7.25)).unwrap(), 7.25);
    }

    #[test]
    fn decimal_rejects_non_numeric() {
        assert_eq!(coerce_decimal(&text("n/a")), Err(CoercionError::NotNumeric));
        assert_eq!(coerce_decimal(&text("")), Err(CoercionError::NotNumeric));
        assert_eq!(coerce_decimal(&text("M")), Err(CoercionError::NotNumeric));
        assert!(matches!(
            coerce_decimal(&RawValue::Bool(true)),
            Err(CoercionError::WrongShape { .. })
        ));
    }

    // Percentage — both branches of the scale rule, explicitly.

    #[test]
    fn percentage_with_marker_always_divides() {
        assert_eq!(coerce_percentage(&text("5%")).unwrap(), 0.05);
        assert_eq!(coerce_percentage(&text("0.5%")).unwrap(), 0.005);
        assert_eq!(coerce_percentage(&text("150%")).unwrap(), 1.5);
        assert_eq!(coerce_percentage(&text("250bp")).unwrap(), 0.025);
    }

    #[test]
    fn percentage_unmarked_small_is_already_fractional() {
        assert_eq!(coerce_percentage(&RawValue::Number(0.05)).unwrap(), 0.05);
        assert_eq!(coerce_percentage(&text("0.65")).unwrap(), 0.65);
        assert_eq!(coerce_percentage(&RawValue::Number(1.0)).unwrap(), 1.0);
        assert_eq!(coerce_percentage(&RawValue::Number(-0.3)).unwrap(), -0.3);
    }

    #[test]
    fn percentage_unmarked_large_is_percent_scale() {
        assert_eq!(coerce_percentage(&RawValue::Number(12.0)).unwrap(), 0.12);
        assert_eq!(coerce_percentage(&text("65")).unwrap(), 0.65);
        assert_eq!(coerce_percentage(&RawValue::Number(-30.0)).unwrap(), -0.3);
    }

    // Date

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_iso() {
        assert_eq!(coerce_date(&text("2023-06-30")).unwrap(), date(2023, 6, 30));
    }

    #[test]
    fn date_quarter_maps_to_quarter_end() {
        assert_eq!(coerce_date(&text("Q1 2023")).unwrap(), date(2023, 3, 31));
        assert_eq!(coerce_date(&text("Q2 2025")).unwrap(), date(2025, 6, 30));
        assert_eq!(coerce_date(&text("q4 2024")).unwrap(), date(2024, 12, 31));
    }

    #[test]
    fn date_year_month_maps_to_month_end() {
        assert_eq!(coerce_date(&text("2024-02")).unwrap(), date(2024, 2, 29));
        assert_eq!(coerce_date(&text("2023-12")).unwrap(), date(2023, 12, 31));
    }

    #[test]
    fn date_as_of_prefix() {
        assert_eq!(
            coerce_date(&text("as of 30 June 2023")).unwrap(),
            date(2023, 6, 30)
        );
        assert_eq!(
            coerce_date(&text("As of 2023-09-30")).unwrap(),
            date(2023, 9, 30)
        );
    }

    #[test]
    fn date_day_first_wins_when_ambiguous() {
        // Both DD/MM and MM/DD parse; the fixed rule is day-first.
        assert_eq!(coerce_date(&text("03/04/2023")).unwrap(), date(2023, 4, 3));
        // Unambiguous month-first still parses via the second format.
        assert_eq!(coerce_date(&text("12/25/2023")).unwrap(), date(2023, 12, 25));
    }

    #[test]
    fn date_spelled_out() {
        assert_eq!(
            coerce_date(&text("June 30, 2023")).unwrap(),
            date(2023, 6, 30)
        );
        assert_eq!(
            coerce_date(&text("30 June 2023")).unwrap(),
            date(2023, 6, 30)
        );
    }

    #[test]
    fn date_rejects_garbage() {
        assert_eq!(
            coerce_date(&text("next quarter")),
            Err(CoercionError::UnparseableDate)
        );
        assert!(matches!(
            coerce_date(&RawValue::Number(45000.0)),
            Err(CoercionError::WrongShape { .. })
        ));
    }

    // Enum

    const STRATEGIES: &[&str] = &["Buyout", "Growth", "Venture Capital"];

    #[test]
    fn enum_exact_match_is_case_insensitive() {
        assert_eq!(coerce_enum(&text("buyout"), STRATEGIES).unwrap(), "Buyout");
        assert_eq!(coerce_enum(&text("GROWTH"), STRATEGIES).unwrap(), "Growth");
    }

    #[test]
    fn enum_exact_match_ignores_punctuation() {
        // "VC" and "V.C." canonicalise to the same string.
        assert_eq!(
            coerce_enum(&text("VC"), crate::schema::FUND_STRATEGY).unwrap(),
            "V.C."
        );
        assert_eq!(
            coerce_enum(&text("core+"), crate::schema::FUND_STRATEGY).unwrap(),
            "Core+"
        );
    }

    #[test]
    fn enum_no_fuzzy_default_for_abbreviations() {
        // "VC" shares no token with "Venture Capital": the policy is an
        // explicit failure, not a guessed expansion.
        assert_eq!(
            coerce_enum(&text("VC"), STRATEGIES),
            Err(CoercionError::NoEnumMatch)
        );
    }

    #[test]
    fn enum_fuzzy_token_overlap() {
        assert_eq!(
            coerce_enum(&text("Venture Capital fund"), STRATEGIES).unwrap(),
            "Venture Capital"
        );
        // Exactly at threshold: {industrial} / {industrial, logistics} = 0.5.
        assert_eq!(
            coerce_enum(&text("Industrial"), crate::schema::REAL_ESTATE_SEGMENT).unwrap(),
            "Industrial & Logistics"
        );
    }

    #[test]
    fn enum_below_threshold_fails() {
        assert_eq!(
            coerce_enum(&text("Infrastructure"), STRATEGIES),
            Err(CoercionError::NoEnumMatch)
        );
    }

    // Currency-amount

    #[test]
    fn amount_detects_symbol_and_code() {
        assert_eq!(
            coerce_amount(&text("$350K")).unwrap(),
            (350_000.0, CurrencyTag::iso("USD"))
        );
        assert_eq!(
            coerce_amount(&text("4,570M EUR")).unwrap(),
            (4_570_000_000.0, CurrencyTag::iso("EUR"))
        );
        assert_eq!(
            coerce_amount(&text("£12.5M")).unwrap(),
            (12_500_000.0, CurrencyTag::iso("GBP"))
        );
    }

    #[test]
    fn amount_without_currency_is_unknown_never_guessed() {
        assert_eq!(
            coerce_amount(&text("1.2M")).unwrap(),
            (1_200_000.0, CurrencyTag::Unknown)
        );
        assert_eq!(
            coerce_amount(&RawValue::Number(500.0)).unwrap(),
            (500.0, CurrencyTag::Unknown)
        );
    }

    #[test]
    fn amount_magnitude_letter_is_not_a_code() {
        // The M in 174M must not be read as a currency token.
        let (v, tag) = coerce_amount(&text("174M")).unwrap();
        assert_eq!(v, 174_000_000.0);
        assert_eq!(tag, CurrencyTag::Unknown);
    }

    // Text and boolean

    #[test]
    fn text_trims_and_accepts_scalars() {
        assert_eq!(coerce_text(&text("  Fondo Alpha  ")).unwrap(), "Fondo Alpha");
        assert_eq!(coerce_text(&RawValue::Number(42.0)).unwrap(), "42");
    }

    #[test]
    fn bool_accepts_yes_no() {
        assert!(coerce_bool(&text("Yes")).unwrap());
        assert!(!coerce_bool(&text("no")).unwrap());
        assert!(coerce_bool(&RawValue::Bool(true)).unwrap());
        assert_eq!(coerce_bool(&text("maybe")), Err(CoercionError::NotBoolean));
    }

    // Dispatch

    #[test]
    fn dispatch_follows_semantic_type() {
        let spec = crate::schema::field("IRR").unwrap();
        assert_eq!(
            coerce(spec, &text("15%")).unwrap(),
            TypedValue::Percent(0.15)
        );

        let spec = crate::schema::field("NAV_Date").unwrap();
        assert_eq!(
            coerce(spec, &text("Q2 2025")).unwrap(),
            TypedValue::Date(date(2025, 6, 30))
        );
    }

    // Idempotence: re-coercing a typed value's raw form yields the same value.

    #[test]
    fn reparse_of_typed_output_is_identity() {
        let cases = [
            ("TVPI", text("2.7x")),
            ("IRR", text("15%")),
            ("Discount_Rate", text("150%")),
            ("NAV_Date", text("Q2 2025")),
            ("Commitment_Fondo_Target", text("$350K")),
            ("FMV_Loc_Curr", text("1.2M")),
            ("Strategia_Fondo_Target", text("buyout")),
            ("Nome_Fondo_Target", text("Fondo Alpha")),
        ];
        for (field, raw) in cases {
            let spec = crate::schema::field(field).unwrap();
            let first = coerce(spec, &raw).unwrap();
            let second = coerce(spec, &first.to_raw()).unwrap();
            assert_eq!(first, second, "field {field} not idempotent");
        }
    }
}
