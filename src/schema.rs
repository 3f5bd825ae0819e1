//! The static field schema: every output column, its semantic type, and its
//! presentation group.
//!
//! The schema is the single source of truth for the whole pipeline. The
//! extraction prompt, the validator, the aggregator, and the exporter are all
//! driven by iterating [`schema()`] — adding a column means adding exactly one
//! [`FieldSpec`] declaration here and nothing else.
//!
//! Column order is presentation order: categories in declaration order, then
//! declaration order within each category. The exporter freezes this order
//! into the final table.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// How a raw value must be coerced for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SemanticType {
    /// Plain number, accepting `K`/`M`/`B` magnitude suffixes, thousands
    /// separators, `2.7x` multiples, and ratio forms (`%`, `bp`).
    Decimal,
    /// Calendar date (ISO, `Qn YYYY`, `as of …`), normalised to `YYYY-MM-DD`.
    Date,
    /// Ratio stored as a decimal fraction (`5%` → 0.05).
    Percentage,
    /// Case-insensitive match against a fixed domain of values.
    Enum,
    /// Number plus a detected ISO currency tag (explicitly `unknown` when
    /// none is detectable).
    CurrencyAmount,
    /// Free text, kept as-is.
    Text,
    /// `true`/`false`, also accepting `yes`/`no` text.
    Boolean,
}

/// Presentation group for one column, used only at the export boundary.
///
/// Groups mirror the header colour bands of the reference workbook; the fill
/// colour is a rendering hint the exporter may use or ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    FundDates,
    FundIdentity,
    TargetFund,
    AssetIdentity,
    Investment,
    AssetEconomics,
    DiscountInputs,
    CreditMetrics,
    ValuationPremia,
    RealEstate,
}

impl Category {
    /// Header fill colour (RGB hex, no `#`) for spreadsheet writers that
    /// support cell styling.
    pub fn fill_color(&self) -> &'static str {
        match self {
            Category::FundDates => "DDD0C8",
            Category::FundIdentity => "D9D9D9",
            Category::TargetFund => "DEEDED",
            Category::AssetIdentity => "F6E8CC",
            Category::Investment => "F8D7DA",
            Category::AssetEconomics => "D4EED4",
            Category::DiscountInputs => "BFBFBF",
            Category::CreditMetrics => "F8CBAD",
            Category::ValuationPremia => "C9C9C9",
            Category::RealEstate => "C6EFCE",
        }
    }
}

/// Declaration of one output column.
///
/// Serialize-only: the names and domains are `'static` borrows of this
/// crate's schema table, never read back in.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    /// Unique column name, matching the key the extraction stage emits.
    pub name: &'static str,
    pub semantic_type: SemanticType,
    /// Required fields record a `MissingRequired` error when absent.
    pub required: bool,
    /// Allowed values, non-empty iff `semantic_type` is [`SemanticType::Enum`].
    pub enum_domain: &'static [&'static str],
    pub category: Category,
}

impl FieldSpec {
    const fn new(name: &'static str, semantic_type: SemanticType, category: Category) -> Self {
        Self {
            name,
            semantic_type,
            required: false,
            enum_domain: &[],
            category,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn enumerated(
        name: &'static str,
        enum_domain: &'static [&'static str],
        category: Category,
    ) -> Self {
        Self {
            name,
            semantic_type: SemanticType::Enum,
            required: false,
            enum_domain,
            category,
        }
    }
}

// ── Enum domains ─────────────────────────────────────────────────────────

pub const INSTRUMENT_STRATEGY: &[&str] = &["Equity", "Corporate Debt"];

pub const HEDGING_STRATEGY: &[&str] = &["Yes", "No", "Expected"];

pub const FUND_STRATEGY: &[&str] = &[
    "V.C.",
    "Growth",
    "Buyout",
    "L. Buyout",
    "Asia",
    "Diretto",
    "Senior",
    "Uni-Tranche",
    "Mezzanine",
    "Junior",
    "Preferred Equity",
    "ReFin",
    "Equity",
    "PIK",
    "NAV Lending",
    "CLO",
    "Core",
    "Core+",
    "Value Added",
    "Opportunistic",
    "RE Credit",
    "Other",
];

pub const GEOGRAPHY_MACROAREA: &[&str] = &[
    "Europe",
    "UK",
    "N. America",
    "LatAm",
    "China",
    "SEA & Oceania",
    "Other",
];

pub const MACRO_SECTOR: &[&str] = &[
    "Education",
    "Financial Services",
    "Health & Pharma",
    "Industrial & Business Services",
    "Consumer & Retail",
    "Travel & Hospitality",
    "Software & Technol.",
    "Real estate",
    "Other",
];

pub const INVESTMENT_TYPE: &[&str] = &["Primary", "Secondary", "Co-Inv"];

pub const REALIZATION_STATUS: &[&str] = &["Realized", "Unrealized"];

pub const REAL_ESTATE_SEGMENT: &[&str] = &[
    "Residential",
    "Office",
    "Retail",
    "Industrial & Logistics",
    "Hotel",
    "Mixed Use",
    "Other",
];

// ── The schema ───────────────────────────────────────────────────────────

use Category::*;
use SemanticType::*;

static SCHEMA: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
    vec![
        // Reference dates
        FieldSpec::new("NAV_Date", Date, FundDates).required(),
        FieldSpec::new("Valuation_Date", Date, FundDates),
        // Fund-of-funds identity
        FieldSpec::new("FONDO_TARGET_ASSET", Text, FundIdentity).required(),
        FieldSpec::new("OICR_FONDO_TARGET", Text, FundIdentity).required(),
        FieldSpec::new("OICR", Text, FundIdentity).required(),
        FieldSpec::new("ISIN_OICR", Text, FundIdentity),
        // Underlying target fund
        FieldSpec::new("Nome_Fondo_Target", Text, TargetFund).required(),
        FieldSpec::new("ISIN_Fondo_Target", Text, TargetFund),
        FieldSpec::enumerated("Tipologia_Strumento", INSTRUMENT_STRATEGY, TargetFund),
        FieldSpec::new("Currency_Fondo_Target", Text, TargetFund),
        FieldSpec::new("Country_Fondo_Target", Text, TargetFund),
        FieldSpec::enumerated("Hedging_Strategy_Fondo_Target", HEDGING_STRATEGY, TargetFund),
        FieldSpec::enumerated("Strategia_Fondo_Target", FUND_STRATEGY, TargetFund),
        // Underlying asset identity
        FieldSpec::new("Nome_Asset", Text, AssetIdentity),
        FieldSpec::new("Nome_Asset_Sintetico", Text, AssetIdentity),
        FieldSpec::enumerated("Area_Geo_Asset", GEOGRAPHY_MACROAREA, AssetIdentity),
        FieldSpec::new("Paese_Asset", Text, AssetIdentity),
        FieldSpec::new("Indirizzo_Asset", Text, AssetIdentity),
        FieldSpec::new("Currency_Asset", Text, AssetIdentity),
        FieldSpec::enumerated("Macrosettore_Attivita_Asset", MACRO_SECTOR, AssetIdentity),
        FieldSpec::new("Settore_Attivita_Asset", Text, AssetIdentity),
        // Investment terms and fund-level economics
        FieldSpec::enumerated("Tipologia_Investimento", INVESTMENT_TYPE, Investment),
        FieldSpec::new("Investment_Date", Date, Investment),
        FieldSpec::new("Exit_Date", Date, Investment),
        FieldSpec::new("Valuation_Methodology", Text, Investment),
        FieldSpec::enumerated("Realized_Unrealized", REALIZATION_STATUS, Investment),
        FieldSpec::new("Commitment_Fondo_Target", CurrencyAmount, Investment),
        FieldSpec::new("Capitale_Investito_Lordo_Loc_Curr", CurrencyAmount, Investment),
        FieldSpec::new("Distribuzioni_Loc_Curr", CurrencyAmount, Investment),
        FieldSpec::new("FMV_Loc_Curr", CurrencyAmount, Investment),
        FieldSpec::new("TVPI", Decimal, Investment),
        FieldSpec::new("IRR", Percentage, Investment),
        FieldSpec::new("Cap_Inv_Fondo_Target", Percentage, Investment),
        FieldSpec::new("FMV_Fondo_Target", Percentage, Investment),
        FieldSpec::new("Cap_Inv_Ripartito_FOF", CurrencyAmount, Investment),
        FieldSpec::new("NAV_Ripartito_FOF", CurrencyAmount, Investment),
        FieldSpec::new("Capitale_Investito_Fof", Percentage, Investment),
        FieldSpec::new("FMV_Fof", Percentage, Investment),
        // Per-asset economics (entry and LTM)
        FieldSpec::new("Possesso_Entry", Percentage, AssetEconomics),
        FieldSpec::new("EV_Entry", CurrencyAmount, AssetEconomics),
        FieldSpec::new("EBITDA_Entry", CurrencyAmount, AssetEconomics),
        FieldSpec::new("Margin_Entry", Percentage, AssetEconomics),
        FieldSpec::new("Net_Revenue_Entry", CurrencyAmount, AssetEconomics),
        FieldSpec::new("Net_Debt_Entry", CurrencyAmount, AssetEconomics),
        FieldSpec::new("FCF_Entry", CurrencyAmount, AssetEconomics),
        FieldSpec::new("Net_Result_Entry", CurrencyAmount, AssetEconomics),
        FieldSpec::new("EVEbitda_Entry", Decimal, AssetEconomics),
        FieldSpec::new("EVRevenue_Entry", Decimal, AssetEconomics),
        FieldSpec::new("Net_DebtEbitda_Entry", Decimal, AssetEconomics),
        FieldSpec::new("Economics_Reporting_Date", Date, AssetEconomics),
        FieldSpec::new("Possesso", Percentage, AssetEconomics),
        FieldSpec::new("EV", CurrencyAmount, AssetEconomics),
        FieldSpec::new("LTM_EBITDA", CurrencyAmount, AssetEconomics),
        FieldSpec::new("LTM_Margin", Percentage, AssetEconomics),
        FieldSpec::new("LTM_Net_Revenues", CurrencyAmount, AssetEconomics),
        FieldSpec::new("LTM_Net_Equity", CurrencyAmount, AssetEconomics),
        FieldSpec::new("LTM_Net_Debt", CurrencyAmount, AssetEconomics),
        FieldSpec::new("LTM_FCF", CurrencyAmount, AssetEconomics),
        FieldSpec::new("LTM_Gross_Profit", CurrencyAmount, AssetEconomics),
        FieldSpec::new("LTM_Net_Result", CurrencyAmount, AssetEconomics),
        // Discount-rate build-up inputs
        FieldSpec::new("Target_Companys_Debt_Equity_Ratio", Decimal, DiscountInputs),
        FieldSpec::new("Discount_Rate", Percentage, DiscountInputs),
        FieldSpec::new("Beta", Decimal, DiscountInputs),
        FieldSpec::new("Cost_of_Equity", Percentage, DiscountInputs),
        FieldSpec::new("Cost_of_Debt", Percentage, DiscountInputs),
        // Multiples and credit metrics
        FieldSpec::new("EVEBITDA", Decimal, CreditMetrics),
        FieldSpec::new("EVRevenue", Decimal, CreditMetrics),
        FieldSpec::new("Net_DebtEbitda", Decimal, CreditMetrics),
        FieldSpec::new("Maturity_Date", Date, CreditMetrics),
        FieldSpec::new("Price", Decimal, CreditMetrics),
        FieldSpec::new("Coupon", Percentage, CreditMetrics),
        FieldSpec::new("Spread", Percentage, CreditMetrics),
        FieldSpec::new("Watchlist_position", Text, CreditMetrics),
        FieldSpec::new("Ltv", Percentage, CreditMetrics),
        FieldSpec::new("Leverage_Entry", Decimal, CreditMetrics),
        FieldSpec::new("Leverage", Decimal, CreditMetrics),
        FieldSpec::new("Duration", Decimal, CreditMetrics),
        FieldSpec::new("Credit_Sensitivity", Decimal, CreditMetrics),
        // Valuation premia
        FieldSpec::new("Risk_Free_Rate_applied_to_Valuation", Percentage, ValuationPremia),
        FieldSpec::new("Credit_Rating", Text, ValuationPremia),
        FieldSpec::new("Credit_Rating_Source", Text, ValuationPremia),
        FieldSpec::new("Credit_Spread", Percentage, ValuationPremia),
        FieldSpec::new("Country_Premium", Percentage, ValuationPremia),
        FieldSpec::new("Liquidity_Premium", Percentage, ValuationPremia),
        FieldSpec::new("Other_premia", Percentage, ValuationPremia),
        FieldSpec::new("Total_Discount_Rate_applied_to_Valuation", Percentage, ValuationPremia),
        // Real estate
        FieldSpec::new("Area", Decimal, RealEstate),
        FieldSpec::enumerated("Real_Estate_Segment", REAL_ESTATE_SEGMENT, RealEstate),
    ]
});

/// The full portfolio schema, in frozen column order.
pub fn schema() -> &'static [FieldSpec] {
    &SCHEMA
}

/// Look up one field by name.
pub fn field(name: &str) -> Option<&'static FieldSpec> {
    SCHEMA.iter().find(|f| f.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let mut seen = HashSet::new();
        for spec in schema() {
            assert!(seen.insert(spec.name), "duplicate field name: {}", spec.name);
        }
    }

    #[test]
    fn enum_domain_nonempty_iff_enum() {
        for spec in schema() {
            if spec.semantic_type == SemanticType::Enum {
                assert!(!spec.enum_domain.is_empty(), "{} has empty domain", spec.name);
            } else {
                assert!(spec.enum_domain.is_empty(), "{} has stray domain", spec.name);
            }
        }
    }

    #[test]
    fn required_fields_match_reference_models() {
        let required: Vec<&str> = schema()
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();
        assert_eq!(
            required,
            [
                "NAV_Date",
                "FONDO_TARGET_ASSET",
                "OICR_FONDO_TARGET",
                "OICR",
                "Nome_Fondo_Target",
            ]
        );
    }

    #[test]
    fn categories_are_contiguous() {
        // Presentation order is category order; a category must never be
        // interleaved with another.
        let mut seen = Vec::new();
        for spec in schema() {
            if seen.last() != Some(&spec.category) {
                assert!(
                    !seen.contains(&spec.category),
                    "category {:?} is interleaved",
                    spec.category
                );
                seen.push(spec.category);
            }
        }
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn column_count_matches_reference_layout() {
        assert_eq!(schema().len(), 88);
    }

    #[test]
    fn field_spec_serialises() {
        let json = serde_json::to_string(field("Strategia_Fondo_Target").unwrap()).unwrap();
        assert!(json.contains("\"Strategia_Fondo_Target\""));
        assert!(json.contains("V.C."));
    }

    #[test]
    fn lookup_by_name() {
        let f = field("NAV_Date").unwrap();
        assert_eq!(f.semantic_type, SemanticType::Date);
        assert!(f.required);
        assert!(field("No_Such_Column").is_none());
    }
}
