//! Multifamily underwriting engine.
//!
//! The pipeline runs leaves first and holds no state between calls:
//!
//! 1. [`unit_mix`] resolves the per-bedroom unit distribution.
//! 2. [`rent`] prices that mix against a ZIP rent table.
//! 3. [`opex`] builds the operating expense lines.
//! 4. [`financing`] sizes the loan against the LTV cap and DSCR floor.
//! 5. [`analysis`] composes the steps into an [`analysis::AnalysisResult`].
//!
//! [`portfolio`] runs the same analysis over many listings.

pub mod analysis;
pub mod financing;
pub mod opex;
pub mod parallel;
pub mod portfolio;
pub mod rent;
pub mod unit_mix;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Money;

pub use analysis::{analyze, analyze_with_terms, underwrite, AnalysisResult, UnderwritingInput};
pub use financing::{size_loan, underwrite_loan, FinancingTerms, LoanSizing, PrincipalSolver};
pub use opex::{compute_opex, OpexBreakdown, OpexOverrides};
pub use portfolio::{analyze_portfolio, export_rows, ExportRow, PortfolioInput, PortfolioOutput};
pub use rent::{aggregate_rent, RentMode, RentRoll, RentTable, RentTableEntry};
pub use unit_mix::resolve_unit_mix;

// ---------------------------------------------------------------------------
// Shared input types
// ---------------------------------------------------------------------------

/// One bucket of a property's unit composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMixEntry {
    pub bedrooms: u32,
    pub count: u32,
}

impl UnitMixEntry {
    pub fn new(bedrooms: u32, count: u32) -> Self {
        Self { bedrooms, count }
    }
}

/// A for-sale multifamily listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingInput {
    /// MLS listing number, used to match per-listing overrides in bulk runs
    #[serde(default, alias = "listNo", skip_serializing_if = "Option::is_none")]
    pub list_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// ZIP code; may be empty or padded with whitespace
    #[serde(default)]
    pub zip: String,
    /// Asking price
    #[serde(alias = "listPrice")]
    pub list_price: Money,
    /// Total number of units in the building
    #[serde(default, alias = "totalUnits")]
    pub units: u32,
    /// Total bedrooms across all units; only used to synthesize a default mix
    #[serde(default, alias = "totalBedrooms")]
    pub total_bedrooms: u32,
    /// Explicit unit mix from the listing, if the listing carries one
    #[serde(default, alias = "unitMix")]
    pub unit_mix: Vec<UnitMixEntry>,
    /// Annual real-estate taxes
    #[serde(default)]
    pub taxes: Money,
}

/// Caller-supplied replacements for the unit mix and individual expense lines.
///
/// An override unit mix replaces the listing's mix wholesale; expense
/// overrides replace single lines. Financing terms are not overridable here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default, alias = "unitMix", skip_serializing_if = "Option::is_none")]
    pub unit_mix: Option<Vec<UnitMixEntry>>,
    #[serde(default)]
    pub opex: OpexOverrides,
}

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

/// Round to `dp` decimal places with ties going toward positive infinity.
pub(crate) fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    let scale = Decimal::from(10u64.pow(dp));
    let rounded = ((value * scale) + dec!(0.5)).floor() / scale;
    rounded.normalize()
}

/// Whole currency units.
pub(crate) fn round_money(value: Money) -> Money {
    round_half_up(value, 0)
}

/// Ratios and percentages.
pub(crate) fn round_ratio(value: Decimal) -> Decimal {
    round_half_up(value, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_ties_go_up() {
        assert_eq!(round_money(dec!(2.5)), dec!(3));
        assert_eq!(round_money(dec!(-2.5)), dec!(-2));
        assert_eq!(round_money(dec!(1234.49)), dec!(1234));
    }

    #[test]
    fn test_round_ratio_two_places() {
        assert_eq!(round_ratio(dec!(1.2049)), dec!(1.2));
        assert_eq!(round_ratio(dec!(1.205)), dec!(1.21));
        assert_eq!(round_ratio(dec!(-3.14159)), dec!(-3.14));
    }

    #[test]
    fn test_listing_accepts_camel_case_fields() {
        let listing: ListingInput = serde_json::from_value(serde_json::json!({
            "listNo": "73100001",
            "zip": "02134",
            "listPrice": 950000,
            "totalUnits": 3,
            "totalBedrooms": 6,
            "unitMix": [{ "bedrooms": 2, "count": 3 }],
            "taxes": 9000
        }))
        .unwrap();
        assert_eq!(listing.list_no.as_deref(), Some("73100001"));
        assert_eq!(listing.units, 3);
        assert_eq!(listing.unit_mix, vec![UnitMixEntry::new(2, 3)]);
        assert_eq!(listing.list_price, dec!(950000));
    }
}
