use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use super::analysis::{assumptions, evaluate, AnalysisResult};
use super::financing::FinancingTerms;
use super::parallel::{maybe_parallel_map, PARALLEL_THRESHOLD};
use super::rent::{RentMode, RentTable};
use super::{round_money, round_ratio, ListingInput, Overrides};
use crate::error::UnderwritingError;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::UnderwritingResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A batch of listings priced against one rent table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioInput {
    pub listings: Vec<ListingInput>,
    #[serde(alias = "rentTable")]
    pub rent_table: RentTable,
    #[serde(default, alias = "rentMode")]
    pub rent_mode: RentMode,
    /// Per-listing overrides keyed by listing number
    #[serde(default)]
    pub overrides: BTreeMap<String, Overrides>,
}

/// One listing and its underwriting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingAnalysis {
    pub listing: ListingInput,
    pub analysis: AnalysisResult,
    /// Whether a stored override set was applied
    pub overridden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub listing_count: usize,
    pub total_units: u64,
    pub total_list_price: Money,
    pub total_noi: Money,
    /// Aggregate NOI / aggregate asking price, in percent
    pub portfolio_cap_rate_pct: Option<Decimal>,
    /// Listings whose DSCR is missing or under the lender floor
    pub below_dscr_floor: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioOutput {
    pub results: Vec<ListingAnalysis>,
    pub summary: PortfolioSummary,
}

/// Flat row with the column names used by spreadsheet exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "LIST_NO")]
    pub list_no: String,
    #[serde(rename = "ADDRESS")]
    pub address: String,
    #[serde(rename = "TOWN")]
    pub town: String,
    #[serde(rename = "STATE")]
    pub state: String,
    #[serde(rename = "ZIP")]
    pub zip: String,
    #[serde(rename = "MARKET_TIER")]
    pub market_tier: String,
    #[serde(rename = "COUNTY")]
    pub county: String,
    #[serde(rename = "LIST_PRICE")]
    pub list_price: Money,
    #[serde(rename = "UNITS")]
    pub units: u32,
    #[serde(rename = "MONTHLY_RENT")]
    pub monthly_rent: Money,
    #[serde(rename = "NOI")]
    pub noi: Money,
    #[serde(rename = "CAP_AT_ASK_PCT")]
    pub cap_at_ask_pct: Option<Decimal>,
    #[serde(rename = "DSCR")]
    pub dscr: Option<Decimal>,
}

impl ExportRow {
    pub fn new(listing: &ListingInput, analysis: &AnalysisResult) -> Self {
        let town = listing
            .town
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| analysis.town.clone());

        Self {
            list_no: listing.list_no.clone().unwrap_or_default(),
            address: listing.address.clone().unwrap_or_default(),
            town,
            state: listing.state.clone().unwrap_or_default(),
            zip: listing.zip.trim().to_string(),
            market_tier: analysis.market_tier.clone(),
            county: analysis.county.clone(),
            list_price: listing.list_price,
            units: listing.units,
            monthly_rent: analysis.monthly_gross,
            noi: analysis.noi,
            cap_at_ask_pct: analysis.cap_at_ask_pct,
            dscr: analysis.dscr,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Underwrite every listing in a batch.
///
/// Listings are independent; results come back in input order. A listing
/// that fails validation fails the batch, with the error field prefixed by
/// its position.
pub fn analyze_portfolio(
    input: &PortfolioInput,
) -> UnderwritingResult<ComputationOutput<PortfolioOutput>> {
    let start = Instant::now();
    let terms = FinancingTerms::default();

    // LIST_NO keys match after trimming on both sides
    let by_list_no: BTreeMap<&str, &Overrides> = input
        .overrides
        .iter()
        .map(|(no, ov)| (no.trim(), ov))
        .collect();

    let evaluated = maybe_parallel_map(&input.listings, PARALLEL_THRESHOLD, |idx, listing| {
        let overrides = listing
            .list_no
            .as_deref()
            .and_then(|no| by_list_no.get(no.trim()).copied());
        evaluate(listing, &input.rent_table, input.rent_mode, overrides, &terms)
            .map(|(analysis, warnings)| (analysis, warnings, overrides.is_some()))
            .map_err(|e| prefix_error(e, idx))
    });

    let mut warnings = Vec::new();
    let mut results = Vec::with_capacity(input.listings.len());
    for (listing, outcome) in input.listings.iter().zip(evaluated) {
        let (analysis, listing_warnings, overridden) = outcome?;
        let label = listing_label(listing, results.len());
        warnings.extend(listing_warnings.into_iter().map(|w| format!("[{label}] {w}")));
        results.push(ListingAnalysis {
            listing: listing.clone(),
            analysis,
            overridden,
        });
    }

    let unmatched: Vec<&String> = input
        .overrides
        .keys()
        .filter(|no| {
            !input
                .listings
                .iter()
                .any(|l| l.list_no.as_deref().map(str::trim) == Some(no.trim()))
        })
        .collect();
    if !unmatched.is_empty() {
        let names: Vec<&str> = unmatched.iter().map(|s| s.as_str()).collect();
        warnings.push(format!(
            "Overrides for {} did not match any listing",
            names.join(", ")
        ));
    }

    let summary = summarize(&results, &terms);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Multifamily underwriting (batch): per-listing rent roll, OPEX and LTV/DSCR loan sizing",
        &assumptions(input.rent_mode, &terms),
        warnings,
        elapsed,
        PortfolioOutput { results, summary },
    ))
}

/// Flatten batch results into export rows.
pub fn export_rows(results: &[ListingAnalysis]) -> Vec<ExportRow> {
    results
        .iter()
        .map(|r| ExportRow::new(&r.listing, &r.analysis))
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn summarize(results: &[ListingAnalysis], terms: &FinancingTerms) -> PortfolioSummary {
    let total_units: u64 = results.iter().map(|r| u64::from(r.listing.units)).sum();
    let total_list_price: Money = results.iter().map(|r| r.listing.list_price).sum();
    let total_noi: Money = results.iter().map(|r| r.analysis.noi).sum();

    let portfolio_cap_rate_pct = if total_list_price > Decimal::ZERO {
        Some(round_ratio(total_noi / total_list_price * dec!(100)))
    } else {
        None
    };

    let below_dscr_floor = results
        .iter()
        .filter(|r| match r.analysis.dscr {
            Some(d) => d < terms.dscr_floor,
            None => true,
        })
        .count();

    PortfolioSummary {
        listing_count: results.len(),
        total_units,
        total_list_price: round_money(total_list_price),
        total_noi: round_money(total_noi),
        portfolio_cap_rate_pct,
        below_dscr_floor,
    }
}

fn listing_label(listing: &ListingInput, idx: usize) -> String {
    match listing.list_no.as_deref().map(str::trim) {
        Some(no) if !no.is_empty() => no.to_string(),
        _ => format!("#{idx}"),
    }
}

fn prefix_error(err: UnderwritingError, idx: usize) -> UnderwritingError {
    match err {
        UnderwritingError::InvalidInput { field, reason } => UnderwritingError::InvalidInput {
            field: format!("listings[{idx}].{field}"),
            reason,
        },
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
