use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::financing::{size_loan, FinancingTerms, LoanConstraint};
use super::opex::{compute_opex, opex_defaults, OpexBreakdown};
use super::rent::{aggregate_rent, RentMode, RentTable};
use super::unit_mix::{mix_unit_count, resolve_unit_mix};
use super::{round_money, round_ratio, ListingInput, Overrides, UnitMixEntry};
use crate::error::UnderwritingError;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple};
use crate::UnderwritingResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Fully computed underwriting of one listing.
///
/// Money fields are rounded to whole currency units; `dscr` and
/// `cap_at_ask_pct` to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub rent_mode: RentMode,
    /// Unit mix the rent was priced on
    pub unit_mix: Vec<UnitMixEntry>,
    pub monthly_gross: Money,
    pub annual_gross: Money,
    pub opex: OpexBreakdown,
    pub opex_total: Money,
    pub noi: Money,
    pub loan: Money,
    pub binding_constraint: LoanConstraint,
    pub annual_debt_service: Money,
    pub dscr: Option<Multiple>,
    /// NOI / asking price, in percent
    pub cap_at_ask_pct: Option<Decimal>,
    pub market_tier: String,
    pub county: String,
    pub town: String,
}

/// A single underwriting request as decoded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderwritingInput {
    pub listing: ListingInput,
    #[serde(alias = "rentTable")]
    pub rent_table: RentTable,
    #[serde(default, alias = "rentMode")]
    pub rent_mode: RentMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Overrides>,
}

/// Facts gathered along the pipeline that feed warnings but not the result.
#[derive(Debug, Clone, Default)]
pub(crate) struct Diagnostics {
    pub zip_found: bool,
    pub unpriced_bedrooms: Vec<u32>,
    pub mix_units: u32,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Underwrite a listing with the default financing terms.
///
/// Pure and total: any listing, rent table and override set produce a result.
pub fn analyze(
    listing: &ListingInput,
    rent_table: &RentTable,
    mode: RentMode,
    overrides: Option<&Overrides>,
) -> AnalysisResult {
    analyze_with_terms(listing, rent_table, mode, overrides, &FinancingTerms::default())
}

/// Underwrite a listing with explicit financing terms.
pub fn analyze_with_terms(
    listing: &ListingInput,
    rent_table: &RentTable,
    mode: RentMode,
    overrides: Option<&Overrides>,
    terms: &FinancingTerms,
) -> AnalysisResult {
    run_pipeline(listing, rent_table, mode, overrides, terms).0
}

/// Validate a decoded request, underwrite it and wrap the result with
/// methodology, assumptions and warnings.
pub fn underwrite(
    input: &UnderwritingInput,
) -> UnderwritingResult<ComputationOutput<AnalysisResult>> {
    let start = Instant::now();
    let terms = FinancingTerms::default();

    let (result, warnings) = evaluate(
        &input.listing,
        &input.rent_table,
        input.rent_mode,
        input.overrides.as_ref(),
        &terms,
    )?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Multifamily underwriting: benchmark rent roll, default OPEX, LTV/DSCR loan sizing",
        &assumptions(input.rent_mode, &terms),
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub(crate) fn run_pipeline(
    listing: &ListingInput,
    rent_table: &RentTable,
    mode: RentMode,
    overrides: Option<&Overrides>,
    terms: &FinancingTerms,
) -> (AnalysisResult, Diagnostics) {
    let override_mix = overrides.and_then(|o| o.unit_mix.as_deref());
    let unit_mix = resolve_unit_mix(listing, override_mix);

    let roll = aggregate_rent(&unit_mix, &listing.zip, rent_table, mode);

    let opex = compute_opex(
        roll.annual_gross,
        listing.units,
        listing.taxes,
        overrides.map(|o| &o.opex),
    );

    let noi = roll.annual_gross - opex.total;
    let sizing = size_loan(noi, listing.list_price, terms);

    let cap_at_ask_pct = if listing.list_price > Decimal::ZERO {
        Some(round_ratio(noi / listing.list_price * dec!(100)))
    } else {
        None
    };

    let diagnostics = Diagnostics {
        zip_found: roll.zip_found,
        unpriced_bedrooms: roll.unpriced_bedrooms.clone(),
        mix_units: mix_unit_count(&unit_mix),
    };

    let result = AnalysisResult {
        rent_mode: mode,
        unit_mix,
        monthly_gross: round_money(roll.monthly_gross),
        annual_gross: round_money(roll.annual_gross),
        opex_total: round_money(opex.total),
        opex: opex.map(round_money),
        noi: round_money(noi),
        loan: round_money(sizing.loan),
        binding_constraint: sizing.binding_constraint,
        annual_debt_service: round_money(sizing.annual_debt_service),
        dscr: sizing.dscr.map(round_ratio),
        cap_at_ask_pct,
        market_tier: roll.market_tier,
        county: roll.county,
        town: roll.town,
    };

    (result, diagnostics)
}

/// Validate, run the pipeline and collect warnings for one listing.
pub(crate) fn evaluate(
    listing: &ListingInput,
    rent_table: &RentTable,
    mode: RentMode,
    overrides: Option<&Overrides>,
    terms: &FinancingTerms,
) -> UnderwritingResult<(AnalysisResult, Vec<String>)> {
    validate_input(listing, rent_table, overrides)?;

    let (result, diagnostics) = run_pipeline(listing, rent_table, mode, overrides, terms);
    let warnings = collect_warnings(listing, &result, &diagnostics, terms);

    Ok((result, warnings))
}

pub(crate) fn assumptions(mode: RentMode, terms: &FinancingTerms) -> serde_json::Value {
    serde_json::json!({
        "rent_mode": mode,
        "rent_multiplier": mode.multiplier(),
        "financing": terms,
        "opex_defaults": opex_defaults(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_input(
    listing: &ListingInput,
    rent_table: &RentTable,
    overrides: Option<&Overrides>,
) -> UnderwritingResult<()> {
    if listing.list_price < Decimal::ZERO {
        return Err(UnderwritingError::InvalidInput {
            field: "list_price".into(),
            reason: "List price cannot be negative".into(),
        });
    }
    if listing.taxes < Decimal::ZERO {
        return Err(UnderwritingError::InvalidInput {
            field: "taxes".into(),
            reason: "Taxes cannot be negative".into(),
        });
    }
    validate_mix(&listing.unit_mix, "unit_mix")?;

    if let Some(entry) = rent_table.lookup(&listing.zip) {
        if let Some((bedrooms, _)) = entry.rents.iter().find(|(_, r)| **r < Decimal::ZERO) {
            return Err(UnderwritingError::InvalidInput {
                field: format!("rent_table.{}.rents.{bedrooms}", listing.zip.trim()),
                reason: "Rent cannot be negative".into(),
            });
        }
    }

    if let Some(ov) = overrides {
        if let Some(mix) = &ov.unit_mix {
            validate_mix(mix, "overrides.unit_mix")?;
        }
        if let Some((name, _)) = ov.opex.present().into_iter().find(|(_, v)| *v < Decimal::ZERO) {
            return Err(UnderwritingError::InvalidInput {
                field: format!("overrides.opex.{name}"),
                reason: "Expense override cannot be negative".into(),
            });
        }
    }

    Ok(())
}

fn validate_mix(mix: &[UnitMixEntry], field: &str) -> UnderwritingResult<()> {
    if let Some(idx) = mix.iter().position(|e| e.count == 0) {
        return Err(UnderwritingError::InvalidInput {
            field: format!("{field}[{idx}].count"),
            reason: "Unit mix counts must be positive".into(),
        });
    }
    Ok(())
}

fn collect_warnings(
    listing: &ListingInput,
    result: &AnalysisResult,
    diagnostics: &Diagnostics,
    terms: &FinancingTerms,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if listing.units == 0 && result.unit_mix.is_empty() {
        warnings.push("Listing reports zero units — no rent was estimated".into());
    }

    if !diagnostics.zip_found {
        warnings.push(format!(
            "ZIP '{}' not found in rent table — rents treated as zero",
            listing.zip.trim()
        ));
    } else if !diagnostics.unpriced_bedrooms.is_empty() {
        let list: Vec<String> = diagnostics
            .unpriced_bedrooms
            .iter()
            .map(|b| format!("{b}BR"))
            .collect();
        warnings.push(format!(
            "No benchmark rent for {} in ZIP {} — priced at zero",
            list.join(", "),
            listing.zip.trim()
        ));
    }

    if listing.units > 0 && diagnostics.mix_units != listing.units {
        warnings.push(format!(
            "Unit mix covers {} units but listing reports {}",
            diagnostics.mix_units, listing.units
        ));
    }

    if result.noi < Decimal::ZERO {
        warnings.push(format!(
            "Negative NOI of {} — property cannot support debt",
            result.noi
        ));
    } else if result.binding_constraint == LoanConstraint::Dscr && result.loan > Decimal::ZERO {
        warnings.push(format!(
            "Loan limited by {:.2}x DSCR floor rather than {}% LTV",
            terms.dscr_floor,
            (terms.ltv_cap * dec!(100)).normalize()
        ));
    }

    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
