use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use mfa_core::underwriting::{self, FinancingTerms, PortfolioInput, UnderwritingInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Underwriting
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_property(input_json: String) -> NapiResult<String> {
    let input: UnderwritingInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = underwriting::underwrite(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn analyze_portfolio(input_json: String) -> NapiResult<String> {
    let input: PortfolioInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = underwriting::analyze_portfolio(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Financing
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SizeLoanRequest {
    noi: Decimal,
    price: Decimal,
    #[serde(default)]
    terms: Option<FinancingTerms>,
}

#[napi]
pub fn size_loan(input_json: String) -> NapiResult<String> {
    let request: SizeLoanRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let terms = request.terms.unwrap_or_default();
    let output = underwriting::underwrite_loan(request.noi, request.price, &terms)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
