use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

/// Water and sewer, per unit per year
const WATER_SEWER_PER_UNIT_YEAR: Money = dec!(400);
/// Common-area electricity, per building per month
const COMMON_ELEC_PER_MONTH: Money = dec!(100);
/// Trash removal, per month; only contracted at 5+ units
const RUBBISH_PER_MONTH: Money = dec!(200);
const RUBBISH_MIN_UNITS: u32 = 5;
const PM_RATE: Rate = dec!(0.08);
const REPAIRS_RATE: Rate = dec!(0.02);
const LEGAL_RATE: Rate = dec!(0.01);
const CAPEX_RATE: Rate = dec!(0.01);
const BUILDINGS: u32 = 1;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Per-line replacements for the default expense assumptions.
///
/// Each value replaces the matching assumption, not the computed line:
/// `water_sewer` is $/unit/year, `common_elec` and `rubbish` are $/month,
/// `pm`/`repairs`/`legal`/`capex` are fractions of gross rent and `taxes` is
/// an absolute annual amount. `Some(0)` is an explicit zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpexOverrides {
    #[serde(default, alias = "waterSewer", skip_serializing_if = "Option::is_none")]
    pub water_sewer: Option<Money>,
    #[serde(default, alias = "commonElec", skip_serializing_if = "Option::is_none")]
    pub common_elec: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubbish: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repairs: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capex: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxes: Option<Money>,
}

impl OpexOverrides {
    /// Named values that are present, for validation and reporting.
    pub fn present(&self) -> Vec<(&'static str, Decimal)> {
        [
            ("water_sewer", self.water_sewer),
            ("common_elec", self.common_elec),
            ("rubbish", self.rubbish),
            ("pm", self.pm),
            ("repairs", self.repairs),
            ("legal", self.legal),
            ("capex", self.capex),
            ("taxes", self.taxes),
        ]
        .into_iter()
        .filter_map(|(name, v)| v.map(|v| (name, v)))
        .collect()
    }
}

/// Annual operating expenses by line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpexBreakdown {
    pub water_sewer: Money,
    pub common_elec: Money,
    pub rubbish: Money,
    /// Property management
    pub pm: Money,
    pub repairs: Money,
    pub legal: Money,
    /// Capital expenditure reserve
    pub capex: Money,
    pub taxes: Money,
    pub total: Money,
}

impl OpexBreakdown {
    /// Apply `f` to every line, recomputing nothing.
    pub fn map(&self, f: impl Fn(Money) -> Money) -> Self {
        Self {
            water_sewer: f(self.water_sewer),
            common_elec: f(self.common_elec),
            rubbish: f(self.rubbish),
            pm: f(self.pm),
            repairs: f(self.repairs),
            legal: f(self.legal),
            capex: f(self.capex),
            taxes: f(self.taxes),
            total: f(self.total),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Default expense assumptions, for reporting alongside a result.
pub fn opex_defaults() -> serde_json::Value {
    serde_json::json!({
        "water_sewer_per_unit_year": WATER_SEWER_PER_UNIT_YEAR,
        "common_elec_per_building_month": COMMON_ELEC_PER_MONTH,
        "buildings": BUILDINGS,
        "rubbish_per_month": RUBBISH_PER_MONTH,
        "rubbish_min_units": RUBBISH_MIN_UNITS,
        "pm_pct_of_gross": PM_RATE,
        "repairs_pct_of_gross": REPAIRS_RATE,
        "legal_pct_of_gross": LEGAL_RATE,
        "capex_pct_of_gross": CAPEX_RATE,
    })
}

/// Compute each expense line from gross rent, unit count and taxes.
pub fn compute_opex(
    annual_gross: Money,
    units: u32,
    taxes_from_listing: Money,
    overrides: Option<&OpexOverrides>,
) -> OpexBreakdown {
    let ov = overrides.cloned().unwrap_or_default();
    let units_dec = Decimal::from(units);

    let water_sewer = ov.water_sewer.unwrap_or(WATER_SEWER_PER_UNIT_YEAR) * units_dec;
    let common_elec =
        ov.common_elec.unwrap_or(COMMON_ELEC_PER_MONTH) * dec!(12) * Decimal::from(BUILDINGS);
    let rubbish = if units >= RUBBISH_MIN_UNITS {
        ov.rubbish.unwrap_or(RUBBISH_PER_MONTH) * dec!(12)
    } else {
        Decimal::ZERO
    };
    let pm = ov.pm.unwrap_or(PM_RATE) * annual_gross;
    let repairs = ov.repairs.unwrap_or(REPAIRS_RATE) * annual_gross;
    let legal = ov.legal.unwrap_or(LEGAL_RATE) * annual_gross;
    let capex = ov.capex.unwrap_or(CAPEX_RATE) * annual_gross;
    let taxes = ov.taxes.unwrap_or(taxes_from_listing);

    let total = water_sewer + common_elec + rubbish + pm + repairs + legal + capex + taxes;

    OpexBreakdown {
        water_sewer,
        common_elec,
        rubbish,
        pm,
        repairs,
        legal,
        capex,
        taxes,
        total,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
