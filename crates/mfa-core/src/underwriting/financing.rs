use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::UnderwritingError;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::UnderwritingResult;

/// Halvings of the `[0, price]` search interval when inverting the payment.
pub const BISECTION_ITERATIONS: u32 = 40;

/// Highest nominal annual rate accepted from callers (100%).
pub const MAX_ANNUAL_RATE: Rate = dec!(1);

/// Longest amortization accepted from callers, in years.
pub const MAX_AMORTIZATION_YEARS: u32 = 50;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How the DSCR-limited principal is recovered from the payment limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalSolver {
    /// Bisect over `[0, price]` for a fixed number of iterations
    #[default]
    Bisection,
    /// Exact annuity inverse: payment * (1 - (1+i)^-n) / i
    ClosedForm,
}

/// Lender assumptions used to size acquisition debt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingTerms {
    /// Maximum loan as a fraction of purchase price
    pub ltv_cap: Rate,
    /// Nominal annual interest rate
    pub annual_rate: Rate,
    /// Amortization period in years
    pub amortization_years: u32,
    /// Minimum NOI / annual debt service
    pub dscr_floor: Multiple,
    #[serde(default)]
    pub solver: PrincipalSolver,
}

impl Default for FinancingTerms {
    fn default() -> Self {
        Self {
            ltv_cap: dec!(0.80),
            annual_rate: dec!(0.065),
            amortization_years: 30,
            dscr_floor: dec!(1.20),
            solver: PrincipalSolver::Bisection,
        }
    }
}

impl FinancingTerms {
    pub fn monthly_rate(&self) -> Rate {
        self.annual_rate / dec!(12)
    }

    pub fn periods(&self) -> u32 {
        self.amortization_years.saturating_mul(12)
    }

    /// Reject terms a lender could not quote.
    pub fn validate(&self) -> UnderwritingResult<()> {
        if self.ltv_cap < Decimal::ZERO || self.ltv_cap > Decimal::ONE {
            return Err(UnderwritingError::InvalidInput {
                field: "terms.ltv_cap".into(),
                reason: "LTV cap must be between 0 and 1".into(),
            });
        }

        if self.annual_rate < Decimal::ZERO || self.annual_rate > MAX_ANNUAL_RATE {
            return Err(UnderwritingError::InvalidInput {
                field: "terms.annual_rate".into(),
                reason: format!("Annual rate must be between 0 and {MAX_ANNUAL_RATE}"),
            });
        }

        if self.amortization_years < 1 || self.amortization_years > MAX_AMORTIZATION_YEARS {
            return Err(UnderwritingError::InvalidInput {
                field: "terms.amortization_years".into(),
                reason: format!("Amortization must be 1 to {MAX_AMORTIZATION_YEARS} years"),
            });
        }

        if self.dscr_floor <= Decimal::ZERO {
            return Err(UnderwritingError::InvalidInput {
                field: "terms.dscr_floor".into(),
                reason: "DSCR floor must be positive".into(),
            });
        }

        Ok(())
    }

    pub fn payment(&self) -> AmortizingPayment {
        AmortizingPayment::new(self.monthly_rate(), self.periods())
    }
}

/// Which constraint produced the sized loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanConstraint {
    Ltv,
    Dscr,
}

/// Loan sized against both constraints, before rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSizing {
    pub loan_by_ltv: Money,
    pub loan_by_dscr: Money,
    pub loan: Money,
    pub binding_constraint: LoanConstraint,
    pub monthly_payment: Money,
    pub annual_debt_service: Money,
    /// NOI / annual debt service; `None` when there is no debt service
    pub dscr: Option<Multiple>,
}

// ---------------------------------------------------------------------------
// Payment function
// ---------------------------------------------------------------------------

/// Level monthly payment for a fully amortizing loan.
///
/// The payment is linear in principal, so the constant per-dollar factor
/// `i(1+i)^n / ((1+i)^n - 1)` is computed once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmortizingPayment {
    monthly_rate: Rate,
    periods: u32,
    factor: Decimal,
}

impl AmortizingPayment {
    pub fn new(monthly_rate: Rate, periods: u32) -> Self {
        let factor = if periods == 0 {
            Decimal::ZERO
        } else if monthly_rate.is_zero() {
            Decimal::ONE / Decimal::from(periods)
        } else {
            // Past the Decimal range (1+r)^n / ((1+r)^n - 1) is 1 and the factor is r
            match Decimal::ONE
                .checked_add(monthly_rate)
                .and_then(|base| base.checked_powu(u64::from(periods)))
                .and_then(|compound| {
                    let denominator = compound - Decimal::ONE;
                    if denominator.is_zero() {
                        Some(Decimal::ZERO)
                    } else {
                        monthly_rate.checked_mul(compound)?.checked_div(denominator)
                    }
                }) {
                Some(factor) => factor,
                None => monthly_rate,
            }
        };

        Self {
            monthly_rate,
            periods,
            factor,
        }
    }

    /// Monthly payment on `principal`.
    pub fn pmt(&self, principal: Money) -> Money {
        if self.monthly_rate.is_zero() && self.periods > 0 {
            return principal / Decimal::from(self.periods);
        }
        principal * self.factor
    }

    /// Principal whose payment equals `payment`, solved exactly.
    pub fn principal_for(&self, payment: Money) -> Money {
        if payment <= Decimal::ZERO || self.factor.is_zero() {
            return Decimal::ZERO;
        }
        if self.monthly_rate.is_zero() {
            return payment * Decimal::from(self.periods);
        }
        payment / self.factor
    }

    /// Principal in `[0, ceiling]` whose payment equals `payment`, by bisection.
    pub fn bisect_principal(&self, payment: Money, ceiling: Money, iterations: u32) -> Money {
        if payment <= Decimal::ZERO || ceiling <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let mut lo = Decimal::ZERO;
        let mut hi = ceiling;
        for _ in 0..iterations {
            let mid = (lo + hi) / dec!(2);
            if self.pmt(mid) > payment {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        (lo + hi) / dec!(2)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Size the largest loan that satisfies both the LTV cap and the DSCR floor.
///
/// A non-positive NOI leaves no room for debt service and sizes the loan at
/// zero; a non-positive price does the same through the LTV cap.
pub fn size_loan(noi: Money, price: Money, terms: &FinancingTerms) -> LoanSizing {
    let payment = terms.payment();

    let loan_by_ltv = price * terms.ltv_cap;

    let monthly_debt_limit = if terms.dscr_floor.is_zero() {
        Decimal::ZERO
    } else {
        noi / terms.dscr_floor / dec!(12)
    };

    let loan_by_dscr = match terms.solver {
        PrincipalSolver::Bisection => {
            payment.bisect_principal(monthly_debt_limit, price, BISECTION_ITERATIONS)
        }
        PrincipalSolver::ClosedForm => payment
            .principal_for(monthly_debt_limit)
            .min(price.max(Decimal::ZERO)),
    };

    let binding_constraint = if loan_by_ltv <= loan_by_dscr {
        LoanConstraint::Ltv
    } else {
        LoanConstraint::Dscr
    };
    let loan = loan_by_ltv.min(loan_by_dscr).max(Decimal::ZERO);

    let monthly_payment = payment.pmt(loan);
    let annual_debt_service = monthly_payment * dec!(12);
    let dscr = if annual_debt_service > Decimal::ZERO {
        Some(noi / annual_debt_service)
    } else {
        None
    };

    LoanSizing {
        loan_by_ltv,
        loan_by_dscr,
        loan,
        binding_constraint,
        monthly_payment,
        annual_debt_service,
        dscr,
    }
}

/// Validated loan sizing wrapped in the standard output envelope.
pub fn underwrite_loan(
    noi: Money,
    price: Money,
    terms: &FinancingTerms,
) -> UnderwritingResult<ComputationOutput<LoanSizing>> {
    let start = Instant::now();

    if price < Decimal::ZERO {
        return Err(UnderwritingError::InvalidInput {
            field: "price".into(),
            reason: "Price cannot be negative".into(),
        });
    }
    terms.validate()?;

    let mut warnings = Vec::new();
    if noi <= Decimal::ZERO {
        warnings.push("Non-positive NOI supports no debt".to_string());
    }

    let sizing = size_loan(noi, price, terms);

    Ok(with_metadata(
        "Max loan under LTV cap and DSCR floor, level-payment amortization",
        terms,
        warnings,
        start.elapsed().as_micros() as u64,
        sizing,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
