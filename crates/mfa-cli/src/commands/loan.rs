use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use mfa_core::underwriting::{underwrite_loan, FinancingTerms, PrincipalSolver};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SolverArg {
    Bisection,
    ClosedForm,
}

impl From<SolverArg> for PrincipalSolver {
    fn from(s: SolverArg) -> Self {
        match s {
            SolverArg::Bisection => PrincipalSolver::Bisection,
            SolverArg::ClosedForm => PrincipalSolver::ClosedForm,
        }
    }
}

/// Arguments for standalone loan sizing
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct SizeLoanArgs {
    /// Path to JSON input file with noi and price
    #[arg(long)]
    pub input: Option<String>,

    /// Annual net operating income
    #[arg(long)]
    pub noi: Option<Decimal>,

    /// Purchase price
    #[arg(long)]
    pub price: Option<Decimal>,

    /// How the DSCR-limited principal is solved
    #[arg(long, value_enum, default_value = "bisection")]
    pub solver: SolverArg,
}

#[derive(Deserialize)]
struct SizeLoanRequest {
    noi: Decimal,
    price: Decimal,
}

pub fn run_size_loan(args: SizeLoanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: SizeLoanRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let (Some(noi), Some(price)) = (args.noi, args.price) {
        SizeLoanRequest { noi, price }
    } else if let Some(request) = input::stdin::read_stdin()? {
        request
    } else {
        return Err("--noi and --price are required (or provide --input)".into());
    };

    let terms = FinancingTerms {
        solver: args.solver.into(),
        ..Default::default()
    };
    let output = underwrite_loan(request.noi, request.price, &terms)?;
    for w in &output.warnings {
        warn!("{w}");
    }
    Ok(serde_json::to_value(output)?)
}
