use clap::Args;
use serde_json::Value;
use tracing::{info, warn};

use mfa_core::underwriting::{self, ListingInput, Overrides, RentMode, RentTable, UnderwritingInput};

use crate::input;

/// Arguments for single-listing underwriting
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to a JSON request with listing, rent_table, rent_mode and overrides
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a JSON listing (used with --rent-table)
    #[arg(long)]
    pub listing: Option<String>,

    /// Path to a JSON rent table keyed by ZIP code
    #[arg(long)]
    pub rent_table: Option<String>,

    /// Path to a JSON override set (unit_mix, opex)
    #[arg(long)]
    pub overrides: Option<String>,

    /// Rent assumption: below, avg or agg (overrides the request's mode)
    #[arg(long)]
    pub rent_mode: Option<String>,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: UnderwritingInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(ref listing_path) = args.listing {
        let rent_table_path = args
            .rent_table
            .as_deref()
            .ok_or("--rent-table is required with --listing")?;
        let listing: ListingInput = input::file::read_json(listing_path)?;
        let rent_table: RentTable = input::file::read_json(rent_table_path)?;
        let overrides: Option<Overrides> =
            input::file::read_optional_json(args.overrides.as_deref())?;
        UnderwritingInput {
            listing,
            rent_table,
            rent_mode: RentMode::default(),
            overrides,
        }
    } else if let Some(request) = input::stdin::read_stdin()? {
        request
    } else {
        return Err("--input <file.json>, --listing with --rent-table, or stdin required".into());
    };

    if let Some(ref label) = args.rent_mode {
        request.rent_mode = RentMode::from_label(label);
    }

    if request.rent_table.is_empty() {
        warn!("rent table is empty; every listing will price at zero rent");
    }

    info!(
        zip = request.listing.zip.trim(),
        units = request.listing.units,
        rent_mode = %request.rent_mode,
        zips_in_table = request.rent_table.len(),
        "underwriting listing"
    );

    let result = underwriting::underwrite(&request)?;
    for w in &result.warnings {
        warn!("{w}");
    }
    Ok(serde_json::to_value(result)?)
}
