use clap::Args;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use tracing::{info, warn};

use mfa_core::underwriting::{
    self, ListingInput, Overrides, PortfolioInput, RentMode, RentTable,
};

use crate::input;

/// Arguments for bulk underwriting
#[derive(Args)]
pub struct PortfolioArgs {
    /// Path to a JSON batch with listings, rent_table, rent_mode and overrides
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a JSON array of listings (used with --rent-table)
    #[arg(long)]
    pub listings: Option<String>,

    /// Path to a JSON rent table keyed by ZIP code
    #[arg(long)]
    pub rent_table: Option<String>,

    /// Path to a JSON object of override sets keyed by listing number
    #[arg(long)]
    pub overrides: Option<String>,

    /// Rent assumption: below, avg or agg (overrides the batch's mode)
    #[arg(long)]
    pub rent_mode: Option<String>,

    /// Also write the export columns (LIST_NO … DSCR) to this CSV file
    #[arg(long)]
    pub export: Option<String>,
}

pub fn run_portfolio(args: PortfolioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut batch: PortfolioInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(ref listings_path) = args.listings {
        let rent_table_path = args
            .rent_table
            .as_deref()
            .ok_or("--rent-table is required with --listings")?;
        let listings: Vec<ListingInput> = input::file::read_json(listings_path)?;
        let rent_table: RentTable = input::file::read_json(rent_table_path)?;
        let overrides: BTreeMap<String, Overrides> =
            input::file::read_optional_json(args.overrides.as_deref())?.unwrap_or_default();
        PortfolioInput {
            listings,
            rent_table,
            rent_mode: RentMode::default(),
            overrides,
        }
    } else if let Some(batch) = input::stdin::read_stdin()? {
        batch
    } else {
        return Err("--input <file.json>, --listings with --rent-table, or stdin required".into());
    };

    if let Some(ref label) = args.rent_mode {
        batch.rent_mode = RentMode::from_label(label);
    }

    if batch.rent_table.is_empty() {
        warn!("rent table is empty; every listing will price at zero rent");
    }

    info!(
        listings = batch.listings.len(),
        overrides = batch.overrides.len(),
        rent_mode = %batch.rent_mode,
        "underwriting batch"
    );

    let output = underwriting::analyze_portfolio(&batch)?;
    for w in &output.warnings {
        warn!("{w}");
    }

    if let Some(ref path) = args.export {
        let rows = underwriting::export_rows(&output.result.results);
        let file = File::create(path).map_err(|e| format!("Failed to create '{path}': {e}"))?;
        let mut wtr = csv::Writer::from_writer(file);
        for row in &rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        info!(path = %path, rows = rows.len(), "wrote export");
    }

    Ok(serde_json::to_value(output)?)
}
