mod commands;
mod input;
mod output;
mod telemetry;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::analyze::AnalyzeArgs;
use commands::loan::SizeLoanArgs;
use commands::portfolio::PortfolioArgs;

/// Multifamily property underwriting
#[derive(Parser)]
#[command(
    name = "mfa",
    version,
    about = "Multifamily property underwriting",
    long_about = "Estimate rent, operating expenses, loan size, DSCR and cap rate for \
                  multifamily listings from a ZIP-level rent table, with decimal precision. \
                  Reads JSON files or stdin; prints JSON, tables, CSV or a single figure."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log filter for stderr (e.g. warn, info, debug); RUST_LOG takes precedence
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Underwrite a single listing
    Analyze(AnalyzeArgs),
    /// Underwrite a batch of listings against one rent table
    Portfolio(PortfolioArgs),
    /// Size a loan from NOI and price under the LTV cap and DSCR floor
    SizeLoan(SizeLoanArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = telemetry::init(&cli.log_level) {
        eprintln!("{}: {}", "error".red().bold(), e);
        process::exit(1);
    }

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::analyze::run_analyze(args),
        Commands::Portfolio(args) => commands::portfolio::run_portfolio(args),
        Commands::SizeLoan(args) => commands::loan::run_size_loan(args),
        Commands::Version => {
            println!("mfa {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
