pub mod analyze;
pub mod loan;
pub mod portfolio;
