pub mod error;
pub mod types;

#[cfg(feature = "underwriting")]
pub mod underwriting;

pub use error::UnderwritingError;
pub use types::*;

/// Standard result type for all underwriting operations
pub type UnderwritingResult<T> = Result<T, UnderwritingError>;
