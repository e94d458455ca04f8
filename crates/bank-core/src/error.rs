//! Error types for bank-core

use thiserror::Error;

/// Result type alias for bank-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for domain token parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Period string did not match any accepted format
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    /// Entity identifier is empty or not a ticker/sector
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),
}
