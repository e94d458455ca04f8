//! Core domain types for bank-rs
//!
//! Defines the period and entity vocabulary shared by every other crate in the
//! workspace: quarter/year tokens with a total order, bank tickers and sector
//! aggregates, and the error type raised when parsing them.

pub mod entity;
pub mod error;
pub mod period;

pub use entity::{Entity, SectorKind, normalize_ticker};
pub use error::{Error, Result};
pub use period::{Period, latest_quarters};
