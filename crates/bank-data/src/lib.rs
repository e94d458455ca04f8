//! Data access layer for bank-rs
//!
//! Loads the CSV datasets the assistant works from into read-only in-memory
//! tables: quarterly, yearly and forecast metrics ([`MetricTable`]), sector
//! membership ([`SectorMap`]), metric key codes ([`KeyItems`]), daily
//! valuation ratios ([`ValuationTable`]) and cached commentary
//! ([`CommentaryCache`], [`SectorAnalysisTable`]). Loading has no side
//! effects, so reloading a directory yields identical tables.

pub mod commentary;
pub mod dataset;
pub mod error;
pub mod key_items;
mod reader;
pub mod sectors;
pub mod table;
pub mod valuation;

pub use commentary::{
    CommentRecord, CommentaryCache, GENERATED_AT_FORMAT, SectorAnalysis, SectorAnalysisTable,
    same_quarter,
};
pub use dataset::BankData;
pub use error::{DataError, Result};
pub use key_items::KeyItems;
pub use sectors::SectorMap;
pub use table::{Granularity, MetricRow, MetricTable};
pub use valuation::{
    SeriesStats, ValuationMetric, ValuationRow, ValuationTable, percentile_of_score, z_score,
};
