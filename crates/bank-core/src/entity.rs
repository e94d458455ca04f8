//! Bank tickers and sector aggregates

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sector aggregates published alongside individual banks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectorKind {
    /// The whole banking sector
    #[serde(rename = "Sector")]
    Sector,
    /// State-owned commercial banks
    #[serde(rename = "SOCB")]
    Socb,
    #[serde(rename = "Private_1")]
    Private1,
    #[serde(rename = "Private_2")]
    Private2,
    #[serde(rename = "Private_3")]
    Private3,
}

impl SectorKind {
    pub const ALL: [SectorKind; 5] = [
        SectorKind::Sector,
        SectorKind::Socb,
        SectorKind::Private1,
        SectorKind::Private2,
        SectorKind::Private3,
    ];

    /// Identifier used in the `TICKER` and `Type` columns
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sector => "Sector",
            Self::Socb => "SOCB",
            Self::Private1 => "Private_1",
            Self::Private2 => "Private_2",
            Self::Private3 => "Private_3",
        }
    }

    /// Case-insensitive lookup; accepts `Private 1`, `private_1` and `PRIVATE1`
    pub fn parse(input: &str) -> Option<Self> {
        let folded: String = input
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_uppercase();

        match folded.as_str() {
            "SECTOR" => Some(Self::Sector),
            "SOCB" => Some(Self::Socb),
            "PRIVATE1" => Some(Self::Private1),
            "PRIVATE2" => Some(Self::Private2),
            "PRIVATE3" => Some(Self::Private3),
            _ => None,
        }
    }
}

impl fmt::Display for SectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bank ticker or a sector aggregate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Entity {
    Bank(String),
    Sector(SectorKind),
}

impl Entity {
    /// Parse a ticker or sector name; tickers are upper-cased
    pub fn parse(input: &str) -> Result<Self> {
        if let Some(sector) = SectorKind::parse(input) {
            return Ok(Self::Sector(sector));
        }

        let ticker = input.trim().to_uppercase();
        let valid = (2..=6).contains(&ticker.len())
            && ticker.chars().all(|c| c.is_ascii_alphanumeric());
        if valid {
            Ok(Self::Bank(ticker))
        } else {
            Err(Error::InvalidEntity(input.to_string()))
        }
    }

    /// Key stored in the `TICKER` column for this entity
    pub fn key(&self) -> &str {
        match self {
            Self::Bank(ticker) => ticker,
            Self::Sector(sector) => sector.as_str(),
        }
    }

    pub fn is_sector(&self) -> bool {
        matches!(self, Self::Sector(_))
    }

    /// Individual banks carry three letter tickers
    pub fn is_individual_bank(&self) -> bool {
        matches!(self, Self::Bank(ticker) if ticker.len() == 3)
    }
}

/// Canonical spelling of a ticker or sector name.
///
/// Sector names keep their mixed case (`SECTOR` becomes `Sector`), anything
/// else is upper-cased.
pub fn normalize_ticker(input: &str) -> String {
    match SectorKind::parse(input) {
        Some(sector) => sector.as_str().to_string(),
        None => input.trim().to_uppercase(),
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl TryFrom<String> for Entity {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Entity> for String {
    fn from(entity: Entity) -> Self {
        entity.key().to_string()
    }
}
