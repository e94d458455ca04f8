//! Quarter and year tokens
//!
//! Banking datasets key quarterly rows by `XQyy` strings (`"1Q24"`) and yearly
//! rows by a four digit year. [`Period`] parses every spelling seen in user
//! questions and tool arguments (`"1Q24"`, `"2024-Q1"`, `"Q1 2024"`, `"2024"`)
//! into one comparable key.
//!
//! # Ordering
//!
//! Periods are ordered by year first. Within a year the four quarters come
//! first and the full-year token sorts after `4Q`, so `3Q24 < 4Q24 < 2024 < 1Q25`.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static SHORT_QUARTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([1-4])Q(\d{2}|\d{4})$").expect("valid regex"));
static YEAR_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})[\s-]?Q([1-4])$").expect("valid regex"));
static QUARTER_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Q([1-4])[\s-]*(\d{4})$").expect("valid regex"));
static YEAR_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})$").expect("valid regex"));

/// A reporting period: one quarter or one full year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Period {
    /// A calendar quarter, `quarter` in 1..=4
    Quarter { year: u16, quarter: u8 },
    /// A full year
    Year(u16),
}

impl Period {
    /// Build a quarter, rejecting quarter numbers outside 1..=4
    pub fn quarter(year: u16, quarter: u8) -> Result<Self> {
        if (1..=4).contains(&quarter) {
            Ok(Self::Quarter { year, quarter })
        } else {
            Err(Error::InvalidPeriod(format!("{quarter}Q{year}")))
        }
    }

    /// Build a full-year period
    pub fn year(year: u16) -> Self {
        Self::Year(year)
    }

    /// Parse any accepted period spelling
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim().to_uppercase();

        if let Some(caps) = SHORT_QUARTER.captures(&raw) {
            let quarter = caps[1].parse::<u8>().map_err(|_| invalid(input))?;
            let digits = &caps[2];
            let year = digits.parse::<u16>().map_err(|_| invalid(input))?;
            let year = if digits.len() == 2 { expand_two_digit_year(year) } else { year };
            return Self::quarter(year, quarter);
        }

        if let Some(caps) = YEAR_FIRST.captures(&raw) {
            let year = caps[1].parse::<u16>().map_err(|_| invalid(input))?;
            let quarter = caps[2].parse::<u8>().map_err(|_| invalid(input))?;
            return Self::quarter(year, quarter);
        }

        if let Some(caps) = QUARTER_FIRST.captures(&raw) {
            let quarter = caps[1].parse::<u8>().map_err(|_| invalid(input))?;
            let year = caps[2].parse::<u16>().map_err(|_| invalid(input))?;
            return Self::quarter(year, quarter);
        }

        if let Some(caps) = YEAR_ONLY.captures(&raw) {
            let year = caps[1].parse::<u16>().map_err(|_| invalid(input))?;
            return Ok(Self::Year(year));
        }

        Err(invalid(input))
    }

    /// Whether this is a quarterly period
    pub fn is_quarter(&self) -> bool {
        matches!(self, Self::Quarter { .. })
    }

    /// Calendar year of the period
    pub fn year_number(&self) -> u16 {
        match self {
            Self::Quarter { year, .. } | Self::Year(year) => *year,
        }
    }

    /// The period immediately before this one at the same granularity
    pub fn previous(&self) -> Option<Self> {
        match *self {
            Self::Quarter { year, quarter: 1 } => year
                .checked_sub(1)
                .map(|year| Self::Quarter { year, quarter: 4 }),
            Self::Quarter { year, quarter } => Some(Self::Quarter {
                year,
                quarter: quarter - 1,
            }),
            Self::Year(year) => year.checked_sub(1).map(Self::Year),
        }
    }

    fn sort_key(&self) -> (u16, u8) {
        match *self {
            Self::Quarter { year, quarter } => (year, quarter),
            Self::Year(year) => (year, 5),
        }
    }
}

/// The `n` most recent quarters ending at `latest`, oldest first.
///
/// Rolls back across year boundaries: `latest_quarters(2Q25, 4)` yields
/// `3Q24, 4Q24, 1Q25, 2Q25`. A yearly `latest` yields the four quarters of
/// that year, truncated to `n`.
pub fn latest_quarters(latest: Period, n: usize) -> Vec<Period> {
    let anchor = match latest {
        Period::Quarter { .. } => latest,
        Period::Year(year) => Period::Quarter { year, quarter: 4 },
    };

    let mut quarters = Vec::with_capacity(n);
    let mut current = Some(anchor);
    while quarters.len() < n {
        match current {
            Some(period) => {
                quarters.push(period);
                current = period.previous();
            },
            None => break,
        }
    }
    quarters.reverse();
    quarters
}

fn expand_two_digit_year(year: u16) -> u16 {
    if year < 50 { 2000 + year } else { 1900 + year }
}

fn invalid(input: &str) -> Error {
    Error::InvalidPeriod(input.to_string())
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quarter { year, quarter } => write!(f, "{quarter}Q{:02}", year % 100),
            Self::Year(year) => write!(f, "{year}"),
        }
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Period {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}
