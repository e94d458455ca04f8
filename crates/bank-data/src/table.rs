//! Wide metric tables
//!
//! `dfsectorquarter.csv`, `dfsectoryear.csv` and `dfsectorforecast.csv` share
//! one layout: identifier columns `TICKER`, `Type` and a period column
//! (`Date_Quarter` or `Year`), followed by one numeric column per metric. The
//! metric columns are either display names (`ROE`, `Loan`) or key codes
//! (`CA.10`, `IS.13`); [`KeyItems`] translates between the two.

use crate::error::{DataError, Result};
use crate::key_items::KeyItems;
use crate::reader::{self, Headers};
use bank_core::Period;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Period granularity of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Quarterly,
    Yearly,
}

impl Granularity {
    /// Name of the period column in the file
    pub fn period_column(self) -> &'static str {
        match self {
            Self::Quarterly => "Date_Quarter",
            Self::Yearly => "Year",
        }
    }
}

/// One (entity, period) row with its metric values
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub ticker: String,
    /// `Type` column: the sector group the row belongs to
    pub sector: Option<String>,
    pub period: Period,
    values: HashMap<String, f64>,
}

impl MetricRow {
    pub fn new(ticker: impl Into<String>, sector: Option<String>, period: Period) -> Self {
        Self {
            ticker: ticker.into(),
            sector,
            period,
            values: HashMap::new(),
        }
    }

    pub fn with_value(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.values.insert(metric.into(), value);
        self
    }

    /// Value of a metric column, `None` when the cell was blank
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }

    /// Individual banks carry three letter tickers; aggregates do not
    pub fn is_individual_bank(&self) -> bool {
        self.ticker.len() == 3
    }
}

/// In-memory copy of one metric file; read-only once loaded
#[derive(Debug, Clone)]
pub struct MetricTable {
    source: PathBuf,
    granularity: Granularity,
    columns: Vec<String>,
    rows: Vec<MetricRow>,
}

impl MetricTable {
    /// Load a table from disk
    pub fn load(path: &Path) -> Result<Self> {
        let rdr = reader::open(path)?;
        Self::parse(path, rdr)
    }

    /// Parse a table from any reader; `source` is used in error messages
    pub fn from_reader<R: Read>(source: &Path, input: R) -> Result<Self> {
        Self::parse(source, reader::reader(input))
    }

    fn parse<R: Read>(path: &Path, mut rdr: csv::Reader<R>) -> Result<Self> {
        let headers = Headers::read(path, &mut rdr)?;
        let ticker_idx = headers.require(path, "TICKER")?;
        let type_idx = headers.position("Type");

        let (granularity, period_idx) = if let Some(idx) = headers.position("Date_Quarter") {
            (Granularity::Quarterly, idx)
        } else if let Some(idx) = headers.position("Year") {
            (Granularity::Yearly, idx)
        } else {
            return Err(DataError::malformed(path, "missing Date_Quarter or Year column"));
        };

        let metric_columns: Vec<(usize, String)> = headers
            .names()
            .iter()
            .enumerate()
            .filter(|(idx, name)| {
                *idx != ticker_idx
                    && Some(*idx) != type_idx
                    && *idx != period_idx
                    && !name.is_empty()
                    && !name.starts_with("Unnamed")
            })
            .map(|(idx, name)| (idx, name.clone()))
            .collect();

        let mut rows = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| DataError::csv(path, e))?;
            let Some(ticker) = reader::field(&record, ticker_idx) else {
                continue;
            };
            let raw_period = reader::field(&record, period_idx).ok_or_else(|| {
                DataError::malformed(path, format!("row {}: empty period", line + 2))
            })?;
            let period = parse_period(granularity, raw_period).ok_or_else(|| {
                DataError::malformed(path, format!("row {}: invalid period '{raw_period}'", line + 2))
            })?;

            let sector = type_idx
                .and_then(|idx| reader::field(&record, idx))
                .map(ToString::to_string);
            let row = metric_columns
                .iter()
                .filter_map(|(idx, name)| reader::number(reader::field(&record, *idx)).map(|v| (name, v)))
                .fold(MetricRow::new(ticker, sector, period), |row, (name, v)| {
                    row.with_value(name.as_str(), v)
                });
            rows.push(row);
        }

        tracing::debug!(
            path = %path.display(),
            rows = rows.len(),
            columns = metric_columns.len(),
            "Loaded metric table"
        );

        Ok(Self {
            source: path.to_path_buf(),
            granularity,
            columns: metric_columns.into_iter().map(|(_, name)| name).collect(),
            rows,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Metric columns in file order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for one entity and period
    pub fn row(&self, ticker: &str, period: Period) -> Option<&MetricRow> {
        self.rows
            .iter()
            .find(|r| r.ticker == ticker && r.period == period)
    }

    /// Single cell lookup
    pub fn value(&self, ticker: &str, period: Period, metric: &str) -> Option<f64> {
        self.row(ticker, period).and_then(|r| r.value(metric))
    }

    /// All rows of one entity, in file order
    pub fn rows_for<'a>(&'a self, ticker: &'a str) -> impl Iterator<Item = &'a MetricRow> + 'a {
        self.rows.iter().filter(move |r| r.ticker == ticker)
    }

    /// Rows matching a predicate, in file order
    pub fn filter<F>(&self, predicate: F) -> Vec<&MetricRow>
    where
        F: Fn(&MetricRow) -> bool,
    {
        self.rows.iter().filter(|r| predicate(r)).collect()
    }

    /// Distinct periods, oldest first
    pub fn periods(&self) -> Vec<Period> {
        let mut periods: Vec<Period> = self
            .rows
            .iter()
            .map(|r| r.period)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        periods.sort();
        periods
    }

    pub fn latest_period(&self) -> Option<Period> {
        self.rows.iter().map(|r| r.period).max()
    }

    /// Distinct tickers in order of first appearance
    pub fn tickers(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|r| r.ticker.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// Most recent row of every ticker, ordered by ticker
    pub fn latest_per_ticker(&self) -> Vec<&MetricRow> {
        let mut latest: BTreeMap<&str, &MetricRow> = BTreeMap::new();
        for row in &self.rows {
            latest
                .entry(row.ticker.as_str())
                .and_modify(|current| {
                    if row.period >= current.period {
                        *current = row;
                    }
                })
                .or_insert(row);
        }
        latest.into_values().collect()
    }

    /// Column holding `metric`.
    ///
    /// Tries the name as given, then its key code, then the display name of a
    /// key code.
    pub fn resolve_column(&self, metric: &str, key_items: &KeyItems) -> Option<String> {
        if self.has_column(metric) {
            return Some(metric.to_string());
        }
        key_items
            .code_for(metric)
            .filter(|code| self.has_column(code))
            .or_else(|| key_items.name_for(metric).filter(|name| self.has_column(name)))
            .map(ToString::to_string)
    }
}

fn parse_period(granularity: Granularity, raw: &str) -> Option<Period> {
    match granularity {
        Granularity::Quarterly => Period::parse(raw).ok().filter(Period::is_quarter),
        Granularity::Yearly => Period::parse(reader::year_text(raw))
            .ok()
            .filter(|p| !p.is_quarter()),
    }
}
