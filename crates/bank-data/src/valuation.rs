//! Valuation ratio history (`Valuation_banking.csv`) and the statistics
//! computed over it

use crate::error::{DataError, Result};
use crate::reader::{self, Headers};
use chrono::{NaiveDate, NaiveDateTime};
use statrs::statistics::{Data, Median, Statistics};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Valuation ratio selectable by callers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ValuationMetric {
    Pe,
    #[default]
    Pb,
    Ps,
}

impl ValuationMetric {
    /// Accepts `PE`, `P/E`, `pb` and similar spellings
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().replace('/', "").to_uppercase().as_str() {
            "PE" => Some(Self::Pe),
            "PB" => Some(Self::Pb),
            "PS" => Some(Self::Ps),
            _ => None,
        }
    }

    /// Short code used in tool arguments
    pub fn code(self) -> &'static str {
        match self {
            Self::Pe => "PE",
            Self::Pb => "PB",
            Self::Ps => "PS",
        }
    }

    /// Column in the valuation file
    pub fn column(self) -> &'static str {
        match self {
            Self::Pe => "PE_RATIO",
            Self::Pb => "PX_TO_BOOK_RATIO",
            Self::Ps => "PX_TO_SALES_RATIO",
        }
    }
}

impl fmt::Display for ValuationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One trading day for one entity
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationRow {
    pub ticker: String,
    pub sector: Option<String>,
    pub trade_date: NaiveDate,
    pub pe: Option<f64>,
    pub pb: Option<f64>,
    pub ps: Option<f64>,
}

impl ValuationRow {
    pub fn value(&self, metric: ValuationMetric) -> Option<f64> {
        match metric {
            ValuationMetric::Pe => self.pe,
            ValuationMetric::Pb => self.pb,
            ValuationMetric::Ps => self.ps,
        }
    }
}

/// Daily valuation ratios, sorted by ticker then trade date
#[derive(Debug, Clone, Default)]
pub struct ValuationTable {
    rows: Vec<ValuationRow>,
    columns: Vec<ValuationMetric>,
}

impl ValuationTable {
    pub fn load(path: &Path) -> Result<Self> {
        let rdr = reader::open(path)?;
        Self::parse(path, rdr)
    }

    pub fn from_reader<R: Read>(source: &Path, input: R) -> Result<Self> {
        Self::parse(source, reader::reader(input))
    }

    fn parse<R: Read>(path: &Path, mut rdr: csv::Reader<R>) -> Result<Self> {
        let headers = Headers::read(path, &mut rdr)?;
        let ticker_idx = headers.require(path, "TICKER")?;
        let date_idx = headers.require(path, "TRADE_DATE")?;
        let type_idx = headers.position("Type");
        let metric_idx = |m: ValuationMetric| headers.position(m.column());
        let pe_idx = metric_idx(ValuationMetric::Pe);
        let pb_idx = metric_idx(ValuationMetric::Pb);
        let ps_idx = metric_idx(ValuationMetric::Ps);

        let columns = [
            (ValuationMetric::Pe, pe_idx),
            (ValuationMetric::Pb, pb_idx),
            (ValuationMetric::Ps, ps_idx),
        ]
        .into_iter()
        .filter_map(|(m, idx)| idx.map(|_| m))
        .collect();

        let mut rows = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| DataError::csv(path, e))?;
            let Some(ticker) = reader::field(&record, ticker_idx) else {
                continue;
            };
            let raw_date = reader::field(&record, date_idx).unwrap_or_default();
            let trade_date = parse_trade_date(raw_date).ok_or_else(|| {
                DataError::malformed(path, format!("row {}: invalid TRADE_DATE '{raw_date}'", line + 2))
            })?;
            let cell = |idx: Option<usize>| idx.and_then(|i| reader::number(reader::field(&record, i)));

            rows.push(ValuationRow {
                ticker: ticker.to_string(),
                sector: type_idx.and_then(|i| reader::field(&record, i)).map(ToString::to_string),
                trade_date,
                pe: cell(pe_idx),
                pb: cell(pb_idx),
                ps: cell(ps_idx),
            });
        }

        tracing::debug!(path = %path.display(), rows = rows.len(), "Loaded valuation table");
        Ok(Self::from_rows_with_columns(rows, columns))
    }

    fn from_rows_with_columns(mut rows: Vec<ValuationRow>, columns: Vec<ValuationMetric>) -> Self {
        rows.sort_by(|a, b| a.ticker.cmp(&b.ticker).then(a.trade_date.cmp(&b.trade_date)));
        Self { rows, columns }
    }

    /// Whether the file carried a column for `metric`
    pub fn has_metric(&self, metric: ValuationMetric) -> bool {
        self.columns.contains(&metric)
    }

    pub fn rows(&self) -> &[ValuationRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.trade_date).max()
    }

    /// Rows of one ticker, oldest first
    pub fn rows_for<'a>(&'a self, ticker: &'a str) -> impl Iterator<Item = &'a ValuationRow> + 'a {
        self.rows.iter().filter(move |r| r.ticker == ticker)
    }

    /// Rows whose `Type` is `sector`, grouped by ticker then date
    pub fn rows_in_sector<'a>(&'a self, sector: &'a str) -> impl Iterator<Item = &'a ValuationRow> + 'a {
        self.rows
            .iter()
            .filter(move |r| r.sector.as_deref() == Some(sector))
    }

    /// `Type` recorded for a ticker
    pub fn sector_of(&self, ticker: &str) -> Option<&str> {
        self.rows
            .iter()
            .filter(|r| r.ticker == ticker)
            .find_map(|r| r.sector.as_deref())
    }

    /// Non-missing values of one ticker, oldest first
    pub fn series(&self, ticker: &str, metric: ValuationMetric) -> Vec<(NaiveDate, f64)> {
        self.rows_for(ticker)
            .filter_map(|r| r.value(metric).map(|v| (r.trade_date, v)))
            .collect()
    }

    /// Cross-sectional mean of a sector per trade date, oldest first
    pub fn sector_daily_mean(&self, sector: &str, metric: ValuationMetric) -> Vec<(NaiveDate, f64)> {
        let mut sums: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        for row in self.rows_in_sector(sector) {
            if let Some(v) = row.value(metric) {
                let entry = sums.entry(row.trade_date).or_insert((0.0, 0));
                entry.0 += v;
                entry.1 += 1;
            }
        }
        sums.into_iter()
            .map(|(date, (sum, count))| (date, sum / count as f64))
            .collect()
    }
}

fn parse_trade_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

/// Percentile rank of `score` within `values`, averaging ties (0 to 100).
///
/// An exact match counts half below and half at the score, so the maximum of
/// a distinct series ranks at 100 and its minimum at `100 / n`.
pub fn percentile_of_score(values: &[f64], score: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let below = values.iter().filter(|v| **v < score).count();
    let at_or_below = values.iter().filter(|v| **v <= score).count();
    let bump = usize::from(at_or_below > below);
    (below + at_or_below + bump) as f64 * 50.0 / values.len() as f64
}

/// `(score - mean) / sample std`, zero when the spread is zero or undefined
pub fn z_score(values: &[f64], score: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let std = values.iter().std_dev();
    if std.is_finite() && std > 0.0 {
        (score - values.iter().mean()) / std
    } else {
        0.0
    }
}

/// Summary of a valuation series relative to a current reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub current: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; zero for a single observation
    pub std: f64,
    pub z_score: f64,
    pub percentile_rank: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl SeriesStats {
    /// Statistics of a series whose last element is the current reading
    pub fn of(values: &[f64]) -> Option<Self> {
        let current = *values.last()?;
        Self::against(values, current)
    }

    /// Statistics of a series relative to an external current reading
    pub fn against(values: &[f64], current: f64) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let std = if values.len() > 1 { values.iter().std_dev() } else { 0.0 };
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));

        Some(Self {
            current,
            mean: values.iter().mean(),
            median: Data::new(values.to_vec()).median(),
            std,
            z_score: z_score(values, current),
            percentile_rank: percentile_of_score(values, current),
            min,
            max,
            count: values.len(),
        })
    }

    /// Reading of the z-score used in reports
    pub fn interpretation(&self) -> &'static str {
        if self.z_score < -1.0 {
            "Undervalued"
        } else if self.z_score > 1.0 {
            "Overvalued"
        } else {
            "Fair valued"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
TICKER,Type,TRADE_DATE,PE_RATIO,PX_TO_BOOK_RATIO,PX_TO_SALES_RATIO
VCB,SOCB,2024-01-02,14,2.6,
VCB,SOCB,2024-01-03,15,2.7,
VCB,SOCB,2024-01-04,16,2.8,
VCB,SOCB,2024-01-05,19,,
BID,SOCB,2024-01-04,10,2.0,
BID,SOCB,2024-01-05,12,2.2,
";

    fn table() -> ValuationTable {
        ValuationTable::from_reader(Path::new("Valuation_banking.csv"), CSV.as_bytes()).unwrap()
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!(ValuationMetric::parse("P/E"), Some(ValuationMetric::Pe));
        assert_eq!(ValuationMetric::parse("pb"), Some(ValuationMetric::Pb));
        assert_eq!(ValuationMetric::parse("EV"), None);
        assert_eq!(ValuationMetric::default().column(), "PX_TO_BOOK_RATIO");
    }

    #[test]
    fn test_series_skips_missing() {
        let table = table();
        let pb: Vec<f64> = table.series("VCB", ValuationMetric::Pb).into_iter().map(|(_, v)| v).collect();
        assert_eq!(pb, vec![2.6, 2.7, 2.8]);
        assert_eq!(table.latest_date(), NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(table.sector_of("BID"), Some("SOCB"));
    }

    #[test]
    fn test_sector_outlives_ticker_argument() {
        let table = table();
        let sector = {
            let ticker = String::from("VCB");
            table.sector_of(&ticker)
        };
        assert_eq!(sector, Some("SOCB"));
        assert_eq!(table.sector_of("XYZ"), None);
    }

    #[test]
    fn test_z_score_uses_sample_std() {
        let values = [14.0, 15.0, 16.0, 19.0];
        let stats = SeriesStats::of(&values).unwrap();
        let mean = 16.0;
        let sample_std = ((4.0 + 1.0 + 0.0 + 9.0) / 3.0_f64).sqrt();
        assert!((stats.mean - mean).abs() < 1e-9);
        assert!((stats.std - sample_std).abs() < 1e-9);
        assert!((stats.z_score - (19.0 - mean) / sample_std).abs() < 1e-9);
        assert!((stats.median - 15.5).abs() < 1e-9);
        assert_eq!(stats.min, 14.0);
        assert_eq!(stats.max, 19.0);
        assert_eq!(stats.percentile_rank, 100.0);
    }

    #[test]
    fn test_percentile_rank_ties() {
        assert!((percentile_of_score(&[1.0, 2.0, 3.0, 4.0], 3.0) - 75.0).abs() < 1e-9);
        assert!((percentile_of_score(&[1.0, 2.0, 3.0, 3.0, 4.0], 3.0) - 70.0).abs() < 1e-9);
        assert!((percentile_of_score(&[1.0, 2.0], 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_constant_series_has_zero_z() {
        let stats = SeriesStats::of(&[2.0, 2.0, 2.0]).unwrap();
        assert_eq!(stats.z_score, 0.0);
        assert_eq!(stats.interpretation(), "Fair valued");
        assert!(SeriesStats::of(&[]).is_none());
        assert_eq!(SeriesStats::of(&[3.0]).unwrap().std, 0.0);
    }

    #[test]
    fn test_sector_daily_mean() {
        let means = table().sector_daily_mean("SOCB", ValuationMetric::Pe);
        assert_eq!(means.len(), 4);
        assert_eq!(means[2].1, 13.0);
        assert_eq!(means[3].1, 15.5);
    }

    #[test]
    fn test_interpretation_thresholds() {
        let mut stats = SeriesStats::of(&[1.0, 2.0]).unwrap();
        stats.z_score = -1.5;
        assert_eq!(stats.interpretation(), "Undervalued");
        stats.z_score = 1.2;
        assert_eq!(stats.interpretation(), "Overvalued");
    }
}
