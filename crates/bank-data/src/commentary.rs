//! Cached model commentary (`banking_comments.csv`) and sector-level
//! quarterly analysis (`quarterly_analysis_results.csv`)

use crate::error::{DataError, Result};
use crate::reader;
use bank_core::Period;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Timestamp format of the `GENERATED_AT` column
pub const GENERATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether two quarter labels denote the same quarter.
///
/// Labels in any accepted spelling compare by value (`2024-Q3` matches
/// `3Q24`); labels that do not parse compare as text.
pub fn same_quarter(a: &str, b: &str) -> bool {
    match (Period::parse(a), Period::parse(b)) {
        (Ok(pa), Ok(pb)) => pa == pb,
        _ => a.trim() == b.trim(),
    }
}

/// Column order of the comment cache file
const COMMENT_COLUMNS: [&str; 5] = ["TICKER", "SECTOR", "QUARTER", "COMMENT", "GENERATED_AT"];

/// One generated comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    #[serde(rename = "TICKER")]
    pub ticker: String,
    #[serde(rename = "SECTOR", default)]
    pub sector: String,
    #[serde(rename = "QUARTER")]
    pub quarter: String,
    #[serde(rename = "COMMENT", default)]
    pub comment: String,
    #[serde(rename = "GENERATED_AT", default)]
    pub generated_at: String,
}

impl CommentRecord {
    /// New record stamped with the current local time
    pub fn new(
        ticker: impl Into<String>,
        sector: impl Into<String>,
        quarter: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            sector: sector.into(),
            quarter: quarter.into(),
            comment: comment.into(),
            generated_at: chrono::Local::now().format(GENERATED_AT_FORMAT).to_string(),
        }
    }

    fn matches(&self, ticker: &str, quarter: &str) -> bool {
        self.ticker.eq_ignore_ascii_case(ticker.trim()) && same_quarter(&self.quarter, quarter)
    }
}

/// Comment cache keyed by (ticker, quarter)
#[derive(Debug, Clone, Default)]
pub struct CommentaryCache {
    records: Vec<CommentRecord>,
}

impl CommentaryCache {
    pub fn load(path: &Path) -> Result<Self> {
        let mut rdr = reader::open(path)?;
        let records = rdr
            .deserialize()
            .collect::<std::result::Result<Vec<CommentRecord>, _>>()
            .map_err(|e| DataError::csv(path, e))?;
        tracing::debug!(path = %path.display(), records = records.len(), "Loaded commentary cache");
        Ok(Self::from_records(records))
    }

    /// Load the cache, starting empty when the file does not exist yet
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(e) if e.is_missing() => Ok(Self::default()),
            other => other,
        }
    }

    pub fn from_records(records: Vec<CommentRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[CommentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Comment for a ticker and quarter; ticker match is case-insensitive
    pub fn get(&self, ticker: &str, quarter: &str) -> Option<&CommentRecord> {
        self.records.iter().find(|r| r.matches(ticker, quarter))
    }

    pub fn contains(&self, ticker: &str, quarter: &str) -> bool {
        self.get(ticker, quarter).is_some()
    }

    /// Insert or replace the record for its (ticker, quarter); returns
    /// whether an existing record was replaced
    pub fn upsert(&mut self, record: CommentRecord) -> bool {
        match self
            .records
            .iter_mut()
            .find(|r| r.matches(&record.ticker, &record.quarter))
        {
            Some(existing) => {
                *existing = record;
                true
            },
            None => {
                self.records.push(record);
                false
            },
        }
    }

    /// Write the cache to `path` through a temporary file in the same
    /// directory, then rename it into place
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| DataError::io(dir, e))?;

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(tmp.as_file_mut());
            writer
                .write_record(COMMENT_COLUMNS)
                .map_err(|e| DataError::csv(path, e))?;
            for record in &self.records {
                writer.serialize(record).map_err(|e| DataError::csv(path, e))?;
            }
            writer
                .flush()
                .map_err(|e| DataError::io(path, e))?;
        }
        tmp.as_file_mut().flush().map_err(|e| DataError::io(path, e))?;
        tmp.persist(path).map_err(|e| DataError::io(path, e.error))?;

        tracing::info!(path = %path.display(), records = self.records.len(), "Saved commentary cache");
        Ok(())
    }
}

/// Sector-wide analysis for one quarter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorAnalysis {
    #[serde(rename = "QUARTER")]
    pub quarter: String,
    #[serde(rename = "KEY_CHANGES", default)]
    pub key_changes: String,
    #[serde(rename = "INDIVIDUAL_HIGHLIGHTS", default)]
    pub individual_highlights: String,
    #[serde(rename = "FORWARD_OUTLOOK", default)]
    pub forward_outlook: String,
    #[serde(rename = "FULL_ANALYSIS", default)]
    pub full_analysis: String,
}

/// All quarterly sector analyses, in file order
#[derive(Debug, Clone, Default)]
pub struct SectorAnalysisTable {
    rows: Vec<SectorAnalysis>,
}

impl SectorAnalysisTable {
    pub fn load(path: &Path) -> Result<Self> {
        let mut rdr = reader::open(path)?;
        let rows = rdr
            .deserialize()
            .collect::<std::result::Result<Vec<SectorAnalysis>, _>>()
            .map_err(|e| DataError::csv(path, e))?;
        Ok(Self::from_rows(rows))
    }

    pub fn from_rows(rows: Vec<SectorAnalysis>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[SectorAnalysis] {
        &self.rows
    }

    pub fn for_quarter(&self, quarter: &str) -> Option<&SectorAnalysis> {
        self.rows.iter().find(|r| same_quarter(&r.quarter, quarter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(ticker: &str, quarter: &str, comment: &str) -> CommentRecord {
        CommentRecord {
            ticker: ticker.to_string(),
            sector: "Private_1".to_string(),
            quarter: quarter.to_string(),
            comment: comment.to_string(),
            generated_at: "2025-01-01 09:00:00".to_string(),
        }
    }

    #[test]
    fn test_same_quarter_across_spellings() {
        assert!(same_quarter("3Q24", "2024-Q3"));
        assert!(same_quarter("Q3 2024", "3Q24"));
        assert!(!same_quarter("3Q24", "4Q24"));
        assert!(same_quarter("latest", "latest"));
    }

    #[test]
    fn test_upsert_replaces_by_key() {
        let mut cache = CommentaryCache::default();
        assert!(!cache.upsert(record("ACB", "1Q24", "first")));
        assert!(cache.upsert(record("acb", "2024-Q1", "second")));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("ACB", "1Q24").unwrap().comment, "second");
    }

    #[test]
    fn test_empty_cache_saves_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("banking_comments.csv");
        CommentaryCache::default().save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.trim_end(), "TICKER,SECTOR,QUARTER,COMMENT,GENERATED_AT");
        assert!(CommentaryCache::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("banking_comments.csv");
        let mut cache = CommentaryCache::default();
        cache.upsert(record("ACB", "1Q24", "Loan growth, \"strong\" margins"));
        cache.upsert(CommentRecord::new("VCB", "SOCB", "1Q24", "Stable"));
        cache.save(&path).unwrap();

        let reloaded = CommentaryCache::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.get("ACB", "1Q24").unwrap().comment,
            "Loan growth, \"strong\" margins"
        );
        assert_eq!(reloaded.get("VCB", "1Q24").unwrap().generated_at.len(), 19);
    }

    #[test]
    fn test_missing_cache_starts_empty() {
        let dir = TempDir::new().unwrap();
        let cache = CommentaryCache::load_or_empty(&dir.path().join("none.csv")).unwrap();
        assert!(cache.is_empty());
        assert!(CommentaryCache::load(&dir.path().join("none.csv")).unwrap_err().is_missing());
    }

    #[test]
    fn test_sector_analysis_lookup() {
        let table = SectorAnalysisTable::from_rows(vec![SectorAnalysis {
            quarter: "1Q24".to_string(),
            key_changes: "NIM compression".to_string(),
            individual_highlights: String::new(),
            forward_outlook: String::new(),
            full_analysis: String::new(),
        }]);
        assert!(table.for_quarter("2024-Q1").is_some());
        assert!(table.for_quarter("2Q24").is_none());
    }
}
