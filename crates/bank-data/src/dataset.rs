//! Every table the assistant reads, loaded from one data directory

use crate::commentary::{CommentaryCache, SectorAnalysisTable};
use crate::error::Result;
use crate::key_items::KeyItems;
use crate::sectors::SectorMap;
use crate::table::MetricTable;
use crate::valuation::ValuationTable;
use std::path::{Path, PathBuf};

pub const QUARTERLY_FILE: &str = "dfsectorquarter.csv";
pub const YEARLY_FILE: &str = "dfsectoryear.csv";
pub const FORECAST_FILE: &str = "dfsectorforecast.csv";
pub const BANK_TYPE_FILE: &str = "Bank_Type.csv";
pub const KEY_ITEMS_FILE: &str = "Key_items.csv";
pub const VALUATION_FILE: &str = "Valuation_banking.csv";
pub const COMMENTS_FILE: &str = "banking_comments.csv";
pub const SECTOR_ANALYSIS_FILE: &str = "quarterly_analysis_results.csv";

/// Immutable snapshot of the data directory.
///
/// The metric tables, sector map and key items are required. Valuation,
/// commentary and sector analysis are optional; tools depending on them
/// report that the data is not available.
#[derive(Debug, Clone)]
pub struct BankData {
    pub dir: PathBuf,
    pub quarterly: MetricTable,
    pub yearly: MetricTable,
    pub forecast: MetricTable,
    pub sectors: SectorMap,
    pub key_items: KeyItems,
    pub valuation: Option<ValuationTable>,
    pub comments: Option<CommentaryCache>,
    pub sector_analysis: Option<SectorAnalysisTable>,
}

impl BankData {
    /// Load every table from `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let data = Self {
            dir: dir.to_path_buf(),
            quarterly: MetricTable::load(&dir.join(QUARTERLY_FILE))?,
            yearly: MetricTable::load(&dir.join(YEARLY_FILE))?,
            forecast: MetricTable::load(&dir.join(FORECAST_FILE))?,
            sectors: SectorMap::load(&dir.join(BANK_TYPE_FILE))?,
            key_items: KeyItems::load(&dir.join(KEY_ITEMS_FILE))?,
            valuation: optional(&dir.join(VALUATION_FILE), ValuationTable::load)?,
            comments: optional(&dir.join(COMMENTS_FILE), CommentaryCache::load)?,
            sector_analysis: optional(&dir.join(SECTOR_ANALYSIS_FILE), SectorAnalysisTable::load)?,
        };

        tracing::info!(
            dir = %dir.display(),
            quarterly_rows = data.quarterly.len(),
            yearly_rows = data.yearly.len(),
            forecast_rows = data.forecast.len(),
            banks = data.sectors.len(),
            valuation = data.valuation.is_some(),
            comments = data.comments.is_some(),
            sector_analysis = data.sector_analysis.is_some(),
            "Loaded banking data"
        );
        Ok(data)
    }

    pub fn comments_path(&self) -> PathBuf {
        self.dir.join(COMMENTS_FILE)
    }
}

fn optional<T>(path: &Path, load: impl FnOnce(&Path) -> Result<T>) -> Result<Option<T>> {
    match load(path) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_missing() => {
            tracing::debug!(path = %path.display(), "Optional data file absent");
            Ok(None)
        },
        Err(e) => Err(e),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use bank_core::Period;
    use std::fs;

    #[test]
    fn test_load_directory() {
        let dir = fixtures::data_dir();
        let data = BankData::load(dir.path()).unwrap();
        assert_eq!(data.quarterly.len(), 5);
        assert_eq!(data.sectors.sector_of("VCB"), Some("SOCB"));
        assert!(data.valuation.is_some());
        assert!(data.comments.is_none());
        assert!(data.sector_analysis.is_none());
        assert_eq!(
            data.quarterly.value("ACB", Period::quarter(2024, 1).unwrap(), "ROE"),
            Some(0.18)
        );
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = fixtures::data_dir();
        let first = BankData::load(dir.path()).unwrap();
        let second = BankData::load(dir.path()).unwrap();
        assert_eq!(first.quarterly.rows(), second.quarterly.rows());
        assert_eq!(first.yearly.columns(), second.yearly.columns());
    }

    #[test]
    fn test_missing_required_file_names_path() {
        let dir = fixtures::data_dir();
        fs::remove_file(dir.path().join(YEARLY_FILE)).unwrap();
        let err = BankData::load(dir.path()).unwrap_err();
        assert!(err.is_missing());
        assert!(err.path().ends_with(YEARLY_FILE));
    }
}
