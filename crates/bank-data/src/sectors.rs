//! Static bank to sector membership (`Bank_Type.csv`)

use crate::error::{DataError, Result};
use crate::reader::{self, Headers};
use std::path::Path;

/// Which sector group every bank belongs to
#[derive(Debug, Clone, Default)]
pub struct SectorMap {
    entries: Vec<(String, String)>,
}

impl SectorMap {
    pub fn load(path: &Path) -> Result<Self> {
        let mut rdr = reader::open(path)?;
        let headers = Headers::read(path, &mut rdr)?;
        let ticker_idx = headers.require(path, "TICKER")?;
        let type_idx = headers.require(path, "Type")?;

        let mut entries = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| DataError::csv(path, e))?;
            if let (Some(ticker), Some(kind)) =
                (reader::field(&record, ticker_idx), reader::field(&record, type_idx))
            {
                entries.push((ticker.to_string(), kind.to_string()));
            }
        }
        Ok(Self::from_pairs(entries))
    }

    pub fn from_pairs<I, T, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, S)>,
        T: Into<String>,
        S: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(t, s)| (t.into(), s.into()))
                .collect(),
        }
    }

    /// Sector of a ticker, exact match
    pub fn sector_of(&self, ticker: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, s)| s.as_str())
    }

    /// Tickers assigned to a sector, in file order
    pub fn members(&self, sector: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, s)| s == sector)
            .map(|(t, _)| t.as_str())
            .collect()
    }

    /// Sectors with their tickers, in order of first appearance
    pub fn grouped(&self) -> Vec<(&str, Vec<&str>)> {
        let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
        for (ticker, sector) in &self.entries {
            match groups.iter_mut().find(|(s, _)| *s == sector.as_str()) {
                Some((_, members)) => members.push(ticker.as_str()),
                None => groups.push((sector.as_str(), vec![ticker.as_str()])),
            }
        }
        groups
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> SectorMap {
        SectorMap::from_pairs([
            ("VCB", "SOCB"),
            ("ACB", "Private_1"),
            ("BID", "SOCB"),
            ("TCB", "Private_1"),
        ])
    }

    #[test]
    fn test_membership() {
        let map = map();
        assert_eq!(map.sector_of("ACB"), Some("Private_1"));
        assert_eq!(map.sector_of("XYZ"), None);
        assert_eq!(map.members("SOCB"), ["VCB", "BID"]);
    }

    #[test]
    fn test_grouped_keeps_first_appearance_order() {
        let map = map();
        let grouped = map.grouped();
        assert_eq!(grouped[0], ("SOCB", vec!["VCB", "BID"]));
        assert_eq!(grouped[1], ("Private_1", vec!["ACB", "TCB"]));
    }
}
