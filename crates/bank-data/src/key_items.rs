//! Metric name to key code mapping (`Key_items.csv`)

use crate::error::{DataError, Result};
use crate::reader::{self, Headers};
use std::path::Path;

/// Display names and the key codes used as column headers
#[derive(Debug, Clone, Default)]
pub struct KeyItems {
    items: Vec<(String, String)>,
}

impl KeyItems {
    pub fn load(path: &Path) -> Result<Self> {
        let mut rdr = reader::open(path)?;
        let headers = Headers::read(path, &mut rdr)?;
        let name_idx = headers.require(path, "Name")?;
        let code_idx = headers.require(path, "KeyCode")?;

        let mut items = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| DataError::csv(path, e))?;
            if let (Some(name), Some(code)) =
                (reader::field(&record, name_idx), reader::field(&record, code_idx))
            {
                items.push((name.to_string(), code.to_string()));
            }
        }
        Ok(Self::from_pairs(items))
    }

    pub fn from_pairs<I, N, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: Into<String>,
    {
        Self {
            items: pairs
                .into_iter()
                .map(|(n, c)| (n.into(), c.into()))
                .collect(),
        }
    }

    /// Key code of a display name, case-insensitive
    pub fn code_for(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        self.items
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, c)| c.as_str())
    }

    /// Display name of a key code
    pub fn name_for(&self, code: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(_, c)| c == code.trim())
            .map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
