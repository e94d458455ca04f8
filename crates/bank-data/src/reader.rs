//! Shared CSV reading helpers

use crate::error::{DataError, Result};
use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Open a headed CSV file, mapping a missing file to [`DataError::MissingFile`]
pub(crate) fn open(path: &Path) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    Ok(reader(file))
}

pub(crate) fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}

/// Header positions of one file
pub(crate) struct Headers {
    names: Vec<String>,
}

impl Headers {
    pub(crate) fn read<R: Read>(path: &Path, reader: &mut csv::Reader<R>) -> Result<Self> {
        let headers = reader.headers().map_err(|e| DataError::csv(path, e))?;
        Ok(Self {
            names: headers.iter().map(ToString::to_string).collect(),
        })
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|h| h == name)
    }

    pub(crate) fn require(&self, path: &Path, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| DataError::malformed(path, format!("missing {name} column")))
    }

    pub(crate) fn names(&self) -> &[String] {
        &self.names
    }
}

/// Field text, `None` when absent or blank
pub(crate) fn field(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Numeric cell; blanks, `nan` and non-numeric text read as missing
pub(crate) fn number(raw: Option<&str>) -> Option<f64> {
    let raw = raw?;
    if raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("inf") {
        return None;
    }
    raw.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Year cells exported from spreadsheets can carry a trailing `.0`
pub(crate) fn year_text(raw: &str) -> &str {
    raw.strip_suffix(".0").unwrap_or(raw)
}
