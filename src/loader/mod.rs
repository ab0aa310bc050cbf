//! Record loaders for citation-database exports.
//!
//! Each loader adapts one export format into a lazy stream of [`RawRecord`]s.
//! A stream yields `Err(ScreenError::Format)` at most once and then ends:
//! a corrupt file loses its remaining entries but never affects other files.
//!
//! - [`ris`] - tagged `TAG  - value` interchange format
//! - [`bibtex`] - `@type{key, field = {value}}` citation format

pub mod bibtex;
pub mod ris;

use crate::error::Result;
use crate::record::RawRecord;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Lazy, finite, non-restartable record stream
pub type RecordStream = Box<dyn Iterator<Item = Result<RawRecord>>>;

/// Supported export formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Ris,
    Bibtex,
}

impl SourceFormat {
    /// Format for a path, or `None` for extensions the corpus ignores.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ris" => Some(SourceFormat::Ris),
            "bib" => Some(SourceFormat::Bibtex),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Ris => "ris",
            SourceFormat::Bibtex => "bibtex",
        }
    }
}

/// Source name for a file: its stem (`scopus.ris` -> `scopus`).
pub fn source_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Build a record stream over `reader` for the declared `format`.
pub fn load_records<R: Read + 'static>(
    reader: R,
    format: SourceFormat,
    source_name: &str,
) -> RecordStream {
    match format {
        SourceFormat::Ris => Box::new(ris::RisRecords::new(BufReader::new(reader), source_name)),
        SourceFormat::Bibtex => Box::new(bibtex::BibtexRecords::new(reader, source_name)),
    }
}

/// Open a file and build its record stream.
pub fn open_records(path: &Path, format: SourceFormat) -> Result<RecordStream> {
    let file = File::open(path)?;
    Ok(load_records(file, format, &source_name(path)))
}

/// Keep the first non-empty occurrence of a text field.
pub(crate) fn set_first(record: &mut RawRecord, key: &str, value: &str) {
    if !record.has(key) {
        record.set_text(key, value.trim());
    }
}

/// First four-digit run in a date-like value (`2021/05/03/` -> `2021`).
pub(crate) fn extract_year(value: &str) -> String {
    let digits: Vec<char> = value.chars().collect();
    for window in digits.windows(4) {
        if window.iter().all(|c| c.is_ascii_digit()) {
            return window.iter().collect();
        }
    }
    value.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SourceFormat::from_path(&PathBuf::from("a/scopus.ris")), Some(SourceFormat::Ris));
        assert_eq!(SourceFormat::from_path(&PathBuf::from("acl.BIB")), Some(SourceFormat::Bibtex));
        assert_eq!(SourceFormat::from_path(&PathBuf::from("notes.txt")), None);
        assert_eq!(SourceFormat::from_path(&PathBuf::from("README")), None);
    }

    #[test]
    fn test_source_name_is_file_stem() {
        assert_eq!(source_name(&PathBuf::from("/data/web_of_science.ris")), "web_of_science");
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("2021/05/03/"), "2021");
        assert_eq!(extract_year(" 1999 "), "1999");
        assert_eq!(extract_year("n.d."), "n.d.");
    }
}
