//! RIS loader.
//!
//! Reads `TAG  - value` lines incrementally. `TY` opens an entry and `ER`
//! closes it; an untagged line inside an entry continues the previous value.

use crate::error::{Result, ScreenError};
use crate::loader::{extract_year, set_first};
use crate::record::{field, RawRecord};
use std::io::{BufRead, Lines};
use tracing::debug;

/// Streaming RIS entry iterator
pub struct RisRecords<R: BufRead> {
    lines: Lines<R>,
    source: String,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> RisRecords<R> {
    pub fn new(reader: R, source: &str) -> Self {
        Self {
            lines: reader.lines(),
            source: source.to_string(),
            line_no: 0,
            done: false,
        }
    }

    fn fail(&mut self, message: String) -> Option<Result<RawRecord>> {
        self.done = true;
        Some(Err(ScreenError::format(&self.source, message)))
    }
}

impl<R: BufRead> Iterator for RisRecords<R> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut current: Option<(String, Vec<(String, String)>)> = None;

        loop {
            let raw_line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    let line_no = self.line_no + 1;
                    return self.fail(format!("unreadable line {line_no}: {e}"));
                }
                None => {
                    self.done = true;
                    // Trailing entry without ER is still an entry
                    return current.map(|(ty, tags)| Ok(build_record(&ty, tags)));
                }
            };
            self.line_no += 1;

            let line = raw_line.trim_start_matches('\u{feff}').trim_end();
            if line.trim().is_empty() {
                continue;
            }

            let Some((tag, value)) = split_tag(line) else {
                match current.as_mut().and_then(|(_, tags)| tags.last_mut()) {
                    Some((_, previous)) => {
                        previous.push(' ');
                        previous.push_str(line.trim());
                        continue;
                    }
                    None => {
                        let line_no = self.line_no;
                        return self.fail(format!("invalid RIS line {line_no}: {line}"));
                    }
                }
            };

            match tag {
                "TY" => {
                    if current.is_some() {
                        let line_no = self.line_no;
                        return self.fail(format!("nested TY without ER at line {line_no}"));
                    }
                    current = Some((value.to_string(), Vec::new()));
                }
                "ER" => {
                    let Some((ty, tags)) = current.take() else {
                        let line_no = self.line_no;
                        return self.fail(format!("ER without TY at line {line_no}"));
                    };
                    return Some(Ok(build_record(&ty, tags)));
                }
                _ => {
                    let Some((_, tags)) = current.as_mut() else {
                        let line_no = self.line_no;
                        return self.fail(format!("{tag} outside of RIS entry at line {line_no}"));
                    };
                    tags.push((tag.to_string(), value.to_string()));
                }
            }
        }
    }
}

/// Split `TI  - Title` into `("TI", "Title")`. Tags are two upper-case
/// alphanumerics.
fn split_tag(line: &str) -> Option<(&str, &str)> {
    let (tag, value) = line.split_once("  - ").or_else(|| line.split_once("  -"))?;
    let tag = tag.trim();
    let valid = tag.len() == 2
        && tag
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    valid.then(|| (tag, value.trim()))
}

fn build_record(entry_type: &str, tags: Vec<(String, String)>) -> RawRecord {
    let mut record = RawRecord::new();
    record.set_text(field::TYPE, entry_type.trim());

    for (tag, value) in tags {
        match tag.as_str() {
            "TI" | "T1" => set_first(&mut record, field::TITLE, &value),
            "AU" | "A1" | "A2" => record.push_list(field::AUTHORS, value),
            "PY" | "Y1" | "DA" => {
                if !record.has(field::YEAR) {
                    record.set_text(field::YEAR, extract_year(&value));
                }
            }
            "JO" | "JF" | "JA" | "T2" => set_first(&mut record, field::VENUE, &value),
            "VL" => set_first(&mut record, field::VOLUME, &value),
            "IS" => set_first(&mut record, field::ISSUE, &value),
            "DO" => set_first(&mut record, field::DOI, &value),
            "AB" | "N2" => set_first(&mut record, field::ABSTRACT, &value),
            "KW" => record.push_list(field::KEYWORDS, value),
            "UR" | "L1" => set_first(&mut record, field::URL, &value),
            other => {
                let key = other.to_ascii_lowercase();
                set_first(&mut record, &key, &value);
            }
        }
    }

    debug!(title = record.text(field::TITLE), "Parsed RIS entry");
    record
}
