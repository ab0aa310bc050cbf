//! BibTeX loader.
//!
//! The whole file is read up front (BibTeX values can span lines and nest
//! braces), then entries are parsed one at a time on demand. `@string`
//! macros and month abbreviations are substituted; `@comment` and
//! `@preamble` blocks are skipped.

use crate::error::{OptionExt, Result, ScreenError};
use crate::loader::{extract_year, set_first};
use crate::record::{field, RawRecord};
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;

const MONTHS: &[(&str, &str)] = &[
    ("jan", "January"),
    ("feb", "February"),
    ("mar", "March"),
    ("apr", "April"),
    ("may", "May"),
    ("jun", "June"),
    ("jul", "July"),
    ("aug", "August"),
    ("sep", "September"),
    ("oct", "October"),
    ("nov", "November"),
    ("dec", "December"),
];

/// Lazily parsed BibTeX entry iterator
pub struct BibtexRecords {
    source: String,
    reader: Option<Box<dyn Read>>,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    strings: HashMap<String, String>,
    done: bool,
}

impl BibtexRecords {
    pub fn new<R: Read + 'static>(reader: R, source: &str) -> Self {
        let strings = MONTHS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            source: source.to_string(),
            reader: Some(Box::new(reader)),
            chars: Vec::new(),
            pos: 0,
            line: 1,
            strings,
            done: false,
        }
    }

    /// Read the underlying source on first use.
    fn fill(&mut self) -> Result<()> {
        if let Some(mut reader) = self.reader.take() {
            let mut content = String::new();
            reader
                .read_to_string(&mut content)
                .map_err(|e| ScreenError::format(&self.source, format!("unreadable file: {e}")))?;
            self.chars = content.chars().collect();
        }
        Ok(())
    }

    fn error(&self, message: &str) -> ScreenError {
        ScreenError::format(&self.source, format!("{message} at line {}", self.line))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, wanted: char) -> Result<()> {
        self.skip_whitespace();
        match self.bump() {
            Some(c) if c == wanted => Ok(()),
            Some(c) => Err(self.error(&format!("expected '{wanted}', found '{c}'"))),
            None => Err(self.error(&format!("expected '{wanted}', found end of file"))),
        }
    }

    fn identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if is_ident_char(c) {
                ident.push(c);
                self.bump();
            } else {
                break;
            }
        }
        ident
    }

    /// Consume a `{...}` block whose opening brace was already read.
    fn braced(&mut self) -> Result<String> {
        let mut depth = 1usize;
        let mut text = String::new();
        loop {
            let c = self.bump().ok_or_format(&self.source, "unbalanced braces")?;
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(text);
                    }
                }
                _ => {}
            }
            text.push(c);
        }
    }

    fn quoted(&mut self) -> Result<String> {
        let mut depth = 0usize;
        let mut text = String::new();
        loop {
            let c = self
                .bump()
                .ok_or_format(&self.source, "unterminated quoted value")?;
            match c {
                '\\' => {
                    // `\"` and friends never close the value
                    text.push(c);
                    if let Some(escaped) = self.bump() {
                        text.push(escaped);
                    }
                    continue;
                }
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                '"' if depth == 0 => return Ok(text),
                _ => {}
            }
            text.push(c);
        }
    }

    /// A field value: parts joined by `#`.
    fn value(&mut self) -> Result<String> {
        let mut value = String::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('{') => {
                    self.bump();
                    value.push_str(&self.braced()?);
                }
                Some('"') => {
                    self.bump();
                    value.push_str(&self.quoted()?);
                }
                Some(c) if c.is_alphanumeric() => {
                    let token = self.identifier();
                    let resolved = self
                        .strings
                        .get(&token.to_lowercase())
                        .cloned()
                        .unwrap_or(token);
                    value.push_str(&resolved);
                }
                Some(c) => return Err(self.error(&format!("unexpected '{c}' in value"))),
                None => return Err(self.error("unexpected end of file in value")),
            }
            self.skip_whitespace();
            if self.peek() == Some('#') {
                self.bump();
            } else {
                return Ok(value);
            }
        }
    }

    /// Whether the text after an `@` opens a block (`type{` or `type(`).
    /// Anything else, like an e-mail address in a header, is comment text.
    fn at_block_start(&self) -> bool {
        let rest = &self.chars[self.pos.min(self.chars.len())..];
        let ident_len = rest.iter().take_while(|c| is_ident_char(**c)).count();
        if ident_len == 0 {
            return false;
        }
        rest[ident_len..]
            .iter()
            .find(|c| !c.is_whitespace())
            .is_some_and(|c| matches!(c, '{' | '('))
    }

    /// Parse one `@type{...}` block. Returns `None` for non-entry blocks.
    fn block(&mut self) -> Result<Option<RawRecord>> {
        let start_line = self.line;
        let entry_type = self.identifier().to_lowercase();
        self.skip_whitespace();
        let close = match self.bump() {
            Some('{') => '}',
            Some('(') => ')',
            _ => return Err(self.error(&format!("expected '{{' after @{entry_type}"))),
        };

        match entry_type.as_str() {
            "comment" | "preamble" => {
                if close == '}' {
                    self.braced()?;
                } else {
                    self.skip_until(')')?;
                }
                return Ok(None);
            }
            "string" => {
                self.skip_whitespace();
                let name = self.identifier().to_lowercase();
                self.expect('=')?;
                let value = self.value()?;
                self.expect(close)?;
                self.strings.insert(name, value);
                return Ok(None);
            }
            _ => {}
        }

        self.skip_whitespace();
        let mut key = String::new();
        while let Some(c) = self.peek() {
            if c == ',' || c == close || c.is_whitespace() {
                break;
            }
            key.push(c);
            self.bump();
        }

        let mut fields: Vec<(String, String)> = Vec::new();
        loop {
            self.skip_whitespace();
            match self.bump() {
                Some(c) if c == close => break,
                Some(',') => {}
                Some(c) => return Err(self.error(&format!("unexpected '{c}' in entry '{key}'"))),
                None => {
                    return Err(ScreenError::format(
                        &self.source,
                        format!("unterminated entry '{key}' starting at line {start_line}"),
                    ))
                }
            }
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.bump();
                break;
            }
            let name = self.identifier().to_lowercase();
            if name.is_empty() {
                return Err(self.error(&format!("missing field name in entry '{key}'")));
            }
            self.expect('=')?;
            let value = self.value()?;
            fields.push((name, value));
        }

        Ok(Some(build_record(&entry_type, fields)))
    }

    fn skip_until(&mut self, wanted: char) -> Result<()> {
        loop {
            let c = self.bump().ok_or_format(&self.source, "unterminated block")?;
            if c == wanted {
                return Ok(());
            }
        }
    }
}

impl Iterator for BibtexRecords {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Err(e) = self.fill() {
            self.done = true;
            return Some(Err(e));
        }

        loop {
            // Text between entries is an implicit comment
            while self.peek().is_some_and(|c| c != '@') {
                self.bump();
            }
            if self.bump().is_none() {
                self.done = true;
                return None;
            }
            if !self.at_block_start() {
                continue;
            }
            match self.block() {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.' | '+' | '/')
}

/// Strip grouping braces, unescape `\&` and collapse whitespace.
fn clean_value(raw: &str) -> String {
    let without_braces: String = raw.chars().filter(|c| *c != '{' && *c != '}').collect();
    without_braces
        .replace("\\&", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn build_record(entry_type: &str, fields: Vec<(String, String)>) -> RawRecord {
    let mut record = RawRecord::new();
    record.set_text(field::TYPE, entry_type);

    for (name, raw) in fields {
        let value = clean_value(&raw);
        match name.as_str() {
            "title" => set_first(&mut record, field::TITLE, &value),
            "author" => {
                for author in value.split(" and ") {
                    record.push_list(field::AUTHORS, author);
                }
            }
            "year" => {
                if !record.has(field::YEAR) {
                    record.set_text(field::YEAR, extract_year(&value));
                }
            }
            "journal" | "journaltitle" => {
                // Journal wins over booktitle regardless of field order
                record.set_text(field::VENUE, value);
            }
            "booktitle" => set_first(&mut record, field::VENUE, &value),
            "volume" => set_first(&mut record, field::VOLUME, &value),
            "number" | "issue" => set_first(&mut record, field::ISSUE, &value),
            "doi" => set_first(&mut record, field::DOI, &value),
            "abstract" => set_first(&mut record, field::ABSTRACT, &value),
            "keywords" => {
                for keyword in value.split([',', ';']) {
                    record.push_list(field::KEYWORDS, keyword);
                }
            }
            "url" => set_first(&mut record, field::URL, &value),
            other => set_first(&mut record, other, &value),
        }
    }

    debug!(title = record.text(field::TITLE), "Parsed BibTeX entry");
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(content: &str) -> Vec<Result<RawRecord>> {
        BibtexRecords::new(Cursor::new(content.to_string()), "test").collect()
    }

    #[test]
    fn test_parse_inproceedings() {
        let content = r#"
@inproceedings{kim-2021-empathic,
    title = "{E}mpathic Response Generation",
    author = "Kim, Jin  and
      Lee, Sora",
    booktitle = "Proceedings of ACL",
    month = aug,
    year = "2021",
    doi = "10.18653/v1/x",
    url = "https://aclanthology.org/2021.acl-long.1",
    abstract = "We annotate a {corpus} of dialogues.",
    keywords = {empathy, dialogue; generation},
}
"#;
        let records = parse(content);
        assert_eq!(records.len(), 1);
        let record = records[0].as_ref().expect("parse");
        assert_eq!(record.text(field::TITLE), "Empathic Response Generation");
        assert_eq!(record.list(field::AUTHORS), vec!["Kim, Jin", "Lee, Sora"]);
        assert_eq!(record.text(field::VENUE), "Proceedings of ACL");
        assert_eq!(record.text(field::YEAR), "2021");
        assert_eq!(record.text("month"), "August");
        assert_eq!(record.text(field::ABSTRACT), "We annotate a corpus of dialogues.");
        assert_eq!(record.list(field::KEYWORDS), vec!["empathy", "dialogue", "generation"]);
        assert_eq!(record.text(field::TYPE), "inproceedings");
        assert_eq!(record.text(field::URL), "https://aclanthology.org/2021.acl-long.1");
    }

    #[test]
    fn test_string_macros_and_comments() {
        let content = r#"
@comment{ exported by a reference manager }
@string{ acl = "Association for Computational Linguistics" }
@article{a, title = {Emotion}, journal = acl # " Journal", number = 4, volume = 7}
"#;
        let records = parse(content);
        assert_eq!(records.len(), 1);
        let record = records[0].as_ref().expect("parse");
        assert_eq!(
            record.text(field::VENUE),
            "Association for Computational Linguistics Journal"
        );
        assert_eq!(record.text(field::ISSUE), "4");
        assert_eq!(record.text(field::VOLUME), "7");
    }

    #[test]
    fn test_journal_preferred_over_booktitle() {
        let content = "@article{a, booktitle = {Workshop}, journal = {Journal}, title = {T}}";
        let records = parse(content);
        let record = records[0].as_ref().expect("parse");
        assert_eq!(record.text(field::VENUE), "Journal");
    }

    #[test]
    fn test_unterminated_entry_is_format_error() {
        let content = "@article{ok, title = {First}}\n@article{broken, title = {Second}\n";
        let results = parse(content);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(ScreenError::Format { .. })));
    }

    #[test]
    fn test_at_sign_in_comment_text_is_ignored() {
        let content = "% Maintainer: someone@uni.edu\n@article{a, title = {Emotion First}}\nContact: me @ home\n@article{b, title = {Empathy Second}}\n";
        let records: Vec<RawRecord> = parse(content).into_iter().map(|r| r.expect("parse")).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text(field::TITLE), "Emotion First");
        assert_eq!(records[1].text(field::TITLE), "Empathy Second");
    }

    #[test]
    fn test_escaped_quote_inside_quoted_value() {
        let content = "@article{a, title = \"Emotion in M\\\"uller's Corpus\", year = 2020}\n@article{b, title = {Next}}\n";
        let records: Vec<RawRecord> = parse(content).into_iter().map(|r| r.expect("parse")).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text(field::TITLE), "Emotion in M\\\"uller's Corpus");
        assert_eq!(records[0].text(field::YEAR), "2020");
        assert_eq!(records[1].text(field::TITLE), "Next");
    }

    #[test]
    fn test_entry_without_title_still_yields_record() {
        let results = parse("@misc{x, year = 2020}");
        let record = results[0].as_ref().expect("parse");
        assert!(!record.has(field::TITLE));
        assert_eq!(record.text(field::YEAR), "2020");
    }
}
