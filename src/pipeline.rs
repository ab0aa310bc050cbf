//! Screening pipeline: load -> dedup -> classify -> aggregate.
//!
//! A [`ScreeningRun`] owns the ledger and tallies for exactly one run. Source
//! files are processed one at a time in file-name order, records in file
//! order, so first-seen-wins is deterministic.

use crate::classifier::{Classification, Classifier, Signal};
use crate::config::{DuplicatePolicy, ScreenConfig};
use crate::error::{Result, ScreenError};
use crate::ledger::{Admission, DedupLedger, LedgerStats, RejectReason, TitleKey};
use crate::loader::{self, RecordStream, SourceFormat};
use crate::record::{field, PaperRecord, RawRecord};
use crate::tally::Tally;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Corpus-wide counters kept outside the ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub records_read: u64,
    pub skipped_no_title: u64,
    pub skipped_no_abstract: u64,
    pub out_of_scope: u64,
    pub files_loaded: u64,
    pub files_failed: u64,
}

/// What happened to one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub name: String,
    pub format: SourceFormat,
    pub records_read: u64,
    pub accepted: u64,
    pub duplicates: u64,
    pub missing_title: u64,
    pub out_of_scope: u64,
    /// Set when the file stopped early on a format error
    pub error: Option<String>,
}

impl SourceSummary {
    fn new(name: &str, format: SourceFormat) -> Self {
        Self {
            name: name.to_string(),
            format,
            records_read: 0,
            accepted: 0,
            duplicates: 0,
            missing_title: 0,
            out_of_scope: 0,
            error: None,
        }
    }
}

/// Per-record result of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Kept,
    Duplicate,
    OutOfScope,
    MissingTitle,
    MissingAbstract,
}

/// Frozen result of a finished run
#[derive(Debug, Clone)]
pub struct ScreeningReport {
    pub config: ScreenConfig,
    pub papers: Vec<PaperRecord>,
    pub tally: Tally,
    pub ledger: LedgerStats,
    pub counters: RunCounters,
    pub sources: Vec<SourceSummary>,
}

impl ScreeningReport {
    pub fn tracked_signals(&self) -> &[Signal] {
        self.tally.tracked()
    }
}

/// State of one screening run
pub struct ScreeningRun {
    config: ScreenConfig,
    classifier: Classifier,
    ledger: DedupLedger,
    tally: Tally,
    papers: Vec<PaperRecord>,
    counters: RunCounters,
    sources: Vec<SourceSummary>,
}

impl ScreeningRun {
    pub fn new(config: ScreenConfig) -> Result<Self> {
        let classifier = Classifier::new(config.rule_set)?;
        let tally = Tally::new(&classifier.tracked_signals());
        Ok(Self {
            config,
            classifier,
            ledger: DedupLedger::new(),
            tally,
            papers: Vec::new(),
            counters: RunCounters::default(),
            sources: Vec::new(),
        })
    }

    /// Ingest one file. Returns `Err` only for fatal errors; format and I/O
    /// problems end the file and are recorded in its summary.
    pub fn ingest_file(&mut self, path: &Path, format: SourceFormat) -> Result<&SourceSummary> {
        let name = loader::source_name(path);
        match loader::open_records(path, format) {
            Ok(stream) => self.ingest(&name, format, stream),
            Err(e) => {
                let mut summary = SourceSummary::new(&name, format);
                self.fail_source(&mut summary, e)?;
                Ok(self.push_summary(summary))
            }
        }
    }

    /// Ingest an already opened record stream under `source` name.
    pub fn ingest(
        &mut self,
        source: &str,
        format: SourceFormat,
        stream: RecordStream,
    ) -> Result<&SourceSummary> {
        info!(source = source, format = format.as_str(), "Processing source");
        self.tally.register_source(source);
        let mut summary = SourceSummary::new(source, format);

        for item in stream {
            match item {
                Ok(record) => {
                    summary.records_read += 1;
                    self.counters.records_read += 1;
                    match self.process_record(source, record)? {
                        RecordOutcome::Kept => summary.accepted += 1,
                        RecordOutcome::Duplicate => summary.duplicates += 1,
                        RecordOutcome::OutOfScope => {
                            summary.accepted += 1;
                            summary.out_of_scope += 1;
                        }
                        RecordOutcome::MissingTitle => summary.missing_title += 1,
                        RecordOutcome::MissingAbstract => {}
                    }
                }
                Err(e) => {
                    self.fail_source(&mut summary, e)?;
                    return Ok(self.push_summary(summary));
                }
            }
        }

        self.counters.files_loaded += 1;
        info!(
            source = source,
            records = summary.records_read,
            accepted = summary.accepted,
            duplicates = summary.duplicates,
            out_of_scope = summary.out_of_scope,
            "Source complete"
        );
        Ok(self.push_summary(summary))
    }

    fn fail_source(&mut self, summary: &mut SourceSummary, error: ScreenError) -> Result<()> {
        if error.is_fatal() {
            return Err(error);
        }
        warn!(
            source = %summary.name,
            records_before_error = summary.records_read,
            error = %error,
            "Skipping rest of source"
        );
        self.counters.files_failed += 1;
        summary.error = Some(error.to_string());
        Ok(())
    }

    fn push_summary(&mut self, summary: SourceSummary) -> &SourceSummary {
        self.sources.push(summary);
        let last = self.sources.len() - 1;
        &self.sources[last]
    }

    /// Run one record through ledger, classifier and aggregator.
    pub fn process_record(&mut self, source: &str, record: RawRecord) -> Result<RecordOutcome> {
        let key = match TitleKey::for_record(&record) {
            Ok(key) => key,
            Err(RejectReason::MissingTitle) => {
                debug!(source = source, "Entry without a title, skipping");
                self.counters.skipped_no_title += 1;
                return Ok(RecordOutcome::MissingTitle);
            }
        };
        if self.config.require_abstract && !record.has(field::ABSTRACT) {
            debug!(source = source, title = key.as_str(), "Entry without an abstract, skipping");
            self.counters.skipped_no_abstract += 1;
            return Ok(RecordOutcome::MissingAbstract);
        }

        let early: Option<Classification> = match self.config.duplicate_policy {
            DuplicatePolicy::ClassifyFirst => Some(self.classifier.classify_record(&record)),
            DuplicatePolicy::CheckFirst => None,
        };

        if self.ledger.admit_key(key) == Admission::Duplicate {
            debug!(source = source, title = record.text(field::TITLE), "Duplicate found");
            if let Some(classification) = early {
                self.tally.record_duplicate(source, &classification);
            }
            return Ok(RecordOutcome::Duplicate);
        }

        let classification = early.unwrap_or_else(|| self.classifier.classify_record(&record));
        if !classification.is_in_scope() {
            debug!(source = source, title = record.text(field::TITLE), "Entry does not match any category");
            self.counters.out_of_scope += 1;
            return Ok(RecordOutcome::OutOfScope);
        }
        let paper = PaperRecord {
            source: source.to_string(),
            record,
            classification,
        };
        self.tally.record(&paper)?;
        self.papers.push(paper);
        Ok(RecordOutcome::Kept)
    }

    pub fn ledger_stats(&self) -> LedgerStats {
        self.ledger.stats()
    }

    pub fn papers(&self) -> &[PaperRecord] {
        &self.papers
    }

    pub fn finish(self) -> ScreeningReport {
        ScreeningReport {
            config: self.config,
            papers: self.papers,
            tally: self.tally,
            ledger: self.ledger.stats(),
            counters: self.counters,
            sources: self.sources,
        }
    }
}

/// Supported source files in `dir`, sorted by file name.
pub fn discover_sources(dir: &Path) -> Result<Vec<(PathBuf, SourceFormat)>> {
    if !dir.is_dir() {
        return Err(ScreenError::Config(format!(
            "Input directory not found: {}",
            dir.display()
        )));
    }

    let mut sources = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match SourceFormat::from_path(&path) {
            Some(format) => sources.push((path, format)),
            None => debug!(path = %path.display(), "Ignoring unsupported file"),
        }
    }
    sources.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
    Ok(sources)
}

/// Screen every supported file in `dir` and return the frozen report.
pub fn screen_directory(dir: &Path, config: ScreenConfig) -> Result<ScreeningReport> {
    let sources = discover_sources(dir)?;
    info!(
        dir = %dir.display(),
        files = sources.len(),
        rules = config.rule_set.as_str(),
        duplicates = config.duplicate_policy.as_str(),
        "Starting screening run"
    );

    let mut run = ScreeningRun::new(config)?;
    for (path, format) in &sources {
        run.ingest_file(path, *format)?;
    }

    let report = run.finish();
    info!(
        unique = report.ledger.total_seen,
        duplicates = report.ledger.duplicates_seen,
        screened = report.papers.len(),
        "Screening run complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Category;
    use crate::config::RuleSetName;
    use std::io::Cursor;

    fn ris_stream(content: &str, source: &str) -> RecordStream {
        loader::load_records(Cursor::new(content.to_string()), SourceFormat::Ris, source)
    }

    fn record(title: &str, abstract_text: &str) -> RawRecord {
        let mut record = RawRecord::new();
        record.set_text(field::TITLE, title);
        record.set_text(field::ABSTRACT, abstract_text);
        record
    }

    #[test]
    fn test_duplicate_across_sources() {
        let mut run = ScreeningRun::new(ScreenConfig::default()).expect("run");
        let first = run
            .process_record("acm", record("Empathic Response Generation", ""))
            .expect("process");
        let second = run
            .process_record("ieee", record(" empathic response generation ", ""))
            .expect("process");
        assert_eq!(first, RecordOutcome::Kept);
        assert_eq!(second, RecordOutcome::Duplicate);

        let report = run.finish();
        assert_eq!(report.ledger.duplicates_seen, 1);
        assert_eq!(report.tally.papers(Category::Empathy), 1);
        assert_eq!(report.papers.len(), 1);
        assert_eq!(report.papers[0].source, "acm");
        assert_eq!(report.tally.global()[&Category::Empathy].duplicates, 0);
    }

    #[test]
    fn test_classify_first_counts_duplicates_per_category() {
        let config = ScreenConfig {
            duplicate_policy: DuplicatePolicy::ClassifyFirst,
            ..Default::default()
        };
        let mut run = ScreeningRun::new(config).expect("run");
        run.process_record("a", record("Emotion Cause Extraction", "")).expect("process");
        run.process_record("b", record("EMOTION CAUSE EXTRACTION", "")).expect("process");
        run.process_record("b", record("Graph Kernels", "")).expect("process");
        run.process_record("c", record("graph kernels", "")).expect("process");

        let report = run.finish();
        assert_eq!(report.ledger.duplicates_seen, 2);
        let emotion = &report.tally.global()[&Category::Emotion];
        assert_eq!(emotion.papers, 1);
        assert_eq!(emotion.duplicates, 1);
        assert_eq!(report.tally.per_source()["b"][&Category::Emotion].duplicates, 1);
        assert_eq!(report.counters.out_of_scope, 1);
    }

    #[test]
    fn test_missing_title_changes_nothing() {
        let mut run = ScreeningRun::new(ScreenConfig::default()).expect("run");
        run.process_record("a", record("Emotion", "")).expect("process");
        let tally_before = run.tally.clone();
        let ledger_before = run.ledger_stats();

        let outcome = run.process_record("a", record("   ", "an abstract")).expect("process");
        assert_eq!(outcome, RecordOutcome::MissingTitle);
        assert_eq!(run.ledger_stats(), ledger_before);
        assert_eq!(run.tally, tally_before);
        assert_eq!(run.counters.skipped_no_title, 1);
    }

    #[test]
    fn test_title_checked_before_abstract() {
        let config = ScreenConfig {
            require_abstract: true,
            ..Default::default()
        };
        let mut run = ScreeningRun::new(config).expect("run");
        let outcome = run.process_record("a", record("", "")).expect("process");
        assert_eq!(outcome, RecordOutcome::MissingTitle);
        assert_eq!(run.counters.skipped_no_title, 1);
        assert_eq!(run.counters.skipped_no_abstract, 0);

        let outcome = run.process_record("a", record("Emotion", "")).expect("process");
        assert_eq!(outcome, RecordOutcome::MissingAbstract);
        assert_eq!(run.counters.skipped_no_title, 1);
        assert_eq!(run.counters.skipped_no_abstract, 1);
        assert_eq!(run.ledger_stats().considered(), 0);
    }

    #[test]
    fn test_out_of_scope_excluded() {
        let mut run = ScreeningRun::new(ScreenConfig::default()).expect("run");
        let outcome = run
            .process_record("a", record("Deep Learning for Sentiment", ""))
            .expect("process");
        assert_eq!(outcome, RecordOutcome::OutOfScope);
        let report = run.finish();
        assert!(report.papers.is_empty());
        assert_eq!(report.tally.total_papers(), 0);
        assert_eq!(report.ledger.total_seen, 1);
    }

    #[test]
    fn test_require_abstract() {
        let config = ScreenConfig {
            rule_set: RuleSetName::Anthology,
            require_abstract: true,
            ..Default::default()
        };
        let mut run = ScreeningRun::new(config).expect("run");
        let outcome = run.process_record("acl", record("Emotion", "")).expect("process");
        assert_eq!(outcome, RecordOutcome::MissingAbstract);
        assert_eq!(run.ledger_stats().total_seen, 0);
        let outcome = run
            .process_record("acl", record("Emotion", "We train a model."))
            .expect("process");
        assert_eq!(outcome, RecordOutcome::Kept);
        assert_eq!(run.papers()[0].classification.signal(Signal::MachineLearning), Some(true));
    }

    #[test]
    fn test_format_error_keeps_earlier_records() {
        let mut run = ScreeningRun::new(ScreenConfig::default()).expect("run");
        let content = "TY  - JOUR\nTI  - Emotion Kept\nER  - \nnot a tag line\n";
        let summary = run
            .ingest("broken", SourceFormat::Ris, ris_stream(content, "broken"))
            .expect("not fatal")
            .clone();
        assert_eq!(summary.records_read, 1);
        assert!(summary.error.is_some());

        let good = "TY  - JOUR\nTI  - Empathy Other\nER  - \n";
        run.ingest("good", SourceFormat::Ris, ris_stream(good, "good"))
            .expect("ingest");

        let report = run.finish();
        assert_eq!(report.papers.len(), 2);
        assert_eq!(report.counters.files_failed, 1);
        assert_eq!(report.counters.files_loaded, 1);
    }
}
