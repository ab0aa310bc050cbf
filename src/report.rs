//! Report assembly: per-paper CSV table and statistics text/JSON.
//!
//! Reads only the frozen [`ScreeningReport`]; never touches run state.

use crate::classifier::{Category, Signal};
use crate::config::{DuplicatePolicy, ScreenConfig};
use crate::error::Result;
use crate::ledger::LedgerStats;
use crate::pipeline::{RunCounters, ScreeningReport, SourceSummary};
use crate::record::{field, PaperRecord};
use crate::tally::{CategoryTallies, Tally};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

/// Output file names inside the output folder
pub const PAPERS_FILE: &str = "screened_papers.csv";
pub const STATISTICS_FILE: &str = "statistics.txt";
pub const STATISTICS_JSON_FILE: &str = "statistics.json";

/// One row of the per-paper table
#[derive(Debug, Serialize)]
pub struct PaperRow<'a> {
    pub source: &'a str,
    pub title: &'a str,
    pub authors: String,
    pub year: &'a str,
    pub venue: &'a str,
    pub volume: &'a str,
    pub issue: &'a str,
    pub doi: &'a str,
    #[serde(rename = "abstract")]
    pub abstract_text: &'a str,
    pub keywords: String,
    pub url: &'a str,
    #[serde(rename = "type")]
    pub entry_type: &'a str,
    pub category: &'static str,
    pub is_dataset: &'static str,
    pub is_ml: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_ai: Option<&'static str>,
}

/// Spreadsheet-friendly flag token
pub fn flag(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

impl<'a> PaperRow<'a> {
    pub fn from_paper(paper: &'a PaperRecord) -> Self {
        let record = &paper.record;
        let classification = &paper.classification;
        Self {
            source: &paper.source,
            title: record.text(field::TITLE).trim(),
            authors: record.list(field::AUTHORS).join("; "),
            year: record.text(field::YEAR),
            venue: record.text(field::VENUE),
            volume: record.text(field::VOLUME),
            issue: record.text(field::ISSUE),
            doi: record.text(field::DOI),
            abstract_text: record.text(field::ABSTRACT),
            keywords: record.list(field::KEYWORDS).join("; "),
            url: record.text(field::URL),
            entry_type: record.text(field::TYPE),
            category: classification.category.map(|c| c.as_str()).unwrap_or(""),
            is_dataset: flag(classification.signal(Signal::Dataset).unwrap_or(false)),
            is_ml: flag(classification.signal(Signal::MachineLearning).unwrap_or(false)),
            is_ai: classification.signal(Signal::AiNlp).map(flag),
        }
    }
}

/// Write the per-paper table. Writes a header even when there are no papers.
pub fn write_papers_csv(path: &Path, papers: &[PaperRecord], tracked: &[Signal]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!papers.is_empty())
        .from_path(path)?;

    if papers.is_empty() {
        let mut header = vec![
            "source", "title", "authors", "year", "venue", "volume", "issue", "doi", "abstract",
            "keywords", "url", "type", "category", "is_dataset", "is_ml",
        ];
        if tracked.contains(&Signal::AiNlp) {
            header.push("is_ai");
        }
        wtr.write_record(&header)?;
    }

    for paper in papers {
        wtr.serialize(PaperRow::from_paper(paper))?;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = papers.len(), "Saved paper table");
    Ok(())
}

fn write_category_block(out: &mut String, tallies: &CategoryTallies, tally: &Tally, show_duplicates: bool, indent: &str) {
    for category in Category::ALL {
        let Some(counts) = tallies.get(&category) else {
            continue;
        };
        let _ = writeln!(out, "{indent}{} papers: {}", category.as_str(), counts.papers);
        for signal in tally.tracked() {
            let _ = writeln!(out, "{indent}  - {}: {}", signal.label(), counts.signal(*signal));
        }
        if show_duplicates {
            let _ = writeln!(out, "{indent}  - Duplicates: {}", counts.duplicates);
        }
    }
}

fn write_overall(out: &mut String, ledger: &LedgerStats, counters: &RunCounters, config: &ScreenConfig) {
    let _ = writeln!(out, "Overall Statistics:");
    let _ = writeln!(out, "Rule set: {}", config.rule_set.as_str());
    let _ = writeln!(out, "Duplicate policy: {}", config.duplicate_policy.as_str());
    let _ = writeln!(out, "Total papers across all databases: {}", ledger.considered());
    let _ = writeln!(out, "Total unique papers: {}", ledger.total_seen);
    let _ = writeln!(out, "Total duplicates removed: {}", ledger.duplicates_seen);
    let _ = writeln!(out, "Entries without a title: {}", counters.skipped_no_title);
    if config.require_abstract {
        let _ = writeln!(out, "Entries without an abstract: {}", counters.skipped_no_abstract);
    }
    let _ = writeln!(out, "Unique papers out of scope: {}", counters.out_of_scope);
    let _ = writeln!(
        out,
        "Files loaded: {} (failed: {})",
        counters.files_loaded, counters.files_failed
    );
}

fn write_source_summary(out: &mut String, summary: &SourceSummary) {
    let _ = writeln!(
        out,
        "Records: {} (accepted: {}, duplicates: {}, without title: {}, out of scope: {})",
        summary.records_read,
        summary.accepted,
        summary.duplicates,
        summary.missing_title,
        summary.out_of_scope
    );
    if let Some(error) = &summary.error {
        let _ = writeln!(out, "Stopped early: {error}");
    }
}

/// Human-readable statistics report
pub fn render_statistics(report: &ScreeningReport) -> String {
    let show_duplicates = report.config.duplicate_policy == DuplicatePolicy::ClassifyFirst;
    let mut out = String::new();

    write_overall(&mut out, &report.ledger, &report.counters, &report.config);
    let _ = writeln!(out);
    write_category_block(&mut out, report.tally.global(), &report.tally, show_duplicates, "");

    let _ = writeln!(out, "\nStatistics by database:");
    for summary in &report.sources {
        let _ = writeln!(out, "\nDatabase: {} ({})", summary.name, summary.format.as_str());
        write_source_summary(&mut out, summary);
        if let Some(tallies) = report.tally.per_source().get(&summary.name) {
            write_category_block(&mut out, tallies, &report.tally, show_duplicates, "  ");
        }
    }
    out
}

/// Machine-readable snapshot of the final state
#[derive(Debug, Serialize)]
pub struct StatisticsSnapshot<'a> {
    pub config: &'a ScreenConfig,
    pub ledger: LedgerStats,
    pub considered: u64,
    pub counters: RunCounters,
    pub sources: &'a [SourceSummary],
    pub tally: &'a Tally,
}

impl<'a> StatisticsSnapshot<'a> {
    pub fn new(report: &'a ScreeningReport) -> Self {
        Self {
            config: &report.config,
            ledger: report.ledger,
            considered: report.ledger.considered(),
            counters: report.counters,
            sources: &report.sources,
            tally: &report.tally,
        }
    }
}

/// Write table, statistics text and JSON snapshot into `dir`.
pub fn write_report(dir: &Path, report: &ScreeningReport) -> Result<String> {
    std::fs::create_dir_all(dir)?;

    write_papers_csv(&dir.join(PAPERS_FILE), &report.papers, report.tracked_signals())?;

    let text = render_statistics(report);
    std::fs::write(dir.join(STATISTICS_FILE), &text)?;

    let json = serde_json::to_string_pretty(&StatisticsSnapshot::new(report))?;
    std::fs::write(dir.join(STATISTICS_JSON_FILE), json)?;

    info!(dir = %dir.display(), "Saved statistics");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classification;
    use crate::record::RawRecord;

    fn sample_paper(ai: Option<bool>) -> PaperRecord {
        let mut record = RawRecord::new();
        record.set_text(field::TITLE, "Empathic Response Generation");
        record.push_list(field::AUTHORS, "Kim, J.");
        record.push_list(field::AUTHORS, "Lee, S.");
        record.push_list(field::KEYWORDS, "empathy");
        let mut signals: std::collections::BTreeMap<Signal, bool> =
            [(Signal::Dataset, true), (Signal::MachineLearning, false)]
                .into_iter()
                .collect();
        if let Some(ai) = ai {
            signals.insert(Signal::AiNlp, ai);
        }
        PaperRecord {
            source: "acm".to_string(),
            record,
            classification: Classification {
                category: Some(Category::Empathy),
                signals,
            },
        }
    }

    #[test]
    fn test_row_flags_and_lists() {
        let paper = sample_paper(None);
        let row = PaperRow::from_paper(&paper);
        assert_eq!(row.authors, "Kim, J.; Lee, S.");
        assert_eq!(row.category, "empathy");
        assert_eq!(row.is_dataset, "Yes");
        assert_eq!(row.is_ml, "No");
        assert_eq!(row.is_ai, None);
        assert_eq!(row.doi, "");
    }

    #[test]
    fn test_csv_columns_follow_tracked_signals() {
        let dir = tempfile::tempdir().expect("tempdir");

        let path = dir.path().join("without_ai.csv");
        write_papers_csv(&path, &[sample_paper(None)], &[Signal::Dataset, Signal::MachineLearning])
            .expect("write");
        let content = std::fs::read_to_string(&path).expect("read");
        let header = content.lines().next().expect("header");
        assert!(header.ends_with("category,is_dataset,is_ml"));
        assert!(content.contains("Yes,No"));

        let path = dir.path().join("with_ai.csv");
        write_papers_csv(&path, &[sample_paper(Some(true))], &[Signal::AiNlp]).expect("write");
        let content = std::fs::read_to_string(&path).expect("read");
        assert!(content.lines().next().expect("header").ends_with("is_ml,is_ai"));
        assert!(content.contains("Yes,No,Yes"));

        let path = dir.path().join("empty.csv");
        write_papers_csv(&path, &[], &[]).expect("write");
        let content = std::fs::read_to_string(&path).expect("read");
        assert!(content.starts_with("source,title,authors"));
    }
}
