//! PDF text extraction and model/metric mining.

use crate::error::{Result, ScreenError};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// Model family names looked up as whole words
pub const MODEL_KEYWORDS: &[&str] = &[
    "lstm",
    "cnn",
    "transformer",
    "bert",
    "gru",
    "rnn",
    "xlnet",
    "roberta",
    "gpt",
    "svm",
    "random forest",
    "xgboost",
    "lightgbm",
    "catboost",
    "knn",
    "naive bayes",
    "decision tree",
    "linear regression",
    "logistic regression",
    "ensemble",
];

/// Metric names, each expected to be followed by a number
pub const METRIC_KEYWORDS: &[&str] = &[
    "accuracy", "f1 score", "precision", "recall", "auc", "bleu", "rouge", "mse", "rmse",
];

/// Column key for a metric (`f1 score` -> `f1_score`)
pub fn metric_key(metric: &str) -> String {
    metric.replace(' ', "_")
}

/// Models and metric values found in a text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub models: BTreeSet<String>,
    pub metrics: BTreeMap<String, f64>,
}

/// Compiled keyword matchers
pub struct Extractor {
    models: Vec<(&'static str, Regex)>,
    metrics: Vec<(&'static str, Regex)>,
}

fn phrase_pattern(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"[\s-]+")
}

impl Extractor {
    pub fn new() -> Result<Self> {
        let compile = |source: String| {
            Regex::new(&source)
                .map_err(|e| ScreenError::Config(format!("Invalid keyword pattern {source}: {e}")))
        };

        let models = MODEL_KEYWORDS
            .iter()
            .map(|m| -> Result<(&'static str, Regex)> {
                Ok((*m, compile(format!(r"(?i)\b{}s?\b", phrase_pattern(m)))?))
            })
            .collect::<Result<Vec<_>>>()?;

        let metrics = METRIC_KEYWORDS
            .iter()
            .map(|m| -> Result<(&'static str, Regex)> {
                let source = format!(
                    r"(?i)\b{}\b\s*(?:of|=|:)?\s*(\d+(?:\.\d+)?)",
                    phrase_pattern(m)
                );
                Ok((*m, compile(source)?))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { models, metrics })
    }

    /// Find model names and the last reported value of each metric.
    pub fn extract(&self, text: &str) -> Extraction {
        let mut extraction = Extraction::default();

        for (name, re) in &self.models {
            if re.is_match(text) {
                extraction.models.insert(name.to_string());
            }
        }

        for (name, re) in &self.metrics {
            let value = re
                .captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .filter_map(|m| m.as_str().parse::<f64>().ok())
                .last();
            if let Some(value) = value {
                extraction.metrics.insert(metric_key(name), value);
            }
        }

        extraction
    }
}

/// Extract text from the first `max_pages` pages of an in-memory PDF.
pub fn extract_pdf_text(bytes: &[u8], max_pages: usize) -> Result<String> {
    if max_pages == 0 {
        return Ok(String::new());
    }

    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| ScreenError::Pdf(format!("failed to open PDF: {e}")))?;
    let pages = document.get_pages();
    if pages.is_empty() {
        return Ok(String::new());
    }
    let page_numbers = pages.keys().copied().take(max_pages).collect::<Vec<u32>>();

    document
        .extract_text(&page_numbers)
        .map_err(|e| ScreenError::Pdf(format!("failed to extract text: {e}")))
}
