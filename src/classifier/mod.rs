//! Topic and signal classification.
//!
//! The primary category comes from the title alone through a fixed 2x2
//! table, so it is exclusive by construction. Secondary signals are
//! evaluated independently over title + abstract.

pub mod rules;

use crate::config::RuleSetName;
use crate::error::Result;
use crate::record::{field, RawRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

pub use rules::{Predicate, Rule, RuleSet, Signal, SignalRule};

/// Topical bucket of an in-scope paper
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Emotion,
    Empathy,
    EmotionAndEmpathy,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Emotion,
        Category::Empathy,
        Category::EmotionAndEmpathy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Emotion => "emotion",
            Category::Empathy => "empathy",
            Category::EmotionAndEmpathy => "emotion_and_empathy",
        }
    }
}

/// Indexed by `[emotion matched][empathy matched]`.
const PRIMARY_TABLE: [[Option<Category>; 2]; 2] = [
    [None, Some(Category::Empathy)],
    [Some(Category::Emotion), Some(Category::EmotionAndEmpathy)],
];

pub fn primary_category(emotion: bool, empathy: bool) -> Option<Category> {
    PRIMARY_TABLE[usize::from(emotion)][usize::from(empathy)]
}

/// Result of classifying one record
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    /// `None` means out of scope
    pub category: Option<Category>,
    /// Only tracked signals are present
    pub signals: BTreeMap<Signal, bool>,
}

impl Classification {
    pub fn is_in_scope(&self) -> bool {
        self.category.is_some()
    }

    /// `None` when the rule set does not track `signal`.
    pub fn signal(&self, signal: Signal) -> Option<bool> {
        self.signals.get(&signal).copied()
    }

    pub fn active_signals(&self) -> impl Iterator<Item = Signal> + '_ {
        self.signals
            .iter()
            .filter(|(_, on)| **on)
            .map(|(signal, _)| *signal)
    }
}

/// Lowercase and collapse runs of whitespace.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Stateless classifier over a compiled rule set
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: RuleSet,
}

impl Classifier {
    pub fn new(name: RuleSetName) -> Result<Self> {
        Ok(Self {
            rules: RuleSet::build(name)?,
        })
    }

    pub fn tracked_signals(&self) -> Vec<Signal> {
        self.rules.tracked()
    }

    /// Primary category from the title alone.
    pub fn primary(&self, title: &str) -> Option<Category> {
        let title = normalize_text(title);
        primary_category(self.rules.emotion.matches(&title), self.rules.empathy.matches(&title))
    }

    pub fn classify(&self, title: &str, abstract_text: &str) -> Classification {
        let category = self.primary(title);
        let combined = normalize_text(&format!("{title} {abstract_text}"));
        let mut signals = BTreeMap::new();
        let mut fired = Vec::new();
        for rule in &self.rules.signals {
            let hit = rule.rule.matches(&combined);
            if hit {
                fired.push(rule.rule.name);
            }
            signals.insert(rule.signal, hit);
        }
        if !fired.is_empty() {
            debug!(
                rules = self.rules.name.as_str(),
                fired = ?fired,
                title = title,
                "Signal rules matched"
            );
        }
        Classification { category, signals }
    }

    pub fn classify_record(&self, record: &RawRecord) -> Classification {
        self.classify(record.text(field::TITLE), record.text(field::ABSTRACT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screening() -> Classifier {
        Classifier::new(RuleSetName::Screening).expect("rules compile")
    }

    #[test]
    fn test_decision_table() {
        assert_eq!(primary_category(true, true), Some(Category::EmotionAndEmpathy));
        assert_eq!(primary_category(false, true), Some(Category::Empathy));
        assert_eq!(primary_category(true, false), Some(Category::Emotion));
        assert_eq!(primary_category(false, false), None);
    }

    #[test]
    fn test_emotion_and_empathy_without_signals() {
        let c = screening().classify("Modeling Emotion and Empathy in Dialogue", "");
        assert_eq!(c.category, Some(Category::EmotionAndEmpathy));
        assert_eq!(c.active_signals().count(), 0);
        assert_eq!(c.signal(Signal::Dataset), Some(false));
        assert_eq!(c.signal(Signal::AiNlp), None);
    }

    #[test]
    fn test_out_of_scope_title() {
        let c = screening().classify("Deep Learning for Sentiment", "emotion empathy everywhere");
        assert_eq!(c.category, None);
        assert!(!c.is_in_scope());
    }

    #[test]
    fn test_abstract_never_changes_category() {
        let classifier = screening();
        let title = "Empathic Response Generation";
        let abstracts = [
            "",
            "We study emotion.",
            "An annotated dataset with strong results for emotion classification.",
        ];
        for abstract_text in abstracts {
            assert_eq!(
                classifier.classify(title, abstract_text).category,
                Some(Category::Empathy)
            );
        }
    }

    #[test]
    fn test_signals_use_abstract() {
        let c = screening().classify(
            "Emotion Cause Extraction",
            "We annotate a new dataset and report classification results.",
        );
        assert_eq!(c.category, Some(Category::Emotion));
        assert_eq!(c.signal(Signal::Dataset), Some(true));
        assert_eq!(c.signal(Signal::MachineLearning), Some(true));
    }

    #[test]
    fn test_anthology_tracks_ai() {
        let classifier = Classifier::new(RuleSetName::Anthology).expect("rules compile");
        let c = classifier.classify("Empathy in NLP", "A survey.");
        assert_eq!(c.signal(Signal::AiNlp), Some(true));
        assert_eq!(c.signal(Signal::MachineLearning), Some(false));
    }

    #[test]
    fn test_classify_record_reads_fields() {
        let mut record = RawRecord::new();
        record.set_text(field::TITLE, "  EMOTIONAL   Support Conversation ");
        let c = screening().classify_record(&record);
        assert_eq!(c.category, Some(Category::Emotion));
    }
}
