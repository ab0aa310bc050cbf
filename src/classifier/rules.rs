//! Named predicate rules and the two signal rule sets.
//!
//! Every rule is an independently testable predicate over normalized text.
//! Patterns are compiled case-insensitive.

use crate::config::RuleSetName;
use crate::error::{Result, ScreenError};
use regex::Regex;
use serde::Serialize;

/// Secondary signals a rule set may track
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Dataset,
    MachineLearning,
    AiNlp,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Dataset => "dataset",
            Signal::MachineLearning => "machine_learning",
            Signal::AiNlp => "ai_nlp",
        }
    }

    /// Human-readable label used in the statistics report
    pub fn label(&self) -> &'static str {
        match self {
            Signal::Dataset => "Dataset related papers",
            Signal::MachineLearning => "Machine Learning/Deep Learning papers",
            Signal::AiNlp => "AI/NLP papers",
        }
    }
}

/// Boolean predicate over normalized text
#[derive(Debug, Clone)]
pub enum Predicate {
    Pattern(Regex),
    AllOf(Vec<Predicate>),
    AnyOf(Vec<Predicate>),
}

impl Predicate {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Predicate::Pattern(re) => re.is_match(text),
            Predicate::AllOf(parts) => parts.iter().all(|p| p.matches(text)),
            Predicate::AnyOf(parts) => parts.iter().any(|p| p.matches(text)),
        }
    }
}

/// A predicate with a name, for logs and tests
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: &'static str,
    pub predicate: Predicate,
}

impl Rule {
    fn new(name: &'static str, predicate: Predicate) -> Self {
        Self { name, predicate }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.predicate.matches(text)
    }
}

/// Rule deciding one secondary signal
#[derive(Debug, Clone)]
pub struct SignalRule {
    pub signal: Signal,
    pub rule: Rule,
}

/// Topic rules (title only) plus ordered signal rules (title + abstract)
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub name: RuleSetName,
    pub emotion: Rule,
    pub empathy: Rule,
    pub signals: Vec<SignalRule>,
}

const EMOTION: &str = r"\bemotion(?:s|al)?\b";
const EMPATHY: &str = r"\bempath(?:y|ic|i[zs]e)\b";

// Co-occurrence vocabulary
const TASK: &str = r"\b(?:classif(?:y|ication)|recogn(?:ize|ition)|predict(?:ion)?|regress(?:ion)?|generat(?:e|ion))\b";
const RESULT: &str = r"\b(?:results?|perform(?:ance|ed|ing)|f1|accurac(?:y|ies)|pearson)\b";
const DATA: &str = r"\bdata(?:set|base)?s?\b";
const ANNOTATION: &str = r"\bannotat(?:ion|ed|ing)\b";
const LABELING: &str = r"\blabell?(?:ing|ed|s)?\b";

// Bare vocabulary
const DATASET_VOCAB: &str = r"\b(?:datasets?|corpus|corpora|collection|benchmark|annotated?|labell?ed)\b";
const ML_VOCAB: &str = concat!(
    r"\b(?:machine\s+learning|deep\s+learning|neural|classifiers?|classification|",
    r"supervised|unsupervised|transformers?|bert|gpt|llms?|embeddings?|fine-tun\w*|",
    r"train(?:ing|ed)|model(?:s|ing|ed)?)\b"
);
const AI_VOCAB: &str = concat!(
    r"\b(?:artificial\s+intelligence|natural\s+language\s+processing|nlp|",
    r"computational\s+linguistics|language\s+model(?:s|ing)?)\b"
);

fn pattern(source: &str) -> Result<Predicate> {
    Regex::new(&format!("(?i){source}"))
        .map(Predicate::Pattern)
        .map_err(|e| ScreenError::Config(format!("Invalid rule pattern {source}: {e}")))
}

impl RuleSet {
    /// Compile the named rule set.
    pub fn build(name: RuleSetName) -> Result<Self> {
        let emotion = Rule::new("emotion", pattern(EMOTION)?);
        let empathy = Rule::new("empathy", pattern(EMPATHY)?);

        let signals = match name {
            RuleSetName::Screening => vec![
                SignalRule {
                    signal: Signal::Dataset,
                    rule: Rule::new(
                        "dataset_with_annotation",
                        Predicate::AllOf(vec![
                            pattern(DATA)?,
                            Predicate::AnyOf(vec![pattern(ANNOTATION)?, pattern(LABELING)?]),
                        ]),
                    ),
                },
                SignalRule {
                    signal: Signal::MachineLearning,
                    rule: Rule::new(
                        "task_with_result",
                        Predicate::AllOf(vec![pattern(TASK)?, pattern(RESULT)?]),
                    ),
                },
            ],
            RuleSetName::Anthology => vec![
                SignalRule {
                    signal: Signal::Dataset,
                    rule: Rule::new("dataset_vocabulary", pattern(DATASET_VOCAB)?),
                },
                SignalRule {
                    signal: Signal::MachineLearning,
                    rule: Rule::new("ml_vocabulary", pattern(ML_VOCAB)?),
                },
                SignalRule {
                    signal: Signal::AiNlp,
                    rule: Rule::new("ai_nlp_vocabulary", pattern(AI_VOCAB)?),
                },
            ],
        };

        Ok(Self {
            name,
            emotion,
            empathy,
            signals,
        })
    }

    /// Signals this rule set evaluates, in rule order
    pub fn tracked(&self) -> Vec<Signal> {
        self.signals.iter().map(|r| r.signal).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal_rule(set: &RuleSet, signal: Signal) -> &Rule {
        &set
            .signals
            .iter()
            .find(|r| r.signal == signal)
            .expect("signal tracked")
            .rule
    }

    #[test]
    fn test_rule_sets_carry_names() {
        let screening = RuleSet::build(RuleSetName::Screening).expect("build");
        assert_eq!(screening.name, RuleSetName::Screening);
        assert_eq!(signal_rule(&screening, Signal::Dataset).name, "dataset_with_annotation");
        assert_eq!(signal_rule(&screening, Signal::MachineLearning).name, "task_with_result");

        let anthology = RuleSet::build(RuleSetName::Anthology).expect("build");
        assert_eq!(anthology.name, RuleSetName::Anthology);
        assert_eq!(signal_rule(&anthology, Signal::AiNlp).name, "ai_nlp_vocabulary");
    }

    #[test]
    fn test_topic_patterns_are_whole_word() {
        let set = RuleSet::build(RuleSetName::Screening).expect("build");
        assert!(set.emotion.matches("emotional support"));
        assert!(set.emotion.matches("EMOTIONS in text"));
        assert!(!set.emotion.matches("emotionless"));
        assert!(!set.emotion.matches("emotive language"));
        assert!(set.empathy.matches("empathic agents"));
        assert!(set.empathy.matches("to empathise"));
        assert!(!set.empathy.matches("empathetic replies"));
    }

    #[test]
    fn test_screening_dataset_needs_annotation() {
        let set = RuleSet::build(RuleSetName::Screening).expect("build");
        let rule = signal_rule(&set, Signal::Dataset);
        assert!(!rule.matches("a new dataset of tweets"));
        assert!(rule.matches("a new dataset of tweets annotated for anger"));
        assert!(rule.matches("we release labelled data"));
    }

    #[test]
    fn test_screening_ml_needs_task_and_result() {
        let set = RuleSet::build(RuleSetName::Screening).expect("build");
        let rule = signal_rule(&set, Signal::MachineLearning);
        assert!(!rule.matches("emotion recognition in speech"));
        assert!(rule.matches("emotion recognition with 80% accuracy"));
        assert!(!set.tracked().contains(&Signal::AiNlp));
    }

    #[test]
    fn test_anthology_vocabulary() {
        let set = RuleSet::build(RuleSetName::Anthology).expect("build");
        assert!(signal_rule(&set, Signal::Dataset).matches("a benchmark for empathy"));
        assert!(signal_rule(&set, Signal::MachineLearning).matches("we fine-tune bert"));
        assert!(signal_rule(&set, Signal::AiNlp).matches("natural  language processing"));
        assert_eq!(
            set.tracked(),
            vec![Signal::Dataset, Signal::MachineLearning, Signal::AiNlp]
        );
    }

    #[test]
    fn test_predicate_combinators() {
        let a = pattern("alpha").expect("pattern");
        let b = pattern("beta").expect("pattern");
        let all = Predicate::AllOf(vec![a.clone(), b.clone()]);
        let any = Predicate::AnyOf(vec![a, b]);
        assert!(!all.matches("alpha only"));
        assert!(all.matches("alpha and beta"));
        assert!(any.matches("beta only"));
        assert!(!any.matches("gamma"));
    }
}
