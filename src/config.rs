//! Screening run configuration.
//!
//! The classification and duplicate-handling policies that differed between
//! pipeline variants are explicit, named choices here.

use clap::ValueEnum;
use serde::Serialize;

/// Which signal rule set the classifier uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleSetName {
    /// Dataset needs annotation/labeling vocabulary; ML needs task + result vocabulary
    #[default]
    Screening,
    /// Bare dataset / model vocabulary, plus an AI/NLP signal
    Anthology,
}

impl RuleSetName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleSetName::Screening => "screening",
            RuleSetName::Anthology => "anthology",
        }
    }
}

/// Whether duplicates are classified before the ledger decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Ledger first; only accepted records are classified
    #[default]
    CheckFirst,
    /// Classify every titled record; duplicates count per category
    ClassifyFirst,
}

impl DuplicatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicatePolicy::CheckFirst => "check-first",
            DuplicatePolicy::ClassifyFirst => "classify-first",
        }
    }
}

/// Configuration for a single screening run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScreenConfig {
    pub rule_set: RuleSetName,
    pub duplicate_policy: DuplicatePolicy,
    /// Skip titled records that carry no abstract
    pub require_abstract: bool,
}
