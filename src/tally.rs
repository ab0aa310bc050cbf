//! Additive global and per-source counters.
//!
//! The fold is commutative: final totals do not depend on record order.

use crate::classifier::{Category, Classification, Signal};
use crate::error::{Result, ScreenError};
use crate::record::PaperRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Counters for one category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTally {
    pub papers: u64,
    pub signals: BTreeMap<Signal, u64>,
    /// Duplicates resolved to this category (classify-first policy only)
    pub duplicates: u64,
}

impl CategoryTally {
    fn new(tracked: &[Signal]) -> Self {
        Self {
            papers: 0,
            signals: tracked.iter().map(|s| (*s, 0)).collect(),
            duplicates: 0,
        }
    }

    pub fn signal(&self, signal: Signal) -> u64 {
        self.signals.get(&signal).copied().unwrap_or(0)
    }

    fn add_paper(&mut self, classification: &Classification) {
        self.papers += 1;
        for signal in classification.active_signals() {
            *self.signals.entry(signal).or_insert(0) += 1;
        }
    }
}

/// One tally per category, always holding all three
pub type CategoryTallies = BTreeMap<Category, CategoryTally>;

fn empty_tallies(tracked: &[Signal]) -> CategoryTallies {
    Category::ALL
        .iter()
        .map(|c| (*c, CategoryTally::new(tracked)))
        .collect()
}

/// Aggregator state: global and per-source tallies
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    tracked: Vec<Signal>,
    global: CategoryTallies,
    per_source: BTreeMap<String, CategoryTallies>,
}

impl Tally {
    pub fn new(tracked: &[Signal]) -> Self {
        Self {
            tracked: tracked.to_vec(),
            global: empty_tallies(tracked),
            per_source: BTreeMap::new(),
        }
    }

    /// Make sure a source appears in the report even with zero papers.
    pub fn register_source(&mut self, source: &str) {
        self.source_mut(source);
    }

    fn source_mut(&mut self, source: &str) -> &mut CategoryTallies {
        let tracked = &self.tracked;
        self.per_source
            .entry(source.to_string())
            .or_insert_with(|| empty_tallies(tracked))
    }

    /// Fold one admitted, classified paper into both tallies.
    pub fn record(&mut self, paper: &PaperRecord) -> Result<()> {
        let category = paper.classification.category.ok_or_else(|| {
            ScreenError::InvariantViolation(format!(
                "unclassified record from {} reached the aggregator",
                paper.source
            ))
        })?;

        self.global
            .entry(category)
            .or_default()
            .add_paper(&paper.classification);
        self.source_mut(&paper.source)
            .entry(category)
            .or_default()
            .add_paper(&paper.classification);
        Ok(())
    }

    /// Count a duplicate against its resolved category. Out-of-scope
    /// duplicates are not counted.
    pub fn record_duplicate(&mut self, source: &str, classification: &Classification) {
        let Some(category) = classification.category else {
            return;
        };
        self.global.entry(category).or_default().duplicates += 1;
        self.source_mut(source).entry(category).or_default().duplicates += 1;
    }

    pub fn tracked(&self) -> &[Signal] {
        &self.tracked
    }

    pub fn global(&self) -> &CategoryTallies {
        &self.global
    }

    pub fn per_source(&self) -> &BTreeMap<String, CategoryTallies> {
        &self.per_source
    }

    pub fn papers(&self, category: Category) -> u64 {
        self.global.get(&category).map(|t| t.papers).unwrap_or(0)
    }

    pub fn total_papers(&self) -> u64 {
        self.global.values().map(|t| t.papers).sum()
    }
}
