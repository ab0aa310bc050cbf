//! # litscreen
//!
//! Bibliographic screening pipeline: merge citation-database exports,
//! deduplicate by canonical title, classify by topic and secondary signals,
//! and tally the results globally and per source.
//!
//! ## Modules
//!
//! - [`loader`] - RIS and BibTeX record streams
//! - [`ledger`] - Title-based deduplication ledger
//! - [`classifier`] - Topic table and signal rule sets
//! - [`tally`] - Global and per-source counters
//! - [`pipeline`] - Run context wiring the stages together
//! - [`report`] - Paper table and statistics output
//! - [`enrichment`] - Optional PDF model/metric mining
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use litscreen::{pipeline, report, ScreenConfig};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let run = pipeline::screen_directory(Path::new("./exports"), ScreenConfig::default())?;
//!     println!("{}", report::render_statistics(&run));
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod ledger;
pub mod loader;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod tally;

pub use config::{DuplicatePolicy, RuleSetName, ScreenConfig};
pub use error::{Result, ScreenError};
