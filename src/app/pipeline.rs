//! Shared "load pipeline" used by the one-shot commands and the explore session.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! datastore fetch -> clean -> enrich
//!
//! The commands can then focus on presentation (tables, charts, files).

use crate::data::{FetchOutcome, PageSource, Rem20Client, YearError};
use crate::domain::{EnrichedRecord, RawRecord};
use crate::indicators::enrich;
use crate::io::clean;

/// Cleaned and enriched records for one year selection.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub years: Vec<i32>,
    pub records: Vec<EnrichedRecord>,
    pub errors: Vec<YearError>,
    /// True when every year failed at the transport level.
    pub all_failed: bool,
}

impl Dataset {
    pub fn from_outcome(years: &[i32], outcome: FetchOutcome) -> Self {
        let all_failed = outcome.all_failed();
        Self {
            years: years.to_vec(),
            records: process(&outcome.records),
            errors: outcome.errors,
            all_failed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Clean then enrich a raw table.
pub fn process(raw: &[RawRecord]) -> Vec<EnrichedRecord> {
    enrich(&clean(raw))
}

/// Fetch `years` (no cache) and run the full pipeline.
pub fn load<S: PageSource>(client: &Rem20Client<S>, years: &[i32]) -> Dataset {
    let outcome = client.fetch(years);
    log::info!(
        "Fetched {} record(s) in {} request(s); {} period(s) failed",
        outcome.records.len(),
        outcome.requests,
        outcome.errors.len()
    );
    Dataset::from_outcome(years, outcome)
}
