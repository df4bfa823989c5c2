//! Domain types used throughout the pipeline.
//!
//! - raw datastore rows (`RawRecord`) and upstream column names (`columns`)
//! - cleaned rows (`MonthlyFacilityRecord`)
//! - enriched rows with verified indicators (`EnrichedRecord`)
//! - report metrics (`Metric`)

pub mod types;

pub use types::*;
