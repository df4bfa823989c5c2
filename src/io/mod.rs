//! Input/output helpers.
//!
//! - raw row cleaning and typing (`clean`)
//! - enriched table exports (CSV/JSON) (`export`)

pub mod clean;
pub mod export;

pub use clean::*;
pub use export::*;
