//! `rem20-dash` library crate.
//!
//! Fetches the REM 20 hospital bed-utilization indicators from the datos.gob.cl
//! CKAN datastore, cleans them, recomputes occupancy and lethality, and reports
//! them in the terminal.
//!
//! The binary (`rem20`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes or hitting the network
//! - the fetch/clean/enrich pipeline is reusable from other front-ends

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod io;
pub mod plot;
pub mod report;
