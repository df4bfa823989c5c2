//! Command-line parsing for the REM 20 indicators tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from fetching, cleaning and reporting.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::Metric;
use crate::indicators::DEFAULT_DISCREPANCY_THRESHOLD;
use crate::io::ExportFormat;
use crate::report::{DEFAULT_TOP_FACILITIES, RecordFilter};

pub mod session;

/// Year fetched when none is given.
pub const DEFAULT_YEAR: i32 = 2025;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "rem20",
    version,
    about = "Chilean public-hospital bed indicators (REM 20, datos.gob.cl)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print KPIs, discharges by area, and the top facilities by occupancy.
    Summary(SummaryArgs),
    /// Print the monthly trend of one indicator with an ASCII chart.
    Trend(TrendArgs),
    /// Compare upstream indicators with values recomputed from bed-days and discharges.
    Check(CheckArgs),
    /// Write the cleaned and enriched table to CSV or JSON.
    Export(ExportArgs),
    /// Interactive session; fetched years are cached for the session.
    Explore(FetchArgs),
}

/// Which periods to fetch and how.
#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// Year (PERIODO) to fetch; repeatable. Defaults to 2025.
    #[arg(short = 'y', long = "year", value_parser = clap::value_parser!(i32).range(1990..=2100))]
    pub years: Vec<i32>,

    /// Fetch every period (no year filter).
    #[arg(long, conflicts_with = "years")]
    pub all_years: bool,

    /// Records per page (overrides REM20_PAGE_SIZE).
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Per-request timeout in seconds (overrides REM20_TIMEOUT_SECS).
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl FetchArgs {
    /// Years to request; empty means the unfiltered pass.
    pub fn resolved_years(&self) -> Vec<i32> {
        if self.all_years {
            Vec::new()
        } else if self.years.is_empty() {
            vec![DEFAULT_YEAR]
        } else {
            self.years.clone()
        }
    }
}

/// Exact-match filters applied after fetching.
#[derive(Debug, Args, Clone, Default)]
pub struct FilterArgs {
    /// Health service name (GLOSA_SSS).
    #[arg(long)]
    pub service: Option<String>,

    /// Functional area name (AREA_FUNCIONAL).
    #[arg(long)]
    pub area: Option<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> RecordFilter {
        RecordFilter {
            service: self.service.clone(),
            area: self.area.clone(),
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Number of facilities in the occupancy ranking.
    #[arg(long, default_value_t = DEFAULT_TOP_FACILITIES)]
    pub top: usize,
}

#[derive(Debug, Args, Clone)]
pub struct TrendArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Indicator to plot.
    #[arg(short = 'm', long, value_enum, default_value_t = Metric::Occupancy)]
    pub metric: Metric,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 16)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Tolerated difference in percentage points.
    #[arg(long, default_value_t = DEFAULT_DISCREPANCY_THRESHOLD)]
    pub threshold: f64,

    /// Maximum mismatches to list.
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Output file.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub out: PathBuf,

    /// Output format (inferred from the extension when omitted).
    #[arg(long, value_enum)]
    pub format: Option<ExportFormat>,
}
