//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves client configuration (env + flags)
//! - fetches, cleans and enriches REM 20 records
//! - prints reports/plots
//! - writes optional exports

use std::io;

use clap::Parser;

use crate::cli::{CheckArgs, Command, ExportArgs, FetchArgs, SummaryArgs, TrendArgs};
use crate::config::ClientConfig;
use crate::data::Rem20Client;
use crate::error::{AppError, EXIT_FETCH};
use crate::indicators::find_discrepancies;
use crate::io::ExportFormat;
use crate::report::{self, DEFAULT_OTHER_SHARE, NO_DATA_MESSAGE};

pub mod pipeline;

use pipeline::Dataset;

/// Entry point for the `rem20` binary.
pub fn run() -> Result<(), AppError> {
    // `rem20` and `rem20 -y 2024` behave like `rem20 summary ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Summary(args) => handle_summary(args),
        Command::Trend(args) => handle_trend(args),
        Command::Check(args) => handle_check(args),
        Command::Export(args) => handle_export(args),
        Command::Explore(args) => handle_explore(args),
    }
}

/// Environment config with CLI overrides applied.
pub fn client_config_from_args(args: &FetchArgs) -> Result<ClientConfig, AppError> {
    let mut config = ClientConfig::from_env()?;
    apply_overrides(&mut config, args)?;
    Ok(config)
}

fn apply_overrides(config: &mut ClientConfig, args: &FetchArgs) -> Result<(), AppError> {
    if let Some(page_size) = args.page_size {
        if page_size == 0 {
            return Err(AppError::usage("--page-size must be positive."));
        }
        config.page_size = page_size;
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err(AppError::usage("--timeout must be positive."));
        }
        config.timeout = std::time::Duration::from_secs(timeout);
    }
    Ok(())
}

/// Fetch and process the selected years; report per-year failures on stderr.
fn load(args: &FetchArgs) -> Result<Dataset, AppError> {
    let config = client_config_from_args(args)?;
    let client = Rem20Client::from_config(&config)?;
    let dataset = pipeline::load(&client, &args.resolved_years());

    eprint!("{}", report::format_fetch_errors(&dataset.errors));
    Ok(dataset)
}

/// Print the "no data" message; fail only if every period errored.
fn no_data(dataset: &Dataset) -> Result<(), AppError> {
    println!("{NO_DATA_MESSAGE}");
    if dataset.all_failed {
        return Err(AppError::new(EXIT_FETCH, "Every requested period failed to load."));
    }
    Ok(())
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let dataset = load(&args.fetch)?;
    if dataset.is_empty() {
        return no_data(&dataset);
    }

    let filter = args.filter.to_filter();
    let records = filter.apply(&dataset.records);

    println!(
        "{}",
        report::format_run_header(&dataset.years, &filter, dataset.records.len(), records.len())
    );
    println!("{}", report::format_kpis(&report::compute_kpis(&records)));
    println!(
        "{}",
        report::format_areas(&report::area_distribution(&records, DEFAULT_OTHER_SHARE))
    );
    println!("{}", report::format_facilities(&report::top_facilities(&records, args.top)));

    let found = find_discrepancies(&records, crate::indicators::DEFAULT_DISCREPANCY_THRESHOLD);
    if !found.is_empty() {
        println!(
            "Note: {} upstream indicator value(s) differ from recomputed ones; run `rem20 check` for details.",
            found.len()
        );
    }
    Ok(())
}

fn handle_trend(args: TrendArgs) -> Result<(), AppError> {
    let dataset = load(&args.fetch)?;
    if dataset.is_empty() {
        return no_data(&dataset);
    }

    let filter = args.filter.to_filter();
    let records = filter.apply(&dataset.records);
    let points = report::trend(&records, args.metric);

    println!(
        "{}",
        report::format_run_header(&dataset.years, &filter, dataset.records.len(), records.len())
    );
    println!("{}", report::format_trend_table(&points, args.metric));
    if !args.no_plot {
        println!("{}", crate::plot::render_trend_plot(&points, args.width, args.height));
    }
    Ok(())
}

fn handle_check(args: CheckArgs) -> Result<(), AppError> {
    let dataset = load(&args.fetch)?;
    if dataset.is_empty() {
        return no_data(&dataset);
    }

    let records = args.filter.to_filter().apply(&dataset.records);
    let found = find_discrepancies(&records, args.threshold);
    print!(
        "{}",
        report::format_discrepancies(&records, &found, args.threshold, args.limit)
    );
    Ok(())
}

fn handle_export(args: ExportArgs) -> Result<(), AppError> {
    let dataset = load(&args.fetch)?;
    if dataset.all_failed {
        return no_data(&dataset);
    }

    let records = args.filter.to_filter().apply(&dataset.records);
    let format = args.format.unwrap_or_else(|| ExportFormat::from_path(&args.out));
    crate::io::write_records(&args.out, &records, format)?;
    println!("Wrote {} record(s) to {}", records.len(), args.out.display());
    Ok(())
}

fn handle_explore(args: FetchArgs) -> Result<(), AppError> {
    let config = client_config_from_args(&args)?;
    let client = Rem20Client::from_config(&config)?;
    let mut session = crate::cli::session::Session::new(client, config.cache_ttl, args.resolved_years());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    session.run(stdin.lock(), &mut stdout)
}

/// Rewrite argv so `rem20` defaults to `rem20 summary`.
///
/// Rules:
/// - `rem20`                      -> `rem20 summary`
/// - `rem20 -y 2024 ...`          -> `rem20 summary -y 2024 ...`
/// - `rem20 --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("summary".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    // Anything else starting with a flag is treated as summary flags.
    if arg1.starts_with('-') {
        argv.insert(1, "summary".to_string());
    }
    argv
}
