//! Export the enriched table to CSV or JSON.
//!
//! Columns use the upstream names plus the `VERIF_*` verification columns, so
//! the files line up with the datastore's own CSV downloads.

use std::fs::File;
use std::path::Path;

use clap::ValueEnum;

use crate::domain::{EnrichedRecord, columns};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Guess from a file extension, defaulting to CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ExportFormat::Json,
            _ => ExportFormat::Csv,
        }
    }
}

pub fn write_records(path: &Path, records: &[EnrichedRecord], format: ExportFormat) -> Result<(), AppError> {
    match format {
        ExportFormat::Csv => write_records_csv(path, records),
        ExportFormat::Json => write_records_json(path, records),
    }
}

/// CSV header in export order.
pub fn csv_header() -> Vec<&'static str> {
    let mut header = vec![
        columns::PERIOD,
        columns::MONTH,
        columns::SERVICE_CODE,
        columns::SERVICE_NAME,
        columns::FACILITY_CODE,
        columns::FACILITY_NAME,
        columns::AREA_CODE,
        columns::AREA_NAME,
    ];
    header.extend(columns::COUNTERS);
    header.extend(columns::UPSTREAM_INDICATORS);
    header.push(columns::VERIFIED_OCCUPANCY_INDEX);
    header.push(columns::VERIFIED_LETHALITY);
    header
}

/// Write the enriched table as CSV.
pub fn write_records_csv(path: &Path, records: &[EnrichedRecord]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::usage(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writer
        .write_record(csv_header())
        .map_err(|e| AppError::usage(format!("Failed to write export CSV header: {e}")))?;

    for r in records {
        writer
            .write_record(csv_row(r))
            .map_err(|e| AppError::usage(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::usage(format!("Failed to flush export CSV: {e}")))?;
    log::info!("Wrote {} record(s) to {}", records.len(), path.display());
    Ok(())
}

fn csv_row(r: &EnrichedRecord) -> Vec<String> {
    let rec = &r.record;
    let mut row = vec![
        rec.year.map(|y| y.to_string()).unwrap_or_default(),
        rec.month.map(|m| m.to_string()).unwrap_or_default(),
        rec.service_code.clone(),
        rec.service_name.clone(),
        rec.facility_code.clone(),
        rec.facility_name.clone(),
        rec.area_code.clone(),
        rec.area_name.clone(),
    ];
    row.extend(rec.counters().iter().map(|v| v.to_string()));
    row.extend(rec.upstream_indicators().iter().map(|v| v.to_string()));
    row.push(format!("{:.4}", r.verified_occupancy_index));
    row.push(format!("{:.4}", r.verified_lethality));
    row
}

/// Write the enriched table as a pretty-printed JSON array.
pub fn write_records_json(path: &Path, records: &[EnrichedRecord]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::usage(format!("Failed to create export JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, records)
        .map_err(|e| AppError::usage(format!("Failed to write export JSON: {e}")))?;
    log::info!("Wrote {} record(s) to {}", records.len(), path.display());
    Ok(())
}
