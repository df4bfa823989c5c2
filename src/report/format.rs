//! Formatted terminal output.
//!
//! All table formatting lives here so output changes stay localized and the
//! computations in `report` stay easy to test.

use crate::data::YearError;
use crate::domain::{EnrichedRecord, Metric};
use crate::indicators::Discrepancy;

use super::{AreaShare, FacilityRank, Kpis, RecordFilter, TrendPoint};

pub const NO_DATA_MESSAGE: &str =
    "No data could be loaded from the API. Check the connection or try another period.";

/// Header block: what was requested and how much came back.
pub fn format_run_header(years: &[i32], filter: &RecordFilter, loaded: usize, shown: usize) -> String {
    let mut out = String::new();
    out.push_str("=== rem20 - Hospital REM 20 Chile ===\n");
    out.push_str(&format!("Periods: {}\n", fmt_years(years)));
    out.push_str(&format!(
        "Service: {} | Area: {}\n",
        filter.service.as_deref().unwrap_or("All"),
        filter.area.as_deref().unwrap_or("All"),
    ));
    out.push_str(&format!("Records: {shown} shown of {loaded} loaded\n"));
    out
}

pub fn format_fetch_errors(errors: &[YearError]) -> String {
    let mut out = String::new();
    for e in errors {
        out.push_str(&format!("warning: could not load {e}\n"));
    }
    out
}

pub fn format_kpis(kpis: &Kpis) -> String {
    let mut out = String::new();
    out.push_str("Key indicators:\n");
    out.push_str(&format!("- Occupancy index : {}\n", fmt_opt(kpis.avg_occupancy, "%", 1)));
    out.push_str(&format!("- Total discharges: {}\n", fmt_thousands(kpis.total_discharges)));
    out.push_str(&format!("- Average stay    : {}\n", fmt_opt(kpis.avg_stay, " days", 1)));
    out.push_str(&format!("- Lethality rate  : {:.2}%\n", kpis.lethality));
    out
}

pub fn format_trend_table(points: &[TrendPoint], metric: Metric) -> String {
    let mut out = String::new();
    out.push_str(&format!("Trend: {}\n", metric.display_name()));
    push_row(&mut out, format!("{:<8} {:>14} {:>8}", "month", "value", "rows"));
    push_row(&mut out, format!("{:-<8} {:-<14} {:-<8}", "", "", ""));
    for p in points {
        push_row(
            &mut out,
            format!("{:<8} {:>14.2} {:>8}", p.date.format("%Y-%m").to_string(), p.value, p.records),
        );
    }
    out
}

pub fn format_areas(areas: &[AreaShare]) -> String {
    let mut out = String::new();
    out.push_str("Discharges by functional area:\n");
    push_row(&mut out, format!("{:<36} {:>12} {:>8}", "area", "discharges", "share"));
    push_row(&mut out, format!("{:-<36} {:-<12} {:-<8}", "", "", ""));
    for a in areas {
        push_row(
            &mut out,
            format!(
                "{:<36} {:>12} {:>7.1}%",
                truncate(&a.area, 36),
                fmt_thousands(a.discharges),
                a.share
            ),
        );
    }
    out
}

pub fn format_facilities(ranks: &[FacilityRank]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Top {} facilities by occupancy:\n", ranks.len()));
    push_row(
        &mut out,
        format!("{:<40} {:>10} {:>10} {:>6}", "facility", "occupancy", "lethality", "rows"),
    );
    push_row(&mut out, format!("{:-<40} {:-<10} {:-<10} {:-<6}", "", "", "", ""));
    for r in ranks {
        push_row(
            &mut out,
            format!(
                "{:<40} {:>9.1}% {:>9.2}% {:>6}",
                truncate(&r.facility, 40),
                r.avg_occupancy,
                r.avg_lethality,
                r.records
            ),
        );
    }
    out
}

/// Table of upstream/verified mismatches, capped at `limit` rows.
pub fn format_discrepancies(records: &[EnrichedRecord], found: &[Discrepancy], threshold: f64, limit: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Indicator check: {} mismatch(es) above {threshold:.2} pp in {} record(s)\n",
        found.len(),
        records.len()
    ));
    if found.is_empty() {
        return out;
    }

    push_row(
        &mut out,
        format!(
            "{:<8} {:<32} {:<24} {:<10} {:>10} {:>10} {:>9}",
            "month", "facility", "area", "indicator", "upstream", "verified", "delta"
        ),
    );
    push_row(
        &mut out,
        format!("{:-<8} {:-<32} {:-<24} {:-<10} {:-<10} {:-<10} {:-<9}", "", "", "", "", "", "", ""),
    );
    for d in found.iter().take(limit) {
        let Some(r) = records.get(d.index) else { continue };
        push_row(
            &mut out,
            format!(
                "{:<8} {:<32} {:<24} {:<10} {:>10.2} {:>10.2} {:>+9.2}",
                fmt_period(r.record.year, r.record.month),
                truncate(&r.record.facility_name, 32),
                truncate(&r.record.area_name, 24),
                d.indicator.display_name(),
                d.upstream,
                d.verified,
                d.delta()
            ),
        );
    }
    if found.len() > limit {
        out.push_str(&format!("... {} more\n", found.len() - limit));
    }
    out
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

fn fmt_years(years: &[i32]) -> String {
    if years.is_empty() {
        return "all".to_string();
    }
    let parts: Vec<String> = years.iter().map(|y| y.to_string()).collect();
    parts.join(", ")
}

fn fmt_period(year: Option<i32>, month: Option<u32>) -> String {
    match (year, month) {
        (Some(y), Some(m)) => format!("{y}-{m:02}"),
        (Some(y), None) => format!("{y}-??"),
        _ => "?".to_string(),
    }
}

fn fmt_opt(v: Option<f64>, unit: &str, decimals: usize) -> String {
    match v {
        Some(v) => format!("{v:.decimals$}{unit}"),
        None => "n/a".to_string(),
    }
}

/// Whole number with `,` thousands separators.
pub fn fmt_thousands(v: f64) -> String {
    let rounded = v.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0 {
        out.insert(0, '-');
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
