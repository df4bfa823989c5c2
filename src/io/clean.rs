//! Raw row cleaning and typing.
//!
//! Turns upstream JSON rows into `MonthlyFacilityRecord`s. Cleaning never
//! fails and never drops a row:
//! - metric columns: unparseable, null, missing or non-finite -> `0.0`
//! - base counters additionally clamp negatives to `0.0`
//! - code columns: stringified and left-padded with zeros
//! - year/month: integers, or `None` when unreadable (they are keys, not metrics)

use serde_json::{Number, Value};

use crate::domain::{MonthlyFacilityRecord, RawRecord, columns};

/// Clean a whole raw table. The input is left untouched.
pub fn clean(raw: &[RawRecord]) -> Vec<MonthlyFacilityRecord> {
    let out: Vec<MonthlyFacilityRecord> = raw.iter().map(clean_record).collect();
    log::debug!("Cleaned {} raw record(s)", out.len());
    out
}

pub fn clean_record(row: &RawRecord) -> MonthlyFacilityRecord {
    let code = |name: &str| {
        let width = columns::CODE_WIDTHS
            .iter()
            .find(|(col, _)| *col == name)
            .map(|(_, w)| *w)
            .unwrap_or(0);
        pad_code(row.get(name), width)
    };
    let counter = |name: &str| parse_metric(row.get(name)).max(0.0);
    let metric = |name: &str| parse_metric(row.get(name));

    MonthlyFacilityRecord {
        service_code: code(columns::SERVICE_CODE),
        service_name: text(row.get(columns::SERVICE_NAME)),
        facility_code: code(columns::FACILITY_CODE),
        facility_name: text(row.get(columns::FACILITY_NAME)),
        area_code: code(columns::AREA_CODE),
        area_name: text(row.get(columns::AREA_NAME)),

        year: parse_integer(row.get(columns::PERIOD)).and_then(|v| i32::try_from(v).ok()),
        month: parse_integer(row.get(columns::MONTH)).and_then(|v| u32::try_from(v).ok()),

        available_bed_days: counter(columns::AVAILABLE_BED_DAYS),
        occupied_bed_days: counter(columns::OCCUPIED_BED_DAYS),
        stay_days: counter(columns::STAY_DAYS),
        discharges: counter(columns::DISCHARGES),
        deceased: counter(columns::DECEASED),
        transfers: counter(columns::TRANSFERS),

        avg_available_beds: metric(columns::AVG_AVAILABLE_BEDS),
        occupancy_index: metric(columns::OCCUPANCY_INDEX),
        avg_stay: metric(columns::AVG_STAY),
        lethality: metric(columns::LETHALITY),
        rotation_index: metric(columns::ROTATION_INDEX),
    }
}

/// Numeric coercion for metric columns; anything unusable becomes `0.0`.
pub fn parse_metric(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Integer coercion for dimension keys. Integral floats (`"2025.0"`) are accepted.
pub fn parse_integer(value: Option<&Value>) -> Option<i64> {
    let f = match value? {
        Value::Number(n) => match n.as_i64() {
            Some(i) => return Some(i),
            None => n.as_f64()?,
        },
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Some(i);
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    (f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15).then_some(f as i64)
}

/// Stringify a code and left-pad it with zeros to `width`.
///
/// Missing/null codes stay empty rather than becoming a run of zeros. A leading
/// sign stays in front of the padding (`-5` -> `-05`) and counts toward `width`.
pub fn pad_code(value: Option<&Value>, width: usize) -> String {
    let code = text(value);
    let code = code.trim();
    if code.is_empty() {
        return String::new();
    }
    match code.strip_prefix(['-', '+']) {
        Some(digits) => {
            let sign = &code[..1];
            let width = width.saturating_sub(1);
            format!("{sign}{digits:0>width$}")
        }
        None => format!("{code:0>width$}"),
    }
}

fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => number_text(n),
        Some(other) => other.to_string(),
    }
}

/// Integral numbers render without a fraction: `5.0` -> `"5"`.
fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(pairs: &[(&str, Value)]) -> RawRecord {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn sample_rows() -> Vec<RawRecord> {
        vec![
            row(&[
                ("PERIODO", json!("2025")),
                ("MES", json!("3")),
                ("COD_SSS", json!("7")),
                ("GLOSA_SSS", json!("Servicio de Salud Maule")),
                ("CODIGO_ESTABLECIMIENTO", json!("123")),
                ("ESTABLECIMIENTO", json!("Hospital de Talca")),
                ("COD_AREA_FUNCIONAL", json!(5)),
                ("AREA_FUNCIONAL", json!("Medicina")),
                ("DIAS_CAMAS_DISPONIBLES", json!("100")),
                ("DIAS_CAMAS_OCUPADAS", json!(80)),
                ("NUMERO_EGRESOS", json!("20")),
                ("EGRESOS_FALLECIDOS", json!("1")),
                ("INDICE_OCUPACIONAL", json!("79.5")),
            ]),
            row(&[
                ("PERIODO", json!("N/A")),
                ("MES", json!(null)),
                ("DIAS_CAMAS_DISPONIBLES", json!("N/A")),
                ("DIAS_CAMAS_OCUPADAS", json!(null)),
                ("NUMERO_EGRESOS", json!("")),
                ("TRASLADOS", json!("-4")),
                ("LETALIDAD", json!("NaN")),
            ]),
        ]
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(clean(&[]).is_empty());
    }

    #[test]
    fn codes_are_zero_padded() {
        let out = clean(&sample_rows());
        assert_eq!(out[0].facility_code, "000123");
        assert_eq!(out[0].area_code, "05");
        assert_eq!(out[0].service_code, "07");
        assert_eq!(out[1].facility_code, "");
    }

    #[test]
    fn pad_code_leaves_wide_codes_alone() {
        assert_eq!(pad_code(Some(&json!("1234567")), 6), "1234567");
        assert_eq!(pad_code(Some(&json!(12.0)), 2), "12");
        assert_eq!(pad_code(Some(&json!(null)), 2), "");
    }

    #[test]
    fn pad_code_keeps_sign_in_front() {
        assert_eq!(pad_code(Some(&json!(-5)), 3), "-05");
        assert_eq!(pad_code(Some(&json!("+7")), 2), "+7");
        assert_eq!(pad_code(Some(&json!("-123")), 2), "-123");
    }

    #[test]
    fn malformed_metrics_become_zero() {
        let out = clean(&sample_rows());
        let r = &out[1];
        assert_eq!(r.available_bed_days, 0.0);
        assert_eq!(r.occupied_bed_days, 0.0);
        assert_eq!(r.discharges, 0.0);
        assert_eq!(r.transfers, 0.0);
        assert_eq!(r.lethality, 0.0);
        assert_eq!(r.stay_days, 0.0);
    }

    #[test]
    fn unreadable_periods_are_missing_not_zero() {
        let out = clean(&sample_rows());
        assert_eq!(out[0].year, Some(2025));
        assert_eq!(out[0].month, Some(3));
        assert_eq!(out[1].year, None);
        assert_eq!(out[1].month, None);
        assert_eq!(parse_integer(Some(&json!("2025.0"))), Some(2025));
        assert_eq!(parse_integer(Some(&json!("3.5"))), None);
    }

    #[test]
    fn numeric_columns_are_typed() {
        let out = clean(&sample_rows());
        assert_eq!(out[0].available_bed_days, 100.0);
        assert_eq!(out[0].occupied_bed_days, 80.0);
        assert!((out[0].occupancy_index - 79.5).abs() < 1e-12);
        assert_eq!(out[0].service_name, "Servicio de Salud Maule");
    }

    #[test]
    fn clean_is_idempotent() {
        let once = clean(&sample_rows());
        let reraw: Vec<RawRecord> = once.iter().map(|r| r.to_raw()).collect();
        let twice = clean(&reraw);
        assert_eq!(once, twice);
    }

    #[test]
    fn input_is_not_mutated() {
        let rows = sample_rows();
        let snapshot = rows.clone();
        let _ = clean(&rows);
        assert_eq!(rows, snapshot);
    }
}
