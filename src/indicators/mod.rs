//! Indicator recomputation and consistency checks.
//!
//! Occupancy and lethality are recomputed from base counters and stored next
//! to the upstream values. Neither side overwrites the other;
//! `find_discrepancies` reports where they disagree.

use crate::domain::{EnrichedRecord, MonthlyFacilityRecord};

/// Default tolerance (percentage points) before a divergence is reported.
pub const DEFAULT_DISCREPANCY_THRESHOLD: f64 = 1.0;

/// `occupied / available × 100`, or 0 when nothing was available.
pub fn occupancy_index(occupied_bed_days: f64, available_bed_days: f64) -> f64 {
    if available_bed_days > 0.0 {
        occupied_bed_days / available_bed_days * 100.0
    } else {
        0.0
    }
}

/// `deceased / discharges × 100`, or 0 without discharges.
pub fn lethality(deceased: f64, discharges: f64) -> f64 {
    if discharges > 0.0 {
        deceased / discharges * 100.0
    } else {
        0.0
    }
}

pub fn enrich_record(record: &MonthlyFacilityRecord) -> EnrichedRecord {
    EnrichedRecord {
        verified_occupancy_index: occupancy_index(record.occupied_bed_days, record.available_bed_days),
        verified_lethality: lethality(record.deceased, record.discharges),
        record: record.clone(),
    }
}

/// Add verified indicators to every record.
pub fn enrich(records: &[MonthlyFacilityRecord]) -> Vec<EnrichedRecord> {
    records.iter().map(enrich_record).collect()
}

/// Which indicator diverged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Occupancy,
    Lethality,
}

impl Indicator {
    pub fn display_name(self) -> &'static str {
        match self {
            Indicator::Occupancy => "occupancy",
            Indicator::Lethality => "lethality",
        }
    }
}

/// An upstream indicator that differs from its recomputed value.
#[derive(Debug, Clone, PartialEq)]
pub struct Discrepancy {
    /// Index into the slice passed to `find_discrepancies`.
    pub index: usize,
    pub indicator: Indicator,
    pub upstream: f64,
    pub verified: f64,
}

impl Discrepancy {
    pub fn delta(&self) -> f64 {
        self.upstream - self.verified
    }
}

/// Every (record, indicator) pair where `|upstream - verified| > threshold`.
pub fn find_discrepancies(records: &[EnrichedRecord], threshold: f64) -> Vec<Discrepancy> {
    let threshold = threshold.abs();
    let mut out = Vec::new();
    for (index, r) in records.iter().enumerate() {
        let pairs = [
            (Indicator::Occupancy, r.record.occupancy_index, r.verified_occupancy_index),
            (Indicator::Lethality, r.record.lethality, r.verified_lethality),
        ];
        for (indicator, upstream, verified) in pairs {
            if (upstream - verified).abs() > threshold {
                out.push(Discrepancy {
                    index,
                    indicator,
                    upstream,
                    verified,
                });
            }
        }
    }
    if !out.is_empty() {
        log::warn!(
            "{} upstream indicator value(s) differ from recomputed values by more than {threshold} pp",
            out.len()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::RawRecord;
    use crate::io::clean::clean;

    fn rec(available: f64, occupied: f64, discharges: f64, deceased: f64) -> MonthlyFacilityRecord {
        MonthlyFacilityRecord {
            available_bed_days: available,
            occupied_bed_days: occupied,
            discharges,
            deceased,
            ..Default::default()
        }
    }

    #[test]
    fn zero_available_bed_days_gives_zero_occupancy() {
        let out = enrich(&[rec(0.0, 10.0, 0.0, 0.0)]);
        assert_eq!(out[0].verified_occupancy_index, 0.0);
        assert_eq!(out[0].verified_lethality, 0.0);
    }

    #[test]
    fn lethality_is_percentage_of_discharges() {
        let out = enrich(&[rec(0.0, 0.0, 100.0, 5.0)]);
        assert!((out[0].verified_lethality - 5.0).abs() < 1e-12);
    }

    #[test]
    fn upstream_values_are_preserved() {
        let mut r = rec(100.0, 50.0, 10.0, 1.0);
        r.occupancy_index = 48.0;
        r.lethality = 12.0;
        let out = enrich(&[r.clone()]);
        assert_eq!(out[0].record, r);
        assert!((out[0].verified_occupancy_index - 50.0).abs() < 1e-12);
        assert!((out[0].verified_lethality - 10.0).abs() < 1e-12);
    }

    #[test]
    fn end_to_end_clean_then_enrich() {
        let raw: Vec<RawRecord> = vec![
            [
                ("PERIODO", json!("2025")),
                ("MES", json!("3")),
                ("DIAS_CAMAS_DISPONIBLES", json!("100")),
                ("DIAS_CAMAS_OCUPADAS", json!("80")),
                ("NUMERO_EGRESOS", json!("20")),
                ("EGRESOS_FALLECIDOS", json!("1")),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        ];

        let out = enrich(&clean(&raw));
        assert_eq!(out.len(), 1);
        assert!((out[0].verified_occupancy_index - 80.0).abs() < 1e-12);
        assert!((out[0].verified_lethality - 5.0).abs() < 1e-12);
        assert_eq!(out[0].record.year, Some(2025));
        assert_eq!(out[0].record.month, Some(3));
    }

    #[test]
    fn discrepancies_above_threshold_are_reported() {
        let mut close = rec(100.0, 80.0, 20.0, 1.0);
        close.occupancy_index = 80.4;
        close.lethality = 5.0;
        let mut off = rec(100.0, 80.0, 20.0, 1.0);
        off.occupancy_index = 70.0;
        off.lethality = 5.0;

        let found = find_discrepancies(&enrich(&[close, off]), DEFAULT_DISCREPANCY_THRESHOLD);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].index, 1);
        assert_eq!(found[0].indicator, Indicator::Occupancy);
        assert!((found[0].delta() + 10.0).abs() < 1e-12);
    }
}
