//! Shared domain types.
//!
//! A raw datastore row is a flat JSON object keyed by upstream column names.
//! Cleaning turns it into a `MonthlyFacilityRecord`; enrichment wraps that in
//! an `EnrichedRecord` carrying the recomputed indicators.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One datastore row exactly as received.
pub type RawRecord = Map<String, Value>;

/// Upstream column names of the REM 20 resource.
pub mod columns {
    pub const PERIOD: &str = "PERIODO";
    pub const MONTH: &str = "MES";

    pub const SERVICE_CODE: &str = "COD_SSS";
    pub const SERVICE_NAME: &str = "GLOSA_SSS";
    pub const FACILITY_CODE: &str = "CODIGO_ESTABLECIMIENTO";
    pub const FACILITY_NAME: &str = "ESTABLECIMIENTO";
    pub const AREA_CODE: &str = "COD_AREA_FUNCIONAL";
    pub const AREA_NAME: &str = "AREA_FUNCIONAL";

    pub const AVAILABLE_BED_DAYS: &str = "DIAS_CAMAS_DISPONIBLES";
    pub const OCCUPIED_BED_DAYS: &str = "DIAS_CAMAS_OCUPADAS";
    pub const STAY_DAYS: &str = "DIAS_ESTADA";
    pub const DISCHARGES: &str = "NUMERO_EGRESOS";
    pub const DECEASED: &str = "EGRESOS_FALLECIDOS";
    pub const TRANSFERS: &str = "TRASLADOS";

    pub const AVG_AVAILABLE_BEDS: &str = "PROMEDIO_CAMAS_DISPONIBLE";
    pub const OCCUPANCY_INDEX: &str = "INDICE_OCUPACIONAL";
    pub const AVG_STAY: &str = "PROMEDIO_DIAS_ESTADA";
    pub const LETHALITY: &str = "LETALIDAD";
    pub const ROTATION_INDEX: &str = "INDICE_ROTACION";

    pub const VERIFIED_OCCUPANCY_INDEX: &str = "VERIF_INDICE_OCUPACIONAL";
    pub const VERIFIED_LETHALITY: &str = "VERIF_LETALIDAD";

    /// Code columns and the width they are zero-padded to.
    pub const CODE_WIDTHS: [(&str, usize); 3] = [(SERVICE_CODE, 2), (FACILITY_CODE, 6), (AREA_CODE, 2)];

    /// Columns holding base counters (never negative once cleaned).
    pub const COUNTERS: [&str; 6] = [
        AVAILABLE_BED_DAYS,
        OCCUPIED_BED_DAYS,
        STAY_DAYS,
        DISCHARGES,
        DECEASED,
        TRANSFERS,
    ];

    /// Indicators as reported upstream.
    pub const UPSTREAM_INDICATORS: [&str; 5] = [AVG_AVAILABLE_BEDS, OCCUPANCY_INDEX, AVG_STAY, LETHALITY, ROTATION_INDEX];
}

/// One row per (facility, functional area, year, month), typed and cleaned.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonthlyFacilityRecord {
    #[serde(rename = "COD_SSS")]
    pub service_code: String,
    #[serde(rename = "GLOSA_SSS")]
    pub service_name: String,
    #[serde(rename = "CODIGO_ESTABLECIMIENTO")]
    pub facility_code: String,
    #[serde(rename = "ESTABLECIMIENTO")]
    pub facility_name: String,
    #[serde(rename = "COD_AREA_FUNCIONAL")]
    pub area_code: String,
    #[serde(rename = "AREA_FUNCIONAL")]
    pub area_name: String,

    /// `None` when the upstream value could not be read as a year.
    #[serde(rename = "PERIODO")]
    pub year: Option<i32>,
    #[serde(rename = "MES")]
    pub month: Option<u32>,

    #[serde(rename = "DIAS_CAMAS_DISPONIBLES")]
    pub available_bed_days: f64,
    #[serde(rename = "DIAS_CAMAS_OCUPADAS")]
    pub occupied_bed_days: f64,
    #[serde(rename = "DIAS_ESTADA")]
    pub stay_days: f64,
    #[serde(rename = "NUMERO_EGRESOS")]
    pub discharges: f64,
    #[serde(rename = "EGRESOS_FALLECIDOS")]
    pub deceased: f64,
    #[serde(rename = "TRASLADOS")]
    pub transfers: f64,

    #[serde(rename = "PROMEDIO_CAMAS_DISPONIBLE")]
    pub avg_available_beds: f64,
    #[serde(rename = "INDICE_OCUPACIONAL")]
    pub occupancy_index: f64,
    #[serde(rename = "PROMEDIO_DIAS_ESTADA")]
    pub avg_stay: f64,
    #[serde(rename = "LETALIDAD")]
    pub lethality: f64,
    #[serde(rename = "INDICE_ROTACION")]
    pub rotation_index: f64,
}

impl MonthlyFacilityRecord {
    /// Render the record back into an upstream-shaped row.
    pub fn to_raw(&self) -> RawRecord {
        let mut row = Map::new();
        let text = |s: &str| Value::String(s.to_string());
        let num = |v: f64| Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null);

        row.insert(columns::SERVICE_CODE.into(), text(&self.service_code));
        row.insert(columns::SERVICE_NAME.into(), text(&self.service_name));
        row.insert(columns::FACILITY_CODE.into(), text(&self.facility_code));
        row.insert(columns::FACILITY_NAME.into(), text(&self.facility_name));
        row.insert(columns::AREA_CODE.into(), text(&self.area_code));
        row.insert(columns::AREA_NAME.into(), text(&self.area_name));
        row.insert(columns::PERIOD.into(), self.year.map(Value::from).unwrap_or(Value::Null));
        row.insert(columns::MONTH.into(), self.month.map(Value::from).unwrap_or(Value::Null));

        for (name, value) in columns::COUNTERS.iter().zip(self.counters()) {
            row.insert((*name).into(), num(value));
        }
        for (name, value) in columns::UPSTREAM_INDICATORS.iter().zip(self.upstream_indicators()) {
            row.insert((*name).into(), num(value));
        }
        row
    }

    /// Base counters in `columns::COUNTERS` order.
    pub fn counters(&self) -> [f64; 6] {
        [
            self.available_bed_days,
            self.occupied_bed_days,
            self.stay_days,
            self.discharges,
            self.deceased,
            self.transfers,
        ]
    }

    /// Upstream indicators in `columns::UPSTREAM_INDICATORS` order.
    pub fn upstream_indicators(&self) -> [f64; 5] {
        [
            self.avg_available_beds,
            self.occupancy_index,
            self.avg_stay,
            self.lethality,
            self.rotation_index,
        ]
    }
}

/// A cleaned record plus indicators recomputed from its base counters.
///
/// The upstream `occupancy_index` / `lethality` are kept untouched on `record`;
/// the verified values sit next to them so the two can be compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: MonthlyFacilityRecord,
    #[serde(rename = "VERIF_INDICE_OCUPACIONAL")]
    pub verified_occupancy_index: f64,
    #[serde(rename = "VERIF_LETALIDAD")]
    pub verified_lethality: f64,
}

/// Which column a trend or ranking reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    /// Upstream occupancy index (%).
    Occupancy,
    /// Upstream average length of stay (days).
    AvgStay,
    /// Upstream lethality (%).
    Lethality,
    /// Total discharges.
    Discharges,
    AvailableBedDays,
    OccupiedBedDays,
    /// Occupancy recomputed from bed-days.
    VerifiedOccupancy,
    /// Lethality recomputed from discharges.
    VerifiedLethality,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::Occupancy,
        Metric::AvgStay,
        Metric::Lethality,
        Metric::Discharges,
        Metric::AvailableBedDays,
        Metric::OccupiedBedDays,
        Metric::VerifiedOccupancy,
        Metric::VerifiedLethality,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Metric::Occupancy => "Occupancy index (%)",
            Metric::AvgStay => "Average stay (days)",
            Metric::Lethality => "Lethality (%)",
            Metric::Discharges => "Total discharges",
            Metric::AvailableBedDays => "Available bed-days",
            Metric::OccupiedBedDays => "Occupied bed-days",
            Metric::VerifiedOccupancy => "Verified occupancy index (%)",
            Metric::VerifiedLethality => "Verified lethality (%)",
        }
    }

    pub fn value(self, r: &EnrichedRecord) -> f64 {
        match self {
            Metric::Occupancy => r.record.occupancy_index,
            Metric::AvgStay => r.record.avg_stay,
            Metric::Lethality => r.record.lethality,
            Metric::Discharges => r.record.discharges,
            Metric::AvailableBedDays => r.record.available_bed_days,
            Metric::OccupiedBedDays => r.record.occupied_bed_days,
            Metric::VerifiedOccupancy => r.verified_occupancy_index,
            Metric::VerifiedLethality => r.verified_lethality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_raw_uses_upstream_column_names() {
        let rec = MonthlyFacilityRecord {
            facility_code: "000123".to_string(),
            year: Some(2025),
            month: None,
            discharges: 20.0,
            ..Default::default()
        };
        let raw = rec.to_raw();
        assert_eq!(raw[columns::FACILITY_CODE], Value::String("000123".to_string()));
        assert_eq!(raw[columns::PERIOD], Value::from(2025));
        assert_eq!(raw[columns::MONTH], Value::Null);
        assert_eq!(raw[columns::DISCHARGES].as_f64(), Some(20.0));
        assert_eq!(raw.len(), 8 + columns::COUNTERS.len() + columns::UPSTREAM_INDICATORS.len());
    }

    #[test]
    fn metric_reads_verified_fields() {
        let r = EnrichedRecord {
            record: MonthlyFacilityRecord { occupancy_index: 70.0, ..Default::default() },
            verified_occupancy_index: 80.0,
            verified_lethality: 5.0,
        };
        assert_eq!(Metric::Occupancy.value(&r), 70.0);
        assert_eq!(Metric::VerifiedOccupancy.value(&r), 80.0);
    }
}
