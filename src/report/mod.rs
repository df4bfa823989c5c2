//! Reporting utilities: filters, KPIs, trends, distributions and rankings.
//!
//! Everything here is a pure function over `EnrichedRecord`s; presentation
//! lives in `format` (tables) and `crate::plot` (charts).

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;

use crate::domain::{EnrichedRecord, Metric};

pub mod format;

pub use format::*;

/// Label used for the folded tail of small functional areas.
pub const OTHER_AREAS_LABEL: &str = "Otros";
/// Areas below this share of total discharges are folded into "Otros".
pub const DEFAULT_OTHER_SHARE: f64 = 0.03;
pub const DEFAULT_TOP_FACILITIES: usize = 10;

/// Exact-match filter on health service and functional area names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub service: Option<String>,
    pub area: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, r: &EnrichedRecord) -> bool {
        self.service.as_deref().is_none_or(|s| r.record.service_name == s)
            && self.area.as_deref().is_none_or(|a| r.record.area_name == a)
    }

    pub fn apply(&self, records: &[EnrichedRecord]) -> Vec<EnrichedRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.service.is_none() && self.area.is_none()
    }
}

/// Distinct health service names, in first-appearance order.
pub fn distinct_services(records: &[EnrichedRecord]) -> Vec<String> {
    distinct(records.iter().map(|r| r.record.service_name.as_str()))
}

/// Distinct functional area names, in first-appearance order.
pub fn distinct_areas(records: &[EnrichedRecord]) -> Vec<String> {
    distinct(records.iter().map(|r| r.record.area_name.as_str()))
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Headline indicators for a (filtered) record set.
#[derive(Debug, Clone, PartialEq)]
pub struct Kpis {
    pub records: usize,
    /// Mean of the upstream occupancy index; `None` without records.
    pub avg_occupancy: Option<f64>,
    pub total_discharges: f64,
    /// Mean of the upstream average stay; `None` without records.
    pub avg_stay: Option<f64>,
    /// Discharge-weighted lethality: Σdeceased / Σdischarges × 100.
    pub lethality: f64,
}

pub fn compute_kpis(records: &[EnrichedRecord]) -> Kpis {
    let total_discharges: f64 = records.iter().map(|r| r.record.discharges).sum();
    let total_deceased: f64 = records.iter().map(|r| r.record.deceased).sum();

    Kpis {
        records: records.len(),
        avg_occupancy: mean(records.iter().map(|r| r.record.occupancy_index)),
        total_discharges,
        avg_stay: mean(records.iter().map(|r| r.record.avg_stay)),
        lethality: crate::indicators::lethality(total_deceased, total_discharges),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// One month of a trend series.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub year: i32,
    pub month: u32,
    /// First day of the month.
    pub date: NaiveDate,
    /// Mean of the metric over all records of that month.
    pub value: f64,
    pub records: usize,
}

/// Monthly mean of `metric`, oldest month first.
///
/// Records without a year, or with a month outside 1..=12, are skipped.
pub fn trend(records: &[EnrichedRecord], metric: Metric) -> Vec<TrendPoint> {
    let mut groups: BTreeMap<(i32, u32), (f64, usize)> = BTreeMap::new();
    for r in records {
        let (Some(year), Some(month)) = (r.record.year, r.record.month) else {
            continue;
        };
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            continue;
        }
        let entry = groups.entry((year, month)).or_insert((0.0, 0));
        entry.0 += metric.value(r);
        entry.1 += 1;
    }

    groups
        .into_iter()
        .filter_map(|((year, month), (sum, n))| {
            Some(TrendPoint {
                year,
                month,
                date: NaiveDate::from_ymd_opt(year, month, 1)?,
                value: sum / n as f64,
                records: n,
            })
        })
        .collect()
}

/// Discharges attributed to one functional area (or the "Otros" bucket).
#[derive(Debug, Clone, PartialEq)]
pub struct AreaShare {
    pub area: String,
    pub discharges: f64,
    /// Percentage of total discharges.
    pub share: f64,
}

/// Discharges by functional area, largest first.
///
/// Areas under `other_share` of the total are summed into a trailing
/// `"Otros"` entry.
pub fn area_distribution(records: &[EnrichedRecord], other_share: f64) -> Vec<AreaShare> {
    let mut order: Vec<String> = Vec::new();
    let mut sums: HashMap<String, f64> = HashMap::new();
    for r in records {
        let area = &r.record.area_name;
        if !sums.contains_key(area) {
            order.push(area.clone());
        }
        *sums.entry(area.clone()).or_insert(0.0) += r.record.discharges;
    }

    let mut areas: Vec<(String, f64)> = order
        .into_iter()
        .map(|a| {
            let v = sums.get(&a).copied().unwrap_or(0.0);
            (a, v)
        })
        .collect();
    // Stable sort keeps first-appearance order among ties.
    areas.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let total: f64 = areas.iter().map(|(_, v)| v).sum();
    let threshold = other_share * total;
    let share = |v: f64| if total > 0.0 { v / total * 100.0 } else { 0.0 };

    let (kept, folded): (Vec<_>, Vec<_>) = areas.into_iter().partition(|(_, v)| *v >= threshold);

    let mut out: Vec<AreaShare> = kept
        .into_iter()
        .map(|(area, discharges)| AreaShare {
            area,
            discharges,
            share: share(discharges),
        })
        .collect();

    if !folded.is_empty() {
        let discharges: f64 = folded.iter().map(|(_, v)| v).sum();
        out.push(AreaShare {
            area: OTHER_AREAS_LABEL.to_string(),
            discharges,
            share: share(discharges),
        });
    }
    out
}

/// Mean indicators for one facility.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityRank {
    pub facility: String,
    pub avg_occupancy: f64,
    pub avg_lethality: f64,
    pub records: usize,
}

/// Facilities with the highest mean upstream occupancy, highest first.
pub fn top_facilities(records: &[EnrichedRecord], n: usize) -> Vec<FacilityRank> {
    let mut order: Vec<String> = Vec::new();
    let mut sums: HashMap<String, (f64, f64, usize)> = HashMap::new();
    for r in records {
        let name = &r.record.facility_name;
        if !sums.contains_key(name) {
            order.push(name.clone());
        }
        let e = sums.entry(name.clone()).or_insert((0.0, 0.0, 0));
        e.0 += r.record.occupancy_index;
        e.1 += r.record.lethality;
        e.2 += 1;
    }

    let mut ranks: Vec<FacilityRank> = order
        .into_iter()
        .filter_map(|facility| {
            let (occ, leth, count) = *sums.get(&facility)?;
            Some(FacilityRank {
                avg_occupancy: occ / count as f64,
                avg_lethality: leth / count as f64,
                records: count,
                facility,
            })
        })
        .collect();

    ranks.sort_by(|a, b| {
        b.avg_occupancy
            .partial_cmp(&a.avg_occupancy)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranks.truncate(n);
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MonthlyFacilityRecord;
    use crate::indicators::enrich;

    fn rec(service: &str, area: &str, facility: &str, ym: (Option<i32>, Option<u32>)) -> MonthlyFacilityRecord {
        MonthlyFacilityRecord {
            service_name: service.to_string(),
            area_name: area.to_string(),
            facility_name: facility.to_string(),
            year: ym.0,
            month: ym.1,
            ..Default::default()
        }
    }

    fn sample() -> Vec<EnrichedRecord> {
        let mut a = rec("Maule", "Medicina", "Talca", (Some(2025), Some(2)));
        a.occupancy_index = 90.0;
        a.discharges = 100.0;
        a.deceased = 4.0;
        a.avg_stay = 5.0;
        a.lethality = 4.0;

        let mut b = rec("Maule", "Cirugia", "Curico", (Some(2025), Some(1)));
        b.occupancy_index = 70.0;
        b.discharges = 300.0;
        b.deceased = 3.0;
        b.avg_stay = 3.0;
        b.lethality = 1.0;

        let mut c = rec("Biobio", "Medicina", "Talca", (Some(2025), Some(2)));
        c.occupancy_index = 80.0;
        c.discharges = 5.0;
        c.avg_stay = 4.0;

        let d = rec("Biobio", "UCI", "Los Angeles", (None, Some(2)));

        enrich(&[a, b, c, d])
    }

    #[test]
    fn filter_matches_service_and_area() {
        let records = sample();
        let filter = RecordFilter {
            service: Some("Maule".to_string()),
            area: Some("Medicina".to_string()),
        };
        let out = filter.apply(&records);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].record.facility_name, "Talca");
        assert_eq!(RecordFilter::default().apply(&records).len(), 4);
    }

    #[test]
    fn distinct_values_keep_first_appearance_order() {
        let records = sample();
        assert_eq!(distinct_services(&records), vec!["Maule", "Biobio"]);
        assert_eq!(distinct_areas(&records), vec!["Medicina", "Cirugia", "UCI"]);
    }

    #[test]
    fn kpis_weight_lethality_by_discharges() {
        let kpis = compute_kpis(&sample());
        assert_eq!(kpis.records, 4);
        assert_eq!(kpis.total_discharges, 405.0);
        // 7 deaths over 405 discharges.
        assert!((kpis.lethality - 7.0 / 405.0 * 100.0).abs() < 1e-9);
        assert!((kpis.avg_occupancy.unwrap() - 60.0).abs() < 1e-9);
        assert!((kpis.avg_stay.unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn kpis_of_empty_set() {
        let kpis = compute_kpis(&[]);
        assert_eq!(kpis.avg_occupancy, None);
        assert_eq!(kpis.avg_stay, None);
        assert_eq!(kpis.lethality, 0.0);
    }

    #[test]
    fn trend_groups_by_month_and_skips_missing_periods() {
        let points = trend(&sample(), Metric::Occupancy);
        assert_eq!(points.len(), 2);
        assert_eq!((points[0].year, points[0].month), (2025, 1));
        assert_eq!(points[0].value, 70.0);
        assert_eq!(points[1].date, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(points[1].value, 85.0);
        assert_eq!(points[1].records, 2);
    }

    #[test]
    fn trend_skips_invalid_month() {
        let records = enrich(&[rec("S", "A", "F", (Some(2025), Some(13)))]);
        assert!(trend(&records, Metric::Discharges).is_empty());
    }

    #[test]
    fn small_areas_fold_into_otros() {
        let out = area_distribution(&sample(), DEFAULT_OTHER_SHARE);
        let names: Vec<&str> = out.iter().map(|a| a.area.as_str()).collect();
        // Medicina=105, Cirugia=300, UCI=0 (< 3% of 405).
        assert_eq!(names, vec!["Cirugia", "Medicina", "Otros"]);
        assert_eq!(out[2].discharges, 0.0);
        let total_share: f64 = out.iter().map(|a| a.share).sum();
        assert!((total_share - 100.0).abs() < 1e-9);
    }

    #[test]
    fn no_otros_entry_when_nothing_is_small() {
        let out = area_distribution(&sample()[..2], DEFAULT_OTHER_SHARE);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|a| a.area != OTHER_AREAS_LABEL));
    }

    #[test]
    fn top_facilities_ranked_by_mean_occupancy() {
        let out = top_facilities(&sample(), 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].facility, "Talca");
        assert_eq!(out[0].avg_occupancy, 85.0);
        assert_eq!(out[0].records, 2);
        assert_eq!(out[1].facility, "Curico");
    }
}
