use std::collections::BTreeMap;

use serde::Serialize;

use crate::parcel::ParcelRecord;

const UNKNOWN_BUCKET: &str = "Unknown";

/// Aggregates over whatever subset of records is currently shown.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DerivedStats {
    pub total_count: usize,
    pub total_area_sqm: f64,
    /// Mean over all records; a record with no recorded area contributes 0.
    pub average_area_sqm: f64,
    /// Sum of recorded valuations; records without one are skipped.
    pub total_valuation: f64,
    pub count_by_region: BTreeMap<String, usize>,
    pub count_by_land_use: BTreeMap<String, usize>,
}

impl DerivedStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ParcelRecord>) -> Self {
        let mut stats = DerivedStats::default();
        for record in records {
            let p = &record.properties;
            stats.total_count += 1;
            stats.total_area_sqm += p.area_sqm.unwrap_or(0.0);
            stats.total_valuation += p.valuation.unwrap_or(0.0);
            *stats
                .count_by_region
                .entry(bucket(Some(p.region.as_str())))
                .or_default() += 1;
            *stats
                .count_by_land_use
                .entry(bucket(p.land_use.as_deref()))
                .or_default() += 1;
        }
        if stats.total_count > 0 {
            stats.average_area_sqm = stats.total_area_sqm / stats.total_count as f64;
        }
        stats
    }

    /// Share of `count` in the total, in percent, for distribution bars.
    pub fn percent_of_total(&self, count: usize) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total_count as f64
        }
    }

    /// Land-use buckets, largest first; ties keep name order.
    pub fn land_use_ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .count_by_land_use
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

fn bucket(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN_BUCKET.to_string(),
    }
}
