use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use landview_shared::query::SEARCH_RESULT_LIMIT;
use landview_shared::{GeoBounds, ParcelCollection, ParcelRecord, SearchQuery};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read parcel fixture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parcel fixture is not a FeatureCollection: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate parcel id `{0}`")]
    DuplicateId(String),
}

/// Read-only parcel set loaded once at startup. Queries are linear scans.
#[derive(Debug)]
pub struct ParcelStore {
    records: Vec<ParcelRecord>,
    /// Envelope per record, same order as `records`.
    envelopes: Vec<Option<GeoBounds>>,
}

impl ParcelStore {
    pub fn new(records: Vec<ParcelRecord>) -> Result<Self, StoreError> {
        let mut seen = HashSet::new();
        for record in &records {
            if !seen.insert(record.properties.parcel_id.as_str()) {
                return Err(StoreError::DuplicateId(record.properties.parcel_id.clone()));
            }
        }
        let envelopes = records.iter().map(ParcelRecord::bounds).collect();
        Ok(Self { records, envelopes })
    }

    pub fn from_geojson(raw: &str) -> Result<Self, StoreError> {
        let collection: ParcelCollection = serde_json::from_str(raw)?;
        Self::new(collection.features)
    }

    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_geojson(&raw)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every parcel in the given regions; an empty list means all regions.
    pub fn by_regions(&self, regions: &[String]) -> ParcelCollection {
        collect_limited(
            self.records.iter().filter(|r| in_regions(r, regions)),
            usize::MAX,
        )
    }

    /// Parcels whose envelope intersects `bounds`, at most `limit` of them.
    pub fn in_viewport(
        &self,
        bounds: &GeoBounds,
        regions: &[String],
        limit: usize,
    ) -> ParcelCollection {
        let matches = self
            .records
            .iter()
            .zip(&self.envelopes)
            .filter(|(record, envelope)| {
                in_regions(record, regions)
                    && envelope.as_ref().is_some_and(|env| env.intersects(bounds))
            })
            .map(|(record, _)| record);
        collect_limited(matches, limit)
    }

    pub fn search(&self, query: &SearchQuery, regions: &[String]) -> ParcelCollection {
        collect_limited(
            self.records
                .iter()
                .filter(|r| in_regions(r, regions) && query.matches(r)),
            SEARCH_RESULT_LIMIT,
        )
    }

    /// Lookup by parcel number, falling back to the feature id.
    pub fn get(&self, id: &str) -> Option<&ParcelRecord> {
        self.records
            .iter()
            .find(|r| r.properties.parcel_id == id)
            .or_else(|| self.records.iter().find(|r| r.id == id))
    }

    pub fn region_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.region().to_string()).or_insert(0) += 1;
        }
        counts
    }
}

fn in_regions(record: &ParcelRecord, regions: &[String]) -> bool {
    regions.is_empty() || regions.iter().any(|r| r == record.region())
}

/// `total` counts every match, including the ones past `limit`.
fn collect_limited<'a>(
    matches: impl Iterator<Item = &'a ParcelRecord>,
    limit: usize,
) -> ParcelCollection {
    let mut features = Vec::new();
    let mut total = 0;
    for record in matches {
        total += 1;
        if features.len() < limit {
            features.push(record.clone());
        }
    }
    ParcelCollection::new(features, total)
}

#[derive(Clone)]
pub struct AppState {
    pub parcels: Arc<ParcelStore>,
}

impl AppState {
    pub fn new(parcels: ParcelStore) -> Self {
        Self {
            parcels: Arc::new(parcels),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::fixture_store;
    use super::*;
    use landview_shared::SearchField;

    fn regions(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fixture_covers_every_known_region() {
        let store = fixture_store();
        let counts = store.region_counts();
        for region in landview_shared::KNOWN_REGIONS {
            assert!(counts.get(region.name).copied().unwrap_or(0) > 0, "{}", region.name);
        }
        assert_eq!(counts.values().sum::<usize>(), store.len());
    }

    #[test]
    fn empty_region_list_means_everything() {
        let store = fixture_store();
        assert_eq!(store.by_regions(&[]).len(), store.len());
        let arusha = store.by_regions(&regions(&["Arusha"]));
        assert!(!arusha.is_empty());
        assert!(arusha.features.iter().all(|r| r.region() == "Arusha"));
        assert_eq!(arusha.total, arusha.len());
    }

    #[test]
    fn viewport_total_counts_past_the_limit() {
        let store = fixture_store();
        let dar = GeoBounds::new(39.0, -7.0, 39.5, -6.6);
        let all = store.in_viewport(&dar, &[], usize::MAX);
        assert!(all.len() >= 2);
        assert!(all.features.iter().all(|r| r.region() == "Dar es Salaam"));

        let capped = store.in_viewport(&dar, &[], 1);
        assert_eq!(capped.len(), 1);
        assert_eq!(capped.total, all.len());
        assert!(capped.is_truncated());
    }

    #[test]
    fn viewport_outside_every_parcel_is_empty() {
        let store = fixture_store();
        let ocean = GeoBounds::new(50.0, -20.0, 51.0, -19.0);
        let result = store.in_viewport(&ocean, &[], 10);
        assert!(result.is_empty());
        assert_eq!(result.total, 0);
    }

    #[test]
    fn search_is_case_insensitive_and_region_scoped() {
        let store = fixture_store();
        let query = SearchQuery::new(SearchField::LandUse, "RESIDENTIAL").expect("valid");
        let everywhere = store.search(&query, &[]);
        assert!(everywhere.len() >= 2);
        let scoped = store.search(&query, &regions(&["Bagamoyo"]));
        assert!(scoped.len() < everywhere.len());
        assert!(scoped.features.iter().all(|r| r.region() == "Bagamoyo"));
    }

    #[test]
    fn get_by_parcel_id() {
        let store = fixture_store();
        assert_eq!(
            store.get("DSM-0001").map(|r| r.region()),
            Some("Dar es Salaam")
        );
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","id":"a","geometry":{"type":"Polygon","coordinates":[]},"properties":{"parcel_id":"X","region":"Arusha"}},
            {"type":"Feature","id":"b","geometry":{"type":"Polygon","coordinates":[]},"properties":{"parcel_id":"X","region":"Arusha"}}
        ]}"#;
        assert!(matches!(
            ParcelStore::from_geojson(raw),
            Err(StoreError::DuplicateId(id)) if id == "X"
        ));
    }

    #[test]
    fn malformed_fixture_is_a_parse_error() {
        assert!(matches!(
            ParcelStore::from_geojson("{\"features\": 3}"),
            Err(StoreError::Parse(_))
        ));
    }
}
