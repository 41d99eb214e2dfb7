use std::rc::Rc;

use landview_shared::{
    DerivedStats, GeoBounds, IntentKind, ParcelCollection, ParcelRecord, QueryError, QueryIntent,
    RegionFilterState, SearchQuery,
};

use crate::viewport::{ViewportChange, ViewportOrigin};

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// A request the glue must execute. Hand `seq` back to `complete`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub seq: u64,
    pub intent: QueryIntent,
    /// Every region is disabled, so the answer is known to be empty. The glue
    /// completes the ticket with an empty collection instead of fetching;
    /// an empty `regions` list on the wire would mean "all regions".
    pub skip_fetch: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The collection was replaced by the result of an intent of this kind.
    Applied(IntentKind),
    Failed(String),
    /// A newer request was issued after this one; nothing changed.
    Stale,
}

/// Decides which parcel query runs and which response may be displayed.
///
/// Every submitted intent gets the next sequence number. Only the completion
/// carrying the latest number is applied, so a slow early response can never
/// overwrite a newer one.
pub struct QueryCoordinator {
    latest_seq: u64,
    state: LoadState,
    displayed: Rc<ParcelCollection>,
    active: Option<QueryIntent>,
    /// Last non-search intent, restored when a search is cleared.
    base: Option<QueryIntent>,
    search: Option<SearchQuery>,
    regions: RegionFilterState,
    bounds: Option<GeoBounds>,
    selected: Option<String>,
    viewport_limit: u32,
}

impl QueryCoordinator {
    pub fn new(regions: RegionFilterState, viewport_limit: u32) -> Self {
        Self {
            latest_seq: 0,
            state: LoadState::Idle,
            displayed: Rc::new(ParcelCollection::default()),
            active: None,
            base: None,
            search: None,
            regions,
            bounds: None,
            selected: None,
            viewport_limit,
        }
    }

    pub fn start(&mut self) -> Ticket {
        self.submit(self.region_intent())
    }

    pub fn submit(&mut self, intent: QueryIntent) -> Ticket {
        self.latest_seq += 1;
        self.state = LoadState::Loading;
        match &intent {
            QueryIntent::Search { query, .. } => self.search = Some(query.clone()),
            _ => {
                self.search = None;
                self.base = Some(intent.clone());
            }
        }
        self.active = Some(intent.clone());
        Ticket {
            seq: self.latest_seq,
            intent,
            skip_fetch: self.regions.enabled_count() == 0,
        }
    }

    /// Flip a region flag. `None` for a region that is not known.
    pub fn toggle_region(&mut self, name: &str) -> Option<Ticket> {
        if !self.regions.toggle(name) {
            return None;
        }
        let region_intent = self.region_intent();
        match self.search.clone() {
            Some(query) => {
                self.base = Some(region_intent);
                let regions = self.regions.enabled_names();
                Some(self.submit(QueryIntent::Search { query, regions }))
            }
            None => Some(self.submit(region_intent)),
        }
    }

    pub fn on_viewport_change(&mut self, change: ViewportChange) -> Option<Ticket> {
        self.bounds = Some(change.bounds);
        if change.origin != ViewportOrigin::User || self.is_searching() {
            return None;
        }
        let intent = QueryIntent::Viewport {
            bounds: change.bounds,
            regions: self.regions.enabled_names(),
            limit: self.viewport_limit,
        };
        Some(self.submit(intent))
    }

    pub fn search(&mut self, query: SearchQuery) -> Ticket {
        let regions = self.regions.enabled_names();
        self.submit(QueryIntent::Search { query, regions })
    }

    /// Leave search mode and re-issue whatever was showing before it.
    pub fn clear_search(&mut self) -> Option<Ticket> {
        self.search.as_ref()?;
        let intent = self.base.clone().unwrap_or_else(|| self.region_intent());
        Some(self.submit(intent))
    }

    pub fn retry(&mut self) -> Option<Ticket> {
        let intent = self.active.clone()?;
        Some(self.submit(intent))
    }

    pub fn complete(
        &mut self,
        seq: u64,
        result: Result<ParcelCollection, QueryError>,
    ) -> Completion {
        if seq != self.latest_seq {
            return Completion::Stale;
        }
        match result {
            Ok(collection) => {
                if let Some(id) = &self.selected
                    && !collection.contains(id)
                {
                    self.selected = None;
                }
                self.displayed = Rc::new(collection);
                self.state = LoadState::Loaded;
                let kind = self
                    .active
                    .as_ref()
                    .map_or(IntentKind::Region, QueryIntent::kind);
                Completion::Applied(kind)
            }
            Err(error) => {
                let message = error.to_string();
                self.state = LoadState::Failed(message.clone());
                Completion::Failed(message)
            }
        }
    }

    /// Select a displayed record. Returns false if the id is not displayed.
    pub fn select(&mut self, id: &str) -> bool {
        if !self.displayed.contains(id) {
            return false;
        }
        self.selected = Some(id.to_string());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_record(&self) -> Option<&ParcelRecord> {
        self.selected.as_deref().and_then(|id| self.displayed.get(id))
    }

    pub fn displayed(&self) -> Rc<ParcelCollection> {
        Rc::clone(&self.displayed)
    }

    pub fn load_state(&self) -> &LoadState {
        &self.state
    }

    pub fn regions(&self) -> &RegionFilterState {
        &self.regions
    }

    pub fn is_searching(&self) -> bool {
        self.search.is_some()
    }

    pub fn active_search(&self) -> Option<&SearchQuery> {
        self.search.as_ref()
    }

    pub fn last_bounds(&self) -> Option<GeoBounds> {
        self.bounds
    }

    /// Displayed records whose region is enabled, in collection order.
    pub fn visible_records(&self) -> impl Iterator<Item = &ParcelRecord> {
        self.displayed
            .features
            .iter()
            .filter(|r| self.regions.is_enabled(r.region()))
    }

    pub fn derived_stats(&self) -> DerivedStats {
        DerivedStats::from_records(self.visible_records())
    }

    fn region_intent(&self) -> QueryIntent {
        QueryIntent::Region {
            regions: self.regions.enabled_names(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landview_shared::{ParcelProperties, Polygon, SearchField};

    fn record(id: &str, region: &str) -> ParcelRecord {
        ParcelRecord {
            id: id.to_string(),
            geometry: Polygon::new(vec![vec![
                [39.205, -6.782],
                [39.206, -6.782],
                [39.206, -6.781],
                [39.205, -6.781],
                [39.205, -6.782],
            ]]),
            properties: ParcelProperties {
                parcel_id: id.to_string(),
                region: region.to_string(),
                area_sqm: Some(1000.0),
                ..Default::default()
            },
        }
    }

    fn collection(ids: &[(&str, &str)]) -> ParcelCollection {
        let features: Vec<_> = ids.iter().map(|(id, region)| record(id, region)).collect();
        let total = features.len();
        ParcelCollection::new(features, total)
    }

    fn coordinator() -> QueryCoordinator {
        QueryCoordinator::new(RegionFilterState::new(), 1000)
    }

    fn user_change() -> ViewportChange {
        ViewportChange {
            bounds: GeoBounds::new(39.1, -6.9, 39.3, -6.7),
            origin: ViewportOrigin::User,
        }
    }

    fn owner_search(value: &str) -> SearchQuery {
        SearchQuery::new(SearchField::OwnerName, value).expect("valid query")
    }

    #[test]
    fn start_issues_region_intent_for_enabled_regions() {
        let mut c = coordinator();
        let ticket = c.start();
        assert_eq!(ticket.seq, 1);
        assert_eq!(
            ticket.intent,
            QueryIntent::Region {
                regions: vec![
                    "Dar es Salaam".to_string(),
                    "Arusha".to_string(),
                    "Bagamoyo".to_string()
                ]
            }
        );
        assert_eq!(c.load_state(), &LoadState::Loading);
    }

    #[test]
    fn only_latest_completion_is_applied() {
        let mut c = coordinator();
        let first = c.start();
        let second = c.on_viewport_change(user_change()).expect("viewport ticket");
        assert!(second.seq > first.seq);

        assert_eq!(
            c.complete(second.seq, Ok(collection(&[("B", "Arusha")]))),
            Completion::Applied(IntentKind::Viewport)
        );
        // The slower, older response arrives afterwards and is dropped.
        assert_eq!(
            c.complete(first.seq, Ok(collection(&[("A", "Arusha")]))),
            Completion::Stale
        );
        assert!(c.displayed().contains("B"));
        assert!(!c.displayed().contains("A"));
    }

    #[test]
    fn scrambled_completions_leave_the_last_intent_displayed() {
        let mut c = coordinator();
        let tickets = [
            c.start(),
            c.on_viewport_change(user_change()).expect("viewport"),
            c.on_viewport_change(user_change()).expect("viewport"),
            c.toggle_region("Bagamoyo").expect("known region"),
        ];
        let seqs: Vec<u64> = tickets.iter().map(|t| t.seq).collect();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));

        let responses = [
            ("A", "Dar es Salaam"),
            ("B", "Arusha"),
            ("C", "Arusha"),
            ("D", "Dar es Salaam"),
        ];
        for index in [1, 2, 0] {
            let (id, region) = responses[index];
            assert_eq!(
                c.complete(tickets[index].seq, Ok(collection(&[(id, region)]))),
                Completion::Stale
            );
            assert!(c.displayed().is_empty());
            assert_eq!(c.load_state(), &LoadState::Loading);
        }

        let (id, region) = responses[3];
        assert_eq!(
            c.complete(tickets[3].seq, Ok(collection(&[(id, region)]))),
            Completion::Applied(IntentKind::Region)
        );
        assert_eq!(
            c.complete(tickets[0].seq, Ok(collection(&[("A", "Dar es Salaam")]))),
            Completion::Stale
        );
        let shown: Vec<&str> = c.visible_records().map(|r| r.id.as_str()).collect();
        assert_eq!(shown, vec!["D"]);
    }

    #[test]
    fn disabling_every_region_skips_the_fetch() {
        let mut c = coordinator();
        let t = c.start();
        assert!(!t.skip_fetch);
        c.complete(t.seq, Ok(collection(&[("A", "Arusha")])));

        assert!(!c.toggle_region("Dar es Salaam").expect("known").skip_fetch);
        assert!(!c.toggle_region("Arusha").expect("known").skip_fetch);
        let last = c.toggle_region("Bagamoyo").expect("known");
        assert!(last.skip_fetch);
        assert_eq!(last.intent, QueryIntent::Region { regions: vec![] });

        assert_eq!(
            c.complete(last.seq, Ok(ParcelCollection::default())),
            Completion::Applied(IntentKind::Region)
        );
        assert!(c.displayed().is_empty());

        let again = c.toggle_region("Arusha").expect("known");
        assert!(!again.skip_fetch);
    }

    #[test]
    fn stale_failure_does_not_touch_state() {
        let mut c = coordinator();
        let first = c.start();
        let second = c.retry().expect("retry");
        c.complete(second.seq, Ok(collection(&[("A", "Arusha")])));
        let outcome = c.complete(first.seq, Err(QueryError::Transport("reset".into())));
        assert_eq!(outcome, Completion::Stale);
        assert_eq!(c.load_state(), &LoadState::Loaded);
    }

    #[test]
    fn failure_keeps_last_good_collection() {
        let mut c = coordinator();
        let t = c.start();
        c.complete(t.seq, Ok(collection(&[("A", "Arusha")])));

        let t = c.retry().expect("retry");
        let outcome = c.complete(
            t.seq,
            Err(QueryError::Status {
                status: 500,
                text: "Internal Server Error".into(),
            }),
        );
        assert_eq!(
            outcome,
            Completion::Failed("server returned 500: Internal Server Error".into())
        );
        assert!(matches!(c.load_state(), LoadState::Failed(_)));
        assert!(c.displayed().contains("A"));

        let t = c.retry().expect("retry after failure");
        assert_eq!(c.load_state(), &LoadState::Loading);
        assert!(matches!(t.intent, QueryIntent::Region { .. }));
    }

    #[test]
    fn programmatic_changes_do_not_query() {
        let mut c = coordinator();
        let change = ViewportChange {
            origin: ViewportOrigin::Programmatic,
            ..user_change()
        };
        assert_eq!(c.on_viewport_change(change), None);
        assert_eq!(c.last_bounds(), Some(change.bounds));
    }

    #[test]
    fn search_suppresses_viewport_queries_until_cleared() {
        let mut c = coordinator();
        let viewport = c.on_viewport_change(user_change()).expect("viewport");
        c.search(owner_search("john"));
        assert!(c.is_searching());
        assert_eq!(c.on_viewport_change(user_change()), None);

        let restored = c.clear_search().expect("clear");
        assert_eq!(restored.intent, viewport.intent);
        assert!(!c.is_searching());
        assert_eq!(c.clear_search(), None);
    }

    #[test]
    fn clear_search_without_base_issues_region_intent() {
        let mut c = coordinator();
        c.search(owner_search("john"));
        let ticket = c.clear_search().expect("clear");
        assert!(matches!(ticket.intent, QueryIntent::Region { .. }));
    }

    #[test]
    fn toggle_during_search_reruns_search_with_new_regions() {
        let mut c = coordinator();
        c.start();
        c.search(owner_search("john"));

        let ticket = c.toggle_region("Arusha").expect("known region");
        match &ticket.intent {
            QueryIntent::Search { query, regions } => {
                assert_eq!(query.value(), "john");
                assert_eq!(
                    regions,
                    &vec!["Dar es Salaam".to_string(), "Bagamoyo".to_string()]
                );
            }
            other => panic!("expected search intent, got {other:?}"),
        }
        assert!(c.is_searching());

        let restored = c.clear_search().expect("clear");
        assert_eq!(
            restored.intent,
            QueryIntent::Region {
                regions: vec!["Dar es Salaam".to_string(), "Bagamoyo".to_string()]
            }
        );
    }

    #[test]
    fn toggle_unknown_region_is_ignored() {
        let mut c = coordinator();
        let before = c.start();
        assert_eq!(c.toggle_region("Mwanza"), None);
        assert_eq!(c.retry().map(|t| t.seq), Some(before.seq + 1));
    }

    #[test]
    fn selection_is_dropped_when_record_disappears() {
        let mut c = coordinator();
        let t = c.start();
        c.complete(t.seq, Ok(collection(&[("A", "Arusha"), ("B", "Arusha")])));
        assert!(!c.select("Z"));
        assert!(c.select("A"));
        assert_eq!(c.selected_record().map(|r| r.id.as_str()), Some("A"));

        let t = c.on_viewport_change(user_change()).expect("viewport");
        c.complete(t.seq, Ok(collection(&[("A", "Arusha")])));
        assert_eq!(c.selected_id(), Some("A"));

        let t = c.on_viewport_change(user_change()).expect("viewport");
        c.complete(t.seq, Ok(collection(&[("B", "Arusha")])));
        assert_eq!(c.selected_id(), None);
    }

    #[test]
    fn stats_cover_only_enabled_regions() {
        let mut c = coordinator();
        let t = c.start();
        c.complete(
            t.seq,
            Ok(collection(&[
                ("A", "Arusha"),
                ("D", "Dar es Salaam"),
                ("X", "Mwanza"),
            ])),
        );
        assert_eq!(c.derived_stats().total_count, 2);

        c.toggle_region("Arusha");
        assert_eq!(c.visible_records().count(), 1);
        assert_eq!(c.derived_stats().total_area_sqm, 1000.0);
    }
}
