use crate::geo::GeoBounds;
use crate::search::SearchQuery;

pub const DEFAULT_VIEWPORT_LIMIT: u32 = 1000;
pub const MAX_VIEWPORT_LIMIT: u32 = 5000;
pub const SEARCH_RESULT_LIMIT: usize = 100;

pub const PARCELS_PATH: &str = "/parcels";
pub const SEARCH_PATH: &str = "/parcels/search";

/// What a parcel fetch asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryIntent {
    /// All parcels in the enabled regions.
    Region { regions: Vec<String> },
    /// Parcels whose envelope intersects the viewport.
    Viewport {
        bounds: GeoBounds,
        regions: Vec<String>,
        limit: u32,
    },
    /// Explicit text search.
    Search {
        query: SearchQuery,
        regions: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentKind {
    Region,
    Viewport,
    Search,
}

impl QueryIntent {
    pub fn kind(&self) -> IntentKind {
        match self {
            QueryIntent::Region { .. } => IntentKind::Region,
            QueryIntent::Viewport { .. } => IntentKind::Viewport,
            QueryIntent::Search { .. } => IntentKind::Search,
        }
    }

    pub fn regions(&self) -> &[String] {
        match self {
            QueryIntent::Region { regions }
            | QueryIntent::Viewport { regions, .. }
            | QueryIntent::Search { regions, .. } => regions,
        }
    }

    /// Same intent, restricted to a different region set.
    pub fn with_regions(&self, regions: Vec<String>) -> QueryIntent {
        let mut intent = self.clone();
        match &mut intent {
            QueryIntent::Region { regions: r }
            | QueryIntent::Viewport { regions: r, .. }
            | QueryIntent::Search { regions: r, .. } => *r = regions,
        }
        intent
    }

    /// Path relative to the API base.
    pub fn endpoint(&self) -> &'static str {
        match self {
            QueryIntent::Search { .. } => SEARCH_PATH,
            _ => PARCELS_PATH,
        }
    }

    /// Query parameters in wire order. Values are not percent-encoded; the
    /// HTTP client encodes them. An empty region set omits `regions`.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        match self {
            QueryIntent::Region { .. } => {}
            QueryIntent::Viewport { bounds, .. } => {
                params.push(("bbox", bounds.to_bbox_param()));
            }
            QueryIntent::Search { query, .. } => {
                params.push(("field", query.field().as_str().to_string()));
                params.push(("value", query.value().to_string()));
            }
        }
        if let Some(regions) = join_regions(self.regions()) {
            params.push(("regions", regions));
        }
        if let QueryIntent::Viewport { limit, .. } = self {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

/// Comma-join region names for the `regions=` parameter; `None` when empty.
pub fn join_regions(regions: &[String]) -> Option<String> {
    (!regions.is_empty()).then(|| regions.join(","))
}

/// Parse a `regions=` parameter. Missing or blank yields an empty list.
pub fn parse_region_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
