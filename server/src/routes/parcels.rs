use axum::Json;
use axum::extract::{Path, Query, State};
use landview_shared::query::{DEFAULT_VIEWPORT_LIMIT, MAX_VIEWPORT_LIMIT, parse_region_list};
use landview_shared::{GeoBounds, ParcelCollection, ParcelRecord, SearchQuery};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    bbox: Option<String>,
    regions: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    field: Option<String>,
    value: Option<String>,
    regions: Option<String>,
}

/// `GET /parcels`: whole regions, or a bbox slice when `bbox` is present.
pub async fn list_parcels(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ParcelCollection>, ApiError> {
    let regions = parse_region_list(params.regions.as_deref());
    let bbox = params.bbox.as_deref().map(str::trim).filter(|b| !b.is_empty());

    let collection = match bbox {
        None => state.parcels.by_regions(&regions),
        Some(raw) => {
            let bounds = GeoBounds::parse_bbox_param(raw)
                .ok_or_else(|| ApiError::InvalidBbox(raw.to_string()))?;
            let limit = parse_limit(params.limit.as_deref())?;
            state.parcels.in_viewport(&bounds, &regions, limit)
        }
    };

    tracing::debug!(
        returned = collection.len(),
        total = collection.total,
        regions = regions.len(),
        viewport = bbox.is_some(),
        "parcel listing"
    );
    Ok(Json(collection))
}

pub async fn search_parcels(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ParcelCollection>, ApiError> {
    let query = SearchQuery::from_params(
        params.field.as_deref().unwrap_or_default(),
        params.value.as_deref().unwrap_or_default(),
    )?;
    let regions = parse_region_list(params.regions.as_deref());
    let collection = state.parcels.search(&query, &regions);

    tracing::debug!(
        field = %query.field(),
        returned = collection.len(),
        total = collection.total,
        "parcel search"
    );
    Ok(Json(collection))
}

pub async fn get_parcel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ParcelRecord>, ApiError> {
    state
        .parcels
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

/// Missing means the default; values above the cap are clamped, zero is rejected.
fn parse_limit(raw: Option<&str>) -> Result<usize, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(DEFAULT_VIEWPORT_LIMIT as usize);
    };
    let limit = raw
        .parse::<u32>()
        .ok()
        .filter(|limit| *limit > 0)
        .ok_or_else(|| ApiError::InvalidLimit(raw.to_string()))?;
    Ok(limit.min(MAX_VIEWPORT_LIMIT) as usize)
}
