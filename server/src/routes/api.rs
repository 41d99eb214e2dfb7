use axum::Json;
use axum::extract::State;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "parcels": state.parcels.len(),
        "regions": state.parcels.region_counts(),
    }))
}
