use landview_shared::query::DEFAULT_VIEWPORT_LIMIT;

/// Backend base path. Override at build time with `LANDVIEW_API_BASE`.
pub const API_BASE: &str = match option_env!("LANDVIEW_API_BASE") {
    Some(base) => base,
    None => "/api/v1",
};

pub const FETCH_TIMEOUT_SECS: u32 = 20;
pub const VIEWPORT_LIMIT: u32 = DEFAULT_VIEWPORT_LIMIT;

/// Quiet period after the last pan/zoom gesture before bounds are emitted.
pub const VIEWPORT_SETTLE_MS: f64 = 150.0;
pub const FOCUS_ANIMATION_MS: f64 = 300.0;
pub const FIT_PADDING_PX: f64 = 20.0;
pub const LISTING_FOCUS_ZOOM: f64 = 17.0;

pub const MIN_ZOOM: f64 = 3.0;
pub const MAX_ZOOM: f64 = 19.0;
/// Wheel delta (CSS px) per zoom level.
pub const WHEEL_PX_PER_ZOOM_LEVEL: f64 = 240.0;

pub const TILE_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str = "© OpenStreetMap contributors";

pub const SETTINGS_STORAGE_KEY: &str = "landview_settings";
pub const AUTH_TOKEN_STORAGE_KEY: &str = "auth_token";

pub fn api_url(path: &str) -> String {
    format!("{}{}", API_BASE.trim_end_matches('/'), path)
}
