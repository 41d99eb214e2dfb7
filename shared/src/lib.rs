pub mod colors;
pub mod error;
pub mod export;
pub mod format;
pub mod geo;
pub mod parcel;
pub mod query;
pub mod region;
pub mod search;
pub mod stats;

pub use colors::region_color_hex;
pub use error::QueryError;
pub use geo::{FocusRequest, GeoBounds, LatLng, Position};
pub use parcel::{ParcelCollection, ParcelProperties, ParcelRecord, Polygon};
pub use query::{IntentKind, QueryIntent};
pub use region::{KNOWN_REGIONS, Region, RegionFilterState};
pub use search::{SearchField, SearchQuery};
pub use stats::DerivedStats;
