use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree at the equator. The planar area approximation squares this.
pub const METERS_PER_DEGREE: f64 = 111_319.9;

/// A `[lon, lat]` pair, in GeoJSON axis order.
pub type Position = [f64; 2];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Target of an animated map move: a center and a zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusRequest {
    pub center: LatLng,
    pub zoom: f64,
}

impl FocusRequest {
    pub const fn new(lat: f64, lng: f64, zoom: f64) -> Self {
        Self {
            center: LatLng::new(lat, lng),
            zoom,
        }
    }
}

/// Geographic rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Bounds of a set of positions, or `None` for an empty set.
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Option<Self> {
        let mut iter = positions.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(first[0], first[1], first[0], first[1]);
        for p in iter {
            bounds.extend_position(*p);
        }
        Some(bounds)
    }

    pub fn extend_position(&mut self, p: Position) {
        self.west = self.west.min(p[0]);
        self.east = self.east.max(p[0]);
        self.south = self.south.min(p[1]);
        self.north = self.north.max(p[1]);
    }

    pub fn union(&self, other: &GeoBounds) -> GeoBounds {
        GeoBounds {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }

    /// Envelope intersection test; touching edges count as intersecting.
    pub fn intersects(&self, other: &GeoBounds) -> bool {
        self.west <= other.east
            && other.west <= self.east
            && self.south <= other.north
            && other.south <= self.north
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    pub fn is_valid(&self) -> bool {
        [self.west, self.south, self.east, self.north]
            .iter()
            .all(|v| v.is_finite())
            && self.west <= self.east
            && self.south <= self.north
    }

    /// Serialize as the `west,south,east,north` triple used by `bbox=` query params.
    pub fn to_bbox_param(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }

    /// Parse a `west,south,east,north` bbox parameter.
    pub fn parse_bbox_param(raw: &str) -> Option<GeoBounds> {
        let coords: Vec<f64> = raw
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        let [west, south, east, north] = coords.as_slice() else {
            return None;
        };
        let bounds = GeoBounds::new(*west, *south, *east, *north);
        bounds.is_valid().then_some(bounds)
    }
}

/// Great-circle distance between two points in meters (haversine).
pub fn haversine_distance_m(a: LatLng, b: LatLng) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Sum of haversine legs along a path of `[lon, lat]` positions.
pub fn path_length_m(path: &[Position]) -> f64 {
    path.windows(2)
        .map(|leg| {
            haversine_distance_m(
                LatLng::new(leg[0][1], leg[0][0]),
                LatLng::new(leg[1][1], leg[1][0]),
            )
        })
        .sum()
}

/// Planar shoelace area of a ring given in raw lon/lat, scaled to square meters.
///
/// This is an equatorial approximation, not a geodesic area: it ignores the
/// shrinking of longitude degrees away from the equator and is only meaningful
/// for small extents. The ring may be open or closed.
pub fn polygon_area_sqm(ring: &[Position]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += ring[i][0] * ring[j][1];
        twice_area -= ring[j][0] * ring[i][1];
    }
    (twice_area / 2.0).abs() * METERS_PER_DEGREE * METERS_PER_DEGREE
}

/// Even-odd ray casting. Works for open or closed rings.
pub fn point_in_ring(x: f64, y: f64, ring: &[(f64, f64)]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
