use serde::{Deserialize, Serialize};

use crate::geo::{GeoBounds, LatLng, Position, path_length_m, polygon_area_sqm};

/// GeoJSON polygon: outer ring first, holes after, positions in `[lon, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Polygon")]
pub struct Polygon {
    pub coordinates: Vec<Vec<Position>>,
}

impl Polygon {
    pub fn new(coordinates: Vec<Vec<Position>>) -> Self {
        Self { coordinates }
    }

    pub fn outer_ring(&self) -> &[Position] {
        self.coordinates.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bounds of the outer ring; holes cannot extend past it.
    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::from_positions(self.outer_ring())
    }

    /// Planar approximation of the outer ring minus its holes.
    pub fn approx_area_sqm(&self) -> f64 {
        let mut rings = self.coordinates.iter();
        let Some(outer) = rings.next() else {
            return 0.0;
        };
        let holes: f64 = rings.map(|ring| polygon_area_sqm(ring)).sum();
        (polygon_area_sqm(outer) - holes).max(0.0)
    }

    pub fn perimeter_m(&self) -> f64 {
        let ring = self.outer_ring();
        let mut length = path_length_m(ring);
        if let (Some(first), Some(last)) = (ring.first(), ring.last())
            && first != last
        {
            length += path_length_m(&[*last, *first]);
        }
        length
    }
}

/// Attribute bag of a parcel, as served in a feature's `properties`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParcelProperties {
    pub parcel_id: String,
    pub region: String,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub ward: Option<String>,
    #[serde(default)]
    pub area_sqm: Option<f64>,
    #[serde(default)]
    pub perimeter_m: Option<f64>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub land_use: Option<String>,
    #[serde(default)]
    pub zoning: Option<String>,
    #[serde(default)]
    pub valuation: Option<f64>,
    /// Backend timestamps arrive as ISO datetimes, bare dates, or null.
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One land parcel, in GeoJSON `Feature` form. Never mutated after receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct ParcelRecord {
    pub id: String,
    pub geometry: Polygon,
    pub properties: ParcelProperties,
}

impl ParcelRecord {
    pub fn region(&self) -> &str {
        &self.properties.region
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        self.geometry.bounds()
    }

    /// Center of the outer ring's bounds, used for focus requests.
    pub fn center(&self) -> Option<LatLng> {
        self.bounds().map(|b| b.center())
    }

    /// Recorded area, falling back to the planar approximation of the geometry.
    pub fn area_sqm(&self) -> f64 {
        self.properties
            .area_sqm
            .unwrap_or_else(|| self.geometry.approx_area_sqm())
    }

    pub fn perimeter_m(&self) -> f64 {
        self.properties
            .perimeter_m
            .unwrap_or_else(|| self.geometry.perimeter_m())
    }
}

/// Ordered server response. `total` is the server-side match count and may
/// exceed `features.len()` when the server caps results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct ParcelCollection {
    pub features: Vec<ParcelRecord>,
    #[serde(default)]
    pub total: usize,
}

impl ParcelCollection {
    pub fn new(features: Vec<ParcelRecord>, total: usize) -> Self {
        Self { features, total }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ParcelRecord> {
        self.features.iter().find(|record| record.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// True when the server matched more records than it returned.
    pub fn is_truncated(&self) -> bool {
        self.total > self.features.len()
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        self.features
            .iter()
            .filter_map(ParcelRecord::bounds)
            .reduce(|acc, b| acc.union(&b))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn square(west: f64, south: f64, size: f64) -> Polygon {
        Polygon::new(vec![vec![
            [west, south],
            [west + size, south],
            [west + size, south + size],
            [west, south + size],
            [west, south],
        ]])
    }

    pub fn record(id: &str, region: &str) -> ParcelRecord {
        ParcelRecord {
            id: id.to_string(),
            geometry: square(39.2050, -6.7820, 0.001),
            properties: ParcelProperties {
                parcel_id: id.to_string(),
                region: region.to_string(),
                ..ParcelProperties::default()
            },
        }
    }
}
