use std::rc::Rc;

use landview_shared::format::format_area;
use landview_shared::{
    GeoBounds, IntentKind, ParcelCollection, ParcelRecord, RegionFilterState, region_color_hex,
};

use crate::spatial::{ProjectedShape, SpatialGrid};
use crate::viewport::MapView;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParcelStyle {
    pub color: &'static str,
    pub weight: f64,
    pub stroke_opacity: f64,
    pub fill_opacity: f64,
}

pub fn style_for(region: &str, hovered: bool) -> ParcelStyle {
    ParcelStyle {
        color: region_color_hex(region),
        weight: if hovered { 3.0 } else { 2.0 },
        stroke_opacity: 0.8,
        fill_opacity: if hovered { 0.6 } else { 0.4 },
    }
}

/// Why the layer is being rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileCause {
    CollectionReplaced(IntentKind),
    FilterChanged,
}

impl ReconcileCause {
    /// Region and search results are framed; viewport results and local
    /// filter changes leave the map where the user put it.
    fn wants_fit(self) -> bool {
        matches!(
            self,
            ReconcileCause::CollectionReplaced(IntentKind::Region | IntentKind::Search)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRequest {
    pub bounds: GeoBounds,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoverPopup {
    pub parcel_id: String,
    pub region: String,
    pub owner: Option<String>,
    pub area: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub record: ParcelRecord,
}

struct LayerContents {
    collection: Rc<ParcelCollection>,
    /// Indices into `collection.features`, in draw order.
    visible: Vec<usize>,
    /// One per entry of `visible`.
    shapes: Vec<ProjectedShape>,
    grid: SpatialGrid,
    bounds: Option<GeoBounds>,
}

/// The drawable parcel layer: the filtered records, their projected shapes
/// and the hover state. Rebuilt wholesale on every reconcile.
#[derive(Default)]
pub struct ParcelLayer {
    contents: Option<LayerContents>,
    /// Position in `visible`.
    hovered: Option<usize>,
}

impl ParcelLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the layer with the enabled-region subset of `collection`.
    pub fn reconcile(
        &mut self,
        collection: Rc<ParcelCollection>,
        regions: &RegionFilterState,
        cause: ReconcileCause,
    ) -> Option<FitRequest> {
        self.clear();

        let visible: Vec<usize> = collection
            .features
            .iter()
            .enumerate()
            .filter(|(_, r)| regions.is_enabled(r.region()))
            .map(|(i, _)| i)
            .collect();
        let shapes: Vec<ProjectedShape> = visible
            .iter()
            .map(|&i| ProjectedShape::from_polygon(&collection.features[i].geometry))
            .collect();
        let bounds = visible
            .iter()
            .filter_map(|&i| collection.features[i].bounds())
            .reduce(|acc, b| acc.union(&b));
        let grid = SpatialGrid::build(&shapes);

        self.contents = Some(LayerContents {
            collection,
            visible,
            shapes,
            grid,
            bounds,
        });

        if cause.wants_fit() {
            self.visible_bounds().map(|bounds| FitRequest { bounds })
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.contents = None;
        self.hovered = None;
    }

    pub fn len(&self) -> usize {
        self.contents.as_ref().map_or(0, |c| c.visible.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn visible_bounds(&self) -> Option<GeoBounds> {
        self.contents.as_ref().and_then(|c| c.bounds)
    }

    pub fn visible_records(&self) -> impl Iterator<Item = &ParcelRecord> {
        self.contents
            .iter()
            .flat_map(|c| c.visible.iter().map(move |&i| &c.collection.features[i]))
    }

    /// Shapes in draw order with their current style.
    pub fn paint_items(&self) -> impl Iterator<Item = (&ProjectedShape, ParcelStyle)> {
        let hovered = self.hovered;
        self.contents.iter().flat_map(move |c| {
            c.visible.iter().zip(&c.shapes).enumerate().map(move |(pos, (&i, shape))| {
                let record = &c.collection.features[i];
                (shape, style_for(record.region(), hovered == Some(pos)))
            })
        })
    }

    fn hit(&self, view: &MapView, sx: f64, sy: f64) -> Option<usize> {
        let c = self.contents.as_ref()?;
        let (wx, wy) = view.screen_to_world(sx, sy);
        c.grid.find_at(&c.shapes, wx, wy)
    }

    fn record_at(&self, pos: usize) -> Option<&ParcelRecord> {
        let c = self.contents.as_ref()?;
        c.visible.get(pos).map(|&i| &c.collection.features[i])
    }

    /// Update hover from a pointer position. Returns true if it changed.
    pub fn hover_at(&mut self, view: &MapView, sx: f64, sy: f64) -> bool {
        let hit = self.hit(view, sx, sy);
        let changed = hit != self.hovered;
        self.hovered = hit;
        changed
    }

    pub fn clear_hover(&mut self) -> bool {
        self.hovered.take().is_some()
    }

    pub fn hovered_record(&self) -> Option<&ParcelRecord> {
        self.hovered.and_then(|pos| self.record_at(pos))
    }

    pub fn popup(&self) -> Option<HoverPopup> {
        let record = self.hovered_record()?;
        Some(HoverPopup {
            parcel_id: record.properties.parcel_id.clone(),
            region: record.properties.region.clone(),
            owner: record.properties.owner_name.clone(),
            area: format_area(record.area_sqm()),
        })
    }

    pub fn click_at(&self, view: &MapView, sx: f64, sy: f64) -> Option<Selection> {
        let pos = self.hit(view, sx, sy)?;
        self.record_at(pos).map(|record| Selection {
            record: record.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landview_shared::{FocusRequest, ParcelProperties, Polygon};

    fn record(id: &str, region: &str, west: f64, south: f64) -> ParcelRecord {
        let size = 0.001;
        ParcelRecord {
            id: id.to_string(),
            geometry: Polygon::new(vec![vec![
                [west, south],
                [west + size, south],
                [west + size, south + size],
                [west, south + size],
                [west, south],
            ]]),
            properties: ParcelProperties {
                parcel_id: id.to_string(),
                region: region.to_string(),
                owner_name: Some("Amina Juma".to_string()),
                area_sqm: Some(2450.0),
                ..Default::default()
            },
        }
    }

    fn sample() -> Rc<ParcelCollection> {
        Rc::new(ParcelCollection::new(
            vec![
                record("DSM001", "Dar es Salaam", 39.2050, -6.7820),
                record("ARU001", "Arusha", 36.6830, -3.3869),
                record("DSM002", "Dar es Salaam", 39.2100, -6.7800),
            ],
            3,
        ))
    }

    fn ids(layer: &ParcelLayer) -> Vec<String> {
        layer.visible_records().map(|r| r.id.clone()).collect()
    }

    fn view_on(lat: f64, lng: f64) -> MapView {
        MapView::new(FocusRequest::new(lat, lng, 17.0), 800.0, 600.0)
    }

    #[test]
    fn styles_follow_region_and_hover() {
        let normal = style_for("Arusha", false);
        assert_eq!(normal.color, "#F59E0B");
        assert_eq!((normal.weight, normal.fill_opacity), (2.0, 0.4));
        let hovered = style_for("Arusha", true);
        assert_eq!((hovered.weight, hovered.fill_opacity), (3.0, 0.6));
        assert_eq!(style_for("Mwanza", false).color, "#3B82F6");
    }

    #[test]
    fn reconcile_keeps_enabled_regions_in_order() {
        let mut regions = RegionFilterState::new();
        regions.toggle("Arusha");
        let mut layer = ParcelLayer::new();
        layer.reconcile(sample(), &regions, ReconcileCause::FilterChanged);
        assert_eq!(ids(&layer), vec!["DSM001", "DSM002"]);

        // Same inputs, same result.
        layer.reconcile(sample(), &regions, ReconcileCause::FilterChanged);
        assert_eq!(ids(&layer), vec!["DSM001", "DSM002"]);
        assert_eq!(layer.paint_items().count(), 2);
    }

    #[test]
    fn toggling_a_region_off_and_on_restores_the_visible_set() {
        let mut regions = RegionFilterState::new();
        let mut layer = ParcelLayer::new();
        layer.reconcile(sample(), &regions, ReconcileCause::FilterChanged);
        let original = ids(&layer);
        assert_eq!(original, vec!["DSM001", "ARU001", "DSM002"]);

        for name in ["Dar es Salaam", "Arusha"] {
            assert!(regions.toggle(name));
            layer.reconcile(sample(), &regions, ReconcileCause::FilterChanged);
            assert!(!ids(&layer).iter().any(|id| {
                sample().get(id).is_some_and(|r| r.region() == name)
            }));

            assert!(regions.toggle(name));
            layer.reconcile(sample(), &regions, ReconcileCause::FilterChanged);
            assert_eq!(ids(&layer), original);
        }
    }

    #[test]
    fn fit_only_for_region_and_search_replacements() {
        let regions = RegionFilterState::new();
        let mut layer = ParcelLayer::new();

        let fit = layer.reconcile(
            sample(),
            &regions,
            ReconcileCause::CollectionReplaced(IntentKind::Region),
        );
        let bounds = fit.expect("region result is framed").bounds;
        assert!(bounds.west <= 36.6830 && bounds.east >= 39.2110);

        assert!(
            layer
                .reconcile(sample(), &regions, ReconcileCause::CollectionReplaced(IntentKind::Search))
                .is_some()
        );
        assert_eq!(
            layer.reconcile(
                sample(),
                &regions,
                ReconcileCause::CollectionReplaced(IntentKind::Viewport)
            ),
            None
        );
        assert_eq!(
            layer.reconcile(sample(), &regions, ReconcileCause::FilterChanged),
            None
        );
    }

    #[test]
    fn empty_visible_set_never_fits() {
        let mut regions = RegionFilterState::new();
        regions.toggle("Dar es Salaam");
        regions.toggle("Arusha");
        let mut layer = ParcelLayer::new();
        let fit = layer.reconcile(
            sample(),
            &regions,
            ReconcileCause::CollectionReplaced(IntentKind::Region),
        );
        assert_eq!(fit, None);
        assert!(layer.is_empty());
    }

    #[test]
    fn hover_and_click_hit_the_parcel_under_the_pointer() {
        let mut layer = ParcelLayer::new();
        layer.reconcile(sample(), &RegionFilterState::new(), ReconcileCause::FilterChanged);
        let view = view_on(-6.7815, 39.2055);

        assert!(layer.hover_at(&view, 400.0, 300.0));
        let popup = layer.popup().expect("popup");
        assert_eq!(popup.parcel_id, "DSM001");
        assert_eq!(popup.owner.as_deref(), Some("Amina Juma"));
        assert_eq!(popup.area, "2.45 km²");
        assert!(!layer.hover_at(&view, 400.0, 300.0));

        let selection = layer.click_at(&view, 400.0, 300.0).expect("selection");
        assert_eq!(selection.record.id, "DSM001");

        assert!(layer.clear_hover());
        assert_eq!(layer.popup(), None);
        assert_eq!(layer.click_at(&view, 5.0, 5.0), None);
    }

    #[test]
    fn reconcile_drops_hover() {
        let mut layer = ParcelLayer::new();
        let regions = RegionFilterState::new();
        layer.reconcile(sample(), &regions, ReconcileCause::FilterChanged);
        layer.hover_at(&view_on(-6.7815, 39.2055), 400.0, 300.0);
        assert!(layer.hovered_record().is_some());
        layer.reconcile(sample(), &regions, ReconcileCause::FilterChanged);
        assert!(layer.hovered_record().is_none());
    }
}
