use landview_shared::geo::point_in_ring;
use landview_shared::{LatLng, Polygon};

use crate::viewport::project;

const GRID_COLS: usize = 50;
const GRID_ROWS: usize = 50;

/// A polygon projected once into zoom-0 world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedShape {
    /// Outer ring first, then holes.
    pub rings: Vec<Vec<(f64, f64)>>,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ProjectedShape {
    pub fn from_polygon(polygon: &Polygon) -> Self {
        let rings: Vec<Vec<(f64, f64)>> = polygon
            .coordinates
            .iter()
            .map(|ring| {
                ring.iter()
                    .map(|p| project(LatLng::new(p[1], p[0]), 0.0))
                    .collect()
            })
            .collect();

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for &(x, y) in rings.first().into_iter().flatten() {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Self {
            rings,
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rings.first().is_none_or(|ring| ring.len() < 3)
    }

    /// Inside the outer ring and outside every hole.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if self.is_empty()
            || x < self.min_x
            || x > self.max_x
            || y < self.min_y
            || y > self.max_y
        {
            return false;
        }
        let mut rings = self.rings.iter();
        let Some(outer) = rings.next() else {
            return false;
        };
        point_in_ring(x, y, outer) && !rings.any(|hole| point_in_ring(x, y, hole))
    }
}

/// A flat 2D grid over world space for parcel hit-testing.
/// Rebuilt whenever the visible parcel set changes.
pub struct SpatialGrid {
    cells: Vec<Vec<usize>>,
    min_x: f64,
    min_y: f64,
    cell_w: f64,
    cell_h: f64,
}

impl SpatialGrid {
    pub fn empty() -> Self {
        Self {
            cells: Vec::new(),
            min_x: 0.0,
            min_y: 0.0,
            cell_w: 1.0,
            cell_h: 1.0,
        }
    }

    /// Index `shapes` by bounding box. Indices returned by `find_at` refer to
    /// positions in this slice.
    pub fn build(shapes: &[ProjectedShape]) -> Self {
        let live = || shapes.iter().filter(|s| !s.is_empty());
        if live().next().is_none() {
            return Self::empty();
        }

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for s in live() {
            min_x = min_x.min(s.min_x);
            min_y = min_y.min(s.min_y);
            max_x = max_x.max(s.max_x);
            max_y = max_y.max(s.max_y);
        }

        // Parcels are tiny at zoom 0; pad by a fraction of the extent.
        let pad = ((max_x - min_x).max(max_y - min_y) * 0.01).max(1e-9);
        min_x -= pad;
        min_y -= pad;
        max_x += pad;
        max_y += pad;

        let cell_w = (max_x - min_x) / GRID_COLS as f64;
        let cell_h = (max_y - min_y) / GRID_ROWS as f64;

        let mut cells = vec![Vec::new(); GRID_COLS * GRID_ROWS];
        for (idx, s) in shapes.iter().enumerate() {
            if s.is_empty() {
                continue;
            }
            let col_start = ((s.min_x - min_x) / cell_w).floor().max(0.0) as usize;
            let col_end = ((s.max_x - min_x) / cell_w).floor().min(GRID_COLS as f64 - 1.0) as usize;
            let row_start = ((s.min_y - min_y) / cell_h).floor().max(0.0) as usize;
            let row_end = ((s.max_y - min_y) / cell_h).floor().min(GRID_ROWS as f64 - 1.0) as usize;

            for row in row_start..=row_end {
                for col in col_start..=col_end {
                    cells[row * GRID_COLS + col].push(idx);
                }
            }
        }

        Self {
            cells,
            min_x,
            min_y,
            cell_w,
            cell_h,
        }
    }

    /// Topmost shape containing the world point. Later shapes draw on top,
    /// so candidates are checked last-to-first.
    pub fn find_at(&self, shapes: &[ProjectedShape], wx: f64, wy: f64) -> Option<usize> {
        if self.cells.is_empty() {
            return None;
        }

        let col = ((wx - self.min_x) / self.cell_w).floor() as isize;
        let row = ((wy - self.min_y) / self.cell_h).floor() as isize;
        if col < 0 || row < 0 || col >= GRID_COLS as isize || row >= GRID_ROWS as isize {
            return None;
        }

        self.cells[row as usize * GRID_COLS + col as usize]
            .iter()
            .rev()
            .copied()
            .find(|&idx| shapes.get(idx).is_some_and(|s| s.contains(wx, wy)))
    }
}
