use foundation::geo::{LatLng, LatLngBounds, Viewport};
use foundation::math::{Vec2, project, unproject};

use crate::cell::{Cell, CellKey};

/// Projected anchor point for grid alignment.
///
/// All cell boundaries are computed relative to this point, so cell keys
/// stay stable under pure pans. Recomputed from the viewport center on
/// every zoom change, which is exactly when the seen-cell table must be
/// reset as well.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GridOrigin {
    pub point: Vec2,
    pub zoom: u8,
}

impl GridOrigin {
    pub fn from_viewport(viewport: &Viewport) -> Self {
        Self {
            point: project(viewport.center(), viewport.zoom),
            zoom: viewport.zoom,
        }
    }
}

/// Rejected grid configuration: cell size must be a positive finite number.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct InvalidCellSize {
    pub cell_size: f64,
}

impl std::fmt::Display for InvalidCellSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "grid cell size must be a positive number, got {}",
            self.cell_size
        )
    }
}

impl std::error::Error for InvalidCellSize {}

/// Converts a viewport into the finite set of grid cells it touches.
///
/// Notes on determinism:
/// - Enumeration is a plain `(row, col)` rectangle walk.
/// - Output is sorted by centroid distance to the viewport center with a
///   `(row, col)` tie-break, so equal-distance cells keep a stable order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GridIndexer {
    cell_size: f64,
    padding: f64,
}

impl GridIndexer {
    pub fn new(cell_size: f64, padding: f64) -> Result<Self, InvalidCellSize> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(InvalidCellSize { cell_size });
        }
        Ok(Self {
            cell_size,
            padding: padding.max(0.0),
        })
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Computes every cell touched by `viewport`, padded by the configured
    /// prefetch margin, freshly on each call.
    ///
    /// Spans from the origin to the padded corners are rounded outward so
    /// partially-covered boundary cells are included rather than dropped.
    pub fn compute_cells(&self, viewport: &Viewport, origin: GridOrigin) -> Vec<Cell> {
        if viewport.bounds.is_empty() {
            return Vec::new();
        }

        let zoom = origin.zoom;
        let size = self.cell_size;
        let bounds = viewport.bounds;

        // North-west corner has the smaller projected coordinates (y grows
        // southward in mercator pixel space).
        let nw = project(LatLng::new(bounds.north, bounds.west), zoom);
        let se = project(LatLng::new(bounds.south, bounds.east), zoom);
        let min = Vec2::new(nw.x - self.padding, nw.y - self.padding);
        let max = Vec2::new(se.x + self.padding, se.y + self.padding);

        let col_start = ((min.x - origin.point.x) / size).floor() as i64;
        let col_end = ((max.x - origin.point.x) / size).ceil() as i64;
        let row_start = ((min.y - origin.point.y) / size).floor() as i64;
        let row_end = ((max.y - origin.point.y) / size).ceil() as i64;

        let view_center = project(viewport.center(), zoom);

        let mut cells = Vec::with_capacity(
            ((row_end - row_start).max(0) as usize) * ((col_end - col_start).max(0) as usize),
        );
        for row in row_start..row_end {
            for col in col_start..col_end {
                let nw_px = origin.point + Vec2::new(col as f64 * size, row as f64 * size);
                let se_px =
                    origin.point + Vec2::new((col + 1) as f64 * size, (row + 1) as f64 * size);
                let center_px =
                    origin.point + Vec2::new((col as f64 + 0.5) * size, (row as f64 + 0.5) * size);

                cells.push(Cell {
                    key: CellKey::new(row, col),
                    bounds: LatLngBounds::from_corners(
                        unproject(nw_px, zoom),
                        unproject(se_px, zoom),
                    ),
                    center: unproject(center_px, zoom),
                    distance: center_px.distance_to(view_center),
                });
            }
        }

        cells.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.key.cmp(&b.key)));
        cells
    }
}
