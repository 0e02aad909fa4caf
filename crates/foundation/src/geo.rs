/// Geographic position in WGS84 degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Axis-aligned geographic rectangle (west/south/east/north, degrees).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLngBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl LatLngBounds {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Builds the rectangle spanned by two arbitrary corners.
    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        Self {
            west: a.lng.min(b.lng),
            south: a.lat.min(b.lat),
            east: a.lng.max(b.lng),
            north: a.lat.max(b.lat),
        }
    }

    pub fn center(&self) -> LatLng {
        LatLng::new((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }

    /// A rectangle with no interior (degenerate in either axis).
    pub fn is_empty(&self) -> bool {
        self.west >= self.east || self.south >= self.north
    }

    pub fn contains(&self, pos: LatLng) -> bool {
        pos.lng >= self.west && pos.lng <= self.east && pos.lat >= self.south && pos.lat <= self.north
    }

    /// True when `other` lies entirely inside this rectangle.
    pub fn covers(&self, other: &LatLngBounds) -> bool {
        other.west >= self.west
            && other.east <= self.east
            && other.south >= self.south
            && other.north <= self.north
    }
}

/// The host map's visible region plus its discrete zoom level.
///
/// Supplied by the map view on every move/zoom/resize signal; read-only to
/// the loading core.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub bounds: LatLngBounds,
    pub zoom: u8,
}

impl Viewport {
    pub fn new(bounds: LatLngBounds, zoom: u8) -> Self {
        Self { bounds, zoom }
    }

    pub fn center(&self) -> LatLng {
        self.bounds.center()
    }
}

#[cfg(test)]
mod tests {
    use super::{LatLng, LatLngBounds};

    #[test]
    fn from_corners_normalizes_order() {
        let b = LatLngBounds::from_corners(LatLng::new(46.0, -120.0), LatLng::new(45.0, -122.0));
        assert_eq!(b, LatLngBounds::new(-122.0, 45.0, -120.0, 46.0));
    }

    #[test]
    fn center_is_midpoint() {
        let b = LatLngBounds::new(-122.0, 44.0, -120.0, 46.0);
        assert_eq!(b.center(), LatLng::new(45.0, -121.0));
    }

    #[test]
    fn zero_area_is_empty() {
        assert!(LatLngBounds::new(-122.0, 45.0, -122.0, 46.0).is_empty());
        assert!(LatLngBounds::new(-122.0, 45.0, -120.0, 45.0).is_empty());
        assert!(!LatLngBounds::new(-122.0, 45.0, -120.0, 46.0).is_empty());
    }

    #[test]
    fn covers_requires_full_containment() {
        let outer = LatLngBounds::new(-123.0, 44.0, -119.0, 47.0);
        let inner = LatLngBounds::new(-122.0, 45.0, -120.0, 46.0);
        let straddling = LatLngBounds::new(-124.0, 45.0, -120.0, 46.0);
        assert!(outer.covers(&inner));
        assert!(!outer.covers(&straddling));
        assert!(!inner.covers(&outer));
    }

    #[test]
    fn contains_is_edge_inclusive() {
        let b = LatLngBounds::new(-122.0, 45.0, -120.0, 46.0);
        assert!(b.contains(LatLng::new(45.0, -122.0)));
        assert!(b.contains(LatLng::new(45.5, -121.0)));
        assert!(!b.contains(LatLng::new(44.9, -121.0)));
    }
}
