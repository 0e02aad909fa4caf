use super::Vec2;
use crate::geo::LatLng;

/// Spherical Web Mercator in pixel space at a discrete zoom level.
///
/// World size at zoom `z` is `256 * 2^z` pixels; `y` grows southward.
/// Latitudes are clamped to the projection's valid range, so poles map to
/// the top/bottom world edge rather than infinity.
pub const TILE_SIZE: f64 = 256.0;
/// Highest latitude representable in Web Mercator.
pub const LATITUDE_MAX: f64 = 85.051_128_779_806_59;

pub fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * (1u64 << zoom) as f64
}

pub fn project(pos: LatLng, zoom: u8) -> Vec2 {
    let size = world_size(zoom);
    let lat = pos.lat.clamp(-LATITUDE_MAX, LATITUDE_MAX);

    let x = (pos.lng + 180.0) / 360.0 * size;
    let sin_lat = lat.to_radians().sin();
    let y = (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * std::f64::consts::PI)) * size;

    Vec2::new(x, y)
}

pub fn unproject(point: Vec2, zoom: u8) -> LatLng {
    let size = world_size(zoom);

    let lng = point.x / size * 360.0 - 180.0;
    let lat = (std::f64::consts::PI * (1.0 - 2.0 * point.y / size))
        .sinh()
        .atan()
        .to_degrees();

    LatLng::new(lat, lng)
}
