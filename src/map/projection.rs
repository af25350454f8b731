use std::f64::consts::PI;

use crate::geo::{Bounds, LngLat};

/// Closest zoom level the camera allows
pub const MAX_ZOOM_LEVEL: f64 = 18.0;
/// Furthest zoom level the camera allows (whole world)
pub const MIN_ZOOM_LEVEL: f64 = -1.0;

/// Web Mercator x in [0, 1]
#[inline(always)]
fn mercator_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

/// Web Mercator y in [0, 1], north at 0
#[inline(always)]
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-85.0511, 85.0511).to_radians();
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

/// Visible map area: center, zoom and canvas size in braille dots.
///
/// `zoom` is a scale factor (the world is `zoom * width` dots wide).
/// Web-map zoom levels convert with `zoom = 2^level`.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    pub zoom: f64,
    /// Canvas width in dots
    pub width: usize,
    /// Canvas height in dots
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
        }
    }

    /// Whole-world view
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(0.0, 20.0, 1.0, width, height)
    }

    pub fn center(&self) -> LngLat {
        LngLat::new(self.center_lon, self.center_lat)
    }

    pub fn zoom_level(&self) -> f64 {
        self.zoom.log2()
    }

    pub fn set_zoom_level(&mut self, level: f64) {
        self.zoom = level.clamp(MIN_ZOOM_LEVEL, MAX_ZOOM_LEVEL).exp2();
    }

    /// Move the camera without animation
    pub fn jump_to(&mut self, center: LngLat, level: f64) {
        self.center_lon = center.lng;
        self.center_lat = center.lat;
        self.set_zoom_level(level);
        self.normalize();
    }

    /// Center on `bounds` and pick the closest zoom that shows all of it,
    /// leaving `padding` (fraction of the canvas) free on each axis
    pub fn fit_bounds(&mut self, bounds: &Bounds, padding: f64, max_level: f64) {
        let dx = mercator_x(bounds.max.lng) - mercator_x(bounds.min.lng);
        let dy = mercator_y(bounds.min.lat) - mercator_y(bounds.max.lat);
        let usable = (1.0 - padding).max(0.1);

        let mut zoom = max_level.exp2();
        if dx > 0.0 {
            zoom = zoom.min(usable / dx);
        }
        if dy > 0.0 && self.width > 0 {
            zoom = zoom.min(usable * self.height as f64 / (dy * self.width as f64));
        }

        let center = bounds.center();
        self.center_lon = center.lng;
        self.center_lat = center.lat;
        self.set_zoom_level(zoom.log2());
        self.normalize();
    }

    /// Pan the viewport by a dot delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = 360.0 / (self.zoom * self.width.max(1) as f64);
        self.center_lon += dx as f64 * scale;
        self.center_lat -= dy as f64 * scale * self.center_lat.to_radians().cos();
        self.normalize();
    }

    fn normalize(&mut self) {
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }
        self.center_lat = self.center_lat.clamp(-85.0, 85.0);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom_level(self.zoom_level() + 1.0);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom_level(self.zoom_level() - 1.0);
    }

    /// Zoom in keeping the point under (px, py) fixed
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0);
    }

    /// Zoom out keeping the point under (px, py) fixed
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, -1.0);
    }

    fn zoom_at(&mut self, px: i32, py: i32, levels: f64) {
        let (lon, lat) = self.unproject(px, py);
        self.set_zoom_level(self.zoom_level() + levels);

        // Pan so the same coordinate lands back under the pointer
        let (new_px, new_py) = self.project(lon, lat);
        let scale = self.zoom * self.width.max(1) as f64;
        let center_x = mercator_x(self.center_lon) + (new_px - px) as f64 / scale;
        let center_y = mercator_y(self.center_lat) + (new_py - py) as f64 / scale;
        self.center_lon = center_x * 360.0 - 180.0;
        self.center_lat = (PI * (1.0 - 2.0 * center_y)).sinh().atan().to_degrees();
        self.normalize();
    }

    /// Dot position back to (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let scale = self.zoom * self.width.max(1) as f64;
        let x = (px as f64 - self.width as f64 / 2.0) / scale + mercator_x(self.center_lon);
        let y = (py as f64 - self.height as f64 / 2.0) / scale + mercator_y(self.center_lat);

        let lon = x * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
        (lon, lat)
    }

    /// (lon, lat) to dot position
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let scale = self.zoom * self.width.max(1) as f64;
        let px = (mercator_x(lon) - mercator_x(self.center_lon)) * scale + self.width as f64 / 2.0;
        let py = (mercator_y(lat) - mercator_y(self.center_lat)) * scale + self.height as f64 / 2.0;
        (
            px.clamp(i32::MIN as f64, i32::MAX as f64) as i32,
            py.clamp(i32::MIN as f64, i32::MAX as f64) as i32,
        )
    }

    /// Dots per degree of longitude at the current zoom
    pub fn dots_per_degree(&self) -> f64 {
        self.zoom * self.width.max(1) as f64 / 360.0
    }

    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= 0 && px < self.width as i32 && py >= 0 && py < self.height as i32
    }

    /// Rough bounding box check for a segment
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }

    /// Geographic bounds of the canvas as (min_lon, min_lat, max_lon, max_lat)
    pub fn visible_bbox(&self) -> (f64, f64, f64, f64) {
        let (west, north) = self.unproject(0, 0);
        let (east, south) = self.unproject(self.width as i32, self.height as i32);
        (west, south, east, north)
    }
}
