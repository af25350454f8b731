use glam::DVec2;

/// Geographic coordinate in degrees, longitude first like the map camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Build a coordinate only if both parts are finite and inside the
    /// WGS84 ranges
    pub fn checked(lng: f64, lat: f64) -> Option<Self> {
        let valid = lng.is_finite()
            && lat.is_finite()
            && (-180.0..=180.0).contains(&lng)
            && (-90.0..=90.0).contains(&lat);
        valid.then_some(Self { lng, lat })
    }

    #[inline(always)]
    pub fn to_dvec2(self) -> DVec2 {
        DVec2::new(self.lng, self.lat)
    }

    #[inline(always)]
    pub fn from_dvec2(v: DVec2) -> Self {
        Self { lng: v.x, lat: v.y }
    }
}

/// Axis-aligned bounds over a set of coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: LngLat,
    pub max: LngLat,
}

impl Bounds {
    /// Smallest bounds containing every point, `None` for an empty set
    pub fn enclosing(points: impl IntoIterator<Item = LngLat>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self { min: first, max: first };
        for p in iter {
            bounds.min.lng = bounds.min.lng.min(p.lng);
            bounds.min.lat = bounds.min.lat.min(p.lat);
            bounds.max.lng = bounds.max.lng.max(p.lng);
            bounds.max.lat = bounds.max.lat.max(p.lat);
        }
        Some(bounds)
    }

    pub fn center(&self) -> LngLat {
        LngLat::new(
            (self.min.lng + self.max.lng) * 0.5,
            (self.min.lat + self.max.lat) * 0.5,
        )
    }
}
