use std::time::Instant;

use glam::DVec2;

use crate::geo::LngLat;
use crate::map::projection::Viewport;
use crate::overlay::FlyTo;

/// An in-progress camera animation
#[derive(Debug, Clone)]
pub struct Flight {
    from: DVec2,
    to: DVec2,
    from_level: f64,
    to_level: f64,
    started: Instant,
    cmd: FlyTo,
}

/// Camera position at one instant of a flight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightFrame {
    pub center: LngLat,
    pub level: f64,
    pub done: bool,
}

impl Flight {
    pub fn start(viewport: &Viewport, cmd: FlyTo, now: Instant) -> Self {
        Self {
            from: viewport.center().to_dvec2(),
            to: cmd.center.to_dvec2(),
            from_level: viewport.zoom_level(),
            to_level: cmd.zoom,
            started: now,
            cmd,
        }
    }

    /// Interpolated camera at `now`. Zoom interpolates in level space so
    /// the apparent speed stays even across scales.
    pub fn frame(&self, now: Instant) -> FlightFrame {
        let elapsed = now.saturating_duration_since(self.started);
        let t = if self.cmd.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / self.cmd.duration.as_secs_f64()).min(1.0)
        };
        if t >= 1.0 {
            return FlightFrame {
                center: self.cmd.center,
                level: self.to_level,
                done: true,
            };
        }
        let k = self.cmd.easing.apply(t);

        FlightFrame {
            center: LngLat::from_dvec2(self.from.lerp(self.to, k)),
            level: self.from_level + (self.to_level - self.from_level) * k,
            done: false,
        }
    }
}
