//! Braille-canvas map backend.
//!
//! [`TerminalMap`] implements [`MapProvider`] on top of the viewport,
//! renderer and spatial index. Camera motion (keyboard steps, drags and
//! animated flights) is reported through a queue of [`CameraEvent`]s that
//! the host drains every frame and forwards to the overlay.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::braille::BrailleCanvas;
use crate::data;
use crate::error::ProviderError;
use crate::geo::{Bounds, LngLat};
use crate::map::flight::Flight;
use crate::map::projection::Viewport;
use crate::map::renderer::{Basemap, MapRenderer, MarkerGlyph};
use crate::map::spatial::SpatialGrid;
use crate::overlay::{CameraEvent, FlyTo, MapProvider, MarkerId, PopupId};
use crate::popup::PopupContent;

/// Hit-test grid cell size in degrees (~500 m)
const HIT_CELL: f64 = 0.005;

/// Radius queries touching more cells than this fall back to a scan
const MAX_HIT_SPAN: i32 = 64;

/// Closest zoom level `fit_to` picks
const FIT_MAX_LEVEL: f64 = 15.0;

#[derive(Debug, Default)]
struct PopupSlot {
    content: Option<PopupContent>,
    anchor: Option<LngLat>,
}

/// A popup that is currently shown, with its anchor cell
#[derive(Debug, Clone, Copy)]
pub struct PopupPlacement<'a> {
    pub id: PopupId,
    pub anchor: LngLat,
    pub col: u16,
    pub row: u16,
    pub content: &'a PopupContent,
}

/// One rendered frame of the map layer
pub struct MapFrame<'a> {
    pub canvas: BrailleCanvas,
    pub markers: Vec<MarkerGlyph>,
    pub popups: Vec<PopupPlacement<'a>>,
}

pub struct TerminalMap {
    viewport: Viewport,
    renderer: MapRenderer,
    markers: BTreeMap<MarkerId, LngLat>,
    next_marker: u64,
    hit_grid: SpatialGrid<MarkerId>,
    hit_dirty: bool,
    popups: HashMap<PopupId, PopupSlot>,
    next_popup: u64,
    pending_fly: Option<FlyTo>,
    flight: Option<Flight>,
    /// Last drag position in dots
    drag: Option<(i32, i32)>,
    moving: bool,
    events: Vec<CameraEvent>,
    destroyed: bool,
}

impl TerminalMap {
    /// Map with an optional outline basemap, sized in terminal cells
    pub fn load(basemap: Option<&Path>, cols: u16, rows: u16) -> Result<Self, ProviderError> {
        let basemap = match basemap {
            Some(path) => {
                let lines = data::load_basemap(path).map_err(|source| ProviderError::Basemap {
                    path: path.to_path_buf(),
                    source,
                })?;
                info!(path = %path.display(), lines = lines.len(), "basemap loaded");
                Basemap::new(lines)
            }
            None => Basemap::empty(),
        };
        Ok(Self::with_basemap(basemap, cols, rows))
    }

    pub fn with_basemap(basemap: Basemap, cols: u16, rows: u16) -> Self {
        Self {
            viewport: Viewport::world(cols as usize * 2, rows as usize * 4),
            renderer: MapRenderer::new(basemap),
            markers: BTreeMap::new(),
            next_marker: 1,
            hit_grid: SpatialGrid::new(HIT_CELL),
            hit_dirty: false,
            popups: HashMap::new(),
            next_popup: 1,
            pending_fly: None,
            flight: None,
            drag: None,
            moving: false,
            events: Vec::new(),
            destroyed: false,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn basemap(&self) -> &Basemap {
        self.renderer.basemap()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_flying(&self) -> bool {
        self.flight.is_some() || self.pending_fly.is_some()
    }

    /// Resize to a terminal area of `cols` x `rows` cells
    pub fn set_canvas_size(&mut self, cols: u16, rows: u16) {
        self.viewport.width = cols as usize * 2;
        self.viewport.height = rows as usize * 4;
    }

    fn begin_move(&mut self) {
        if !self.moving {
            self.moving = true;
            self.events.push(CameraEvent::MoveStart);
        }
    }

    fn end_move(&mut self) {
        if self.moving {
            self.moving = false;
            self.events.push(CameraEvent::MoveEnd);
        }
    }

    /// One discrete camera change. Interrupts any flight; outside a drag
    /// it reports a complete start/end pair.
    fn step_camera(&mut self, apply: impl FnOnce(&mut Viewport)) {
        self.flight = None;
        self.pending_fly = None;
        self.begin_move();
        apply(&mut self.viewport);
        if self.drag.is_none() {
            self.end_move();
        }
    }

    /// Pan by whole terminal cells
    pub fn pan(&mut self, cols: i32, rows: i32) {
        self.step_camera(|vp| vp.pan(cols * 2, rows * 4));
    }

    pub fn zoom_in(&mut self) {
        self.step_camera(Viewport::zoom_in);
    }

    pub fn zoom_out(&mut self) {
        self.step_camera(Viewport::zoom_out);
    }

    /// Zoom in keeping the point under the cell fixed
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_center(col, row);
        self.step_camera(|vp| vp.zoom_in_at(px, py));
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_center(col, row);
        self.step_camera(|vp| vp.zoom_out_at(px, py));
    }

    /// Frame `points`, or the whole basemap when none are given
    pub fn fit_to(&mut self, points: impl IntoIterator<Item = LngLat>) {
        let Some(bounds) = Bounds::enclosing(points).or_else(|| self.basemap().bounds()) else {
            return;
        };
        self.step_camera(|vp| vp.fit_bounds(&bounds, 0.15, FIT_MAX_LEVEL));
    }

    pub fn begin_drag(&mut self, col: u16, row: u16) {
        self.flight = None;
        self.pending_fly = None;
        self.drag = Some(cell_center(col, row));
        self.begin_move();
    }

    /// Pan so the map follows the pointer
    pub fn drag(&mut self, col: u16, row: u16) {
        let Some((last_x, last_y)) = self.drag else {
            return;
        };
        let (x, y) = cell_center(col, row);
        if (x, y) != (last_x, last_y) {
            self.viewport.pan(last_x - x, last_y - y);
            self.drag = Some((x, y));
        }
    }

    pub fn end_drag(&mut self) {
        if self.drag.take().is_some() {
            self.end_move();
        }
    }

    /// Advance camera animation. Returns true when the camera moved.
    pub fn tick(&mut self, now: Instant) -> bool {
        if let Some(cmd) = self.pending_fly.take() {
            debug!(lng = cmd.center.lng, lat = cmd.center.lat, zoom = cmd.zoom, "flight started");
            self.begin_move();
            self.flight = Some(Flight::start(&self.viewport, cmd, now));
        }

        let Some(flight) = &self.flight else {
            return false;
        };
        let frame = flight.frame(now);
        self.viewport.jump_to(frame.center, frame.level);
        if frame.done {
            self.flight = None;
            self.end_move();
        }
        true
    }

    /// Camera notifications raised since the last call, oldest first
    pub fn drain_camera_events(&mut self) -> Vec<CameraEvent> {
        std::mem::take(&mut self.events)
    }

    fn refresh_hit_grid(&mut self) {
        if !self.hit_dirty {
            return;
        }
        self.hit_grid.clear();
        for (&id, at) in &self.markers {
            self.hit_grid.insert(at.lng, at.lat, id);
        }
        self.hit_dirty = false;
    }

    /// Marker drawn nearest to a cell, within `radius` cells on both axes.
    /// Ties go to the lower id.
    pub fn marker_at(&mut self, col: u16, row: u16, radius: u16) -> Option<MarkerId> {
        self.refresh_hit_grid();

        let (px, py) = cell_center(col, row);
        let (lon, lat) = self.viewport.unproject(px, py);
        let radius_degrees = f64::from(radius + 1) * 4.0 / self.viewport.dots_per_degree();

        let (col, row, radius) = (i32::from(col), i32::from(row), i32::from(radius));
        let viewport = &self.viewport;
        let score = |&(mlon, mlat, id): &(f64, f64, MarkerId)| {
            let (mx, my) = viewport.project(mlon, mlat);
            let (dc, dr) = ((mx / 2 - col).abs(), (my / 4 - row).abs());
            (dc <= radius && dr <= radius).then(|| ((mx - px).pow(2) + (my - py).pow(2), id))
        };

        let best = if self.hit_grid.cell_span(radius_degrees) > MAX_HIT_SPAN {
            self.hit_grid.iter().filter_map(score).min()
        } else {
            self.hit_grid.query_radius(lon, lat, radius_degrees).filter_map(score).min()
        };
        best.map(|(_, id)| id)
    }

    /// Cell a coordinate falls in, `None` when off screen
    pub fn cell_of(&self, at: LngLat) -> Option<(u16, u16)> {
        let (px, py) = self.viewport.project(at.lng, at.lat);
        self.viewport
            .is_visible(px, py)
            .then(|| ((px / 2) as u16, (py / 4) as u16))
    }

    /// Popups with content that are currently anchored on the map
    pub fn visible_popups(&self) -> impl Iterator<Item = (PopupId, LngLat, &PopupContent)> {
        self.popups
            .iter()
            .filter_map(|(&id, slot)| Some((id, slot.anchor?, slot.content.as_ref()?)))
    }

    pub fn render(&self, hovered: Option<MarkerId>) -> MapFrame<'_> {
        let mut canvas = BrailleCanvas::new(self.viewport.width / 2, self.viewport.height / 4);
        let markers = self.renderer.render(
            &mut canvas,
            &self.viewport,
            self.markers.iter().map(|(&id, &at)| (id, at)),
            hovered,
        );
        let popups = self
            .visible_popups()
            .filter_map(|(id, anchor, content)| {
                let (col, row) = self.cell_of(anchor)?;
                Some(PopupPlacement {
                    id,
                    anchor,
                    col,
                    row,
                    content,
                })
            })
            .collect();
        MapFrame {
            canvas,
            markers,
            popups,
        }
    }
}

fn cell_center(col: u16, row: u16) -> (i32, i32) {
    (i32::from(col) * 2, i32::from(row) * 4 + 1)
}

impl MapProvider for TerminalMap {
    fn add_marker(&mut self, at: LngLat) -> Result<MarkerId, ProviderError> {
        if self.destroyed {
            return Err(ProviderError::Unavailable("map destroyed".into()));
        }
        if LngLat::checked(at.lng, at.lat).is_none() {
            return Err(ProviderError::MarkerRejected {
                lng: at.lng,
                lat: at.lat,
            });
        }
        let id = MarkerId(self.next_marker);
        self.next_marker += 1;
        self.markers.insert(id, at);
        self.hit_dirty = true;
        Ok(id)
    }

    fn remove_marker(&mut self, id: MarkerId) {
        if self.markers.remove(&id).is_some() {
            self.hit_dirty = true;
        }
    }

    fn create_popup(&mut self) -> PopupId {
        let id = PopupId(self.next_popup);
        self.next_popup += 1;
        if !self.destroyed {
            self.popups.insert(id, PopupSlot::default());
        }
        id
    }

    fn set_popup_content(&mut self, id: PopupId, content: PopupContent) {
        if let Some(slot) = self.popups.get_mut(&id) {
            slot.content = Some(content);
        }
    }

    fn show_popup(&mut self, id: PopupId, at: LngLat) {
        if let Some(slot) = self.popups.get_mut(&id) {
            slot.anchor = Some(at);
        }
    }

    fn remove_popup(&mut self, id: PopupId) {
        if let Some(slot) = self.popups.get_mut(&id) {
            slot.anchor = None;
        }
    }

    fn fly_to(&mut self, cmd: FlyTo) {
        if !self.destroyed {
            self.pending_fly = Some(cmd);
        }
    }

    fn destroy(&mut self) {
        self.markers.clear();
        self.hit_grid.clear();
        self.hit_dirty = false;
        self.popups.clear();
        self.pending_fly = None;
        self.flight = None;
        self.drag = None;
        self.moving = false;
        self.events.clear();
        self.destroyed = true;
        debug!("terminal map destroyed");
    }
}
