use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};
use tracing::debug;

use quartier_map::district::District;
use quartier_map::map::TerminalMap;
use quartier_map::overlay::{MarkerId, MarkerOverlay, OverlayEvent, OverlayPhase};

use crate::ui;

/// Where keystrokes go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
}

/// Left button press that may become a click or a drag
#[derive(Debug, Clone, Copy)]
struct Press {
    cell: (u16, u16),
    marker: Option<MarkerId>,
    dragging: bool,
}

/// Application state
pub struct App {
    pub overlay: MarkerOverlay<TerminalMap>,
    /// District whose detail panel is open
    pub selection: Option<District>,
    pub mode: InputMode,
    pub should_quit: bool,
    /// Map drawing area (inside the border) in terminal coordinates
    map_area: Rect,
    hovered: Option<MarkerId>,
    press: Option<Press>,
    pointer_on_map: bool,
}

impl App {
    pub fn new(overlay: MarkerOverlay<TerminalMap>) -> Self {
        Self {
            overlay,
            selection: None,
            mode: InputMode::Normal,
            should_quit: false,
            map_area: Rect::default(),
            hovered: None,
            press: None,
            pointer_on_map: false,
        }
    }

    /// Recompute the map area for the terminal size and resize the canvas
    pub fn set_screen(&mut self, screen: Rect) {
        self.map_area = ui::layout(screen, self.selection.is_some()).map_inner;
        let (width, height) = (self.map_area.width, self.map_area.height);
        if let Some(map) = self.overlay.provider_mut() {
            map.set_canvas_size(width, height);
        }
    }

    pub fn hovered(&self) -> Option<MarkerId> {
        self.hovered
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Terminal position to map cell, `None` outside the map
    fn map_cell(&self, col: u16, row: u16) -> Option<(u16, u16)> {
        self.map_area
            .contains(Position::new(col, row))
            .then(|| (col - self.map_area.x, row - self.map_area.y))
    }

    fn send(&mut self, event: OverlayEvent, now: Instant) {
        let selection = &mut self.selection;
        self.overlay.handle_event(event, now, |district| {
            *selection = Some(district.clone());
        });
    }

    /// Forward camera notifications the map queued to the overlay
    fn pump_camera_events(&mut self, now: Instant) {
        let Some(map) = self.overlay.provider_mut() else {
            return;
        };
        for event in map.drain_camera_events() {
            self.send(event.into(), now);
        }
    }

    /// Run one camera operation on the map, then forward its events
    fn with_map(&mut self, now: Instant, op: impl FnOnce(&mut TerminalMap)) {
        if let Some(map) = self.overlay.provider_mut() {
            op(map);
        }
        self.pump_camera_events(now);
    }

    /// Advance animations and deadlines
    pub fn tick(&mut self, now: Instant) {
        self.with_map(now, |map| {
            map.tick(now);
        });
        self.overlay.tick(now);
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        match self.mode {
            InputMode::Normal => self.handle_normal_key(key, now),
            InputMode::Search => self.handle_search_key(key, now),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Char('/') => self.mode = InputMode::Search,
            KeyCode::Esc | KeyCode::Char('x') => self.selection = None,

            // Pan with hjkl or arrow keys
            KeyCode::Left | KeyCode::Char('h') => self.with_map(now, |m| m.pan(-4, 0)),
            KeyCode::Right | KeyCode::Char('l') => self.with_map(now, |m| m.pan(4, 0)),
            KeyCode::Up | KeyCode::Char('k') => self.with_map(now, |m| m.pan(0, -2)),
            KeyCode::Down | KeyCode::Char('j') => self.with_map(now, |m| m.pan(0, 2)),

            // Zoom
            KeyCode::Char('+') | KeyCode::Char('=') => self.with_map(now, TerminalMap::zoom_in),
            KeyCode::Char('-') | KeyCode::Char('_') => self.with_map(now, TerminalMap::zoom_out),

            KeyCode::Char('f') => self.fit_all(now),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Esc => {
                self.overlay.search_mut().clear();
                self.mode = InputMode::Normal;
            }
            KeyCode::Enter => {
                if let Some(district) = self.overlay.select_highlighted() {
                    debug!(id = %district.id, name = %district.name, "search selection");
                }
                self.mode = InputMode::Normal;
            }
            KeyCode::Up => self.overlay.search_mut().highlight_prev(),
            KeyCode::Down => self.overlay.search_mut().highlight_next(),
            KeyCode::Backspace => self.overlay.search_mut().pop_char(now),
            KeyCode::Char(c) => self.overlay.search_mut().push_char(c, now),
            _ => {}
        }
    }

    /// Frame every district that has a coordinate
    pub fn fit_all(&mut self, now: Instant) {
        let points: Vec<_> = self.overlay.districts().iter().filter_map(District::coordinate).collect();
        self.with_map(now, |map| map.fit_to(points));
    }

    fn set_hovered(&mut self, hit: Option<MarkerId>, now: Instant) {
        if hit == self.hovered {
            return;
        }
        if let Some(old) = self.hovered.take() {
            self.send(OverlayEvent::MarkerLeave(old), now);
        }
        if let Some(new) = hit {
            self.send(OverlayEvent::MarkerEnter(new), now);
        }
        self.hovered = hit;
    }

    fn marker_at(&mut self, cell: (u16, u16)) -> Option<MarkerId> {
        let radius = self.overlay.config().hit_radius;
        self.overlay.provider_mut()?.marker_at(cell.0, cell.1, radius)
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        let Some(cell) = self.map_cell(mouse.column, mouse.row) else {
            if self.press.is_some_and(|p| p.dragging) {
                return self.handle_drag(mouse, now);
            }
            if self.pointer_on_map {
                self.pointer_on_map = false;
                self.set_hovered(None, now);
                self.send(OverlayEvent::CanvasLeave, now);
            }
            return;
        };
        self.pointer_on_map = true;

        match mouse.kind {
            MouseEventKind::Moved => {
                let hit = self.marker_at(cell);
                self.set_hovered(hit, now);
            }
            MouseEventKind::ScrollUp => {
                self.with_map(now, |map| map.zoom_in_at(cell.0, cell.1));
                self.send(OverlayEvent::Wheel, now);
            }
            MouseEventKind::ScrollDown => {
                self.with_map(now, |map| map.zoom_out_at(cell.0, cell.1));
                self.send(OverlayEvent::Wheel, now);
            }
            MouseEventKind::Down(MouseButton::Left) => {
                let marker = self.marker_at(cell);
                self.press = Some(Press {
                    cell,
                    marker,
                    dragging: false,
                });
            }
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Up(MouseButton::Left) => {
                self.handle_drag(mouse, now)
            }
            _ => {}
        }
    }

    /// Drag and release handling; also runs when the pointer has left the map
    fn handle_drag(&mut self, mouse: MouseEvent, now: Instant) {
        let Some(mut press) = self.press else {
            return;
        };
        let cell = (
            mouse.column.saturating_sub(self.map_area.x),
            mouse.row.saturating_sub(self.map_area.y),
        );

        match mouse.kind {
            MouseEventKind::Drag(MouseButton::Left) => {
                if !press.dragging {
                    press.dragging = true;
                    self.set_hovered(None, now);
                    self.with_map(now, |map| map.begin_drag(press.cell.0, press.cell.1));
                }
                self.with_map(now, |map| map.drag(cell.0, cell.1));
                self.press = Some(press);
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.press = None;
                if press.dragging {
                    self.with_map(now, TerminalMap::end_drag);
                } else if let Some(id) = press.marker {
                    self.send(OverlayEvent::MarkerClick(id), now);
                }
            }
            _ => {}
        }
    }

    /// Current zoom level as a string
    pub fn zoom_level(&self) -> String {
        self.overlay
            .provider()
            .map(|map| format!("z{:.1}", map.viewport().zoom_level()))
            .unwrap_or_else(|| "-".to_string())
    }

    /// Current center coordinates as a string
    pub fn center_coords(&self) -> String {
        let Some(map) = self.overlay.provider() else {
            return String::new();
        };
        let center = map.viewport().center();
        format!(
            "{:.3}°{}, {:.3}°{}",
            center.lat.abs(),
            if center.lat >= 0.0 { "N" } else { "S" },
            center.lng.abs(),
            if center.lng >= 0.0 { "E" } else { "W" }
        )
    }

    /// Short phase label for the status bar
    pub fn phase_label(&self) -> &'static str {
        match self.overlay.phase() {
            OverlayPhase::Uninitialized => "idle",
            OverlayPhase::Loading => "loading",
            OverlayPhase::Ready => "ready",
            OverlayPhase::Unavailable(_) => "unavailable",
            OverlayPhase::Disposed => "closed",
        }
    }
}
