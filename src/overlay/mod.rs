//! District marker overlay: the controller that sits between a host page,
//! a district list and an injected [`MapProvider`].
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized -> Loading -> Ready -> Disposed
//!                     \
//!                      -> Unavailable
//! ```
//!
//! The provider only exists inside the `Ready` phase, so marker and popup
//! operations cannot run before the map has loaded or after teardown.
//! Markers are rebuilt on entering `Ready` and every time a different
//! district list (by `Arc` identity) is supplied.
//!
//! # Usage
//!
//! ```ignore
//! let mut overlay = MarkerOverlay::new(config);
//! overlay.start_loading();
//! overlay.finish_loading(TerminalMap::load(basemap, cols, rows));
//! overlay.set_districts(districts);
//!
//! // per input event
//! overlay.handle_event(OverlayEvent::MarkerClick(id), Instant::now(), |d| selection = Some(d.clone()));
//! // per frame
//! overlay.tick(Instant::now());
//! ```

mod hover;
mod markers;
mod provider;
mod search;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::OverlayConfig;
use crate::district::District;
use crate::error::ProviderError;
use crate::format::PriceFormatter;
use crate::popup::PopupContent;

pub use hover::HoverController;
pub use markers::{MarkerSet, MountedMarker, RebuildReport};
pub use provider::{CameraEvent, Easing, FlyTo, MapProvider, MarkerId, PopupId};
pub use search::{filter, filter_indices, SearchController};

/// Observable lifecycle phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayPhase {
    Uninitialized,
    Loading,
    Ready,
    /// The provider failed to load; the reason is user-facing
    Unavailable(String),
    Disposed,
}

/// Input the host forwards from the map surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEvent {
    MarkerEnter(MarkerId),
    MarkerLeave(MarkerId),
    MarkerClick(MarkerId),
    MoveStart,
    MoveEnd,
    Wheel,
    CanvasLeave,
}

impl From<CameraEvent> for OverlayEvent {
    fn from(event: CameraEvent) -> Self {
        match event {
            CameraEvent::MoveStart => OverlayEvent::MoveStart,
            CameraEvent::MoveEnd => OverlayEvent::MoveEnd,
        }
    }
}

enum Phase<P> {
    Uninitialized,
    Loading,
    Ready(P),
    Unavailable(String),
    Disposed,
}

pub struct MarkerOverlay<P: MapProvider> {
    config: OverlayConfig,
    formatter: PriceFormatter,
    phase: Phase<P>,
    districts: Arc<[District]>,
    /// The list the current markers were built from
    built_from: Option<Arc<[District]>>,
    markers: MarkerSet,
    hover: HoverController,
    search: SearchController,
}

impl<P: MapProvider> MarkerOverlay<P> {
    pub fn new(config: OverlayConfig) -> Self {
        let formatter = config.formatter();
        let hover = HoverController::new(config.hover_hide_delay(), config.settle_delay());
        let search = SearchController::new(config.max_suggestions, config.search_debounce());
        Self {
            config,
            formatter,
            phase: Phase::Uninitialized,
            districts: Arc::from(Vec::new()),
            built_from: None,
            markers: MarkerSet::new(),
            hover,
            search,
        }
    }

    pub fn phase(&self) -> OverlayPhase {
        match &self.phase {
            Phase::Uninitialized => OverlayPhase::Uninitialized,
            Phase::Loading => OverlayPhase::Loading,
            Phase::Ready(_) => OverlayPhase::Ready,
            Phase::Unavailable(reason) => OverlayPhase::Unavailable(reason.clone()),
            Phase::Disposed => OverlayPhase::Disposed,
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn formatter(&self) -> &PriceFormatter {
        &self.formatter
    }

    pub fn districts(&self) -> &Arc<[District]> {
        &self.districts
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn hover(&self) -> &HoverController {
        &self.hover
    }

    pub fn search(&self) -> &SearchController {
        &self.search
    }

    pub fn search_mut(&mut self) -> &mut SearchController {
        &mut self.search
    }

    pub fn provider(&self) -> Option<&P> {
        match &self.phase {
            Phase::Ready(p) => Some(p),
            _ => None,
        }
    }

    pub fn provider_mut(&mut self) -> Option<&mut P> {
        match &mut self.phase {
            Phase::Ready(p) => Some(p),
            _ => None,
        }
    }

    /// District a marker stands for
    pub fn district_for(&self, id: MarkerId) -> Option<&District> {
        let marker = self.markers.get(id)?;
        self.built_from.as_ref()?.get(marker.district)
    }

    /// `Uninitialized -> Loading`
    pub fn start_loading(&mut self) {
        if matches!(self.phase, Phase::Uninitialized) {
            debug!("overlay loading");
            self.phase = Phase::Loading;
        } else {
            warn!(phase = ?self.phase(), "start_loading ignored");
        }
    }

    /// `Loading -> Ready | Unavailable`. Markers for the current district
    /// list are mounted as soon as the provider is ready.
    pub fn finish_loading(&mut self, result: Result<P, ProviderError>) -> Option<RebuildReport> {
        if !matches!(self.phase, Phase::Loading) {
            warn!(phase = ?self.phase(), "finish_loading ignored");
            if let Ok(mut provider) = result {
                provider.destroy();
            }
            return None;
        }

        match result {
            Ok(provider) => {
                info!("map ready");
                self.phase = Phase::Ready(provider);
                self.rebuild()
            }
            Err(err) => {
                warn!(error = %err, "map unavailable");
                self.phase = Phase::Unavailable(err.to_string());
                None
            }
        }
    }

    /// Replace the district list. Markers are rebuilt only when the list
    /// is a different allocation from the one they were built from.
    pub fn set_districts(&mut self, districts: Arc<[District]>) -> Option<RebuildReport> {
        if matches!(self.phase, Phase::Disposed) {
            return None;
        }
        self.districts = districts;
        let unchanged = self
            .built_from
            .as_ref()
            .is_some_and(|built| Arc::ptr_eq(built, &self.districts));
        if unchanged {
            return None;
        }
        self.rebuild()
    }

    fn rebuild(&mut self) -> Option<RebuildReport> {
        let Phase::Ready(provider) = &mut self.phase else {
            return None;
        };
        self.hover.hide(provider);
        let report = self.markers.rebuild(provider, &self.districts);
        self.built_from = Some(Arc::clone(&self.districts));
        Some(report)
    }

    /// Dispatch one map-surface event. `on_click` receives the district of
    /// a clicked marker; the host owns what selection means.
    pub fn handle_event<F>(&mut self, event: OverlayEvent, now: Instant, mut on_click: F)
    where
        F: FnMut(&District),
    {
        let Phase::Ready(provider) = &mut self.phase else {
            return;
        };

        match event {
            OverlayEvent::MarkerEnter(id) => {
                let (Some(marker), Some(list)) = (self.markers.get(id), self.built_from.as_ref()) else {
                    return;
                };
                let Some(district) = list.get(marker.district) else {
                    return;
                };
                let formatter = &self.formatter;
                self.hover
                    .enter(provider, marker, || PopupContent::build(district, formatter));
            }
            OverlayEvent::MarkerLeave(id) => self.hover.leave(id, now),
            OverlayEvent::MarkerClick(id) => {
                let (Some(marker), Some(list)) = (self.markers.get(id), self.built_from.as_ref()) else {
                    return;
                };
                let Some(district) = list.get(marker.district) else {
                    return;
                };
                debug!(id = %district.id, name = %district.name, "district clicked");
                on_click(district);
                provider.fly_to(FlyTo {
                    center: marker.at,
                    zoom: self.config.click_zoom,
                    duration: self.config.fly_duration(),
                    easing: self.config.easing,
                });
            }
            OverlayEvent::MoveStart => self.hover.begin_gesture(provider),
            OverlayEvent::MoveEnd => self.hover.end_gesture(now),
            OverlayEvent::Wheel | OverlayEvent::CanvasLeave => self.hover.nudge_gesture(provider, now),
        }
    }

    /// Advance deadlines: popup hide, gesture settle, search debounce
    pub fn tick(&mut self, now: Instant) {
        if matches!(self.phase, Phase::Disposed) {
            return;
        }
        self.search.tick(now, &self.districts);
        if let Phase::Ready(provider) = &mut self.phase {
            self.hover.tick(provider, now);
        }
    }

    /// Accept the suggestion for `index` (an index into [`Self::districts`])
    /// and fly the camera to it at the detail zoom level
    pub fn select_suggestion(&mut self, index: usize) -> Option<&District> {
        let district = self.districts.get(index)?;
        self.search.select(district);

        let Some(center) = district.coordinate() else {
            warn!(id = %district.id, "selected district has no coordinates");
            return Some(district);
        };
        if let Phase::Ready(provider) = &mut self.phase {
            provider.fly_to(FlyTo {
                center,
                zoom: self.config.detail_zoom,
                duration: self.config.fly_duration(),
                easing: self.config.easing,
            });
        }
        Some(district)
    }

    /// Accept whatever suggestion is highlighted
    pub fn select_highlighted(&mut self) -> Option<&District> {
        let index = self.search.highlighted()?;
        self.select_suggestion(index)
    }

    /// Tear down markers, popup and provider. Terminal.
    pub fn dispose(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Disposed) {
            Phase::Ready(mut provider) => {
                self.hover.dispose(&mut provider);
                self.markers.clear(&mut provider);
                provider.destroy();
                info!("overlay disposed");
            }
            Phase::Disposed => {}
            _ => debug!("overlay disposed before map was ready"),
        }
        self.built_from = None;
    }
}

impl<P: MapProvider> Drop for MarkerOverlay<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::testing::RecordingProvider;
    use super::*;
    use crate::district::{FlatPrices, PriceSummary, Scalar};

    fn cocody() -> District {
        District::new("1", "Cocody")
            .with_position(5.36, -4.00)
            .with_prices(PriceSummary::Flat(FlatPrices {
                rental_min: Some(Scalar::from(50000.0)),
                rental_max: Some(Scalar::from(200000.0)),
                ..Default::default()
            }))
    }

    fn neighbours() -> Arc<[District]> {
        Arc::from(vec![
            cocody(),
            District::new("2", "Plateau").with_position(5.32, -4.02),
            District::new("3", "Adjamé").with_position("5.35", "-4.03"),
            District::new("4", "Lost").with_position("", ""),
            District::new("5", "Marcory").with_position(5.30, -3.98),
        ])
    }

    fn ready() -> (MarkerOverlay<RecordingProvider>, std::rc::Rc<std::cell::RefCell<testing::Record>>) {
        let (provider, record) = RecordingProvider::new();
        let mut overlay = MarkerOverlay::new(OverlayConfig::default());
        overlay.start_loading();
        overlay.finish_loading(Ok(provider));
        (overlay, record)
    }

    fn ids(overlay: &MarkerOverlay<RecordingProvider>) -> Vec<MarkerId> {
        overlay.markers().iter().map(|m| m.id).collect()
    }

    fn ignore(_: &District) {}

    #[test]
    fn test_phase_transitions() {
        let (provider, _record) = RecordingProvider::new();
        let mut overlay = MarkerOverlay::new(OverlayConfig::default());
        assert_eq!(overlay.phase(), OverlayPhase::Uninitialized);
        overlay.start_loading();
        assert_eq!(overlay.phase(), OverlayPhase::Loading);
        overlay.finish_loading(Ok(provider));
        assert_eq!(overlay.phase(), OverlayPhase::Ready);
        overlay.dispose();
        assert_eq!(overlay.phase(), OverlayPhase::Disposed);
        overlay.start_loading();
        assert_eq!(overlay.phase(), OverlayPhase::Disposed);
    }

    #[test]
    fn test_districts_before_ready_are_mounted_on_ready() {
        let (provider, record) = RecordingProvider::new();
        let mut overlay = MarkerOverlay::new(OverlayConfig::default());
        assert!(overlay.set_districts(neighbours()).is_none());
        overlay.start_loading();
        let report = overlay.finish_loading(Ok(provider)).unwrap();
        assert_eq!(report, RebuildReport { mounted: 4, skipped: 1 });
        assert_eq!(record.borrow().live_markers(), 4);
    }

    #[test]
    fn test_unavailable_provider() {
        let mut overlay: MarkerOverlay<RecordingProvider> = MarkerOverlay::new(OverlayConfig::default());
        overlay.start_loading();
        overlay.finish_loading(Err(ProviderError::Unavailable("no tiles".into())));
        assert!(matches!(overlay.phase(), OverlayPhase::Unavailable(reason) if reason.contains("no tiles")));
        assert!(overlay.set_districts(neighbours()).is_none());
        assert!(overlay.markers().is_empty());
        overlay.handle_event(OverlayEvent::MoveStart, Instant::now(), ignore);
    }

    #[test]
    fn test_same_list_reference_does_not_rebuild() {
        let (mut overlay, _record) = ready();
        let list = neighbours();
        overlay.set_districts(Arc::clone(&list));
        let before = ids(&overlay);
        assert!(overlay.set_districts(Arc::clone(&list)).is_none());
        assert_eq!(ids(&overlay), before);
    }

    #[test]
    fn test_new_list_reference_rebuilds_without_leaks() {
        let (mut overlay, record) = ready();
        overlay.set_districts(neighbours());
        let first = ids(&overlay);
        let report = overlay.set_districts(neighbours()).unwrap();

        assert_eq!(report.mounted, 4);
        assert_eq!(overlay.markers().len(), 4);
        assert_eq!(record.borrow().live_markers(), 4);
        for id in first {
            assert!(!record.borrow().markers.contains(&id));
        }
    }

    #[test]
    fn test_rapid_hover_never_shows_two_popups() {
        let (mut overlay, record) = ready();
        overlay.set_districts(neighbours());
        let ids = ids(&overlay);
        let t0 = Instant::now();

        for round in 0..5u64 {
            for (i, id) in ids.iter().enumerate() {
                let now = t0 + Duration::from_millis(round * 100 + i as u64 * 10);
                overlay.handle_event(OverlayEvent::MarkerEnter(*id), now, ignore);
                assert!(record.borrow().visible_popups() <= 1);
                overlay.handle_event(OverlayEvent::MarkerLeave(*id), now, ignore);
                overlay.tick(now + Duration::from_millis(5));
                assert!(record.borrow().visible_popups() <= 1);
            }
        }

        let record = record.borrow();
        assert_eq!(record.peak_visible, 1);
        assert_eq!(record.overlapping_shows, 0);
        assert_eq!(record.popups_created, 1);
    }

    #[test]
    fn test_gesture_clears_popup_until_new_hover() {
        let (mut overlay, record) = ready();
        overlay.set_districts(neighbours());
        let ids = ids(&overlay);
        let t0 = Instant::now();

        overlay.handle_event(OverlayEvent::MarkerEnter(ids[0]), t0, ignore);
        assert_eq!(record.borrow().visible_title().as_deref(), Some("Cocody"));

        overlay.handle_event(OverlayEvent::MoveStart, t0, ignore);
        assert_eq!(record.borrow().visible_popups(), 0);

        overlay.handle_event(OverlayEvent::MarkerEnter(ids[1]), t0, ignore);
        overlay.handle_event(OverlayEvent::MoveEnd, t0 + Duration::from_millis(300), ignore);
        overlay.tick(t0 + Duration::from_millis(400));
        assert_eq!(record.borrow().visible_popups(), 0);

        overlay.tick(t0 + Duration::from_millis(500));
        assert!(!overlay.hover().is_interacting());
        overlay.handle_event(OverlayEvent::MarkerEnter(ids[1]), t0 + Duration::from_millis(510), ignore);
        assert_eq!(record.borrow().visible_title().as_deref(), Some("Plateau"));
    }

    #[test]
    fn test_wheel_and_canvas_leave_hide_popup() {
        let (mut overlay, record) = ready();
        overlay.set_districts(neighbours());
        let ids = ids(&overlay);
        let t0 = Instant::now();

        for (round, event) in [OverlayEvent::Wheel, OverlayEvent::CanvasLeave].into_iter().enumerate() {
            let now = t0 + Duration::from_secs(10 * (round as u64 + 1));
            overlay.tick(now);
            overlay.handle_event(OverlayEvent::MarkerEnter(ids[2]), now, ignore);
            assert_eq!(record.borrow().visible_popups(), 1);
            overlay.handle_event(event, now, ignore);
            assert_eq!(record.borrow().visible_popups(), 0);
            assert!(overlay.hover().is_interacting());
        }
    }

    #[test]
    fn test_click_selects_and_flies() {
        let (mut overlay, record) = ready();
        overlay.set_districts(neighbours());
        let target = ids(&overlay)[1];

        let mut selected = None;
        overlay.handle_event(OverlayEvent::MarkerClick(target), Instant::now(), |d| {
            selected = Some(d.name.clone())
        });

        assert_eq!(selected.as_deref(), Some("Plateau"));
        let record = record.borrow();
        let flight = record.flights.last().unwrap();
        assert_eq!(flight.zoom, OverlayConfig::default().click_zoom);
        assert_eq!(flight.center.lat, 5.32);
    }

    #[test]
    fn test_stale_marker_events_are_ignored() {
        let (mut overlay, record) = ready();
        overlay.set_districts(neighbours());
        let stale = ids(&overlay)[0];
        overlay.set_districts(neighbours());

        let mut clicked = false;
        overlay.handle_event(OverlayEvent::MarkerEnter(stale), Instant::now(), ignore);
        overlay.handle_event(OverlayEvent::MarkerClick(stale), Instant::now(), |_| clicked = true);
        assert!(!clicked);
        assert_eq!(record.borrow().visible_popups(), 0);
    }

    #[test]
    fn test_search_scenario_flies_to_cocody() {
        let (mut overlay, record) = ready();
        overlay.set_districts(Arc::from(vec![cocody()]));
        let t0 = Instant::now();

        overlay.search_mut().set_query("coco", t0);
        overlay.tick(t0 + overlay.config().search_debounce());
        let names: Vec<&str> = overlay
            .search()
            .suggestions()
            .iter()
            .map(|&i| overlay.districts()[i].name.as_str())
            .collect();
        assert_eq!(names, vec!["Cocody"]);

        let picked = overlay.select_highlighted().map(|d| d.name.clone());
        assert_eq!(picked.as_deref(), Some("Cocody"));
        assert!(overlay.search().suggestions().is_empty());
        assert_eq!(overlay.search().query(), "Cocody");

        let record = record.borrow();
        let flight = record.flights.last().unwrap();
        assert!((flight.center.lng - -4.00).abs() < 1e-9);
        assert!((flight.center.lat - 5.36).abs() < 1e-9);
        assert_eq!(flight.zoom, OverlayConfig::default().detail_zoom);
        assert_eq!(flight.easing, Easing::EaseOutQuad);
    }

    #[test]
    fn test_dispose_releases_everything() {
        let (mut overlay, record) = ready();
        overlay.set_districts(neighbours());
        let id = ids(&overlay)[0];
        overlay.handle_event(OverlayEvent::MarkerEnter(id), Instant::now(), ignore);

        overlay.dispose();
        {
            let record = record.borrow();
            assert_eq!(record.live_markers(), 0);
            assert_eq!(record.visible_popups(), 0);
            assert_eq!(record.destroyed, 1);
        }

        assert!(overlay.set_districts(neighbours()).is_none());
        drop(overlay);
        assert_eq!(record.borrow().destroyed, 1);
    }

    #[test]
    fn test_drop_disposes() {
        let (mut overlay, record) = ready();
        overlay.set_districts(neighbours());
        drop(overlay);
        assert_eq!(record.borrow().destroyed, 1);
        assert_eq!(record.borrow().live_markers(), 0);
    }
}
