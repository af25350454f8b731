//! Single shared popup plus the gesture suppression window.
//!
//! Marker and camera events arrive in whatever order the input layer
//! produces them. The controller keeps one popup slot and always removes
//! what is shown before showing anything else, so at most one popup is ever
//! visible. While a pan/zoom/scroll gesture is in progress (`interacting`)
//! hover requests are dropped; the flag clears `settle_delay` after the
//! gesture ends.
//!
//! Time is passed in by the caller. Deadlines fire from [`HoverController::tick`].

use std::time::{Duration, Instant};

use tracing::trace;

use crate::overlay::markers::MountedMarker;
use crate::overlay::provider::{MapProvider, MarkerId, PopupId};
use crate::popup::PopupContent;

#[derive(Debug, Clone, Copy)]
struct PopupSlot {
    id: PopupId,
    shown_for: Option<MarkerId>,
}

#[derive(Debug)]
pub struct HoverController {
    popup: Option<PopupSlot>,
    interacting: bool,
    hide_at: Option<Instant>,
    settle_at: Option<Instant>,
    hide_delay: Duration,
    settle_delay: Duration,
}

impl HoverController {
    pub fn new(hide_delay: Duration, settle_delay: Duration) -> Self {
        Self {
            popup: None,
            interacting: false,
            hide_at: None,
            settle_at: None,
            hide_delay,
            settle_delay,
        }
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    /// Marker the popup is currently anchored to
    pub fn shown_for(&self) -> Option<MarkerId> {
        self.popup.and_then(|slot| slot.shown_for)
    }

    /// Pointer entered a marker. `content` is only built when the popup
    /// will actually be shown.
    pub fn enter<P, F>(&mut self, provider: &mut P, marker: &MountedMarker, content: F)
    where
        P: MapProvider,
        F: FnOnce() -> PopupContent,
    {
        if self.interacting {
            trace!(marker = ?marker.id, "hover suppressed during gesture");
            return;
        }

        self.hide(provider);

        let id = match self.popup {
            Some(slot) => slot.id,
            None => provider.create_popup(),
        };
        provider.set_popup_content(id, content());
        provider.show_popup(id, marker.at);
        self.popup = Some(PopupSlot {
            id,
            shown_for: Some(marker.id),
        });
    }

    /// Pointer left a marker. Hiding is deferred so that crossing to an
    /// adjacent marker does not flash the popup off and on.
    pub fn leave(&mut self, marker: MarkerId, now: Instant) {
        if self.shown_for() == Some(marker) {
            self.hide_at = Some(now + self.hide_delay);
        }
    }

    /// Camera move started; stays suppressed until [`Self::end_gesture`]
    pub fn begin_gesture<P: MapProvider>(&mut self, provider: &mut P) {
        self.interacting = true;
        self.settle_at = None;
        self.hide(provider);
    }

    /// One-shot interaction (wheel tick, pointer leaving the canvas)
    pub fn nudge_gesture<P: MapProvider>(&mut self, provider: &mut P, now: Instant) {
        self.interacting = true;
        self.settle_at = Some(now + self.settle_delay);
        self.hide(provider);
    }

    pub fn end_gesture(&mut self, now: Instant) {
        if self.interacting {
            self.settle_at = Some(now + self.settle_delay);
        }
    }

    /// Fire due deadlines
    pub fn tick<P: MapProvider>(&mut self, provider: &mut P, now: Instant) {
        if self.hide_at.is_some_and(|at| now >= at) {
            self.hide_at = None;
            if !self.interacting {
                self.hide(provider);
            }
        }
        if self.settle_at.is_some_and(|at| now >= at) {
            self.settle_at = None;
            self.interacting = false;
        }
    }

    /// Remove the popup immediately if it is shown
    pub fn hide<P: MapProvider>(&mut self, provider: &mut P) {
        self.hide_at = None;
        if let Some(slot) = self.popup.as_mut() {
            if slot.shown_for.take().is_some() {
                provider.remove_popup(slot.id);
            }
        }
    }

    /// Drop the popup slot entirely
    pub fn dispose<P: MapProvider>(&mut self, provider: &mut P) {
        if let Some(slot) = self.popup.take() {
            provider.remove_popup(slot.id);
        }
        self.hide_at = None;
        self.settle_at = None;
        self.interacting = false;
    }
}
