use std::time::Duration;

use serde::Deserialize;

use crate::error::ProviderError;
use crate::geo::LngLat;
use crate::popup::PopupContent;

/// Provider-issued marker handle. Ids are never reused within a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

/// Provider-issued popup handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopupId(pub u64);

/// Camera animation curve, `t` in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    Linear,
    #[default]
    EaseOutQuad,
    EaseInOutCubic,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseOutQuad => t * (2.0 - t),
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Animated camera move to `center` at web-map zoom level `zoom`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyTo {
    pub center: LngLat,
    pub zoom: f64,
    pub duration: Duration,
    pub easing: Easing,
}

/// Camera notifications a provider raises for the host to forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraEvent {
    MoveStart,
    MoveEnd,
}

/// The capability set the overlay needs from a mapping backend.
///
/// Removal calls must tolerate ids that are already gone: the overlay
/// tears everything down on rebuild and dispose without tracking what the
/// provider may have dropped on its own.
pub trait MapProvider {
    fn add_marker(&mut self, at: LngLat) -> Result<MarkerId, ProviderError>;

    fn remove_marker(&mut self, id: MarkerId);

    fn create_popup(&mut self) -> PopupId;

    fn set_popup_content(&mut self, id: PopupId, content: PopupContent);

    fn show_popup(&mut self, id: PopupId, at: LngLat);

    /// Take the popup off the map; the id stays valid for a later show
    fn remove_popup(&mut self, id: PopupId);

    fn fly_to(&mut self, cmd: FlyTo);

    /// Release everything; no other call follows
    fn destroy(&mut self);
}
