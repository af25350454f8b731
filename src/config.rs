use std::fs;
use std::path::Path;
use std::time::Duration;

use num_format::Locale;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::format::PriceFormatter;
use crate::overlay::Easing;

/// Tunables for the overlay, all optional in the TOML file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayConfig {
    /// Delay before hiding the popup after the pointer leaves a marker
    pub hover_hide_delay_ms: u64,
    /// Quiet period after a gesture before popups may open again
    pub settle_delay_ms: u64,
    /// Delay between the last keystroke and refreshing suggestions
    pub search_debounce_ms: u64,
    pub max_suggestions: usize,
    /// Web-map zoom level used when a marker is clicked
    pub click_zoom: f64,
    /// Web-map zoom level used when a search suggestion is picked
    pub detail_zoom: f64,
    pub fly_duration_ms: u64,
    pub easing: Easing,
    /// `num-format` locale name for price grouping
    pub locale: String,
    /// Marker hover/click radius in terminal cells
    pub hit_radius: u16,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            hover_hide_delay_ms: 150,
            settle_delay_ms: 200,
            search_debounce_ms: 150,
            max_suggestions: 8,
            click_zoom: 12.0,
            detail_zoom: 13.0,
            fly_duration_ms: 1200,
            easing: Easing::EaseOutQuad,
            locale: "fr".to_string(),
            hit_radius: 2,
        }
    }
}

impl OverlayConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, zoom) in [("click_zoom", self.click_zoom), ("detail_zoom", self.detail_zoom)] {
            if !zoom.is_finite() || zoom <= 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("zoom must be positive, got {zoom}"),
                });
            }
        }
        if self.max_suggestions == 0 {
            return Err(ConfigError::Invalid {
                field: "max_suggestions",
                reason: "must be at least 1".to_string(),
            });
        }
        self.locale()?;
        Ok(())
    }

    fn locale(&self) -> Result<Locale, ConfigError> {
        Locale::from_name(&self.locale).map_err(|e| ConfigError::Invalid {
            field: "locale",
            reason: e.to_string(),
        })
    }

    /// Price formatter for the configured locale; falls back to `fr`
    pub fn formatter(&self) -> PriceFormatter {
        self.locale().map(PriceFormatter::new).unwrap_or_default()
    }

    pub fn hover_hide_delay(&self) -> Duration {
        Duration::from_millis(self.hover_hide_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn fly_duration(&self) -> Duration {
        Duration::from_millis(self.fly_duration_ms)
    }
}
