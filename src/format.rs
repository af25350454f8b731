use num_format::{Locale, ToFormattedString};

use crate::district::Scalar;

/// Placeholder shown for missing or unusable prices
pub const DASH: &str = "-";

/// Amounts beyond this cannot round-trip through `i64` exactly
const MAX_AMOUNT: f64 = 9.0e15;

/// Locale-grouped integer price rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceFormatter {
    locale: Locale,
}

impl Default for PriceFormatter {
    fn default() -> Self {
        Self { locale: Locale::fr }
    }
}

impl PriceFormatter {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Format a loosely typed price, falling back to [`DASH`]
    pub fn format(&self, value: Option<&Scalar>) -> String {
        match value.and_then(Scalar::as_f64) {
            Some(amount) => self.format_amount(amount),
            None => DASH.to_string(),
        }
    }

    /// Format a numeric amount with no decimal places.
    /// Zero is a placeholder in the price feeds and renders as [`DASH`].
    pub fn format_amount(&self, amount: f64) -> String {
        if !amount.is_finite() {
            return DASH.to_string();
        }
        let rounded = amount.round();
        if rounded == 0.0 || rounded.abs() >= MAX_AMOUNT {
            return DASH.to_string();
        }
        (rounded as i64).to_formatted_string(&self.locale)
    }
}

/// Format with the default (`fr`) locale
pub fn format_price(value: Option<&Scalar>) -> String {
    PriceFormatter::default().format(value)
}
