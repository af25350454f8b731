//! District price overlay for a terminal map.
//!
//! The library holds everything that is independent of the terminal UI:
//! district records and their loaders, price formatting, popup content,
//! the [`overlay::MarkerOverlay`] controller and the braille map backend
//! that implements its [`overlay::MapProvider`] seam.

pub mod braille;
pub mod config;
pub mod data;
pub mod district;
pub mod error;
pub mod format;
pub mod geo;
pub mod map;
pub mod overlay;
pub mod popup;
