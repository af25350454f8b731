mod flight;
mod geometry;
mod projection;
mod renderer;
mod spatial;
mod terminal;

pub use flight::{Flight, FlightFrame};
pub use projection::{Viewport, MAX_ZOOM_LEVEL, MIN_ZOOM_LEVEL};
pub use renderer::{Basemap, LineString, MapRenderer, MarkerGlyph};
pub use spatial::{FeatureGrid, SpatialGrid};
pub use terminal::{MapFrame, PopupPlacement, TerminalMap};
