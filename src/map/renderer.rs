use crate::braille::BrailleCanvas;
use crate::geo::{Bounds, LngLat};
use crate::map::geometry::{draw_line, draw_ring};
use crate::map::projection::Viewport;
use crate::map::spatial::FeatureGrid;
use crate::overlay::MarkerId;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Grid cell size for basemap culling, in degrees
const BASEMAP_CELL: f64 = 0.05;

/// Above this many grid cells a viewport query is slower than drawing
/// everything
const MAX_QUERY_CELLS: i64 = 4096;

/// Outline layer drawn under the markers (commune limits, roads, shore)
pub struct Basemap {
    lines: Vec<LineString>,
    grid: FeatureGrid,
}

impl Basemap {
    pub fn new(lines: Vec<LineString>) -> Self {
        let lines: Vec<LineString> = lines.into_iter().filter(|l| l.len() >= 2).collect();
        let grid = FeatureGrid::build(lines.iter().map(|l| line_bbox(l)), BASEMAP_CELL);
        Self { lines, grid }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Extent of all outline points
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::enclosing(
            self.lines
                .iter()
                .flatten()
                .filter_map(|&(lon, lat)| LngLat::checked(lon, lat)),
        )
    }

    /// Lines that may intersect the viewport
    fn visible(&self, viewport: &Viewport) -> Vec<usize> {
        let (min_lon, min_lat, max_lon, max_lat) = viewport.visible_bbox();
        if self.grid.cells_in(min_lon, min_lat, max_lon, max_lat) > MAX_QUERY_CELLS {
            return (0..self.lines.len()).collect();
        }
        self.grid.query(min_lon, min_lat, max_lon, max_lat)
    }
}

fn line_bbox(line: &LineString) -> (f64, f64, f64, f64) {
    line.iter().fold(
        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |(min_lon, min_lat, max_lon, max_lat), &(lon, lat)| {
            (min_lon.min(lon), min_lat.min(lat), max_lon.max(lon), max_lat.max(lat))
        },
    )
}

/// A marker's cell on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerGlyph {
    pub id: MarkerId,
    pub col: u16,
    pub row: u16,
    pub hovered: bool,
}

/// Draws the basemap and marker layer for one frame
pub struct MapRenderer {
    basemap: Basemap,
}

impl MapRenderer {
    pub fn new(basemap: Basemap) -> Self {
        Self { basemap }
    }

    pub fn basemap(&self) -> &Basemap {
        &self.basemap
    }

    /// Draw outlines to the canvas and return marker cells inside it.
    /// The hovered marker also gets a ring on the canvas.
    pub fn render(
        &self,
        canvas: &mut BrailleCanvas,
        viewport: &Viewport,
        markers: impl Iterator<Item = (MarkerId, LngLat)>,
        hovered: Option<MarkerId>,
    ) -> Vec<MarkerGlyph> {
        for idx in self.basemap.visible(viewport) {
            self.draw_linestring(canvas, &self.basemap.lines[idx], viewport);
        }

        let ring_radius = if viewport.zoom_level() >= 14.0 { 4 } else { 3 };
        let mut glyphs = Vec::new();
        for (id, at) in markers {
            let (px, py) = viewport.project(at.lng, at.lat);
            if !viewport.is_visible(px, py) {
                continue;
            }
            let is_hovered = hovered == Some(id);
            if is_hovered {
                draw_ring(canvas, px, py, ring_radius);
            }
            glyphs.push(MarkerGlyph {
                id,
                col: (px / 2) as u16,
                row: (py / 4) as u16,
                hovered: is_hovered,
            });
        }
        glyphs
    }

    /// Draw a linestring with viewport culling
    fn draw_linestring(&self, canvas: &mut BrailleCanvas, line: &LineString, viewport: &Viewport) {
        let mut prev: Option<(i32, i32)> = None;

        for &(lon, lat) in line {
            let (px, py) = viewport.project(lon, lat);

            if let Some((prev_x, prev_y)) = prev {
                // Segments spanning the antimeridian would streak across the canvas
                let dist = (px - prev_x).unsigned_abs() as usize + (py - prev_y).unsigned_abs() as usize;
                if dist < viewport.width * 4 && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                    draw_line(canvas, prev_x, prev_y, px, py);
                }
            }

            prev = Some((px, py));
        }
    }
}
