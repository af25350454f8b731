use std::collections::HashMap;

/// Hash grid over point items for radius queries.
/// Cells are `cell_size` degrees on each side.
pub struct SpatialGrid<T> {
    cells: HashMap<(i32, i32), Vec<usize>>,
    items: Vec<(f64, f64, T)>,
    cell_size: f64,
}

impl<T> SpatialGrid<T> {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            items: Vec::new(),
            cell_size,
        }
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    pub fn insert(&mut self, lon: f64, lat: f64, item: T) {
        let idx = self.items.len();
        self.items.push((lon, lat, item));
        let cell = self.to_cell(lon, lat);
        self.cells.entry(cell).or_default().push(idx);
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.items.clear();
    }

    /// Number of cells a radius query would touch per axis
    pub fn cell_span(&self, radius_degrees: f64) -> i32 {
        (radius_degrees / self.cell_size).ceil() as i32 * 2 + 1
    }

    /// Items in the cells around (lon, lat). Candidates only: callers
    /// apply their own exact distance test.
    pub fn query_radius(&self, lon: f64, lat: f64, radius_degrees: f64) -> impl Iterator<Item = &(f64, f64, T)> + '_ {
        let center = self.to_cell(lon, lat);
        let r = (radius_degrees / self.cell_size).ceil() as i32;

        (-r..=r)
            .flat_map(move |dy| (-r..=r).map(move |dx| (center.0 + dx, center.1 + dy)))
            .filter_map(move |cell| self.cells.get(&cell))
            .flatten()
            .map(move |&idx| &self.items[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &(f64, f64, T)> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Index of line features by bounding box. A feature is filed under every
/// cell its bbox overlaps, so queries have no false negatives.
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl FeatureGrid {
    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from (min_lon, min_lat, max_lon, max_lat) per feature
    pub fn build(bboxes: impl Iterator<Item = (f64, f64, f64, f64)>, cell_size: f64) -> Self {
        let mut grid = Self {
            cells: HashMap::new(),
            cell_size,
        };
        for (idx, (min_lon, min_lat, max_lon, max_lat)) in bboxes.enumerate() {
            let min_cell = grid.to_cell(min_lon, min_lat);
            let max_cell = grid.to_cell(max_lon, max_lat);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    /// Sorted, deduplicated feature indices overlapping the bounds
    pub fn query(&self, min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Vec<usize> {
        let min_cell = self.to_cell(min_lon, min_lat);
        let max_cell = self.to_cell(max_lon, max_lat);
        let mut results = Vec::new();
        for y in min_cell.1..=max_cell.1 {
            for x in min_cell.0..=max_cell.0 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend_from_slice(indices);
                }
            }
        }
        results.sort_unstable();
        results.dedup();
        results
    }

    /// Number of cells a query over the bounds would visit
    pub fn cells_in(&self, min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> i64 {
        let min_cell = self.to_cell(min_lon, min_lat);
        let max_cell = self.to_cell(max_lon, max_lat);
        (max_cell.0 as i64 - min_cell.0 as i64 + 1) * (max_cell.1 as i64 - min_cell.1 as i64 + 1)
    }
}
