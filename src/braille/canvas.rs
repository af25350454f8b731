/// Braille dot canvas for terminal line art.
/// Each character cell holds a 2x4 dot grid; cells map to U+2800..U+28FF.
pub struct BrailleCanvas {
    width: usize,  // cells
    height: usize, // cells
    cells: Vec<u8>, // dot bits, row-major
}

impl BrailleCanvas {
    /// Canvas of `width` x `height` cells (`width*2` x `height*4` dots)
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0u8; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Dot bit for a position inside a cell:
    /// ```text
    /// (0,0) (1,0)   0x01 0x08
    /// (0,1) (1,1)   0x02 0x10
    /// (0,2) (1,2)   0x04 0x20
    /// (0,3) (1,3)   0x40 0x80
    /// ```
    #[inline(always)]
    fn dot_bit(dx: usize, dy: usize) -> u8 {
        const BITS: [[u8; 4]; 2] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];
        BITS[dx][dy]
    }

    /// Set one dot; out-of-range dots are dropped
    pub fn set_dot(&mut self, x: i32, y: i32) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        let (cx, cy) = (x / 2, y / 4);
        if cx >= self.width || cy >= self.height {
            return;
        }
        self.cells[cy * self.width + cx] |= Self::dot_bit(x % 2, y % 4);
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Glyph at a cell, `None` when the cell has no dots
    pub fn glyph(&self, col: usize, row: usize) -> Option<char> {
        if col >= self.width || row >= self.height {
            return None;
        }
        match self.cells[row * self.width + col] {
            0 => None,
            bits => char::from_u32(0x2800 + bits as u32),
        }
    }

    /// Non-empty cells as `(col, row, glyph)`
    pub fn glyphs(&self) -> impl Iterator<Item = (usize, usize, char)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(idx, &bits)| {
            if bits == 0 {
                return None;
            }
            let glyph = char::from_u32(0x2800 + bits as u32)?;
            Some((idx % self.width, idx / self.width, glyph))
        })
    }

    #[cfg(test)]
    pub fn to_string(&self) -> String {
        (0..self.height)
            .map(|row| {
                (0..self.width)
                    .map(|col| self.glyph(col, row).unwrap_or('\u{2800}'))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_dot() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_dot(0, 0);
        assert_eq!(canvas.to_string(), "⠁");
    }

    #[test]
    fn test_full_cell() {
        let mut canvas = BrailleCanvas::new(1, 1);
        for x in 0..2 {
            for y in 0..4 {
                canvas.set_dot(x, y);
            }
        }
        assert_eq!(canvas.to_string(), "⣿");
    }

    #[test]
    fn test_out_of_range_dropped() {
        let mut canvas = BrailleCanvas::new(2, 1);
        canvas.set_dot(-1, 0);
        canvas.set_dot(4, 0);
        canvas.set_dot(0, 4);
        assert_eq!(canvas.glyphs().count(), 0);
    }

    #[test]
    fn test_glyphs_positions() {
        let mut canvas = BrailleCanvas::new(3, 2);
        canvas.set_dot(5, 7);
        let glyphs: Vec<_> = canvas.glyphs().collect();
        assert_eq!(glyphs, vec![(2, 1, '⢀')]);
        canvas.clear();
        assert!(canvas.glyph(2, 1).is_none());
    }
}
