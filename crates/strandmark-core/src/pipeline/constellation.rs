//! Brightest-point grid signature ("constellation").
//!
//! The image is split into a `G x G` grid. Each cell contributes the position
//! and luminance of its brightest pixel, normalized against the full image,
//! so the signature survives mild resizing and recompression.

use crate::types::{ConstellationCell, ConstellationSignature};

use super::pixels::PixelBuffer;

/// Rec. 601 luma of an RGB triple, in `[0, 255]`.
pub fn luminance([r, g, b]: [u8; 3]) -> f64 {
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// Largest supported grid, in cells per side.
pub const MAX_GRID_SIZE: u32 = 256;

/// Extracts constellation signatures with a fixed grid size.
#[derive(Debug, Clone, Copy)]
pub struct ConstellationExtractor {
    grid_size: u32,
}

impl Default for ConstellationExtractor {
    fn default() -> Self {
        Self::new(8)
    }
}

impl ConstellationExtractor {
    /// Grid sizes outside `1..=MAX_GRID_SIZE` are clamped into range.
    pub fn new(grid_size: u32) -> Self {
        Self {
            grid_size: grid_size.clamp(1, MAX_GRID_SIZE),
        }
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    /// Compute the signature for a buffer.
    ///
    /// Cells are emitted row-major. Within a cell the scan is row-major and
    /// only a strictly brighter pixel replaces the current pick, so the first
    /// pixel wins ties. Cells with no pixels (image smaller than the grid)
    /// report their origin with zero brightness.
    pub fn extract(&self, buffer: &PixelBuffer) -> ConstellationSignature {
        let (width, height) = buffer.dimensions();
        let grid = self.grid_size;
        let cell_w = f64::from(width) / f64::from(grid);
        let cell_h = f64::from(height) / f64::from(grid);

        let mut cells = Vec::with_capacity((grid * grid) as usize);
        for row in 0..grid {
            for col in 0..grid {
                let start_x = (f64::from(col) * cell_w) as u32;
                let start_y = (f64::from(row) * cell_h) as u32;
                let w = (cell_w as u32).min(width.saturating_sub(start_x));
                let h = (cell_h as u32).min(height.saturating_sub(start_y));

                let (max_x, max_y, max_l) = brightest_in_cell(buffer, start_x, start_y, w, h)
                    .unwrap_or((start_x, start_y, 0.0));

                cells.push(ConstellationCell {
                    row,
                    col,
                    x: normalize(f64::from(max_x), width),
                    y: normalize(f64::from(max_y), height),
                    b: (max_l / 255.0).clamp(0.0, 1.0),
                });
            }
        }

        ConstellationSignature {
            grid_size: grid,
            cells,
        }
    }
}

/// Scan one cell; returns the absolute position and luminance of its
/// brightest pixel, or `None` for an empty cell.
fn brightest_in_cell(
    buffer: &PixelBuffer,
    start_x: u32,
    start_y: u32,
    w: u32,
    h: u32,
) -> Option<(u32, u32, f64)> {
    let mut best: Option<(u32, u32, f64)> = None;
    for y in start_y..start_y + h {
        for x in start_x..start_x + w {
            let Some(rgb) = buffer.get(x, y) else {
                continue;
            };
            let l = luminance(rgb);
            match best {
                Some((_, _, max)) if l <= max => {}
                _ => best = Some((x, y, l)),
            }
        }
    }
    best
}

fn normalize(value: f64, extent: u32) -> f64 {
    if extent == 0 {
        0.0
    } else {
        (value / f64::from(extent)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn noise(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, |x, y| {
            let v = x.wrapping_mul(2_654_435_761).wrapping_add(y.wrapping_mul(40_503));
            [(v >> 8) as u8, (v >> 16) as u8, (v >> 24) as u8]
        })
    }

    #[test]
    fn test_cell_count_and_coverage() {
        for (w, h, g) in [(64, 64, 8), (100, 37, 8), (5, 5, 8), (1, 1, 3), (640, 480, 5)] {
            let signature = ConstellationExtractor::new(g).extract(&noise(w, h));
            assert_eq!(signature.cells.len(), (g * g) as usize);

            let positions: HashSet<(u32, u32)> =
                signature.cells.iter().map(|c| (c.row, c.col)).collect();
            assert_eq!(positions.len(), (g * g) as usize);
            assert!(positions.iter().all(|&(r, c)| r < g && c < g));
        }
    }

    #[test]
    fn test_cells_are_row_major() {
        let signature = ConstellationExtractor::new(4).extract(&noise(40, 40));
        for (i, cell) in signature.cells.iter().enumerate() {
            assert_eq!(cell.row, i as u32 / 4);
            assert_eq!(cell.col, i as u32 % 4);
        }
    }

    #[test]
    fn test_values_normalized() {
        for (w, h) in [(64, 64), (33, 97), (3, 2), (1000, 7)] {
            let signature = ConstellationExtractor::default().extract(&noise(w, h));
            for cell in &signature.cells {
                assert!((0.0..=1.0).contains(&cell.x));
                assert!((0.0..=1.0).contains(&cell.y));
                assert!((0.0..=1.0).contains(&cell.b));
            }
        }
    }

    #[test]
    fn test_uniform_image_picks_cell_origin() {
        let buffer = PixelBuffer::filled(64, 64, [128, 128, 128]);
        let signature = ConstellationExtractor::new(8).extract(&buffer);

        for cell in &signature.cells {
            assert_eq!(cell.x, f64::from(cell.col * 8) / 64.0);
            assert_eq!(cell.y, f64::from(cell.row * 8) / 64.0);
        }
    }

    #[test]
    fn test_white_image_full_brightness() {
        let buffer = PixelBuffer::filled(16, 16, [255, 255, 255]);
        let signature = ConstellationExtractor::new(2).extract(&buffer);

        assert_eq!(signature.cells.len(), 4);
        for cell in &signature.cells {
            assert_eq!(format!("{:.2}", cell.b), "1.00");
        }
        assert!(signature.to_json().matches("\"b\": 1.00").count() == 4);
    }

    #[test]
    fn test_brightest_pixel_found_at_absolute_position() {
        let buffer = PixelBuffer::from_fn(40, 20, |x, y| {
            if x == 27 && y == 13 {
                [250, 250, 250]
            } else {
                [10, 10, 10]
            }
        });
        let signature = ConstellationExtractor::new(2).extract(&buffer);
        let cell = signature.cell(1, 1).unwrap();
        assert_eq!(cell.x, 27.0 / 40.0);
        assert_eq!(cell.y, 13.0 / 20.0);
    }

    #[test]
    fn test_strictly_greater_keeps_first_on_tie() {
        let buffer = PixelBuffer::from_fn(4, 4, |x, y| {
            if (x == 1 && y == 2) || (x == 3 && y == 2) {
                [200, 0, 0]
            } else {
                [0, 0, 0]
            }
        });
        let cell = ConstellationExtractor::new(1).extract(&buffer).cells[0];
        assert_eq!(cell.x, 0.25);
        assert_eq!(cell.y, 0.5);
    }

    #[test]
    fn test_image_smaller_than_grid() {
        let buffer = PixelBuffer::filled(3, 3, [255, 255, 255]);
        let signature = ConstellationExtractor::new(8).extract(&buffer);
        assert_eq!(signature.cells.len(), 64);
        assert!(signature.cells.iter().all(|c| c.b == 0.0));
    }

    #[test]
    fn test_grid_size_is_clamped() {
        assert_eq!(ConstellationExtractor::new(0).grid_size(), 1);
        assert_eq!(ConstellationExtractor::new(u32::MAX).grid_size(), MAX_GRID_SIZE);

        let buffer = PixelBuffer::filled(4, 4, [9, 9, 9]);
        assert_eq!(ConstellationExtractor::new(0).extract(&buffer).cells.len(), 1);
    }

    #[test]
    fn test_extraction_is_byte_identical() {
        let buffer = noise(211, 173);
        let extractor = ConstellationExtractor::default();
        assert_eq!(
            extractor.extract(&buffer).to_json(),
            extractor.extract(&buffer).to_json()
        );
    }

    #[test]
    fn test_luminance_weights() {
        assert_eq!(luminance([0, 0, 0]), 0.0);
        assert!((luminance([255, 255, 255]) - 255.0).abs() < 1e-9);
        assert!(luminance([0, 255, 0]) > luminance([255, 0, 0]));
    }
}
