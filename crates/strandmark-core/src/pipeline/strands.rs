//! Three vertical pixel strands sampled at fixed columns.
//!
//! The image height is split into three strips of `height / 3` rows. Each
//! band samples a single column:
//!
//! ```text
//!   x3 = 80% ──┐   top strand     rows [0, strip)
//!   x2 = 50% ──┤   middle strand  rows [(h - strip) / 2, .. + strip)
//!   x1 = 15% ──┘   bottom strand  rows [h - strip, h)
//! ```
//!
//! Rows past `3 * strip` in the remainder are never sampled.

use crate::types::{Strand, StrandBand, StrandSample, StrandSet};

use super::pixels::{OutOfBounds, PixelBuffer};

/// Samples the three strands from a pixel buffer.
pub struct StrandExtractor;

impl StrandExtractor {
    /// Extract all three strands.
    ///
    /// `width` and `height` drive the geometry; they normally match the
    /// buffer but may come from the source's record. Any sampled coordinate
    /// outside the buffer aborts extraction.
    pub fn extract(
        buffer: &PixelBuffer,
        width: u32,
        height: u32,
    ) -> Result<StrandSet, OutOfBounds> {
        let strip_height = height / 3;
        let strands = [
            Self::sample_band(buffer, StrandBand::Bottom, width, height, strip_height)?,
            Self::sample_band(buffer, StrandBand::Middle, width, height, strip_height)?,
            Self::sample_band(buffer, StrandBand::Top, width, height, strip_height)?,
        ];

        Ok(StrandSet {
            width,
            height,
            strip_height,
            strands,
        })
    }

    /// Column sampled for a band.
    pub fn column(band: StrandBand, width: u32) -> u32 {
        (f64::from(width) * band.column_fraction()) as u32
    }

    /// First row sampled for a band.
    pub fn start_row(band: StrandBand, height: u32, strip_height: u32) -> u32 {
        match band {
            StrandBand::Bottom => height - strip_height,
            StrandBand::Middle => (height - strip_height) / 2,
            StrandBand::Top => 0,
        }
    }

    fn sample_band(
        buffer: &PixelBuffer,
        band: StrandBand,
        width: u32,
        height: u32,
        strip_height: u32,
    ) -> Result<Strand, OutOfBounds> {
        let x = Self::column(band, width);
        let y_start = Self::start_row(band, height, strip_height);

        let mut samples = Vec::with_capacity(strip_height as usize);
        for y in (y_start..y_start + strip_height).take_while(|&y| y < height) {
            let [r, g, b] = buffer.try_get(x, y)?;
            samples.push(StrandSample { x, y, r, g, b });
        }

        tracing::trace!(
            "Strand {} ({}): X={}, Y={} to {}",
            band.number(),
            band.name(),
            x,
            y_start,
            y_start + strip_height
        );

        Ok(Strand {
            band,
            x,
            y_start,
            span: strip_height,
            samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, |x, y| {
            [(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8]
        })
    }

    #[test]
    fn test_tall_image_geometry() {
        let buffer = gradient(300, 900);
        let set = StrandExtractor::extract(&buffer, 300, 900).unwrap();

        assert_eq!(set.strip_height, 300);

        let bottom = set.strand(StrandBand::Bottom);
        let middle = set.strand(StrandBand::Middle);
        let top = set.strand(StrandBand::Top);

        assert_eq!((bottom.x, middle.x, top.x), (45, 150, 240));
        assert_eq!(bottom.y_start, 600);
        assert_eq!(bottom.samples.last().unwrap().y, 899);
        assert_eq!(middle.y_start, 300);
        assert_eq!(middle.samples.last().unwrap().y, 599);
        assert_eq!(top.y_start, 0);
        assert_eq!(top.samples.last().unwrap().y, 299);

        assert_eq!(set.counts(), [300, 300, 300]);
        assert_eq!(set.total_samples(), 900);
    }

    #[test]
    fn test_samples_share_column_and_are_contiguous() {
        let buffer = gradient(101, 77);
        let set = StrandExtractor::extract(&buffer, 101, 77).unwrap();

        for strand in &set.strands {
            assert!(strand.samples.iter().all(|s| s.x == strand.x));
            for pair in strand.samples.windows(2) {
                assert_eq!(pair[1].y, pair[0].y + 1);
            }
        }
    }

    #[test]
    fn test_counts_bounded_by_strip_height() {
        for height in [1u32, 2, 3, 4, 5, 10, 11, 64, 899, 901] {
            let buffer = gradient(20, height);
            let set = StrandExtractor::extract(&buffer, 20, height).unwrap();
            let strip = (height / 3) as usize;
            for count in set.counts() {
                assert!(count <= strip, "height {height}: {count} > {strip}");
            }
            assert!(set.total_samples() <= 3 * strip);
        }
    }

    #[test]
    fn test_remainder_rows_not_sampled() {
        // 10 rows: strip = 3, bottom covers 7..10, middle 3..6, top 0..3; row 6 is skipped.
        let buffer = gradient(10, 10);
        let set = StrandExtractor::extract(&buffer, 10, 10).unwrap();
        let rows: Vec<u32> = set
            .strands
            .iter()
            .flat_map(|s| s.samples.iter().map(|p| p.y))
            .collect();
        assert!(!rows.contains(&6));
        assert_eq!(set.strand(StrandBand::Middle).y_start, 3);
    }

    #[test]
    fn test_sample_colors_come_from_buffer() {
        let buffer = gradient(300, 900);
        let set = StrandExtractor::extract(&buffer, 300, 900).unwrap();
        let first = set.strand(StrandBand::Bottom).samples[0];
        assert_eq!(buffer.get(first.x, first.y), Some([first.r, first.g, first.b]));
    }

    #[test]
    fn test_tiny_image_yields_empty_strands() {
        let buffer = gradient(2, 2);
        let set = StrandExtractor::extract(&buffer, 2, 2).unwrap();
        assert_eq!(set.strip_height, 0);
        assert_eq!(set.total_samples(), 0);
    }

    #[test]
    fn test_geometry_larger_than_buffer_fails() {
        // Source reported dimensions that the decoded buffer does not have.
        let buffer = gradient(100, 100);
        let err = StrandExtractor::extract(&buffer, 100, 300).unwrap_err();
        assert_eq!(err.height, 100);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let buffer = gradient(123, 456);
        let a = StrandExtractor::extract(&buffer, 123, 456).unwrap();
        let b = StrandExtractor::extract(&buffer, 123, 456).unwrap();
        assert_eq!(a, b);
    }
}
