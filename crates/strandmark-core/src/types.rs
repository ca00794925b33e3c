//! Core data types for the Strandmark provenance pipeline.
//!
//! These types describe one unit of work (an [`ImageRecord`]) and the two
//! signatures extracted from it.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Digits printed beyond the requested precision when looking for a tie.
/// Far below the spacing of doubles in the ranges written to artifacts.
const TIE_CHECK_DIGITS: usize = 40;

/// Fixed-point formatting that rounds exact ties away from zero.
///
/// `format!("{:.N}")` rounds a value lying exactly halfway (such as
/// `0.03125` at 4 decimals) to even. Stored artifacts round those up, so
/// `format_fixed(0.03125, 4)` is `"0.0313"`.
pub fn format_fixed(value: f64, decimals: usize) -> String {
    let wide = format!("{:.*}", decimals + TIE_CHECK_DIGITS, value);
    let Some(dot) = wide.find('.') else {
        return format!("{:.*}", decimals, value);
    };
    let cut = if decimals == 0 { dot } else { dot + 1 + decimals };
    let tail = &wide[dot + 1 + decimals..];
    let is_tie = tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0');
    if !is_tie {
        return format!("{:.*}", decimals, value);
    }
    round_away(&wide[..cut])
}

/// Add one unit in the last place to a decimal string, carrying as needed.
fn round_away(truncated: &str) -> String {
    let mut digits: Vec<char> = truncated.chars().collect();
    for i in (0..digits.len()).rev() {
        match digits[i] {
            '9' => digits[i] = '0',
            '0'..='8' => {
                digits[i] = char::from(digits[i] as u8 + 1);
                return digits.into_iter().collect();
            }
            _ => {}
        }
    }
    let at = usize::from(digits.first() == Some(&'-'));
    digits.insert(at, '1');
    digits.into_iter().collect()
}

/// One image as reported by the change source.
///
/// Immutable once read; identifies a single unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Monotonically increasing identifier assigned by the source
    pub id: i64,

    /// Display name (usually the file name)
    pub display_name: String,

    /// Width reported by the source; 0 when unknown
    pub width: u32,

    /// Height reported by the source; 0 when unknown
    pub height: u32,

    /// File size in bytes
    pub size_bytes: u64,

    /// Opaque locator handed to the pixel source
    pub locator: String,
}

impl ImageRecord {
    /// File size in mebibytes.
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// The three sampled bands, bottom first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrandBand {
    Bottom,
    Middle,
    Top,
}

impl StrandBand {
    /// All bands in output order.
    pub const ALL: [StrandBand; 3] = [StrandBand::Bottom, StrandBand::Middle, StrandBand::Top];

    /// Zero-based band index (0 = bottom, 1 = middle, 2 = top).
    pub fn index(self) -> usize {
        match self {
            Self::Bottom => 0,
            Self::Middle => 1,
            Self::Top => 2,
        }
    }

    /// One-based strand number used in artifact headings.
    pub fn number(self) -> usize {
        self.index() + 1
    }

    /// Upper-case label used in artifact headings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Bottom => "BOTTOM",
            Self::Middle => "MIDDLE",
            Self::Top => "TOP",
        }
    }

    /// Title-case name used in the metadata summary.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bottom => "Bottom",
            Self::Middle => "Middle",
            Self::Top => "Top",
        }
    }

    /// Horizontal position of the sampled column, in percent of the width.
    pub fn column_percent(self) -> u32 {
        match self {
            Self::Bottom => 15,
            Self::Middle => 50,
            Self::Top => 80,
        }
    }

    /// Horizontal position of the sampled column as a fraction of the width.
    pub fn column_fraction(self) -> f64 {
        match self {
            Self::Bottom => 0.15,
            Self::Middle => 0.50,
            Self::Top => 0.80,
        }
    }
}

/// A single sampled pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrandSample {
    pub x: u32,
    pub y: u32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl StrandSample {
    /// Upper-case `#RRGGBB` form of the sample's color.
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// The `X=..,Y=..,RGB(..),#RRGGBB` line written to strand files.
    pub fn to_line(&self) -> String {
        format!(
            "X={},Y={},RGB({},{},{}),{}",
            self.x,
            self.y,
            self.r,
            self.g,
            self.b,
            self.hex()
        )
    }
}

/// One vertical strand: a contiguous run of samples in a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strand {
    pub band: StrandBand,

    /// Sampled column
    pub x: u32,

    /// First sampled row
    pub y_start: u32,

    /// Rows the strand is meant to cover (the strip height)
    pub span: u32,

    /// Samples in ascending row order
    pub samples: Vec<StrandSample>,
}

impl Strand {
    /// Last row of the nominal range; -1 style values are kept for tiny images.
    pub fn y_end(&self) -> i64 {
        i64::from(self.y_start) + i64::from(self.span) - 1
    }

    /// Number of samples actually taken.
    pub fn count(&self) -> usize {
        self.samples.len()
    }
}

/// The three strands extracted from one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrandSet {
    /// Width the geometry was computed from
    pub width: u32,

    /// Height the geometry was computed from
    pub height: u32,

    /// `height / 3`, truncated
    pub strip_height: u32,

    /// Bottom, middle, top
    pub strands: [Strand; 3],
}

impl StrandSet {
    /// Get the strand for a band.
    pub fn strand(&self, band: StrandBand) -> &Strand {
        &self.strands[band.index()]
    }

    /// Per-band sample counts, bottom first.
    pub fn counts(&self) -> [usize; 3] {
        [
            self.strands[0].count(),
            self.strands[1].count(),
            self.strands[2].count(),
        ]
    }

    /// Total number of samples across all strands.
    pub fn total_samples(&self) -> usize {
        self.counts().iter().sum()
    }
}

/// The brightest point of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstellationCell {
    pub row: u32,
    pub col: u32,

    /// Absolute x normalized by image width
    pub x: f64,

    /// Absolute y normalized by image height
    pub y: f64,

    /// Luminance normalized by 255
    pub b: f64,
}

/// Grid of brightest points used as a perceptual fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstellationSignature {
    /// Cells per side
    pub grid_size: u32,

    /// `grid_size²` cells in row-major order
    pub cells: Vec<ConstellationCell>,
}

impl ConstellationSignature {
    /// Serialize to the fixed-precision JSON array stored on disk and sent
    /// to the registry.
    ///
    /// Coordinates use 4 decimals and brightness 2 decimals, rounded with
    /// [`format_fixed`]; the layout is stable so identical buffers produce
    /// identical bytes.
    pub fn to_json(&self) -> String {
        let mut out = String::from("[\n");
        let last = self.cells.len().saturating_sub(1);
        for (i, cell) in self.cells.iter().enumerate() {
            let _ = write!(
                out,
                "  {{ \"row\": {}, \"col\": {}, \"x\": {}, \"y\": {}, \"b\": {} }}",
                cell.row,
                cell.col,
                format_fixed(cell.x, 4),
                format_fixed(cell.y, 4),
                format_fixed(cell.b, 2)
            );
            out.push_str(if i < last { ",\n" } else { "\n" });
        }
        out.push(']');
        out
    }

    /// Parse a stored constellation array.
    ///
    /// The grid size is inferred from the largest row/col present.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let cells: Vec<ConstellationCell> = serde_json::from_str(json)?;
        let grid_size = cells
            .iter()
            .map(|c| c.row.max(c.col) + 1)
            .max()
            .unwrap_or(0);
        Ok(Self { grid_size, cells })
    }

    /// Look up the cell at a grid position.
    pub fn cell(&self, row: u32, col: u32) -> Option<&ConstellationCell> {
        self.cells.iter().find(|c| c.row == row && c.col == col)
    }
}

/// Everything produced for one image, ready to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedImage {
    pub record: ImageRecord,

    /// Position of this image in the session (1-based)
    pub sequence: u64,

    /// Local capture timestamp, `yyyy-MM-dd HH:mm:ss`
    pub captured_at: String,

    /// Author recorded in the artifacts
    pub author: String,

    pub strands: StrandSet,

    pub constellation: ConstellationSignature,
}

/// Snapshot of the session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Images that were assigned a sequence number, including ones that
    /// failed afterwards
    pub processed: u64,

    /// Images whose artifacts were all written
    pub persisted: u64,

    /// Images dropped because a stage failed
    pub failed: u64,

    /// Highest id the detector has seen
    pub last_seen_id: i64,

    /// Ids waiting in the queue
    pub queue_depth: usize,
}
