//! Reading `pixel_strands_<N>.txt` back and comparing it with fresh strands.

use serde::Serialize;

use crate::error::VerifyError;
use crate::types::{StrandBand, StrandSample, StrandSet};

/// Maximum per-channel difference for two pixels to match.
pub const CHANNEL_TOLERANCE: u8 = 5;

/// Percentage of matching pixels a strand needs.
pub const STRAND_MATCH_PERCENT: f64 = 90.0;

/// Pixel count difference above which the dimensions are considered changed.
pub const COUNT_TOLERANCE: usize = 10;

/// Header fields of a strand file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StrandFileHeader {
    pub image_id: Option<i64>,
    pub file_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub captured_at: Option<String>,
    pub captured_by: Option<String>,
}

/// One strand section as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedStrand {
    /// 1-based strand number from the heading
    pub number: usize,
    pub band: Option<StrandBand>,
    pub x: Option<u32>,
    pub start: Option<(u32, u32)>,
    pub samples: Vec<StrandSample>,
}

/// A parsed strand file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrandFile {
    pub header: StrandFileHeader,
    pub strands: Vec<ParsedStrand>,
}

/// Parse a strand file.
///
/// Unknown lines are skipped, but a line that starts like a pixel record
/// and does not parse is an error.
pub fn parse_strand_file(text: &str) -> Result<StrandFile, VerifyError> {
    let mut header = StrandFileHeader::default();
    let mut strands: Vec<ParsedStrand> = Vec::new();
    let mut in_pixels = false;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();

        if let Some(value) = field(line, "Image ID:") {
            header.image_id = value.parse().ok();
        } else if let Some(value) = field(line, "File Name:") {
            header.file_name = Some(value.to_string());
        } else if let Some(value) = field(line, "Image Dimensions:") {
            if let Some((w, h)) = parse_dimensions(value) {
                header.width = Some(w);
                header.height = Some(h);
            }
        } else if let Some(value) = field(line, "Captured At:") {
            header.captured_at = Some(value.to_string());
        } else if let Some(value) = field(line, "Captured By:") {
            header.captured_by = Some(value.to_string());
        }

        if let Some(heading) = line.strip_prefix("--- STRAND ") {
            strands.push(parse_heading(heading));
            in_pixels = false;
            continue;
        }

        if let Some(coords) = line.strip_prefix("Start:") {
            if let Some(strand) = strands.last_mut() {
                strand.start = parse_point(coords);
                in_pixels = true;
            }
            continue;
        }

        if line.starts_with("===") {
            in_pixels = false;
            continue;
        }

        if in_pixels && line.starts_with("X=") {
            let sample = parse_sample(line).ok_or_else(|| VerifyError::MalformedPixel {
                line_no: idx + 1,
                line: line.to_string(),
            })?;
            if let Some(strand) = strands.last_mut() {
                strand.samples.push(sample);
            }
        }
    }

    if strands.is_empty() {
        return Err(VerifyError::NoStrands);
    }
    Ok(StrandFile { header, strands })
}

fn field<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    line.strip_prefix(name).map(str::trim)
}

/// `"300 x 900 pixels"`
fn parse_dimensions(value: &str) -> Option<(u32, u32)> {
    let mut parts = value.split_whitespace();
    let width = parts.next()?.parse().ok()?;
    (parts.next()? == "x").then_some(())?;
    let height = parts.next()?.parse().ok()?;
    Some((width, height))
}

/// `"1: BOTTOM (X=45, 15% from left) ---"`
fn parse_heading(heading: &str) -> ParsedStrand {
    let number = heading
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(0);

    let band = StrandBand::ALL
        .into_iter()
        .find(|band| heading.contains(band.label()));

    let x = heading.split_once("X=").and_then(|(_, rest)| {
        rest.chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .ok()
    });

    ParsedStrand {
        number,
        band,
        x,
        start: None,
        samples: Vec::new(),
    }
}

/// First `(x,y)` pair in a `Start:` line.
fn parse_point(text: &str) -> Option<(u32, u32)> {
    let (_, rest) = text.split_once('(')?;
    let (inner, _) = rest.split_once(')')?;
    let (x, y) = inner.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

/// `X=45,Y=600,RGB(12,34,56),#0C2238`
fn parse_sample(line: &str) -> Option<StrandSample> {
    let rest = line.strip_prefix("X=")?;
    let (x, rest) = rest.split_once(",Y=")?;
    let (y, rest) = rest.split_once(",RGB(")?;
    let (rgb, hex) = rest.split_once("),")?;

    let mut channels = rgb.split(',').map(|v| v.trim().parse::<u8>().ok());
    let r = channels.next()??;
    let g = channels.next()??;
    let b = channels.next()??;
    if channels.next().is_some() {
        return None;
    }

    let hex = hex.trim();
    if hex.len() != 7 || !hex.starts_with('#') {
        return None;
    }

    Some(StrandSample {
        x: x.parse().ok()?,
        y: y.parse().ok()?,
        r,
        g,
        b,
    })
}

/// Per-strand comparison result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrandMatch {
    pub number: usize,
    pub band: StrandBand,

    /// Pixels in the stored strand
    pub total_pixels: usize,
    pub matching_pixels: usize,
    pub mismatching_pixels: usize,

    /// Matching pixels over the stored strand length
    pub match_percent: f64,
    pub is_match: bool,
}

/// Result of comparing stored strands with freshly extracted ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrandComparison {
    pub strands: Vec<StrandMatch>,

    /// Matching pixels over all compared pixels
    pub match_percent: f64,

    /// False when any strand's pixel count moved by more than
    /// [`COUNT_TOLERANCE`]
    pub dimension_match: bool,

    /// Every compared strand matched
    pub overall_match: bool,
}

fn channels_match(a: &StrandSample, b: &StrandSample) -> bool {
    a.r.abs_diff(b.r) <= CHANNEL_TOLERANCE
        && a.g.abs_diff(b.g) <= CHANNEL_TOLERANCE
        && a.b.abs_diff(b.b) <= CHANNEL_TOLERANCE
}

/// Compare stored strands with strands re-extracted from a candidate image.
///
/// Strands are paired in file order and pixels by position within the
/// strand, up to the shorter of the two.
pub fn compare_strands(original: &StrandFile, extracted: &StrandSet) -> StrandComparison {
    let mut strands = Vec::new();
    let mut compared = 0usize;
    let mut matching = 0usize;
    let mut dimension_match = true;

    for (stored, fresh) in original.strands.iter().zip(extracted.strands.iter()) {
        if stored.samples.len().abs_diff(fresh.samples.len()) > COUNT_TOLERANCE {
            dimension_match = false;
        }

        let matched = stored
            .samples
            .iter()
            .zip(fresh.samples.iter())
            .filter(|(a, b)| channels_match(a, b))
            .count();
        let paired = stored.samples.len().min(fresh.samples.len());

        compared += paired;
        matching += matched;

        let total = stored.samples.len();
        let match_percent = percent(matched, total);
        strands.push(StrandMatch {
            number: stored.number,
            band: fresh.band,
            total_pixels: total,
            matching_pixels: matched,
            mismatching_pixels: paired - matched,
            match_percent,
            is_match: match_percent > STRAND_MATCH_PERCENT,
        });
    }

    let overall_match = strands.iter().all(|s| s.is_match);
    StrandComparison {
        match_percent: percent(matching, compared),
        strands,
        dimension_match,
        overall_match,
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
