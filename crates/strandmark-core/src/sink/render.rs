//! Text layouts for the persisted artifacts.
//!
//! These layouts are read back by verifiers and humans alike, so every
//! separator and blank line is fixed.

use std::fmt::Write as _;

use chrono::{DateTime, Local};

use crate::types::{format_fixed, ProcessedImage, StrandBand};

const RULE: &str = "==============================================";

/// Capture timestamp in the `yyyy-MM-dd HH:mm:ss` form used by every
/// artifact.
pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// File name of the strand artifact for an image.
pub fn strands_file_name(image_id: i64) -> String {
    format!("pixel_strands_{}.txt", image_id)
}

/// File name of the metadata artifact for an image.
pub fn metadata_file_name(image_id: i64) -> String {
    format!("metadata_{}.txt", image_id)
}

/// File name of the constellation artifact for an image.
pub fn constellation_file_name(image_id: i64) -> String {
    format!("constellation_{}.json", image_id)
}

/// Name of the append-only session log.
pub const MASTER_LOG: &str = "master_log.txt";

/// Render `pixel_strands_<N>.txt`.
pub fn render_strand_file(image: &ProcessedImage) -> String {
    let record = &image.record;
    let strands = &image.strands;
    let mut out = String::with_capacity(256 + strands.total_samples() * 32);

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "3 VERTICAL PIXEL STRANDS");
    let _ = writeln!(out, "{RULE}\n");
    let _ = writeln!(out, "Image ID: {}", record.id);
    let _ = writeln!(out, "File Name: {}", record.display_name);
    let _ = writeln!(
        out,
        "Image Dimensions: {} x {} pixels",
        strands.width, strands.height
    );
    let _ = writeln!(out, "File Size: {} MB", format_fixed(record.size_mb(), 2));
    let _ = writeln!(out, "URI: {}", record.locator);
    let _ = writeln!(out, "Captured At: {}", image.captured_at);
    let _ = writeln!(out, "Captured By: {}", image.author);
    let _ = writeln!(out, "Total Strands: 3 (Vertical)");
    let _ = writeln!(out, "Strand Height: {} pixels each", strands.strip_height);
    let _ = writeln!(out, "Format: X,Y,RGB,HEX");
    let _ = writeln!(out, "\n{RULE}\n");

    for band in StrandBand::ALL {
        let strand = strands.strand(band);
        let _ = writeln!(
            out,
            "--- STRAND {}: {} (X={}, {}% from left) ---",
            band.number(),
            band.label(),
            strand.x,
            band.column_percent()
        );
        let _ = writeln!(
            out,
            "Start: ({},{}) | End: ({},{})\n",
            strand.x,
            strand.y_start,
            strand.x,
            strand.y_end()
        );
        for sample in &strand.samples {
            out.push_str(&sample.to_line());
            out.push('\n');
        }
        out.push('\n');
    }

    let counts = strands.counts();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "EXTRACTION SUMMARY");
    let _ = writeln!(out, "{RULE}");
    for (i, count) in counts.iter().enumerate() {
        let _ = writeln!(out, "Strand {} pixels: {}", i + 1, count);
    }
    let _ = writeln!(out, "Total pixels extracted: {}", strands.total_samples());
    let _ = writeln!(out, "{RULE}");
    out
}

/// Render `metadata_<N>.txt`.
pub fn render_metadata(image: &ProcessedImage) -> String {
    let record = &image.record;
    let strands = &image.strands;
    let mut out = String::with_capacity(1024);

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "PHOTO METADATA");
    let _ = writeln!(out, "{RULE}\n");
    let _ = writeln!(out, "Image ID: {}", record.id);
    let _ = writeln!(out, "File Name: {}", record.display_name);
    let _ = writeln!(
        out,
        "Resolution: {} x {} pixels",
        strands.width, strands.height
    );
    let _ = writeln!(out, "File Size: {} MB", format_fixed(record.size_mb(), 2));
    let _ = writeln!(out, "URI: {}", record.locator);
    let _ = writeln!(out, "Captured At: {}", image.captured_at);
    let _ = writeln!(out, "Captured By: {}", image.author);
    let _ = writeln!(out, "Photo Number: {}\n", image.sequence);

    let _ = writeln!(out, "STRAND CONFIGURATION:");
    let _ = writeln!(out, "Total Strands: 3 (Vertical)");
    let _ = writeln!(
        out,
        "Strand Height: {} pixels ({} per strand)\n",
        strands.strip_height,
        strands.height / 3
    );

    for band in StrandBand::ALL {
        let strand = strands.strand(band);
        let _ = writeln!(out, "Strand {} ({}):", band.number(), band.name());
        let _ = writeln!(
            out,
            "  X Position: {} ({}% from left)",
            strand.x,
            band.column_percent()
        );
        let _ = writeln!(out, "  Y Range: {} to {}", strand.y_start, strand.y_end());
        let _ = writeln!(out, "  Pixels: {}\n", strand.count());
    }

    let _ = writeln!(out, "Total Pixels Extracted: {}", strands.total_samples());
    let _ = writeln!(out, "Pixel Data File: {}", strands_file_name(record.id));
    let _ = writeln!(out, "\n{RULE}");
    out
}

/// One line of `master_log.txt`, newline included.
pub fn master_log_line(image: &ProcessedImage) -> String {
    let record = &image.record;
    format!(
        "[{}] ID:{} | {} | {}x{} | {}MB | 3V | Pixels:{}\n",
        image.captured_at,
        record.id,
        record.display_name,
        image.strands.width,
        image.strands.height,
        format_fixed(record.size_mb(), 2),
        image.strands.total_samples()
    )
}
