//! The `strandmark verify` command.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use serde::Serialize;
use strandmark_core::pipeline::constellation::MAX_GRID_SIZE;
use strandmark_core::pipeline::decode::path_to_locator;
use strandmark_core::verify::{
    compare_strands, match_constellations, parse_strand_file, MatchScore, StrandComparison,
};
use strandmark_core::{
    Config, ConstellationExtractor, ConstellationSignature, ImageDecoder, PixelBuffer,
    PixelSource, StrandExtractor,
};

/// Arguments for the `verify` command.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Image to check
    pub image: PathBuf,

    /// Stored `pixel_strands_<N>.txt`
    #[arg(long, value_name = "FILE")]
    pub strands: Option<PathBuf>,

    /// Stored `constellation_<N>.json`
    #[arg(long, value_name = "FILE")]
    pub constellation: Option<PathBuf>,

    /// Grid size to re-extract with (defaults to the stored grid)
    #[arg(long, value_name = "N")]
    pub grid: Option<u32>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Outcome of comparing one image against its artifacts.
#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub image: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub strands: Option<StrandComparison>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub constellation: Option<MatchScore>,

    /// Every supplied check passed
    pub verified: bool,
}

/// Execute the verify command.
pub async fn execute(args: VerifyArgs, config: Config) -> anyhow::Result<()> {
    if args.strands.is_none() && args.constellation.is_none() {
        anyhow::bail!("Nothing to verify against: pass --strands and/or --constellation");
    }

    let decoder = ImageDecoder::new(config.limits.clone());
    let buffer = decoder.decode(&path_to_locator(&args.image)).await?;

    let strand_text = args.strands.as_deref().map(read).transpose()?;
    let constellation_text = args.constellation.as_deref().map(read).transpose()?;

    let report = build_report(
        &args.image,
        &buffer,
        strand_text.as_deref(),
        constellation_text.as_deref(),
        args.grid.unwrap_or(0),
        config.constellation.grid_size,
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.verified {
        anyhow::bail!("Verification failed for {}", args.image.display());
    }
    Ok(())
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))
}

/// Run the requested comparisons against an already decoded image.
///
/// `grid` of 0 means "use the stored grid, falling back to `default_grid`".
fn build_report(
    image: &Path,
    buffer: &PixelBuffer,
    strand_text: Option<&str>,
    constellation_text: Option<&str>,
    grid: u32,
    default_grid: u32,
) -> anyhow::Result<VerifyReport> {
    let strands = match strand_text {
        Some(text) => {
            let stored = parse_strand_file(text)?;
            let (width, height) = buffer.dimensions();
            let fresh = StrandExtractor::extract(buffer, width, height)?;
            Some(compare_strands(&stored, &fresh))
        }
        None => None,
    };

    let constellation = match constellation_text {
        Some(text) => {
            let stored = ConstellationSignature::from_json(text)?;
            let grid = match (grid, stored.grid_size) {
                (0, 0) => default_grid,
                (0, stored) => stored,
                (grid, _) => grid,
            };
            if grid == 0 || grid > MAX_GRID_SIZE {
                anyhow::bail!("Grid size {} is outside 1..={}", grid, MAX_GRID_SIZE);
            }
            let fresh = ConstellationExtractor::new(grid).extract(buffer);
            Some(match_constellations(&fresh, &stored))
        }
        None => None,
    };

    let verified = strands.as_ref().map_or(true, |s| s.overall_match)
        && constellation.as_ref().map_or(true, |c| c.passed);

    Ok(VerifyReport {
        image: image.to_path_buf(),
        strands,
        constellation,
        verified,
    })
}

fn verdict(passed: bool) -> console::StyledObject<&'static str> {
    if passed {
        style("MATCH").green().bold()
    } else {
        style("MISMATCH").red().bold()
    }
}

fn print_report(report: &VerifyReport) {
    println!();
    println!("  Verification: {}", style(report.image.display()).cyan());
    println!("  ====================================");

    if let Some(strands) = &report.strands {
        println!(
            "    Strands:       {} ({:.2}% pixels match)",
            verdict(strands.overall_match),
            strands.match_percent
        );
        for strand in &strands.strands {
            println!(
                "      Strand {} {:<7} {:>6.2}%  ({}/{})",
                strand.number,
                strand.band.label(),
                strand.match_percent,
                strand.matching_pixels,
                strand.total_pixels
            );
        }
        if !strands.dimension_match {
            println!("      {}", style("pixel counts differ; image may be resized").yellow());
        }
    }

    if let Some(score) = &report.constellation {
        println!(
            "    Constellation: {} (score {:.1}, avg distance {:.4}, {} tight)",
            verdict(score.passed),
            score.score,
            score.avg_distance,
            score.tight_matches
        );
    }

    println!("  ------------------------------------");
    println!("    Result:        {}", verdict(report.verified));
    println!("  ====================================");
}
