//! Verification of a candidate image against stored artifacts.
//!
//! Re-extracting signatures from a copy of an image and comparing them with
//! what was written at capture time tells whether the copy is the same
//! picture:
//! - **constellation**: tolerant of resizing and recompression
//! - **strands**: exact-position pixel comparison with a small per-channel
//!   tolerance

pub mod constellation;
pub mod strands;

pub use constellation::{match_constellations, MatchScore};
pub use strands::{
    compare_strands, parse_strand_file, ParsedStrand, StrandComparison, StrandFile,
    StrandFileHeader, StrandMatch,
};
