//! Constellation matching.

use serde::Serialize;

use crate::types::ConstellationSignature;

/// Score above which two constellations are considered the same image.
pub const PASS_THRESHOLD: f64 = 75.0;

/// Cells closer than this (in normalized units) count as tight matches.
pub const TIGHT_MATCH_DISTANCE: f64 = 0.05;

/// Distance charged for a query cell with no counterpart.
pub const MISSING_CELL_PENALTY: f64 = 0.5;

const DISTANCE_WEIGHT: f64 = 500.0;

/// Result of comparing two constellations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchScore {
    /// 0 to 100
    pub score: f64,

    /// Mean Euclidean distance per query cell
    pub avg_distance: f64,

    /// Cells within [`TIGHT_MATCH_DISTANCE`]
    pub tight_matches: usize,

    /// Query cells absent from the reference
    pub missing: usize,

    pub passed: bool,
}

/// Compare a freshly extracted constellation against a stored one.
///
/// Cells are paired by grid position, not by order. Brightness is ignored;
/// only where the brightest point sits matters.
pub fn match_constellations(
    query: &ConstellationSignature,
    reference: &ConstellationSignature,
) -> MatchScore {
    if query.cells.is_empty() {
        return MatchScore {
            score: 0.0,
            avg_distance: MISSING_CELL_PENALTY,
            tight_matches: 0,
            missing: 0,
            passed: false,
        };
    }

    let mut total = 0.0;
    let mut tight_matches = 0;
    let mut missing = 0;

    for cell in &query.cells {
        match reference.cell(cell.row, cell.col) {
            Some(other) => {
                let dist = (cell.x - other.x).hypot(cell.y - other.y);
                total += dist;
                if dist < TIGHT_MATCH_DISTANCE {
                    tight_matches += 1;
                }
            }
            None => {
                total += MISSING_CELL_PENALTY;
                missing += 1;
            }
        }
    }

    let avg_distance = total / query.cells.len() as f64;
    let score = (100.0 - avg_distance * DISTANCE_WEIGHT).max(0.0);

    MatchScore {
        score,
        avg_distance,
        tight_matches,
        missing,
        passed: score > PASS_THRESHOLD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConstellationCell;

    fn grid(offset: f64) -> ConstellationSignature {
        let mut cells = Vec::new();
        for row in 0..2 {
            for col in 0..2 {
                cells.push(ConstellationCell {
                    row,
                    col,
                    x: f64::from(col) * 0.5 + offset,
                    y: f64::from(row) * 0.5,
                    b: 0.5,
                });
            }
        }
        ConstellationSignature {
            grid_size: 2,
            cells,
        }
    }

    #[test]
    fn test_identical_constellations_score_100() {
        let score = match_constellations(&grid(0.0), &grid(0.0));
        assert_eq!(score.score, 100.0);
        assert_eq!(score.tight_matches, 4);
        assert!(score.passed);
    }

    #[test]
    fn test_small_shift_still_passes() {
        let score = match_constellations(&grid(0.02), &grid(0.0));
        assert!((score.avg_distance - 0.02).abs() < 1e-9);
        assert!((score.score - 90.0).abs() < 1e-6);
        assert!(score.passed);
    }

    #[test]
    fn test_tight_match_boundary() {
        let score = match_constellations(&grid(0.05), &grid(0.0));
        assert!((score.score - 75.0).abs() < 1e-6);
        assert_eq!(score.tight_matches, 0);

        let score = match_constellations(&grid(0.049), &grid(0.0));
        assert_eq!(score.tight_matches, 4);
    }

    #[test]
    fn test_missing_cells_are_penalized() {
        let mut reference = grid(0.0);
        reference.cells.retain(|c| !(c.row == 1 && c.col == 1));

        let score = match_constellations(&grid(0.0), &reference);
        assert_eq!(score.missing, 1);
        assert!((score.avg_distance - 0.125).abs() < 1e-9);
        assert_eq!(score.score, 37.5);
        assert!(!score.passed);
    }

    #[test]
    fn test_score_never_negative() {
        let score = match_constellations(&grid(0.9), &grid(0.0));
        assert_eq!(score.score, 0.0);
    }

    #[test]
    fn test_empty_query() {
        let empty = ConstellationSignature {
            grid_size: 0,
            cells: vec![],
        };
        assert!(!match_constellations(&empty, &grid(0.0)).passed);
    }
}
