//! Clue numbers: computing them from a board and checking a board against them.

use crate::grid::{Cell, Dimensions, Grid, HintGrid, Position};
use std::collections::BTreeSet;

/// Number of diagonals touching every intersection node.
pub fn calculate_hints(grid: &Grid<Cell>) -> Grid<u8> {
    let mut counts = Grid::filled(grid.rows() + 1, grid.cols() + 1, 0u8);
    for (pos, &cell) in grid.iter() {
        if let Some((a, b)) = cell.endpoints(pos) {
            for node in [a, b] {
                if let Some(n) = counts.get_mut(node) {
                    *n += 1;
                }
            }
        }
    }
    counts
}

/// Every revealed hint, as a full clue grid.
pub fn reveal_all(counts: &Grid<u8>) -> HintGrid {
    counts.map(|&n| Some(n))
}

/// Does every revealed hint equal the count on `grid`?
pub fn hints_match(grid: &Grid<Cell>, hints: &HintGrid) -> bool {
    let counts = calculate_hints(grid);
    hints
        .iter()
        .all(|(node, hint)| hint.map_or(true, |h| counts.get(node) == Some(&h)))
}

/// Hinted nodes that can no longer be satisfied: too many diagonals point
/// in, or too few empty neighbours remain to reach the hint.
pub fn error_nodes(dims: Dimensions, grid: &Grid<Cell>, hints: &HintGrid) -> BTreeSet<Position> {
    let counts = calculate_hints(grid);
    let mut errors = BTreeSet::new();
    for (node, hint) in hints.iter() {
        let Some(target) = *hint else { continue };
        let current = counts.value(node);
        if current > target {
            errors.insert(node);
            continue;
        }
        let open = dims
            .touching(node)
            .filter(|t| grid.value(t.cell).is_empty())
            .count();
        if usize::from(current) + open < usize::from(target) {
            errors.insert(node);
        }
    }
    errors
}

/// Hinted nodes whose count currently equals the hint.
pub fn satisfied_nodes(grid: &Grid<Cell>, hints: &HintGrid) -> BTreeSet<Position> {
    let counts = calculate_hints(grid);
    hints
        .iter()
        .filter(|(node, hint)| matches!(hint, Some(h) if counts.value(*node) == *h))
        .map(|(node, _)| node)
        .collect()
}

/// Number of revealed hints.
pub fn revealed_count(hints: &HintGrid) -> usize {
    hints.values().iter().filter(|h| h.is_some()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_hints_single_cell() {
        let g = Grid::parse("/").unwrap();
        let counts = calculate_hints(&g);
        assert_eq!(counts.values(), &[0, 1, 1, 0]);

        let g = Grid::parse("\\").unwrap();
        assert_eq!(calculate_hints(&g).values(), &[1, 0, 0, 1]);
    }

    #[test]
    fn test_calculate_hints_sums_to_twice_filled() {
        let g = Grid::parse("/\\.\n\\\\/").unwrap();
        let counts = calculate_hints(&g);
        let total: u32 = counts.values().iter().map(|&n| u32::from(n)).sum();
        assert_eq!(total, 2 * 5);
        assert_eq!(counts.value(Position::new(1, 1)), 1);
        assert_eq!(counts.value(Position::new(2, 2)), 2);
    }

    #[test]
    fn test_hints_match_ignores_hidden() {
        let g = Grid::parse("/").unwrap();
        let mut hints = Grid::filled(2, 2, None);
        assert!(hints_match(&g, &hints));
        hints.set(Position::new(0, 1), Some(1));
        assert!(hints_match(&g, &hints));
        hints.set(Position::new(0, 0), Some(1));
        assert!(!hints_match(&g, &hints));
    }

    #[test]
    fn test_error_and_satisfied_nodes() {
        let dims = Dimensions::new(2, 2).unwrap();
        let mut grid = dims.empty_cells();
        let mut hints = dims.node_grid(None);
        hints.set(Position::new(1, 1), Some(1));
        hints.set(Position::new(0, 0), Some(1));

        assert!(error_nodes(dims, &grid, &hints).is_empty());
        assert!(satisfied_nodes(&grid, &hints).is_empty());

        // (0,0) Backward touches both hinted nodes.
        grid.set(Position::new(0, 0), Cell::Backward);
        let satisfied = satisfied_nodes(&grid, &hints);
        assert!(satisfied.contains(&Position::new(0, 0)));
        assert!(satisfied.contains(&Position::new(1, 1)));

        // Second diagonal into (1,1) overfills it.
        grid.set(Position::new(1, 1), Cell::Backward);
        let errors = error_nodes(dims, &grid, &hints);
        assert_eq!(errors.into_iter().collect::<Vec<_>>(), vec![Position::new(1, 1)]);
    }

    #[test]
    fn test_error_when_unreachable() {
        let dims = Dimensions::new(1, 1).unwrap();
        let mut grid = dims.empty_cells();
        let mut hints = dims.node_grid(None);
        hints.set(Position::new(0, 0), Some(1));
        grid.set(Position::new(0, 0), Cell::Forward);
        assert!(error_nodes(dims, &grid, &hints).contains(&Position::new(0, 0)));
    }
}
