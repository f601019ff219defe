//! Exhaustive search used to decide uniqueness on small boards.
//!
//! The search is an explicit loop over a choice stack rather than
//! recursion; cells are assigned in row-major order and unassigned on
//! the way back up, so the grid always mirrors the stack.

use crate::cycle::has_cycle;
use crate::grid::{Cell, Dimensions, Grid, HintGrid, Position};

/// Next orientation to try after `cell`; `None` once both are exhausted.
fn next_after(cell: Cell) -> Option<Cell> {
    match cell {
        Cell::Empty => Some(Cell::Forward),
        Cell::Forward => Some(Cell::Backward),
        Cell::Backward => None,
    }
}

/// Can the hinted corners of `pos` still be met, and is the board loop-free?
fn consistent(dims: Dimensions, grid: &Grid<Cell>, hints: &HintGrid, pos: Position) -> bool {
    for node in dims.corners(pos) {
        let Some(target) = hints.value(node) else { continue };
        let mut confirmed = 0u8;
        let mut open = 0u8;
        for t in dims.touching(node) {
            match grid.value(t.cell) {
                Cell::Empty => open += 1,
                c if c == t.pointing_in => confirmed += 1,
                _ => {}
            }
        }
        if confirmed > target || confirmed + open < target {
            return false;
        }
    }
    !has_cycle(grid)
}

/// Enumerate boards satisfying `hints` with no loop, stopping after `limit`.
///
/// `on_solution` sees every complete board found. Returns the number found.
pub(crate) fn search(
    dims: Dimensions,
    hints: &HintGrid,
    limit: usize,
    mut on_solution: impl FnMut(&Grid<Cell>),
) -> usize {
    let order: Vec<Position> = dims.cells().collect();
    let total = order.len();
    let mut grid = dims.empty_cells();
    let mut stack: Vec<Cell> = Vec::with_capacity(total);
    let mut candidate = Some(Cell::Forward);
    let mut count = 0;

    if limit == 0 {
        return 0;
    }

    loop {
        match candidate {
            Some(cell) => {
                let pos = order[stack.len()];
                grid.set(pos, cell);
                if !consistent(dims, &grid, hints, pos) {
                    candidate = next_after(cell);
                    continue;
                }
                stack.push(cell);
                if stack.len() < total {
                    candidate = Some(Cell::Forward);
                    continue;
                }

                count += 1;
                on_solution(&grid);
                if count >= limit {
                    return count;
                }
                candidate = stack.pop().and_then(next_after);
            }
            None => {
                grid.set(order[stack.len()], Cell::Empty);
                match stack.pop() {
                    Some(prev) => candidate = next_after(prev),
                    None => return count,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(dims: Dimensions, hints: &HintGrid, limit: usize) -> usize {
        search(dims, hints, limit, |_| {})
    }

    #[test]
    fn test_unconstrained_1x1_has_two() {
        let dims = Dimensions::new(1, 1).unwrap();
        let hints = dims.node_grid(None);
        assert_eq!(count(dims, &hints, 10), 2);
        assert_eq!(count(dims, &hints, 1), 1);
    }

    #[test]
    fn test_unconstrained_2x2_excludes_the_diamond() {
        let dims = Dimensions::new(2, 2).unwrap();
        let hints = dims.node_grid(None);
        // 16 boards, exactly one of them is a loop.
        assert_eq!(count(dims, &hints, 100), 15);
    }

    #[test]
    fn test_single_hint_pins_1x1() {
        let dims = Dimensions::new(1, 1).unwrap();
        let mut hints = dims.node_grid(None);
        hints.set(Position::new(0, 0), Some(1));
        let mut found = Vec::new();
        assert_eq!(search(dims, &hints, 2, |g| found.push(g.clone())), 1);
        assert_eq!(found[0].value(Position::new(0, 0)), Cell::Backward);
    }

    #[test]
    fn test_contradictory_hints() {
        let dims = Dimensions::new(1, 1).unwrap();
        let mut hints = dims.node_grid(None);
        hints.set(Position::new(0, 0), Some(1));
        hints.set(Position::new(0, 1), Some(1));
        assert_eq!(count(dims, &hints, 2), 0);
    }

    #[test]
    fn test_limit_zero() {
        let dims = Dimensions::new(2, 2).unwrap();
        assert_eq!(count(dims, &dims.node_grid(None), 0), 0);
    }
}
