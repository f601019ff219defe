//! Forcing rules shared by the deductive oracle and the next-move hint.
//!
//! Node rule: once a hinted node has as many diagonals pointing in as its
//! hint, every undecided neighbour must point away; once the undecided
//! neighbours are exactly enough to reach the hint, they must all point in.
//!
//! Loop rule: if one orientation of an empty cell would close a loop, the
//! cell takes the other one.

use crate::cycle::{has_cycle, Connectivity};
use crate::grid::{Cell, Dimensions, Grid, HintGrid, Position};

/// A forced or suggested placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub pos: Position,
    pub cell: Cell,
}

/// Count diagonals pointing into `node` and collect undecided neighbours.
pub(crate) fn tally(dims: Dimensions, grid: &Grid<Cell>, node: Position) -> (u8, Vec<Move>) {
    let mut confirmed = 0;
    let mut unknown = Vec::with_capacity(4);
    for t in dims.touching(node) {
        match grid.value(t.cell) {
            Cell::Empty => unknown.push(Move { pos: t.cell, cell: t.pointing_in }),
            c if c == t.pointing_in => confirmed += 1,
            _ => {}
        }
    }
    (confirmed, unknown)
}

/// What the node rule says about `node`, if anything.
///
/// Returned moves carry the orientation each undecided neighbour is forced to.
pub(crate) fn node_forcing(confirmed: u8, unknown: &[Move], target: u8) -> Option<Vec<Move>> {
    if unknown.is_empty() {
        return None;
    }
    if confirmed == target {
        Some(unknown.iter().map(|m| Move { pos: m.pos, cell: m.cell.flipped() }).collect())
    } else if usize::from(confirmed) + unknown.len() == usize::from(target) {
        Some(unknown.to_vec())
    } else {
        None
    }
}

/// Run both rules to a fixed point from an empty board.
///
/// Succeeds only if every cell gets decided without contradiction and the
/// result meets every revealed hint.
pub(crate) fn solve_by_deduction(dims: Dimensions, hints: &HintGrid) -> Option<Grid<Cell>> {
    let mut grid = dims.empty_cells();
    let mut conn = Connectivity::new(dims.rows(), dims.cols());
    let mut changed = true;

    while changed {
        changed = false;

        for (node, hint) in hints.iter() {
            let Some(target) = *hint else { continue };
            let (confirmed, unknown) = tally(dims, &grid, node);
            let Some(forced) = node_forcing(confirmed, &unknown, target) else { continue };
            for m in forced {
                if !grid.value(m.pos).is_empty() {
                    continue;
                }
                grid.set(m.pos, m.cell);
                changed = true;
                if !conn.link(m.pos, m.cell) {
                    return None;
                }
            }
        }

        if changed {
            continue;
        }

        for pos in dims.cells() {
            if !grid.value(pos).is_empty() {
                continue;
            }
            let forward_loops = conn.closes_cycle(pos, Cell::Forward);
            let backward_loops = conn.closes_cycle(pos, Cell::Backward);
            let cell = match (forward_loops, backward_loops) {
                (true, true) => return None,
                (true, false) => Cell::Backward,
                (false, true) => Cell::Forward,
                (false, false) => continue,
            };
            grid.set(pos, cell);
            conn.link(pos, cell);
            changed = true;
        }
    }

    if !grid.is_full() || !crate::hints::hints_match(&grid, hints) {
        return None;
    }
    Some(grid)
}

/// A single next step for a player on `grid`.
///
/// Tries the node rule, then the loop rule, then points at a placed cell
/// that disagrees with `solution`. When nothing is forced and nothing is
/// wrong, the first empty cell is revealed from `solution`.
pub(crate) fn next_logical_move(
    dims: Dimensions,
    grid: &Grid<Cell>,
    hints: &HintGrid,
    solution: &Grid<Cell>,
) -> Option<Move> {
    for (node, hint) in hints.iter() {
        let Some(target) = *hint else { continue };
        let (confirmed, unknown) = tally(dims, grid, node);
        if let Some(first) = node_forcing(confirmed, &unknown, target).and_then(|f| f.first().copied()) {
            return Some(first);
        }
    }

    if !has_cycle(grid) {
        let mut conn = Connectivity::new(dims.rows(), dims.cols());
        for (pos, &cell) in grid.iter() {
            conn.link(pos, cell);
        }
        for pos in dims.cells() {
            if !grid.value(pos).is_empty() {
                continue;
            }
            if conn.closes_cycle(pos, Cell::Forward) {
                return Some(Move { pos, cell: Cell::Backward });
            }
            if conn.closes_cycle(pos, Cell::Backward) {
                return Some(Move { pos, cell: Cell::Forward });
            }
        }
    }

    let wrong = grid.iter().find_map(|(pos, &cell)| {
        let target = solution.value(pos);
        (!cell.is_empty() && cell != target && !target.is_empty()).then_some(Move { pos, cell: target })
    });
    wrong.or_else(|| {
        grid.iter().find_map(|(pos, &cell)| {
            let target = solution.value(pos);
            (cell.is_empty() && !target.is_empty()).then_some(Move { pos, cell: target })
        })
    })
}
