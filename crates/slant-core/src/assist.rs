//! Assisted play: what the player's placements force on their neighbours.
//!
//! Propagation is a single hop. Cells the player placed can force the
//! undecided cells around a saturated or starved node; those forced cells
//! are themselves checked against their nodes, but never force anything
//! further. Contradictions are reported as [`Conflict`] entries.

use crate::cycle::{select_tracer, CycleTracer};
use crate::grid::{Cell, Dimensions, Grid, HintGrid, Position};
use crate::protocol::{info_entries, SolveRequest};
use crate::solver::{node_forcing, Move};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Where a cell's state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    User,
    Propagated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellInfo {
    pub state: Cell,
    pub source: Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    /// Two nodes forced one cell in different directions
    Cell,
    /// A hinted node is overfilled or can no longer be reached
    Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub row: usize,
    pub col: usize,
}

impl Conflict {
    pub fn cell(pos: Position) -> Self {
        Self { kind: ConflictKind::Cell, row: pos.row, col: pos.col }
    }

    pub fn node(pos: Position) -> Self {
        Self { kind: ConflictKind::Node, row: pos.row, col: pos.col }
    }

    pub fn position(&self) -> Position {
        Position::new(self.row, self.col)
    }
}

/// Overlay computed from the player's placements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistResult {
    #[serde(with = "info_entries")]
    pub grid_state: BTreeMap<Position, CellInfo>,
    pub conflicts: Vec<Conflict>,
    pub cycle_cells: BTreeSet<Position>,
}

impl AssistResult {
    /// Cells filled in by propagation rather than by the player.
    pub fn propagated(&self) -> impl Iterator<Item = (Position, Cell)> + '_ {
        self.grid_state
            .iter()
            .filter(|(_, info)| info.source == Source::Propagated)
            .map(|(&pos, info)| (pos, info.state))
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Propagate with the process-wide cycle tracer.
pub fn propagate(request: &SolveRequest) -> AssistResult {
    propagate_with(request, select_tracer())
}

/// Propagate using a specific loop tracer.
///
/// Boards whose size is out of range produce an empty overlay.
pub fn propagate_with(request: &SolveRequest, tracer: &dyn CycleTracer) -> AssistResult {
    let Ok(dims) = Dimensions::new(request.rows, request.cols) else {
        return AssistResult::default();
    };

    let mut grid_state = BTreeMap::new();
    let mut queue = VecDeque::new();
    for (&pos, &cell) in &request.user_moves {
        if dims.contains_cell(pos) && !cell.is_empty() {
            grid_state.insert(pos, CellInfo { state: cell, source: Source::User });
            queue.push_back(pos);
        }
    }

    let mut conflicts = Vec::new();
    let mut reported = BTreeSet::new();
    let mut report = |conflict: Conflict, conflicts: &mut Vec<Conflict>| {
        if reported.insert((conflict.kind, conflict.position())) {
            conflicts.push(conflict);
        }
    };

    while let Some(pos) = queue.pop_front() {
        let Some(info) = grid_state.get(&pos).copied() else { continue };

        let mut forced = Vec::new();
        for node in dims.corners(pos) {
            let Some(target) = request.numbers.value(node) else { continue };
            let (confirmed, unknown) = tally(dims, &grid_state, node);
            if confirmed > target || usize::from(confirmed) + unknown.len() < usize::from(target) {
                report(Conflict::node(node), &mut conflicts);
                continue;
            }
            if info.source != Source::User {
                continue;
            }
            if let Some(moves) = node_forcing(confirmed, &unknown, target) {
                forced.extend(moves);
            }
        }

        for m in forced {
            match grid_state.get(&m.pos) {
                None => {
                    grid_state.insert(m.pos, CellInfo { state: m.cell, source: Source::Propagated });
                    queue.push_back(m.pos);
                }
                Some(existing) if existing.state != m.cell => report(Conflict::cell(m.pos), &mut conflicts),
                Some(_) => {}
            }
        }
    }

    let mut grid = dims.empty_cells();
    for (&pos, info) in &grid_state {
        grid.set(pos, info.state);
    }
    let cycle_cells = tracer.trace(&grid);

    AssistResult { grid_state, conflicts, cycle_cells }
}

/// Count cells in the overlay pointing into `node` and list the absent ones.
fn tally(dims: Dimensions, state: &BTreeMap<Position, CellInfo>, node: Position) -> (u8, Vec<Move>) {
    let mut confirmed = 0;
    let mut unknown = Vec::with_capacity(4);
    for t in dims.touching(node) {
        match state.get(&t.cell) {
            None => unknown.push(Move { pos: t.cell, cell: t.pointing_in }),
            Some(info) if info.state == t.pointing_in => confirmed += 1,
            Some(_) => {}
        }
    }
    (confirmed, unknown)
}

/// Convenience for callers holding a board rather than a move map.
pub fn request_from_grid(hints: &HintGrid, grid: &Grid<Cell>) -> SolveRequest {
    let user_moves = grid
        .iter()
        .filter(|(_, cell)| !cell.is_empty())
        .map(|(pos, &cell)| (pos, cell))
        .collect();
    SolveRequest::new(grid.rows(), grid.cols(), hints.clone(), user_moves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::FallbackCycleDetector;

    fn request(hints: &[((usize, usize), u8)], moves: &[((usize, usize), Cell)]) -> SolveRequest {
        let mut numbers = Grid::filled(4, 4, None);
        for &((r, c), h) in hints {
            numbers.set(Position::new(r, c), Some(h));
        }
        let user_moves = moves.iter().map(|&((r, c), cell)| (Position::new(r, c), cell)).collect();
        SolveRequest::new(3, 3, numbers, user_moves)
    }

    #[test]
    fn test_saturated_edge_node_forces_neighbour() {
        let result = propagate(&request(&[((0, 1), 1)], &[((0, 0), Cell::Forward)]));
        assert_eq!(
            result.grid_state.get(&Position::new(0, 1)),
            Some(&CellInfo { state: Cell::Forward, source: Source::Propagated })
        );
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn test_overfilled_node_conflict() {
        let result = propagate(&request(
            &[((0, 1), 1)],
            &[((0, 0), Cell::Forward), ((0, 1), Cell::Backward)],
        ));
        assert_eq!(result.conflicts, vec![Conflict::node(Position::new(0, 1))]);
        assert_eq!(result.propagated().count(), 0);
    }

    #[test]
    fn test_interior_node_needs_two_moves() {
        let hints = [((1, 1), 2)];
        let one = propagate(&request(&hints, &[((0, 0), Cell::Backward)]));
        assert_eq!(one.grid_state.len(), 1);

        let two = propagate(&request(&hints, &[((0, 0), Cell::Backward), ((0, 1), Cell::Forward)]));
        let forced: Vec<_> = two.propagated().collect();
        assert_eq!(
            forced,
            vec![(Position::new(1, 0), Cell::Backward), (Position::new(1, 1), Cell::Forward)]
        );
    }

    #[test]
    fn test_starved_node_forces_inward() {
        // Corner node (0,0) only sees cell (0,0).
        let result = propagate(&request(&[((1, 1), 4)], &[((0, 0), Cell::Backward)]));
        let forced: Vec<_> = result.propagated().collect();
        assert_eq!(
            forced,
            vec![
                (Position::new(0, 1), Cell::Forward),
                (Position::new(1, 0), Cell::Forward),
                (Position::new(1, 1), Cell::Backward),
            ]
        );
    }

    #[test]
    fn test_cell_conflict_between_nodes() {
        // From (0,0)=F: node (0,1)=1 is saturated and wants (0,1) Forward,
        // node (1,1)=0 is saturated and wants it Backward.
        let result = propagate(&request(&[((0, 1), 1), ((1, 1), 0)], &[((0, 0), Cell::Forward)]));
        assert!(result.conflicts.contains(&Conflict::cell(Position::new(0, 1))));
        assert_eq!(result.grid_state[&Position::new(0, 1)].source, Source::Propagated);
    }

    #[test]
    fn test_propagated_cells_do_not_chain() {
        // (0,0)=F saturates (0,1)=1 and forces (0,1)=F, which would saturate
        // (0,2)=1 and force (0,2)=F if propagated cells chained.
        let result = propagate(&request(&[((0, 1), 1), ((0, 2), 1)], &[((0, 0), Cell::Forward)]));
        assert_eq!(result.grid_state.len(), 2);
        assert!(!result.grid_state.contains_key(&Position::new(0, 2)));
    }

    #[test]
    fn test_out_of_bounds_moves_ignored() {
        let result = propagate(&request(&[], &[((5, 5), Cell::Forward), ((0, 0), Cell::Empty)]));
        assert!(result.grid_state.is_empty());
    }

    #[test]
    fn test_cycle_cells_reported() {
        let moves = [
            ((0, 0), Cell::Forward),
            ((0, 1), Cell::Backward),
            ((1, 0), Cell::Backward),
            ((1, 1), Cell::Forward),
        ];
        let result = propagate_with(&request(&[], &moves), &FallbackCycleDetector);
        assert_eq!(result.cycle_cells.len(), 4);
    }

    #[test]
    fn test_idempotent() {
        let req = request(&[((0, 1), 1), ((1, 1), 2)], &[((0, 0), Cell::Forward), ((1, 0), Cell::Backward)]);
        assert_eq!(propagate(&req), propagate(&req));
    }
}
