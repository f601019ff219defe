//! Solver entry points.
//!
//! Two oracles decide whether a set of revealed hints pins down a single
//! board: exhaustive search (exact, for small boards) and deduction to a
//! fixed point (fast, used for the interactive sizes).

mod backtrack;
mod deduce;

use crate::grid::{Cell, Dimensions, Grid, HintGrid};

pub use deduce::Move;
pub(crate) use deduce::node_forcing;

/// Stateless solver. All state lives in each call.
#[derive(Debug, Default, Clone, Copy)]
pub struct Solver;

impl Solver {
    pub fn new() -> Self {
        Self
    }

    /// First board satisfying `hints` with no loop, if any.
    pub fn solve(&self, dims: Dimensions, hints: &HintGrid) -> Option<Grid<Cell>> {
        let mut first = None;
        backtrack::search(dims, hints, 1, |g| first = Some(g.clone()));
        first
    }

    /// Count solutions up to a limit.
    pub fn count_solutions(&self, dims: Dimensions, hints: &HintGrid, limit: usize) -> usize {
        backtrack::search(dims, hints, limit, |_| {})
    }

    /// Check if the hints admit exactly one board.
    pub fn has_unique_solution(&self, dims: Dimensions, hints: &HintGrid) -> bool {
        self.count_solutions(dims, hints, 2) == 1
    }

    /// Can the whole board be filled by the forcing rules alone?
    pub fn is_deductively_solvable(&self, dims: Dimensions, hints: &HintGrid) -> bool {
        deduce::solve_by_deduction(dims, hints).is_some()
    }

    /// The board reached by the forcing rules, when they reach a full one.
    pub fn deduce(&self, dims: Dimensions, hints: &HintGrid) -> Option<Grid<Cell>> {
        deduce::solve_by_deduction(dims, hints)
    }

    /// Suggest a single next placement for a partly filled board.
    pub fn next_logical_move(
        &self,
        dims: Dimensions,
        grid: &Grid<Cell>,
        hints: &HintGrid,
        solution: &Grid<Cell>,
    ) -> Option<Move> {
        deduce::next_logical_move(dims, grid, hints, solution)
    }
}
