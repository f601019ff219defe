use crate::cycle::has_cycle;
use crate::error::EngineError;
use crate::grid::{Cell, Dimensions, Grid, HintGrid, Position};
use crate::hints::{hints_match, revealed_count};
use serde::Serialize;
use std::fmt;

/// An immutable puzzle: revealed hints plus the hidden solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Puzzle {
    dims: Dimensions,
    hints: HintGrid,
    solution: Grid<Cell>,
}

impl Puzzle {
    /// Assemble a puzzle, checking that the solution is complete,
    /// loop-free and agrees with every revealed hint.
    pub fn from_parts(dims: Dimensions, hints: HintGrid, solution: Grid<Cell>) -> Result<Self, EngineError> {
        if hints.rows() != dims.rows() + 1 || hints.cols() != dims.cols() + 1 {
            return Err(EngineError::MalformedSession(format!(
                "hint grid is {}x{}, expected {}x{}",
                hints.rows(),
                hints.cols(),
                dims.rows() + 1,
                dims.cols() + 1
            )));
        }
        if solution.rows() != dims.rows() || solution.cols() != dims.cols() {
            return Err(EngineError::MalformedSession("solution does not match board size".into()));
        }
        if !solution.is_full() || has_cycle(&solution) || !hints_match(&solution, &hints) {
            return Err(EngineError::MalformedSession("solution violates the puzzle rules".into()));
        }
        Ok(Self { dims, hints, solution })
    }

    pub(crate) fn new_unchecked(dims: Dimensions, hints: HintGrid, solution: Grid<Cell>) -> Self {
        Self { dims, hints, solution }
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn rows(&self) -> usize {
        self.dims.rows()
    }

    pub fn cols(&self) -> usize {
        self.dims.cols()
    }

    pub fn hints(&self) -> &HintGrid {
        &self.hints
    }

    pub fn solution(&self) -> &Grid<Cell> {
        &self.solution
    }

    /// Number of revealed hints
    pub fn hint_count(&self) -> usize {
        revealed_count(&self.hints)
    }
}

/// Plain text board: node rows with hints (`.` when hidden) interleaved
/// with cell rows.
pub fn render_board(dims: Dimensions, hints: &HintGrid, grid: &Grid<Cell>) -> String {
    let mut out = String::new();
    for row in 0..=dims.rows() {
        let nodes: Vec<String> = (0..=dims.cols())
            .map(|col| match hints.value(Position::new(row, col)) {
                Some(h) => h.to_string(),
                None => ".".to_string(),
            })
            .collect();
        out.push_str(&nodes.join(" "));
        out.push('\n');
        if row < dims.rows() {
            out.push(' ');
            let cells: Vec<String> = (0..dims.cols())
                .map(|col| grid.value(Position::new(row, col)).symbol().to_string())
                .collect();
            out.push_str(&cells.join(" "));
            out.push('\n');
        }
    }
    out
}

impl fmt::Display for Puzzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render_board(self.dims, &self.hints, &self.dims.empty_cells()))
    }
}
