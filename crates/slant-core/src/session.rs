//! Saving and resuming a play session.

use crate::error::EngineError;
use crate::game::Game;
use crate::grid::{Cell, Dimensions, Grid, HintGrid, Position};
use std::collections::BTreeMap;
use crate::protocol::{move_entries, nested_rows};
use crate::puzzle::Puzzle;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Everything needed to pick a game back up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSession {
    pub rows: usize,
    pub cols: usize,
    #[serde(with = "nested_rows")]
    pub hints: HintGrid,
    /// Compact board text, rows joined with `|`
    pub solution: String,
    pub grid: String,
    pub solved: bool,
    #[serde(default)]
    pub moves: usize,
    pub error_nodes: Vec<Position>,
    pub cycle_cells: Vec<Position>,
    pub satisfied_nodes: Vec<Position>,
    /// Assist overlay moves, independent of `grid`
    #[serde(default, with = "move_entries")]
    pub user_moves: BTreeMap<Position, Cell>,
}

impl SavedSession {
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn parse_board(text: &str, dims: Dimensions, what: &str) -> Result<Grid<Cell>, EngineError> {
    let grid = Grid::parse(text).ok_or_else(|| EngineError::MalformedSession(format!("{what} is not a board")))?;
    if grid.rows() != dims.rows() || grid.cols() != dims.cols() {
        return Err(EngineError::MalformedSession(format!(
            "{what} is {}x{}, expected {dims}",
            grid.rows(),
            grid.cols()
        )));
    }
    Ok(grid)
}

impl Game {
    /// Snapshot the session
    pub fn to_saved(&self) -> SavedSession {
        let dims = self.dims();
        SavedSession {
            rows: dims.rows(),
            cols: dims.cols(),
            hints: self.hints().clone(),
            solution: self.puzzle().solution().to_string_compact(),
            grid: self.grid().to_string_compact(),
            solved: self.is_solved(),
            moves: self.moves_count(),
            error_nodes: self.error_nodes().iter().copied().collect(),
            cycle_cells: self.cycle_cells().iter().copied().collect(),
            satisfied_nodes: self.satisfied_nodes().iter().copied().collect(),
            user_moves: self.assist_moves().clone(),
        }
    }

    /// Rebuild a session. Shape and hint values are validated and the
    /// derived sets are recomputed from the board rather than trusted.
    pub fn from_saved(saved: &SavedSession) -> Result<Self, EngineError> {
        let dims = Dimensions::new(saved.rows, saved.cols)?;
        if saved.hints.values().iter().flatten().any(|&h| h > 4) {
            return Err(EngineError::MalformedSession("hint above 4".into()));
        }
        let solution = parse_board(&saved.solution, dims, "solution")?;
        let grid = parse_board(&saved.grid, dims, "board")?;
        let puzzle = Puzzle::from_parts(dims, saved.hints.clone(), solution)?;

        let mut game = Game::with_board(puzzle, grid, saved.moves);
        for (pos, &cell) in &saved.user_moves {
            if !game.set_assist_move(pos.row, pos.col, cell) {
                debug!(%pos, "dropping off-board assist move");
            }
        }
        if game.is_solved() != saved.solved
            || game.cycle_cells().iter().ne(saved.cycle_cells.iter())
            || game.error_nodes().iter().ne(saved.error_nodes.iter())
            || game.satisfied_nodes().iter().ne(saved.satisfied_nodes.iter())
        {
            debug!("saved derived state was stale, recomputed");
        }
        Ok(game)
    }
}
