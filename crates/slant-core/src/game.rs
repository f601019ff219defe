use crate::assist::request_from_grid;
use crate::cycle::{has_cycle, select_tracer};
use crate::generator::Generator;
use crate::grid::{Cell, Dimensions, Grid, HintGrid, Position};
use crate::hints::{error_nodes, hints_match, satisfied_nodes};
use crate::protocol::SolveRequest;
use crate::puzzle::{render_board, Puzzle};
use crate::solver::{Move, Solver};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A board is solved when it is full, meets every hint and has no loop.
pub fn is_solved(grid: &Grid<Cell>, hints: &HintGrid) -> bool {
    grid.is_full() && hints_match(grid, hints) && !has_cycle(grid)
}

/// The game state
#[derive(Debug, Clone)]
pub struct Game {
    /// The puzzle being played
    puzzle: Puzzle,
    /// The player's board
    grid: Grid<Cell>,
    /// Whether the board is solved; further moves are ignored until reset
    solved: bool,
    error_nodes: BTreeSet<Position>,
    satisfied_nodes: BTreeSet<Position>,
    cycle_cells: BTreeSet<Position>,
    /// Cells changed since the puzzle started or was reset
    moves: usize,
    /// Tentative moves sketched for the assist overlay, kept apart from the
    /// board. Cleared whenever the puzzle changes.
    assist_moves: BTreeMap<Position, Cell>,
}

impl Game {
    /// Start a game on a freshly generated puzzle
    pub fn new(dims: Dimensions) -> Self {
        Self::from_puzzle(Generator::new().generate(dims))
    }

    /// Start a game on an existing puzzle with an empty board
    pub fn from_puzzle(puzzle: Puzzle) -> Self {
        let grid = puzzle.dims().empty_cells();
        Self::with_board(puzzle, grid, 0)
    }

    pub(crate) fn with_board(puzzle: Puzzle, grid: Grid<Cell>, moves: usize) -> Self {
        let mut game = Self {
            puzzle,
            grid,
            solved: false,
            error_nodes: BTreeSet::new(),
            satisfied_nodes: BTreeSet::new(),
            cycle_cells: BTreeSet::new(),
            moves,
            assist_moves: BTreeMap::new(),
        };
        game.refresh();
        game
    }

    pub fn puzzle(&self) -> &Puzzle {
        &self.puzzle
    }

    pub fn dims(&self) -> Dimensions {
        self.puzzle.dims()
    }

    pub fn grid(&self) -> &Grid<Cell> {
        &self.grid
    }

    pub fn hints(&self) -> &HintGrid {
        self.puzzle.hints()
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    /// Hinted nodes that are overfilled or can no longer be reached
    pub fn error_nodes(&self) -> &BTreeSet<Position> {
        &self.error_nodes
    }

    pub fn satisfied_nodes(&self) -> &BTreeSet<Position> {
        &self.satisfied_nodes
    }

    /// Cells lying on a loop
    pub fn cycle_cells(&self) -> &BTreeSet<Position> {
        &self.cycle_cells
    }

    pub fn moves_count(&self) -> usize {
        self.moves
    }

    pub fn assist_moves(&self) -> &BTreeMap<Position, Cell> {
        &self.assist_moves
    }

    /// Cycle a cell through its states. Returns false when nothing changed:
    /// the position is off the board or the puzzle is already solved.
    pub fn toggle(&mut self, row: usize, col: usize, reverse: bool) -> bool {
        let pos = Position::new(row, col);
        let next = self.grid.value(pos).toggled(reverse);
        self.place(pos, next)
    }

    /// Put a specific state in a cell
    pub fn set_cell(&mut self, row: usize, col: usize, cell: Cell) -> bool {
        self.place(Position::new(row, col), cell)
    }

    fn place(&mut self, pos: Position, cell: Cell) -> bool {
        if self.solved || !self.dims().contains_cell(pos) || self.grid.value(pos) == cell {
            return false;
        }
        self.grid.set(pos, cell);
        self.moves += 1;
        self.refresh();
        true
    }

    /// Clear the board, keeping the puzzle
    pub fn reset(&mut self) {
        self.grid = self.dims().empty_cells();
        self.moves = 0;
        self.refresh();
    }

    /// Replace the puzzle with a new one of the same size
    pub fn new_puzzle(&mut self) {
        self.new_puzzle_with(&mut Generator::new());
    }

    pub fn new_puzzle_with(&mut self, generator: &mut Generator) {
        let dims = self.dims();
        *self = Self::from_puzzle(generator.generate(dims));
    }

    /// Start over on a board of a different size
    pub fn resize(&mut self, dims: Dimensions) {
        *self = Self::from_puzzle(Generator::new().generate(dims));
    }

    /// Suggest one placement without applying it
    pub fn next_logical_move(&self) -> Option<Move> {
        if self.solved {
            return None;
        }
        Solver::new().next_logical_move(self.dims(), &self.grid, self.hints(), self.puzzle.solution())
    }

    /// Apply the suggested placement, if any
    pub fn apply_next_logical_move(&mut self) -> Option<Move> {
        let m = self.next_logical_move()?;
        self.place(m.pos, m.cell).then_some(m)
    }

    /// Sketch a move on the assist overlay. Setting `Empty` removes it.
    /// Off-board positions are ignored.
    pub fn set_assist_move(&mut self, row: usize, col: usize, cell: Cell) -> bool {
        let pos = Position::new(row, col);
        if !self.dims().contains_cell(pos) {
            return false;
        }
        if cell.is_empty() {
            return self.assist_moves.remove(&pos).is_some();
        }
        self.assist_moves.insert(pos, cell) != Some(cell)
    }

    pub fn remove_assist_move(&mut self, row: usize, col: usize) -> bool {
        self.assist_moves.remove(&Position::new(row, col)).is_some()
    }

    /// Replace the overlay with the filled cells of the board
    pub fn copy_board_to_assist(&mut self) {
        self.assist_moves = request_from_grid(self.hints(), &self.grid).user_moves;
    }

    pub fn clear_assist(&mut self) {
        self.assist_moves.clear();
    }

    /// Assist request for the overlay moves against this puzzle's numbers
    pub fn assist_request(&self) -> SolveRequest {
        let dims = self.dims();
        SolveRequest::new(dims.rows(), dims.cols(), self.hints().clone(), self.assist_moves.clone())
    }

    fn refresh(&mut self) {
        let dims = self.dims();
        let hints = self.puzzle.hints();
        self.error_nodes = error_nodes(dims, &self.grid, hints);
        self.satisfied_nodes = satisfied_nodes(&self.grid, hints);
        self.cycle_cells = select_tracer().trace(&self.grid);
        self.solved = is_solved(&self.grid, hints);
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render_board(self.dims(), self.hints(), &self.grid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hints::{calculate_hints, reveal_all};

    fn open_2x2() -> Game {
        let dims = Dimensions::new(2, 2).unwrap();
        let solution = Grid::parse("//\n//").unwrap();
        let hints = reveal_all(&calculate_hints(&solution));
        Game::from_puzzle(Puzzle::from_parts(dims, hints, solution).unwrap())
    }

    #[test]
    fn test_toggle_cycle_and_bounds() {
        let mut game = open_2x2();
        assert!(game.toggle(0, 0, false));
        assert_eq!(game.grid().value(Position::new(0, 0)), Cell::Backward);
        assert!(game.toggle(0, 0, false));
        assert_eq!(game.grid().value(Position::new(0, 0)), Cell::Forward);
        assert!(game.toggle(0, 0, true));
        assert_eq!(game.grid().value(Position::new(0, 0)), Cell::Backward);

        assert!(!game.toggle(2, 0, false));
        assert!(!game.toggle(0, 7, true));
        assert_eq!(game.moves_count(), 3);
    }

    #[test]
    fn test_solving_locks_the_board() {
        let mut game = open_2x2();
        for (r, c) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            game.set_cell(r, c, Cell::Forward);
        }
        assert!(game.is_solved());
        assert!(game.error_nodes().is_empty());
        assert!(!game.toggle(0, 0, false));
        assert_eq!(game.next_logical_move(), None);

        game.reset();
        assert!(!game.is_solved());
        assert_eq!(game.grid().empty_count(), 4);
    }

    #[test]
    fn test_loop_is_not_solved() {
        let looped = Grid::parse("/\\\n\\/").unwrap();
        let hints = reveal_all(&calculate_hints(&looped));
        assert!(looped.is_full() && hints_match(&looped, &hints));
        assert!(!is_solved(&looped, &hints));

        let partial = Grid::parse("//\n/.").unwrap();
        let open = Grid::parse("//\n//").unwrap();
        assert!(!is_solved(&partial, &reveal_all(&calculate_hints(&open))));
    }

    #[test]
    fn test_cycle_cells_follow_the_board() {
        let dims = Dimensions::new(2, 2).unwrap();
        let solution = Grid::parse("//\n//").unwrap();
        let puzzle = Puzzle::from_parts(dims, dims.node_grid(None), solution).unwrap();
        let mut game = Game::from_puzzle(puzzle);
        game.set_cell(0, 0, Cell::Forward);
        game.set_cell(0, 1, Cell::Backward);
        game.set_cell(1, 0, Cell::Backward);
        game.set_cell(1, 1, Cell::Forward);
        assert_eq!(game.cycle_cells().len(), 4);
        assert!(!game.is_solved());

        game.toggle(1, 1, false);
        assert!(game.cycle_cells().is_empty());
    }

    #[test]
    fn test_apply_next_logical_move_solves() {
        let mut game = open_2x2();
        let mut steps = 0;
        while game.apply_next_logical_move().is_some() {
            steps += 1;
            assert!(steps <= 8, "hints should not loop");
        }
        assert!(game.is_solved());
        assert_eq!(game.grid(), game.puzzle().solution());
    }

    #[test]
    fn test_resize_and_new_puzzle() {
        let mut game = Game::from_puzzle(Generator::with_seed(5).generate(Dimensions::new(3, 3).unwrap()));
        game.toggle(0, 0, false);
        game.resize(Dimensions::new(2, 4).unwrap());
        assert_eq!(game.dims(), Dimensions::new(2, 4).unwrap());
        assert_eq!(game.moves_count(), 0);

        let mut generator = Generator::with_seed(8);
        game.new_puzzle_with(&mut generator);
        assert_eq!(game.dims(), Dimensions::new(2, 4).unwrap());
        assert_eq!(game.grid().empty_count(), 8);
    }

    #[test]
    fn test_assist_moves_are_independent_of_the_board() {
        let mut game = open_2x2();
        assert!(game.set_assist_move(0, 0, Cell::Backward));
        assert!(!game.set_assist_move(0, 0, Cell::Backward));
        assert!(!game.set_assist_move(2, 0, Cell::Forward));
        assert!(!game.set_assist_move(0, 5, Cell::Forward));
        assert_eq!(game.grid().empty_count(), 4);
        assert_eq!(game.moves_count(), 0);

        let request = game.assist_request();
        assert_eq!(request.user_moves.len(), 1);
        assert_eq!(request.user_moves[&Position::new(0, 0)], Cell::Backward);

        assert!(game.set_assist_move(0, 0, Cell::Empty));
        assert!(game.assist_moves().is_empty());
        assert!(!game.remove_assist_move(0, 0));
    }

    #[test]
    fn test_copy_and_clear_assist() {
        let mut game = open_2x2();
        game.set_assist_move(1, 1, Cell::Backward);
        game.set_cell(0, 0, Cell::Forward);
        game.set_cell(1, 0, Cell::Backward);

        game.copy_board_to_assist();
        let copied: Vec<_> = game.assist_moves().iter().map(|(p, c)| (*p, *c)).collect();
        assert_eq!(
            copied,
            vec![(Position::new(0, 0), Cell::Forward), (Position::new(1, 0), Cell::Backward)]
        );

        game.reset();
        assert_eq!(game.assist_moves().len(), 2);
        game.clear_assist();
        assert!(game.assist_moves().is_empty());
    }

    #[test]
    fn test_new_puzzle_clears_assist_moves() {
        let mut game = Game::from_puzzle(Generator::with_seed(5).generate(Dimensions::new(3, 3).unwrap()));
        game.set_assist_move(1, 1, Cell::Forward);
        game.new_puzzle_with(&mut Generator::with_seed(6));
        assert!(game.assist_moves().is_empty());

        game.set_assist_move(0, 0, Cell::Backward);
        game.resize(Dimensions::new(4, 4).unwrap());
        assert!(game.assist_moves().is_empty());
    }
}
