//! Board primitives: cell states, positions, dimensions, and the flat grid
//! used for both cells and intersection nodes.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest supported board side.
pub const MAX_DIMENSION: usize = 64;

/// State of a single cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    /// No diagonal placed yet
    #[default]
    Empty,
    /// Diagonal "/": joins the top-right and bottom-left corners
    Forward,
    /// Diagonal "\": joins the top-left and bottom-right corners
    Backward,
}

impl Cell {
    /// The other diagonal. `Empty` stays `Empty`.
    pub fn flipped(self) -> Cell {
        match self {
            Cell::Empty => Cell::Empty,
            Cell::Forward => Cell::Backward,
            Cell::Backward => Cell::Forward,
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }

    /// The two intersection nodes this diagonal joins when placed at `pos`.
    pub fn endpoints(self, pos: Position) -> Option<(Position, Position)> {
        let Position { row, col } = pos;
        match self {
            Cell::Empty => None,
            Cell::Forward => Some((Position::new(row, col + 1), Position::new(row + 1, col))),
            Cell::Backward => Some((Position::new(row, col), Position::new(row + 1, col + 1))),
        }
    }

    /// Next state when toggling; `reverse` walks the cycle the other way.
    pub fn toggled(self, reverse: bool) -> Cell {
        match (self, reverse) {
            (Cell::Empty, false) => Cell::Backward,
            (Cell::Backward, false) => Cell::Forward,
            (Cell::Forward, false) => Cell::Empty,
            (Cell::Empty, true) => Cell::Forward,
            (Cell::Forward, true) => Cell::Backward,
            (Cell::Backward, true) => Cell::Empty,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Forward => '/',
            Cell::Backward => '\\',
        }
    }

    pub fn from_symbol(c: char) -> Option<Cell> {
        match c {
            '.' | ' ' | '0' => Some(Cell::Empty),
            '/' | 'f' | 'F' => Some(Cell::Forward),
            '\\' | 'b' | 'B' => Some(Cell::Backward),
            _ => None,
        }
    }
}

/// A position on either the cell grid or the node lattice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// A cell touching an intersection node, together with the diagonal
/// that would point into that node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Touching {
    pub cell: Position,
    pub pointing_in: Cell,
}

/// Validated board size in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDimensions")]
pub struct Dimensions {
    rows: usize,
    cols: usize,
}

#[derive(Deserialize)]
struct RawDimensions {
    rows: usize,
    cols: usize,
}

impl TryFrom<RawDimensions> for Dimensions {
    type Error = EngineError;

    fn try_from(raw: RawDimensions) -> Result<Self, Self::Error> {
        Dimensions::new(raw.rows, raw.cols)
    }
}

impl Dimensions {
    pub fn new(rows: usize, cols: usize) -> Result<Self, EngineError> {
        if rows == 0 || cols == 0 || rows > MAX_DIMENSION || cols > MAX_DIMENSION {
            return Err(EngineError::InvalidDimensions { rows, cols });
        }
        Ok(Self { rows, cols })
    }

    pub fn square(size: usize) -> Result<Self, EngineError> {
        Self::new(size, size)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn node_count(&self) -> usize {
        (self.rows + 1) * (self.cols + 1)
    }

    pub fn contains_cell(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    pub fn contains_node(&self, pos: Position) -> bool {
        pos.row <= self.rows && pos.col <= self.cols
    }

    /// Iterate all cell positions in row-major order
    pub fn cells(&self) -> impl Iterator<Item = Position> {
        let cols = self.cols;
        (0..self.rows).flat_map(move |row| (0..cols).map(move |col| Position::new(row, col)))
    }

    /// Iterate all node positions in row-major order
    pub fn nodes(&self) -> impl Iterator<Item = Position> {
        let cols = self.cols + 1;
        (0..=self.rows).flat_map(move |row| (0..cols).map(move |col| Position::new(row, col)))
    }

    /// The up to four cells meeting at `node`.
    pub fn touching(&self, node: Position) -> impl Iterator<Item = Touching> {
        let Position { row, col } = node;
        let candidates = [
            (row.checked_sub(1), col.checked_sub(1), Cell::Backward),
            (row.checked_sub(1), Some(col), Cell::Forward),
            (Some(row), col.checked_sub(1), Cell::Forward),
            (Some(row), Some(col), Cell::Backward),
        ];
        let dims = *self;
        candidates.into_iter().filter_map(move |(r, c, pointing_in)| {
            let cell = Position::new(r?, c?);
            dims.contains_cell(cell).then_some(Touching { cell, pointing_in })
        })
    }

    /// The four corner nodes of a cell.
    pub fn corners(&self, cell: Position) -> [Position; 4] {
        let Position { row, col } = cell;
        [
            Position::new(row, col),
            Position::new(row, col + 1),
            Position::new(row + 1, col),
            Position::new(row + 1, col + 1),
        ]
    }

    /// An empty cell grid of this size
    pub fn empty_cells(&self) -> Grid<Cell> {
        Grid::filled(self.rows, self.cols, Cell::Empty)
    }

    /// A node grid of this size filled with `value`
    pub fn node_grid<T: Clone>(&self, value: T) -> Grid<T> {
        Grid::filled(self.rows + 1, self.cols + 1, value)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Dense row-major grid
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawGrid<T>", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

#[derive(Deserialize)]
struct RawGrid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T> TryFrom<RawGrid<T>> for Grid<T> {
    type Error = EngineError;

    fn try_from(raw: RawGrid<T>) -> Result<Self, Self::Error> {
        if raw.cells.len() != raw.rows * raw.cols {
            return Err(EngineError::MalformedGrid {
                rows: raw.rows,
                cols: raw.cols,
                len: raw.cells.len(),
            });
        }
        Ok(Self {
            rows: raw.rows,
            cols: raw.cols,
            cells: raw.cells,
        })
    }
}

/// Clue numbers on the node lattice
pub type HintGrid = Grid<Option<u8>>;

impl<T: Clone> Grid<T> {
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            cells: vec![value; rows * cols],
        }
    }
}

impl<T> Grid<T> {
    /// Build from nested rows. Returns `None` if rows are ragged.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != width) {
            return None;
        }
        Some(Self {
            rows: height,
            cols: width,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn index(&self, pos: Position) -> Option<usize> {
        (pos.row < self.rows && pos.col < self.cols).then(|| pos.row * self.cols + pos.col)
    }

    pub fn get(&self, pos: Position) -> Option<&T> {
        self.index(pos).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        self.index(pos).map(move |i| &mut self.cells[i])
    }

    /// Write `value` at `pos`; out-of-range writes are ignored.
    pub fn set(&mut self, pos: Position, value: T) -> bool {
        match self.get_mut(pos) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &T)> {
        let cols = self.cols.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, v)| (Position::new(i / cols, i % cols), v))
    }

    pub fn values(&self) -> &[T] {
        &self.cells
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            rows: self.rows,
            cols: self.cols,
            cells: self.cells.iter().map(f).collect(),
        }
    }
}

impl<T: Copy + Default> Grid<T> {
    /// Read a value, treating out-of-range positions as the default.
    pub fn value(&self, pos: Position) -> T {
        self.get(pos).copied().unwrap_or_default()
    }
}

impl Grid<Cell> {
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| !c.is_empty())
    }

    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_empty()).count()
    }

    /// Parse rows of `/`, `\` and `.` separated by newlines or `|`.
    pub fn parse(s: &str) -> Option<Self> {
        let rows: Option<Vec<Vec<Cell>>> = s
            .split(['\n', '|'])
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.chars().map(Cell::from_symbol).collect())
            .collect();
        Self::from_rows(rows?)
    }

    /// Compact one-line form, rows joined with `|`.
    pub fn to_string_compact(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() + self.rows);
        for (i, row) in self.cells.chunks(self.cols.max(1)).enumerate() {
            if i > 0 {
                out.push('|');
            }
            out.extend(row.iter().map(|c| c.symbol()));
        }
        out
    }
}
