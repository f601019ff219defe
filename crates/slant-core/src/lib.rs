//! Slant (Gokigen Naname) puzzle engine.
//!
//! Every cell of a `rows x cols` grid holds one diagonal. Numbers on the
//! grid intersections say how many diagonals touch that point, and the
//! diagonals may never form a closed loop.
//!
//! The crate generates uniquely solvable puzzles, checks boards, suggests
//! moves, and computes the assisted-play overlay either inline or on a
//! background thread.

pub mod assist;
pub mod cycle;
pub mod error;
pub mod game;
pub mod generator;
pub mod grid;
pub mod hints;
pub mod protocol;
pub mod puzzle;
pub mod session;
pub mod solver;
pub mod union_find;
pub mod worker;

pub use assist::{propagate, AssistResult, CellInfo, Conflict, ConflictKind, Source};
pub use cycle::{find_cycle_cells, has_cycle, select_tracer, CycleTracer};
pub use error::EngineError;
pub use game::{is_solved, Game};
pub use generator::{Generator, GeneratorConfig, PruneStrategy};
pub use grid::{Cell, Dimensions, Grid, HintGrid, Position, MAX_DIMENSION};
pub use hints::calculate_hints;
pub use protocol::{SolveRequest, WorkerRequest, WorkerResponse};
pub use puzzle::Puzzle;
pub use session::SavedSession;
pub use solver::{Move, Solver};
pub use union_find::UnionFind;
pub use worker::{AssistConfig, AssistSolver, WorkerStatus};
