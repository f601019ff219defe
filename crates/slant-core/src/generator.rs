use crate::cycle::{has_cycle, Connectivity};
use crate::grid::{Cell, Dimensions, Grid, HintGrid, Position};
use crate::hints::{calculate_hints, reveal_all, revealed_count};
use crate::puzzle::Puzzle;
use crate::solver::Solver;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How hint removal decides whether a puzzle is still fair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PruneStrategy {
    /// Count solutions by exhaustive search
    Exact,
    /// Require the forcing rules to fill the board
    Deductive,
    /// Random removal with no oracle
    Heuristic,
}

impl PruneStrategy {
    /// Pick a tier from the board size.
    pub fn for_cells(cells: usize, config: &GeneratorConfig) -> Self {
        if cells <= config.exact_max_cells {
            Self::Exact
        } else if cells <= config.deductive_max_cells {
            Self::Deductive
        } else {
            Self::Heuristic
        }
    }
}

/// Configuration for puzzle generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Constructive attempts before the striped fallback
    pub max_attempts: usize,
    /// Fraction of nodes that stay revealed once pruning stops
    pub hint_density: f64,
    /// Largest board pruned with exhaustive search
    pub exact_max_cells: usize,
    /// Largest board pruned with the deductive oracle
    pub deductive_max_cells: usize,
    /// Chance that a visited hint survives heuristic pruning
    pub heuristic_keep_probability: f64,
    /// Heuristic pruning visits at most this many hints per cell
    pub heuristic_checks_per_cell: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            hint_density: 0.35,
            exact_max_cells: 25,
            deductive_max_cells: 400,
            heuristic_keep_probability: 0.4,
            heuristic_checks_per_cell: 4,
        }
    }
}

/// Slant puzzle generator
pub struct Generator {
    config: GeneratorConfig,
    rng: SimpleRng,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    /// Create a new generator with default configuration
    pub fn new() -> Self {
        Self {
            config: GeneratorConfig::default(),
            rng: SimpleRng::new(),
        }
    }

    /// Create a generator with custom configuration
    pub fn with_config(config: GeneratorConfig) -> Self {
        Self {
            config,
            rng: SimpleRng::new(),
        }
    }

    /// Create a generator with a specific seed for reproducibility
    pub fn with_seed(seed: u64) -> Self {
        Self {
            config: GeneratorConfig::default(),
            rng: SimpleRng::with_seed(seed),
        }
    }

    /// Replace the configuration, keeping the random stream.
    pub fn config_mut(&mut self) -> &mut GeneratorConfig {
        &mut self.config
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate a puzzle of the given size.
    pub fn generate(&mut self, dims: Dimensions) -> Puzzle {
        let solution = self.generate_solution(dims);
        let mut hints = reveal_all(&calculate_hints(&solution));
        self.prune_hints(dims, &mut hints);
        Puzzle::new_unchecked(dims, hints, solution)
    }

    /// A full loop-free board.
    pub fn generate_solution(&mut self, dims: Dimensions) -> Grid<Cell> {
        for attempt in 1..=self.config.max_attempts {
            if let Some(grid) = self.try_construct(dims) {
                debug!(%dims, attempt, "constructed solution");
                return grid;
            }
        }
        warn!(%dims, attempts = self.config.max_attempts, "construction exhausted, using striped board");
        striped(dims)
    }

    /// One randomized pass; `None` on a dead end.
    fn try_construct(&mut self, dims: Dimensions) -> Option<Grid<Cell>> {
        let mut grid = dims.empty_cells();
        let mut conn = Connectivity::new(dims.rows(), dims.cols());
        let mut order: Vec<Position> = dims.cells().collect();
        self.shuffle(&mut order);

        for pos in order {
            let forward_loops = conn.closes_cycle(pos, Cell::Forward);
            let backward_loops = conn.closes_cycle(pos, Cell::Backward);
            let cell = match (forward_loops, backward_loops) {
                (true, true) => return None,
                (true, false) => Cell::Backward,
                (false, true) => Cell::Forward,
                (false, false) if self.rng.next_bool() => Cell::Forward,
                (false, false) => Cell::Backward,
            };
            conn.link(pos, cell);
            grid.set(pos, cell);
        }
        Some(grid)
    }

    /// Hide hints while the tier's oracle still accepts the puzzle.
    fn prune_hints(&mut self, dims: Dimensions, hints: &mut HintGrid) {
        let solver = Solver::new();
        let strategy = PruneStrategy::for_cells(dims.cell_count(), &self.config);
        let target = (dims.node_count() as f64 * self.config.hint_density).floor() as usize;
        let max_checks = match strategy {
            PruneStrategy::Heuristic => dims.cell_count() * self.config.heuristic_checks_per_cell,
            _ => usize::MAX,
        };

        let mut nodes: Vec<Position> = dims.nodes().collect();
        self.shuffle(&mut nodes);

        let mut revealed = revealed_count(hints);
        let mut checks = 0;
        for node in nodes {
            if revealed <= target || checks >= max_checks {
                break;
            }
            let Some(original) = hints.value(node) else { continue };
            hints.set(node, None);
            checks += 1;

            let still_fair = match strategy {
                PruneStrategy::Exact => solver.has_unique_solution(dims, hints),
                PruneStrategy::Deductive => solver.is_deductively_solvable(dims, hints),
                PruneStrategy::Heuristic => self.rng.next_f64() >= self.config.heuristic_keep_probability,
            };
            if still_fair {
                revealed -= 1;
            } else {
                hints.set(node, Some(original));
            }
        }
        debug!(%dims, ?strategy, checks, revealed, target, "pruned hints");
    }

    /// Shuffle a slice using Fisher-Yates
    fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.rng.next_usize(i + 1);
            slice.swap(i, j);
        }
    }
}

/// Even rows Forward, odd rows Backward. Never contains a loop.
pub fn striped(dims: Dimensions) -> Grid<Cell> {
    let mut grid = dims.empty_cells();
    for pos in dims.cells() {
        let cell = if pos.row % 2 == 0 { Cell::Forward } else { Cell::Backward };
        grid.set(pos, cell);
    }
    debug_assert!(!has_cycle(&grid));
    grid
}

/// Small PCG-style PRNG, seedable for reproducible puzzles
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new() -> Self {
        let mut seed_bytes = [0u8; 8];
        getrandom::getrandom(&mut seed_bytes).unwrap_or_else(|_| {
            // getrandom unavailable: a process-wide counter still varies the seed
            static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);
            let counter = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            seed_bytes = counter.to_le_bytes();
        });
        Self::with_seed(u64::from_le_bytes(seed_bytes))
    }

    fn with_seed(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(1),
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let xorshifted = (((self.state >> 18) ^ self.state) >> 27) as u32;
        let rot = (self.state >> 59) as u32;
        (xorshifted.rotate_right(rot)) as u64
    }

    fn next_usize(&mut self, bound: usize) -> usize {
        (self.next_u64() as usize) % bound
    }

    /// Uniform in `[0, 1)`.
    fn next_f64(&mut self) -> f64 {
        self.next_u64() as f64 / (u64::from(u32::MAX) + 1) as f64
    }

    fn next_bool(&mut self) -> bool {
        self.next_u64() & 1 == 1
    }
}
