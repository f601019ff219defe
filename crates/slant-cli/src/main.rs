mod store;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use slant_core::{
    AssistConfig, AssistSolver, Cell, ConflictKind, Dimensions, Game, Generator, GeneratorConfig, WorkerStatus,
    MAX_DIMENSION,
};
use std::path::PathBuf;
use std::time::Duration;
use store::SessionStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Smallest board the command line will create.
const MIN_SIZE: usize = 3;
const DEFAULT_SIZE: usize = 7;

#[derive(Parser)]
#[command(name = "slant", version, about = "Slant (Gokigen Naname) puzzles in the terminal")]
struct Cli {
    /// Board rows
    #[arg(long, global = true, default_value_t = DEFAULT_SIZE, value_parser = parse_size)]
    rows: usize,
    /// Board columns
    #[arg(long, global = true, default_value_t = DEFAULT_SIZE, value_parser = parse_size)]
    cols: usize,
    /// Where sessions are stored. Defaults to the platform data directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Log engine activity to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a puzzle and start a new session
    Generate {
        /// Seed for a reproducible puzzle
        #[arg(long)]
        seed: Option<u64>,
        /// Fraction of intersections left showing a number
        #[arg(long, default_value_t = GeneratorConfig::default().hint_density)]
        density: f64,
    },
    /// Print the current board
    Show {
        /// Also print the solution
        #[arg(long)]
        solution: bool,
    },
    /// Cycle a cell through empty, \ and /
    Move {
        row: usize,
        col: usize,
        /// Cycle the other way: empty, / and \
        #[arg(long)]
        reverse: bool,
        /// Set this state instead of cycling
        #[arg(long, value_enum)]
        state: Option<CellArg>,
    },
    /// Suggest the next logical move
    Hint {
        /// Play the suggestion as well
        #[arg(long)]
        apply: bool,
    },
    /// Clear the board, keeping the puzzle
    Reset,
    /// Replace the puzzle with a new one of the same size
    New,
    /// Delete the saved session for this size
    Forget,
    /// Sketch moves on the assist overlay and show what they force
    Assist {
        /// Solve on this thread instead of a worker
        #[arg(long)]
        no_worker: bool,
        /// Milliseconds the worker has to answer its probe
        #[arg(long, default_value_t = 2000)]
        probe_ms: u64,
        #[command(subcommand)]
        action: Option<AssistAction>,
    },
}

#[derive(Subcommand)]
enum AssistAction {
    /// Sketch a diagonal on the overlay
    Set {
        row: usize,
        col: usize,
        #[arg(value_enum)]
        state: CellArg,
    },
    /// Remove a sketched diagonal
    Remove { row: usize, col: usize },
    /// Replace the overlay with the board's filled cells
    Copy,
    /// Remove every sketched diagonal
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum CellArg {
    Empty,
    Forward,
    Backward,
}

impl From<CellArg> for Cell {
    fn from(arg: CellArg) -> Self {
        match arg {
            CellArg::Empty => Cell::Empty,
            CellArg::Forward => Cell::Forward,
            CellArg::Backward => Cell::Backward,
        }
    }
}

fn parse_size(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if !(MIN_SIZE..=MAX_DIMENSION).contains(&n) {
        return Err(format!("size must be between {MIN_SIZE} and {MAX_DIMENSION}"));
    }
    Ok(n)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn generator(seed: Option<u64>, density: f64) -> Generator {
    let mut generator = match seed {
        Some(seed) => Generator::with_seed(seed),
        None => Generator::new(),
    };
    generator.config_mut().hint_density = density.clamp(0.0, 1.0);
    generator
}

/// The saved session for this size, or a fresh one.
fn load_or_start(store: &SessionStore, dims: Dimensions) -> Result<Game> {
    match store.load(dims)? {
        Some(game) => Ok(game),
        None => {
            info!(%dims, "no saved session, generating a puzzle");
            Ok(Game::new(dims))
        }
    }
}

fn print_status(game: &Game) {
    if game.is_solved() {
        println!("Solved in {} moves.", game.moves_count());
        return;
    }
    let empty = game.grid().empty_count();
    println!("{empty} empty cells, {} moves", game.moves_count());
    if !game.error_nodes().is_empty() {
        let nodes: Vec<String> = game.error_nodes().iter().map(ToString::to_string).collect();
        println!("Unsatisfiable numbers at: {}", nodes.join(" "));
    }
    if !game.cycle_cells().is_empty() {
        let cells: Vec<String> = game.cycle_cells().iter().map(ToString::to_string).collect();
        println!("Loop through cells: {}", cells.join(" "));
    }
}

fn print_game(game: &Game) {
    print!("{game}");
    print_status(game);
}

fn run_assist(game: &Game, no_worker: bool, probe_ms: u64) {
    let config = AssistConfig {
        probe_timeout: Duration::from_millis(probe_ms),
        use_worker: !no_worker,
    };
    let mut solver = AssistSolver::spawn(config);
    if solver.wait_ready() == WorkerStatus::Fallback && !no_worker {
        println!("(worker unavailable, solved inline)");
    }
    let sketched: Vec<String> = game
        .assist_moves()
        .iter()
        .map(|(pos, cell)| format!("{pos} {}", cell.symbol()))
        .collect();
    if sketched.is_empty() {
        println!("No assist moves sketched.");
    } else {
        println!("Assist moves: {}", sketched.join(", "));
    }
    solver.submit(game.assist_request());
    let result = solver.wait_latest(Duration::from_millis(probe_ms.max(1)));

    let forced: Vec<String> = result
        .propagated()
        .map(|(pos, cell)| format!("{pos} {}", cell.symbol()))
        .collect();
    if forced.is_empty() {
        println!("Nothing forced yet.");
    } else {
        println!("Forced: {}", forced.join(", "));
    }
    for conflict in &result.conflicts {
        let what = match conflict.kind {
            ConflictKind::Cell => "cell",
            ConflictKind::Node => "number",
        };
        println!("Conflict at {what} {}", conflict.position());
    }
    if !result.cycle_cells.is_empty() {
        let cells: Vec<String> = result.cycle_cells.iter().map(ToString::to_string).collect();
        println!("Loop through cells: {}", cells.join(" "));
    }
    solver.shutdown();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let dims = Dimensions::new(cli.rows, cli.cols)?;
    let store = match &cli.data_dir {
        Some(dir) => SessionStore::at(dir),
        None => SessionStore::open_default(),
    };

    match cli.command {
        Command::Generate { seed, density } => {
            let game = Game::from_puzzle(generator(seed, density).generate(dims));
            let path = store.save(&game)?;
            print_game(&game);
            println!("Session saved to {}", path.display());
        }
        Command::Show { solution } => {
            let game = load_or_start(&store, dims)?;
            store.save(&game)?;
            print_game(&game);
            if solution {
                println!("\nSolution:");
                print!("{}", game.puzzle().solution().to_string_compact().replace('|', "\n"));
                println!();
            }
        }
        Command::Move { row, col, reverse, state } => {
            let mut game = load_or_start(&store, dims)?;
            let changed = match state {
                Some(state) => game.set_cell(row, col, state.into()),
                None => game.toggle(row, col, reverse),
            };
            if !changed {
                println!("Nothing changed at {row},{col}.");
            }
            store.save(&game)?;
            print_game(&game);
        }
        Command::Hint { apply } => {
            let mut game = load_or_start(&store, dims)?;
            let suggestion = if apply {
                game.apply_next_logical_move()
            } else {
                game.next_logical_move()
            };
            match suggestion {
                Some(m) => println!("Place {} at {}", m.cell.symbol(), m.pos),
                None => println!("No move to suggest."),
            }
            store.save(&game)?;
            if apply {
                print_game(&game);
            }
        }
        Command::Reset => {
            let mut game = load_or_start(&store, dims)?;
            game.reset();
            store.save(&game)?;
            print_game(&game);
        }
        Command::New => {
            let mut game = load_or_start(&store, dims)?;
            game.new_puzzle();
            store.save(&game)?;
            print_game(&game);
        }
        Command::Forget => {
            if store.clear(dims)? {
                println!("Forgot the {dims} session.");
            } else {
                println!("No saved {dims} session.");
            }
        }
        Command::Assist {
            no_worker,
            probe_ms,
            action,
        } => {
            let mut game = load_or_start(&store, dims)?;
            let changed = match action {
                Some(AssistAction::Set { row, col, state }) => game.set_assist_move(row, col, state.into()),
                Some(AssistAction::Remove { row, col }) => game.remove_assist_move(row, col),
                Some(AssistAction::Copy) => {
                    game.copy_board_to_assist();
                    true
                }
                Some(AssistAction::Clear) => {
                    game.clear_assist();
                    true
                }
                None => true,
            };
            if !changed {
                println!("Overlay unchanged.");
            }
            store.save(&game)?;
            print!("{game}");
            run_assist(&game, no_worker, probe_ms);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_size_bounds() {
        assert_eq!(parse_size("3"), Ok(3));
        assert!(parse_size("2").is_err());
        assert!(parse_size("65").is_err());
        assert!(parse_size("x").is_err());
    }

    #[test]
    fn test_parse_move() {
        let cli = Cli::try_parse_from(["slant", "--rows", "4", "move", "1", "2", "--state", "backward"]).unwrap();
        assert_eq!(cli.rows, 4);
        assert_eq!(cli.cols, DEFAULT_SIZE);
        match cli.command {
            Command::Move { row, col, state, .. } => {
                assert_eq!((row, col), (1, 2));
                assert!(matches!(state, Some(CellArg::Backward)));
            }
            _ => panic!("expected a move"),
        }
    }

    #[test]
    fn test_parse_assist_action() {
        let cli = Cli::try_parse_from(["slant", "assist", "--no-worker", "set", "0", "2", "forward"]).unwrap();
        match cli.command {
            Command::Assist {
                no_worker,
                action: Some(AssistAction::Set { row, col, state }),
                ..
            } => {
                assert!(no_worker);
                assert_eq!((row, col), (0, 2));
                assert!(matches!(state, CellArg::Forward));
            }
            _ => panic!("expected an assist set"),
        }

        let bare = Cli::try_parse_from(["slant", "assist"]).unwrap();
        assert!(matches!(bare.command, Command::Assist { action: None, .. }));
    }
}
