//! Basic example of using the Slant engine

use slant_core::{propagate, Cell, Dimensions, Game, Generator, Solver};

fn main() {
    // Generate a puzzle
    let dims = Dimensions::new(6, 6).expect("6x6 is a valid board");
    println!("Generating a {dims} puzzle...\n");
    let mut generator = Generator::new();
    let puzzle = generator.generate(dims);

    println!("Generated puzzle:");
    println!("{}", puzzle);
    println!("Numbers shown: {} of {}", puzzle.hint_count(), dims.node_count());

    // Check it
    let solver = Solver::new();
    println!("Solvable by deduction: {}", solver.is_deductively_solvable(dims, puzzle.hints()));
    println!("Solutions (up to 2): {}", solver.count_solutions(dims, puzzle.hints(), 2));
    if let Some(board) = solver.solve(dims, puzzle.hints()) {
        println!("Search agrees with the stored solution: {}\n", &board == puzzle.solution());
    }

    // Play a few hinted moves
    let mut game = Game::from_puzzle(puzzle);
    for _ in 0..5 {
        if let Some(m) = game.apply_next_logical_move() {
            println!("Hint: {} at {}", m.cell.symbol(), m.pos);
        }
    }
    println!("\n{}", game);

    // Sketch moves on the assist overlay and see what they force
    game.copy_board_to_assist();
    game.set_assist_move(0, 0, Cell::Forward);
    let overlay = propagate(&game.assist_request());
    println!("Assist moves: {}", game.assist_moves().len());
    println!("Forced cells: {}", overlay.propagated().count());
    println!("Conflicts: {}", overlay.conflicts.len());
    game.clear_assist();

    // Finish with hints
    while game.apply_next_logical_move().is_some() {}
    println!("\nSolved: {}", game.is_solved());
    println!("{}", game);
}
