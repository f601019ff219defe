//! Loop detection over the diagonal graph.
//!
//! Diagonals are edges between intersection nodes. A diagonal whose two
//! endpoints are already connected closes a loop. Two forms are provided:
//! a yes/no check built on [`UnionFind`], and a traceable DFS that reports
//! which cells lie on a loop (for highlighting player mistakes).

use crate::grid::{Cell, Grid, Position};
use crate::union_find::UnionFind;
use std::collections::BTreeSet;

#[inline]
fn node_index(node: Position, cols: usize) -> usize {
    node.row * (cols + 1) + node.col
}

/// Incremental connectivity of the diagonals placed so far on one board.
#[derive(Debug, Clone)]
pub struct Connectivity {
    uf: UnionFind,
    cols: usize,
}

impl Connectivity {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            uf: UnionFind::new((rows + 1) * (cols + 1)),
            cols,
        }
    }

    fn edge(&self, pos: Position, cell: Cell) -> Option<(usize, usize)> {
        let (a, b) = cell.endpoints(pos)?;
        Some((node_index(a, self.cols), node_index(b, self.cols)))
    }

    /// Would placing `cell` at `pos` close a loop?
    pub fn closes_cycle(&mut self, pos: Position, cell: Cell) -> bool {
        match self.edge(pos, cell) {
            Some((a, b)) => self.uf.connected(a, b),
            None => false,
        }
    }

    /// Record `cell` at `pos`. Returns `false` if it closed a loop.
    pub fn link(&mut self, pos: Position, cell: Cell) -> bool {
        match self.edge(pos, cell) {
            Some((a, b)) => self.uf.union(a, b),
            None => true,
        }
    }
}

/// Does any set of placed diagonals form a closed loop?
pub fn has_cycle(grid: &Grid<Cell>) -> bool {
    let mut conn = Connectivity::new(grid.rows(), grid.cols());
    grid.iter().any(|(pos, &cell)| !conn.link(pos, cell))
}

struct Edge {
    cell: Position,
    from: usize,
    to: usize,
}

struct Frame {
    node: usize,
    parent: Option<usize>,
    next: usize,
}

/// Every cell that takes part in a loop.
///
/// Depth-first search over the node graph with explicit frame and edge
/// stacks. Reaching a node that is still on the DFS stack (other than the
/// one we just came from) closes a loop; the edge stack is unwound back to
/// that node, marking each cell on the way.
pub fn find_cycle_cells(grid: &Grid<Cell>) -> BTreeSet<Position> {
    let cols = grid.cols();
    let node_count = (grid.rows() + 1) * (cols + 1);
    let mut adj: Vec<Vec<(usize, Position)>> = vec![Vec::new(); node_count];
    for (pos, &cell) in grid.iter() {
        if let Some((a, b)) = cell.endpoints(pos) {
            let (u, v) = (node_index(a, cols), node_index(b, cols));
            adj[u].push((v, pos));
            adj[v].push((u, pos));
        }
    }

    let mut cycle_cells = BTreeSet::new();
    let mut visited = vec![false; node_count];
    let mut on_stack = vec![false; node_count];
    let mut edges: Vec<Edge> = Vec::new();
    let mut frames: Vec<Frame> = Vec::new();

    for start in 0..node_count {
        if visited[start] || adj[start].is_empty() {
            continue;
        }
        visited[start] = true;
        on_stack[start] = true;
        frames.push(Frame { node: start, parent: None, next: 0 });

        while let Some(frame) = frames.last_mut() {
            let u = frame.node;
            let Some(&(v, cell)) = adj[u].get(frame.next) else {
                on_stack[u] = false;
                let entered_by_edge = frame.parent.is_some();
                frames.pop();
                if entered_by_edge {
                    edges.pop();
                }
                continue;
            };
            frame.next += 1;
            if Some(v) == frame.parent {
                continue;
            }

            if on_stack[v] {
                cycle_cells.insert(cell);
                for edge in edges.iter().rev() {
                    cycle_cells.insert(edge.cell);
                    if edge.from == v || edge.to == v {
                        break;
                    }
                }
            } else if !visited[v] {
                visited[v] = true;
                on_stack[v] = true;
                edges.push(Edge { cell, from: u, to: v });
                frames.push(Frame { node: v, parent: Some(u), next: 0 });
            }
        }
    }

    cycle_cells
}

/// Strategy seam for loop highlighting.
pub trait CycleTracer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cells lying on a loop in `grid`.
    fn trace(&self, grid: &Grid<Cell>) -> BTreeSet<Position>;
}

/// Union-find pre-pass that skips the DFS entirely on loop-free boards.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCycleDetector;

impl CycleTracer for NativeCycleDetector {
    fn name(&self) -> &'static str {
        "native"
    }

    fn trace(&self, grid: &Grid<Cell>) -> BTreeSet<Position> {
        if has_cycle(grid) {
            find_cycle_cells(grid)
        } else {
            BTreeSet::new()
        }
    }
}

/// Plain DFS over every board.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackCycleDetector;

impl CycleTracer for FallbackCycleDetector {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn trace(&self, grid: &Grid<Cell>) -> BTreeSet<Position> {
        find_cycle_cells(grid)
    }
}

/// Diamond of four diagonals around the centre node of a 2x2 board.
fn probe_loop() -> Grid<Cell> {
    Grid::from_rows(vec![
        vec![Cell::Forward, Cell::Backward],
        vec![Cell::Backward, Cell::Forward],
    ])
    .unwrap_or_else(|| Grid::filled(2, 2, Cell::Forward))
}

fn agrees(tracer: &dyn CycleTracer) -> bool {
    let looped = probe_loop();
    let open = Grid::filled(2, 2, Cell::Forward);
    tracer.trace(&looped) == FallbackCycleDetector.trace(&looped)
        && tracer.trace(&open).is_empty()
}

/// Pick the tracer once, at startup.
///
/// The native path is only used when it reproduces the fallback's answer
/// on a known loop and a known open board.
pub fn select_tracer() -> &'static dyn CycleTracer {
    static NATIVE: NativeCycleDetector = NativeCycleDetector;
    static FALLBACK: FallbackCycleDetector = FallbackCycleDetector;
    static SELECTED: std::sync::OnceLock<&'static dyn CycleTracer> = std::sync::OnceLock::new();

    *SELECTED.get_or_init(|| {
        if agrees(&NATIVE) {
            tracing::debug!(tracer = NATIVE.name(), "cycle tracer selected");
            &NATIVE
        } else {
            tracing::warn!("native cycle tracer failed its probe, using fallback");
            &FALLBACK
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(s: &str) -> Grid<Cell> {
        Grid::parse(s).unwrap()
    }

    #[test]
    fn test_diamond_is_a_cycle() {
        let g = grid("/\\\n\\/");
        assert!(has_cycle(&g));
        let cells = find_cycle_cells(&g);
        assert_eq!(cells.len(), 4);
    }

    #[test]
    fn test_open_board_has_no_cycle() {
        let g = grid("//\n//");
        assert!(!has_cycle(&g));
        assert!(find_cycle_cells(&g).is_empty());
    }

    #[test]
    fn test_partial_board_ignores_empty() {
        let g = grid("/\\\n\\.");
        assert!(!has_cycle(&g));
        assert!(find_cycle_cells(&g).is_empty());
    }

    #[test]
    fn test_only_loop_cells_are_marked() {
        // Diamond in the top-left 2x2, with tails hanging off it.
        let g = grid("/\\/\n\\/\\\n///");
        assert!(has_cycle(&g));
        let cells = find_cycle_cells(&g);
        let expected: BTreeSet<Position> = [
            Position::new(0, 0),
            Position::new(0, 1),
            Position::new(1, 0),
            Position::new(1, 1),
        ]
        .into_iter()
        .collect();
        assert_eq!(cells, expected);
    }

    #[test]
    fn test_larger_loop() {
        // Diamond of side two around node (2,2) on a 4x4 board.
        let g = grid("./\\.\n/..\\\n\\../\n.\\/.");
        assert!(has_cycle(&g));
        assert_eq!(find_cycle_cells(&g).len(), 8);
    }

    #[test]
    fn test_connectivity_closes_cycle() {
        let mut conn = Connectivity::new(2, 2);
        assert!(conn.link(Position::new(0, 0), Cell::Forward));
        assert!(conn.link(Position::new(0, 1), Cell::Backward));
        assert!(conn.link(Position::new(1, 0), Cell::Backward));
        assert!(conn.closes_cycle(Position::new(1, 1), Cell::Forward));
        assert!(!conn.closes_cycle(Position::new(1, 1), Cell::Backward));
        assert!(!conn.closes_cycle(Position::new(1, 1), Cell::Empty));
    }

    #[test]
    fn test_tracers_agree() {
        let boards = ["/\\\n\\/", "//\n\\\\", "/\\/\n\\/\\\n///", "...\n...\n..."];
        let tracer = select_tracer();
        for b in boards {
            let g = grid(b);
            assert_eq!(tracer.trace(&g), FallbackCycleDetector.trace(&g), "board {b}");
            assert_eq!(NativeCycleDetector.trace(&g), find_cycle_cells(&g));
        }
    }
}
