//! Canonical states and the transition relation they induce.
//!
//! A physical boundary point is shared by up to two blocks, so naming it by
//! block-local terminal would be ambiguous. Canonicalization folds the W
//! and S views onto the E/N view of the lower/left block, giving every
//! point exactly one name.

use std::fmt;

use crate::maze::{BlockKind, Dir, Maze, Terminal};

/// The two directions a canonical state can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    East = 0,
    North = 1,
}

impl Axis {
    /// Returns the single-letter name used by the textual path format.
    #[inline]
    pub const fn letter(self) -> char {
        match self {
            Axis::East => 'E',
            Axis::North => 'N',
        }
    }
}

/// A canonical state: a physical boundary point named by its lower/left
/// block.
///
/// `(x, y, E, i)` is the point shared by `E[i]` of block (x,y) and `W[i]`
/// of block (x+1,y); `(x, y, N, i)` likewise on the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct State {
    pub x: u32,
    pub y: u32,
    pub axis: Axis,
    pub index: u32,
}

impl State {
    /// Where every path begins: `W[0]` on the west edge of block (1,1).
    pub const START: State = State::new(0, 1, Axis::East, 0);

    /// Where every path must end: `W[1]` on the west edge of block (1,1).
    pub const GOAL: State = State::new(0, 1, Axis::East, 1);

    /// Creates a canonical state.
    #[inline]
    pub const fn new(x: u32, y: u32, axis: Axis, index: u32) -> State {
        State { x, y, axis, index }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{}{})", self.x, self.y, self.axis.letter(), self.index)
    }
}

/// Formats a path as arrow-separated state literals.
pub fn format_path(path: &[State]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Folds a block-local terminal into its canonical state.
///
/// Returns `None` when the fold would step off the grid, which only
/// happens for W/S terminals of blocks on the respective edges; real
/// blocks never expose those.
pub(crate) fn canonical(x: u32, y: u32, terminal: Terminal) -> Option<State> {
    let index = terminal.index as u32;
    match terminal.dir {
        Dir::East => Some(State::new(x, y, Axis::East, index)),
        Dir::West => x.checked_sub(1).map(|x| State::new(x, y, Axis::East, index)),
        Dir::North => Some(State::new(x, y, Axis::North, index)),
        Dir::South => y.checked_sub(1).map(|y| State::new(x, y, Axis::North, index)),
    }
}

/// One traversal of an active port, located in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortStep {
    /// Position of the block whose port was traversed.
    pub x: u32,
    /// Position of the block whose port was traversed.
    pub y: u32,
    /// Source terminal, in that block's local naming.
    pub src: Terminal,
    /// Destination terminal, in that block's local naming.
    pub dst: Terminal,
}

/// A pending scan of one incident block's outgoing ports.
#[derive(Debug, Clone, Copy)]
struct Scan {
    x: u32,
    y: u32,
    kind: BlockKind,
    src: Terminal,
}

impl Scan {
    /// Builds the scan for the block at (x,y) if that block exists and
    /// exposes the terminal.
    fn incident(x: u32, y: u32, src: Terminal) -> Option<Scan> {
        let kind = BlockKind::at(x, y)?;
        kind.has_dir(src.dir).then_some(Scan { x, y, kind, src })
    }
}

/// The up-to-two block scans incident to a canonical state.
fn incident_scans(state: State) -> [Option<Scan>; 2] {
    let index = state.index as usize;
    match state.axis {
        Axis::East => [
            Scan::incident(state.x, state.y, Terminal::new(Dir::East, index)),
            Scan::incident(state.x + 1, state.y, Terminal::new(Dir::West, index)),
        ],
        Axis::North => [
            Scan::incident(state.x, state.y, Terminal::new(Dir::North, index)),
            Scan::incident(state.x, state.y + 1, Terminal::new(Dir::South, index)),
        ],
    }
}

/// An iterator over the successor states of a canonical state.
///
/// Walks the outgoing port row of each incident block in turn, folding
/// every active destination back into canonical form. Fan-out is bounded
/// by 8N: two blocks with at most 4N destinations each.
pub struct Successors<'a> {
    maze: &'a Maze,
    scans: [Option<Scan>; 2],
    current: usize,
    cursor: usize,
}

impl<'a> Successors<'a> {
    pub(crate) fn new(maze: &'a Maze, state: State) -> Successors<'a> {
        Successors {
            maze,
            scans: incident_scans(state),
            current: 0,
            cursor: 0,
        }
    }
}

impl Iterator for Successors<'_> {
    type Item = State;

    fn next(&mut self) -> Option<State> {
        let nterm = self.maze.nterm();
        while self.current < 2 {
            if let Some(scan) = self.scans[self.current] {
                if scan.src.index < nterm {
                    match scan.kind {
                        BlockKind::Normal => {
                            while self.cursor < 4 * nterm {
                                let dst = Terminal::from_number(self.cursor, nterm);
                                self.cursor += 1;
                                if self.maze.normal(scan.src, dst) {
                                    if let Some(next) = canonical(scan.x, scan.y, dst) {
                                        return Some(next);
                                    }
                                }
                            }
                        }
                        BlockKind::Nx | BlockKind::Ny => {
                            while self.cursor < nterm {
                                let dst = self.cursor;
                                self.cursor += 1;
                                if dst == scan.src.index {
                                    continue;
                                }
                                let active = match scan.kind {
                                    BlockKind::Nx => self.maze.nx(scan.src.index, dst),
                                    _ => self.maze.ny(scan.src.index, dst),
                                };
                                if active {
                                    let terminal = Terminal::new(scan.src.dir, dst);
                                    if let Some(next) = canonical(scan.x, scan.y, terminal) {
                                        return Some(next);
                                    }
                                }
                            }
                        }
                    }
                }
            }
            self.current += 1;
            self.cursor = 0;
        }
        None
    }
}

impl Maze {
    /// Iterates over the successors of a canonical state under this
    /// maze's port configuration.
    pub fn successors(&self, state: State) -> Successors<'_> {
        Successors::new(self, state)
    }
}

/// Finds a block and active port realizing the transition `from -> to`,
/// if one exists.
///
/// When both incident blocks admit the transition, the lower/left block
/// wins; the solvers treat such multigraph edges as one edge anyway.
pub fn connecting_port(maze: &Maze, from: State, to: State) -> Option<PortStep> {
    let nterm = maze.nterm();
    for scan in incident_scans(from).into_iter().flatten() {
        if scan.src.index >= nterm {
            continue;
        }
        match scan.kind {
            BlockKind::Normal => {
                for number in 0..4 * nterm {
                    let dst = Terminal::from_number(number, nterm);
                    if maze.normal(scan.src, dst) && canonical(scan.x, scan.y, dst) == Some(to) {
                        return Some(PortStep {
                            x: scan.x,
                            y: scan.y,
                            src: scan.src,
                            dst,
                        });
                    }
                }
            }
            BlockKind::Nx | BlockKind::Ny => {
                for index in (0..nterm).filter(|&index| index != scan.src.index) {
                    let active = match scan.kind {
                        BlockKind::Nx => maze.nx(scan.src.index, index),
                        _ => maze.ny(scan.src.index, index),
                    };
                    let dst = Terminal::new(scan.src.dir, index);
                    if active && canonical(scan.x, scan.y, dst) == Some(to) {
                        return Some(PortStep {
                            x: scan.x,
                            y: scan.y,
                            src: scan.src,
                            dst,
                        });
                    }
                }
            }
        }
    }
    None
}
