//! Busy-beaver search over repeated mazes.
//!
//! A repeated maze is a port configuration shared by every block of an
//! infinitely tiled grid. This crate models the grid, solves for the
//! shortest start-to-goal path, and searches the space of mazes for the
//! configuration that makes that shortest path as long as possible.

pub mod maze;
pub mod norm;
pub mod quiz;
pub mod solver;
pub mod state;

mod table;

pub use maze::{detect_nterm, BlockKind, Dir, Maze, ParseMazeError, Terminal, MAX_NTERM};
pub use norm::{abstract_reachable, is_normalized, normalize};
pub use quiz::{candidate_ports, exhaustive, random, top_down, Best, CancelFlag, SearchParams};
pub use solver::{Solution, Solver, Strategy, DEFAULT_MAX_DEPTH};
pub use state::{connecting_port, format_path, Axis, PortStep, State};
