//! Command-line arguments for the repeated-maze searcher.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "rmaze", version, about = "Busy-beaver search over repeated mazes")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Solve a maze given in the textual port format
    Solve {
        /// Maze description; read from standard input when omitted
        maze: Option<String>,

        /// Terminal indices per direction; detected from the input when
        /// omitted
        #[arg(long)]
        nterm: Option<usize>,

        /// Use breadth-first search instead of iterative deepening
        #[arg(long)]
        bfs: bool,

        /// Depth ceiling for iterative deepening
        #[arg(long, default_value_t = rmaze::DEFAULT_MAX_DEPTH)]
        max_depth: u32,

        /// Also print the per-step port annotation and the port matrix
        #[arg(short, long)]
        verbose: bool,
    },

    /// Search the maze space for the longest shortest path
    Search {
        /// Terminal indices per direction
        #[arg(long)]
        nterm: usize,

        /// Smallest number of active ports per candidate maze
        #[arg(long = "min-aport", default_value_t = 0)]
        min_aport: usize,

        /// Largest number of active ports per candidate maze; defaults to
        /// every candidate port
        #[arg(long = "max-aport")]
        max_aport: Option<usize>,

        /// Stop once a path at least this long is found (0 = no cap)
        #[arg(long = "max-len", default_value_t = 0)]
        max_len: u32,

        /// Use breadth-first search instead of iterative deepening
        #[arg(long)]
        bfs: bool,

        /// Top-down port deletion from the fully connected maze
        #[arg(long, conflicts_with = "random")]
        topdown: bool,

        /// Random sampling with the given seed
        #[arg(long)]
        random: Option<u64>,
    },

    /// Print the canonical form of a maze
    Norm {
        /// Maze description; read from standard input when omitted
        maze: Option<String>,

        /// Terminal indices per direction; detected from the input when
        /// omitted
        #[arg(long)]
        nterm: Option<usize>,
    },
}
