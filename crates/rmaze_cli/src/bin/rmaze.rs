use std::io::Read;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rmaze::{
    detect_nterm, format_path, normalize, CancelFlag, Maze, SearchParams, Solver, Strategy,
    MAX_NTERM,
};
use rmaze_cli::args::{Args, Command};
use rmaze_cli::render;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match Args::parse().command {
        Command::Solve {
            maze,
            nterm,
            bfs,
            max_depth,
            verbose,
        } => {
            let maze = read_maze(maze, nterm)?;
            let solver = Solver::new(strategy(bfs)).with_max_depth(max_depth);
            match solver.solve(&maze) {
                Some(found) => {
                    println!("length: {}", found.length);
                    println!("path: {}", format_path(&found.path));
                    if verbose {
                        print!("{}", render::verbose_path(&maze, &found.path));
                        print!("{}", render::port_matrix(&maze));
                    }
                }
                None => println!("no path"),
            }
        }
        Command::Search {
            nterm,
            min_aport,
            max_aport,
            max_len,
            bfs,
            topdown,
            random,
        } => {
            let params = SearchParams {
                nterm: check_nterm(nterm)?,
                min_ports: min_aport,
                max_ports: max_aport.unwrap_or(usize::MAX),
                length_cap: max_len,
                solver: Solver::new(strategy(bfs)),
            };
            let best = if let Some(seed) = random {
                rmaze::random(&params, seed, &interruptible()?)
            } else if topdown {
                rmaze::top_down(&params, &interruptible()?)
            } else {
                rmaze::exhaustive(&params)
            };
            match best {
                Some(best) => {
                    println!("{}", best.maze);
                    println!("length: {}", best.length);
                    println!("path: {}", format_path(&best.path));
                }
                None => println!("no maze with a valid path found"),
            }
        }
        Command::Norm { maze, nterm } => {
            let mut maze = read_maze(maze, nterm)?;
            normalize(&mut maze);
            println!("{maze}");
        }
    }
    Ok(())
}

const fn strategy(bfs: bool) -> Strategy {
    if bfs {
        Strategy::Bfs
    } else {
        Strategy::Iddfs
    }
}

fn check_nterm(nterm: usize) -> Result<usize> {
    if !(2..=MAX_NTERM).contains(&nterm) {
        bail!("nterm must be between 2 and {MAX_NTERM}, got {nterm}");
    }
    Ok(nterm)
}

/// Reads a maze from the argument or, when absent, standard input.
fn read_maze(argument: Option<String>, nterm: Option<usize>) -> Result<Maze> {
    let text = match argument {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read a maze from standard input")?;
            buffer
        }
    };
    let nterm = match nterm {
        Some(nterm) => check_nterm(nterm)?,
        None => detect_nterm(&text),
    };
    if nterm > MAX_NTERM {
        bail!("the maze mentions terminal indices beyond the supported {MAX_NTERM}");
    }
    Maze::parse_with_nterm(&text, nterm).context("failed to parse the maze description")
}

/// Latches the cancellation flag on the first interactive interrupt so a
/// long search returns its best-so-far instead of dying.
fn interruptible() -> Result<CancelFlag> {
    let cancel = CancelFlag::new();
    let handle = cancel.clone();
    ctrlc::set_handler(move || {
        info!("interrupt received; finishing the current iteration");
        handle.cancel();
    })
    .context("failed to install the interrupt handler")?;
    Ok(cancel)
}
