//! Human-readable renderers for mazes and paths.
//!
//! Everything here consumes the core types through their public API and
//! produces plain text; the core never calls back into this module.

use std::fmt::Write;

use itertools::Itertools;
use rmaze::{connecting_port, format_path, Dir, Maze, State, Terminal};

/// Renders the three port tables as matrices with `*` for present and
/// `.` for absent, rows being source terminals and columns destinations.
pub fn port_matrix(maze: &Maze) -> String {
    let nterm = maze.nterm();
    let normal_labels: Vec<String> = (0..4 * nterm)
        .map(|number| Terminal::from_number(number, nterm).to_string())
        .collect();
    let nx_labels: Vec<String> = (0..nterm)
        .map(|index| Terminal::new(Dir::East, index).to_string())
        .collect();
    let ny_labels: Vec<String> = (0..nterm)
        .map(|index| Terminal::new(Dir::North, index).to_string())
        .collect();

    let mut out = String::new();
    matrix_section(&mut out, "normal", &normal_labels, |src, dst| {
        maze.normal(
            Terminal::from_number(src, nterm),
            Terminal::from_number(dst, nterm),
        )
    });
    out.push('\n');
    matrix_section(&mut out, "nx", &nx_labels, |src, dst| {
        src != dst && maze.nx(src, dst)
    });
    out.push('\n');
    matrix_section(&mut out, "ny", &ny_labels, |src, dst| {
        src != dst && maze.ny(src, dst)
    });
    out
}

fn matrix_section(
    out: &mut String,
    name: &str,
    labels: &[String],
    active: impl Fn(usize, usize) -> bool,
) {
    let width = labels.iter().map(String::len).max().unwrap_or(2);
    let _ = writeln!(out, "{name}:");
    let _ = write!(out, "{:width$}", "");
    for label in labels {
        let _ = write!(out, " {label:>width$}");
    }
    out.push('\n');
    for (src, label) in labels.iter().enumerate() {
        let _ = write!(out, "{label:>width$}");
        for dst in 0..labels.len() {
            let mark = if active(src, dst) { '*' } else { '.' };
            let _ = write!(out, " {mark:>width$}");
        }
        out.push('\n');
    }
}

/// Annotates each step of a path with the block and port it traverses.
pub fn verbose_path(maze: &Maze, path: &[State]) -> String {
    let mut out = String::new();
    for (number, (from, to)) in path.iter().tuple_windows().enumerate() {
        let step = match connecting_port(maze, *from, *to) {
            Some(step) => format!(
                "block ({},{}) port {}->{}",
                step.x, step.y, step.src, step.dst
            ),
            None => "no matching port".to_string(),
        };
        let _ = writeln!(out, "step {}: {from} -> {to} via {step}", number + 1);
    }
    if out.is_empty() {
        let _ = writeln!(out, "{}", format_path(path));
    }
    out
}
