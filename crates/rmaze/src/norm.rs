//! Canonical-form normalization and the cheap pruning filters that run
//! before a solve.
//!
//! Two independent index symmetries leave the start/goal-reaching
//! property of a maze untouched: E/W indices may be permuted as long as 0
//! and 1 stay fixed (they name the start and goal), and N/S indices may
//! be permuted freely. Normalization relabels indices by first appearance
//! in flat port order, producing one representative per symmetry class.

use crate::maze::{Dir, Maze, Terminal};

const UNMAPPED: usize = usize::MAX;

/// Relabels the maze in place to the canonical representative of its
/// symmetry class.
pub fn normalize(maze: &mut Maze) {
    let nterm = maze.nterm();
    if nterm < 2 {
        return;
    }
    let mut ew_map = vec![UNMAPPED; nterm];
    let mut ns_map = vec![UNMAPPED; nterm];
    ew_map[0] = 0;
    ew_map[1] = 1;
    let mut next_ew = 2;
    let mut next_ns = 0;

    let mut record = |terminal: Terminal| match terminal.dir {
        Dir::East | Dir::West => assign(&mut ew_map, &mut next_ew, terminal.index),
        Dir::North | Dir::South => assign(&mut ns_map, &mut next_ns, terminal.index),
    };
    for src in 0..4 * nterm {
        for dst in 0..4 * nterm {
            let src = Terminal::from_number(src, nterm);
            let dst = Terminal::from_number(dst, nterm);
            if maze.normal(src, dst) {
                record(src);
                record(dst);
            }
        }
    }
    for (src, dst) in edge_pairs(nterm) {
        if maze.nx(src, dst) {
            assign(&mut ew_map, &mut next_ew, src);
            assign(&mut ew_map, &mut next_ew, dst);
        }
    }
    for (src, dst) in edge_pairs(nterm) {
        if maze.ny(src, dst) {
            assign(&mut ns_map, &mut next_ns, src);
            assign(&mut ns_map, &mut next_ns, dst);
        }
    }
    // Unused indices still get canonical labels.
    for index in 0..nterm {
        assign(&mut ew_map, &mut next_ew, index);
        assign(&mut ns_map, &mut next_ns, index);
    }

    let remap = |terminal: Terminal| {
        let index = match terminal.dir {
            Dir::East | Dir::West => ew_map[terminal.index],
            Dir::North | Dir::South => ns_map[terminal.index],
        };
        Terminal::new(terminal.dir, index)
    };
    let old = maze.clone();
    maze.clear();
    for src in 0..4 * nterm {
        for dst in 0..4 * nterm {
            let src = Terminal::from_number(src, nterm);
            let dst = Terminal::from_number(dst, nterm);
            if old.normal(src, dst) {
                maze.set_normal(remap(src), remap(dst), true);
            }
        }
    }
    for (src, dst) in edge_pairs(nterm) {
        if old.nx(src, dst) {
            maze.set_nx(ew_map[src], ew_map[dst], true);
        }
        if old.ny(src, dst) {
            maze.set_ny(ns_map[src], ns_map[dst], true);
        }
    }
}

/// Returns `true` if the maze already is its own canonical form.
pub fn is_normalized(maze: &Maze) -> bool {
    let mut candidate = maze.clone();
    normalize(&mut candidate);
    candidate == *maze
}

fn assign(map: &mut [usize], next: &mut usize, index: usize) {
    if map[index] == UNMAPPED {
        map[index] = *next;
        *next += 1;
    }
}

/// Edge-table (src, dst) pairs in slot order.
fn edge_pairs(nterm: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..nterm).flat_map(move |src| {
        (0..nterm)
            .filter(move |&dst| dst != src)
            .map(move |dst| (src, dst))
    })
}

/// Necessary condition for the goal to be reachable: reachability in the
/// 2N-node graph of terminal-index classes.
///
/// Node `i` stands for the E/W class with index i (a canonical state on
/// the E axis can traverse both E[i] and W[i] ports), node `N+i` for the
/// N/S class. All position information is discarded, so a reachable
/// class-path proves nothing; only a *missing* one does. Class 0 is the
/// start, class 1 the goal.
pub fn abstract_reachable(maze: &Maze) -> bool {
    let nterm = maze.nterm();
    if nterm < 2 {
        return false;
    }
    let class = |terminal: Terminal| match terminal.dir {
        Dir::East | Dir::West => terminal.index,
        Dir::North | Dir::South => nterm + terminal.index,
    };
    let mut adjacency = vec![0u64; 2 * nterm];
    for src in 0..4 * nterm {
        for dst in 0..4 * nterm {
            let src = Terminal::from_number(src, nterm);
            let dst = Terminal::from_number(dst, nterm);
            if maze.normal(src, dst) {
                adjacency[class(src)] |= 1 << class(dst);
            }
        }
    }
    for (src, dst) in edge_pairs(nterm) {
        if maze.nx(src, dst) {
            adjacency[src] |= 1 << dst;
        }
        if maze.ny(src, dst) {
            adjacency[nterm + src] |= 1 << (nterm + dst);
        }
    }

    // Bitmask BFS from class 0 until the frontier stops growing.
    let mut reachable: u64 = 1;
    loop {
        let mut expanded = reachable;
        let mut frontier = reachable;
        while frontier != 0 {
            let node = frontier.trailing_zeros() as usize;
            frontier &= frontier - 1;
            expanded |= adjacency[node];
        }
        if expanded == reachable {
            return reachable & 0b10 != 0;
        }
        reachable = expanded;
    }
}
