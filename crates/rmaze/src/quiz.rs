//! The quizmaster: searches over the maze space for the port
//! configuration whose shortest path is longest.
//!
//! All three strategies share the candidate-port list (every flat index
//! that is not a normal-block self-loop), the pruning filters and the
//! solver, and differ only in how they walk the space.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::maze::Maze;
use crate::norm::{abstract_reachable, is_normalized, normalize};
use crate::solver::Solver;
use crate::state::State;
use crate::table::KeySet;

/// Number of priority buckets in the top-down search.
const STACK_BUCKETS: usize = 1000;

/// How many iterations pass between progress log lines.
const LOG_INTERVAL: u64 = 10_000;

/// Cooperative cancellation latch.
///
/// The random and top-down searches poll this between iterations; an
/// in-progress solve is never interrupted. The CLI wires it to Ctrl-C.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> CancelFlag {
        CancelFlag::default()
    }

    /// Latches the flag; there is no way to unlatch it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Parameters shared by the three search strategies.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    /// Terminal indices per direction.
    pub nterm: usize,
    /// Smallest number of active ports a candidate maze may have.
    pub min_ports: usize,
    /// Largest number of active ports a candidate maze may have; clamped
    /// to the candidate count.
    pub max_ports: usize,
    /// Stop as soon as a maze at least this long is found; 0 disables the
    /// cap.
    pub length_cap: u32,
    /// Solver used to score candidates.
    pub solver: Solver,
}

/// The best maze a search found, with its certificate.
#[derive(Debug, Clone)]
pub struct Best {
    pub maze: Maze,
    pub length: u32,
    pub path: Vec<State>,
}

/// Flat indices of every port that could appear on a path.
pub fn candidate_ports(maze: &Maze) -> Vec<usize> {
    (0..maze.port_count())
        .filter(|&index| !maze.is_self_loop(index))
        .collect()
}

/// Clones the maze and recomputes the full path for a new best.
///
/// The known length doubles as a warm-start bound, so the recomputation
/// finds the path in a single deepening iteration.
fn record_best(solver: &Solver, maze: &Maze, length: u32) -> Option<Best> {
    let found = solver.solve_from(maze, length)?;
    debug_assert_eq!(found.length, length);
    Some(Best {
        maze: maze.clone(),
        length: found.length,
        path: found.path,
    })
}

fn improves(best: &Option<Best>, length: u32) -> bool {
    best.as_ref().map_or(true, |best| length > best.length)
}

/// Exhaustive walk over all k-subsets of the candidate ports for each
/// k in `[min_ports, max_ports]`.
///
/// Candidates that are not their own canonical form are skipped; their
/// normalized twin is enumerated in its own slot.
pub fn exhaustive(params: &SearchParams) -> Option<Best> {
    let mut maze = Maze::new(params.nterm);
    let candidates = candidate_ports(&maze);
    let mut best = None;
    let mut evaluated = 0u64;
    let mut solved = 0u64;
    let mut pruned_normal_form = 0u64;
    let mut pruned_abstract = 0u64;
    for size in params.min_ports..=params.max_ports.min(candidates.len()) {
        let mut combination: Vec<usize> = (0..size).collect();
        loop {
            maze.clear();
            for &chosen in &combination {
                maze.set_flat(candidates[chosen], true);
            }
            evaluated += 1;
            if evaluated % LOG_INTERVAL == 0 {
                info!(
                    evaluated,
                    solved,
                    pruned_normal_form,
                    pruned_abstract,
                    best = best.as_ref().map_or(0, |best: &Best| best.length),
                    "exhaustive search progress"
                );
            }
            if !is_normalized(&maze) {
                pruned_normal_form += 1;
            } else if !abstract_reachable(&maze) {
                pruned_abstract += 1;
            } else {
                solved += 1;
                if let Some(length) = params.solver.length(&maze) {
                    if improves(&best, length) {
                        best = record_best(&params.solver, &maze, length);
                        info!(length, maze = %maze, "new best maze");
                        if params.length_cap > 0 && length >= params.length_cap {
                            return best;
                        }
                    }
                }
            }
            if !next_combination(&mut combination, candidates.len()) {
                break;
            }
        }
    }
    info!(
        evaluated,
        solved,
        pruned_normal_form,
        pruned_abstract,
        best = best.as_ref().map_or(0, |best: &Best| best.length),
        "exhaustive search finished"
    );
    best
}

/// Advances `combination` to the lexicographically next k-subset of
/// `[0..n)`. Returns `false` when the last subset has been passed.
fn next_combination(combination: &mut [usize], n: usize) -> bool {
    let size = combination.len();
    let mut position = size;
    while position > 0 {
        position -= 1;
        if combination[position] < n - size + position {
            combination[position] += 1;
            for follower in position + 1..size {
                combination[follower] = combination[follower - 1] + 1;
            }
            return true;
        }
    }
    false
}

/// Random sampling of candidate subsets until cancelled or the length cap
/// is reached.
///
/// No normalization prune here: random samples do not systematically
/// produce canonical twins the way lexicographic enumeration does.
pub fn random(params: &SearchParams, seed: u64, cancel: &CancelFlag) -> Option<Best> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut maze = Maze::new(params.nterm);
    let mut candidates = candidate_ports(&maze);
    if candidates.is_empty() {
        return None;
    }
    let max_ports = params.max_ports.min(candidates.len());
    let min_ports = params.min_ports.min(max_ports);
    let mut best = None;
    let mut iterations = 0u64;
    while !cancel.is_cancelled() {
        iterations += 1;
        if iterations % LOG_INTERVAL == 0 {
            info!(
                iterations,
                best = best.as_ref().map_or(0, |best: &Best| best.length),
                "random search progress"
            );
        }
        let size = rng.gen_range(min_ports..=max_ports);
        // Partial Fisher-Yates: only the first `size` positions matter.
        for position in 0..size {
            let other = rng.gen_range(position..candidates.len());
            candidates.swap(position, other);
        }
        maze.clear();
        for &port in &candidates[..size] {
            maze.set_flat(port, true);
        }
        if !abstract_reachable(&maze) {
            continue;
        }
        if let Some(length) = params.solver.length(&maze) {
            if improves(&best, length) {
                best = record_best(&params.solver, &maze, length);
                info!(length, maze = %maze, "new best maze");
                if params.length_cap > 0 && length >= params.length_cap {
                    break;
                }
            }
        }
    }
    best
}

/// Top-down port deletion from the fully connected maze.
///
/// Deleting a port cannot shorten the shortest path, so walking the
/// deletion lattice climbs toward longer paths. Children are keyed by
/// their normalized byte vector, which collapses symmetric twins into one
/// `seen` entry, and are bucketed by their parent's path length so long
/// parents are expanded first.
pub fn top_down(params: &SearchParams, cancel: &CancelFlag) -> Option<Best> {
    let mut maze = Maze::new(params.nterm);
    for port in candidate_ports(&maze) {
        maze.set_flat(port, true);
    }
    normalize(&mut maze);
    let mut stacks: Vec<Vec<Box<[u8]>>> = vec![Vec::new(); STACK_BUCKETS];
    let mut seen = KeySet::new();
    let root = maze.to_bytes().into_boxed_slice();
    seen.insert(&root);
    stacks[1].push(root);
    let mut scratch = maze.clone();
    let mut best = None;
    let mut expanded = 0u64;
    while !cancel.is_cancelled() {
        let Some(bucket) = (0..STACK_BUCKETS).rev().find(|&index| !stacks[index].is_empty())
        else {
            break;
        };
        let entry = stacks[bucket].pop().unwrap();
        maze.load_bytes(&entry);
        expanded += 1;
        if expanded % LOG_INTERVAL == 0 {
            info!(
                expanded,
                seen = seen.len(),
                best = best.as_ref().map_or(0, |best: &Best| best.length),
                "top-down search progress"
            );
        }
        let Some(length) = params.solver.length_from(&maze, bucket as u32) else {
            continue;
        };
        if improves(&best, length) {
            best = record_best(&params.solver, &maze, length);
            info!(length, maze = %maze, "new best maze");
            if params.length_cap > 0 && length >= params.length_cap {
                break;
            }
        }
        for port in maze.active_ports() {
            scratch.load_bytes(&entry);
            scratch.set_flat(port, false);
            normalize(&mut scratch);
            let child = scratch.to_bytes();
            if !seen.contains(&child) && abstract_reachable(&scratch) {
                seen.insert(&child);
                stacks[(length as usize).min(STACK_BUCKETS - 1)].push(child.into_boxed_slice());
            }
        }
        debug!(expanded, bucket, length, "expanded maze");
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::norm::is_normalized;
    use crate::solver::Strategy;

    fn params(nterm: usize, min_ports: usize, max_ports: usize, length_cap: u32) -> SearchParams {
        SearchParams {
            nterm,
            min_ports,
            max_ports,
            length_cap,
            solver: Solver::new(Strategy::Iddfs).with_max_depth(30),
        }
    }

    #[test]
    fn candidate_list_excludes_self_loops() {
        let maze = Maze::new(2);
        let candidates = candidate_ports(&maze);
        // (4N)² − 4N normal ports plus the two dense edge tables.
        assert_eq!(candidates.len(), 64 - 8 + 2 + 2);
        assert!(candidates.iter().all(|&index| !maze.is_self_loop(index)));
    }

    #[test]
    fn combinations_enumerate_in_lexicographic_order() {
        let mut combination = vec![0, 1];
        let mut all = vec![combination.clone()];
        while next_combination(&mut combination, 4) {
            all.push(combination.clone());
        }
        assert_eq!(
            all,
            [[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]]
        );
        let mut empty: Vec<usize> = Vec::new();
        assert!(!next_combination(&mut empty, 4));
    }

    #[test]
    fn exhaustive_small_case_finds_a_path() {
        let best = exhaustive(&params(2, 0, 2, 0)).unwrap();
        assert!(best.length >= 1);
        assert!(is_normalized(&best.maze));
        assert_eq!(best.path.len() as u32, best.length + 1);
        assert_eq!(best.path.first(), Some(&State::START));
        assert_eq!(best.path.last(), Some(&State::GOAL));
    }

    #[test]
    fn exhaustive_honors_length_cap() {
        let best = exhaustive(&params(2, 0, 2, 1)).unwrap();
        assert_eq!(best.length, 1);
    }

    #[test]
    fn random_returns_nothing_when_cancelled_up_front() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        assert!(random(&params(2, 1, 4, 0), 1, &cancel).is_none());
    }

    #[test]
    fn random_finds_a_path_under_a_cap() {
        let best = random(&params(2, 1, 4, 1), 42, &CancelFlag::new()).unwrap();
        assert!(best.length >= 1);
        assert_eq!(best.path.first(), Some(&State::START));
        assert_eq!(best.path.last(), Some(&State::GOAL));
    }

    #[test]
    fn top_down_finds_a_path_under_a_cap() {
        let best = top_down(&params(2, 0, 0, 1), &CancelFlag::new()).unwrap();
        assert!(best.length >= 1);
        assert_eq!(best.path.len() as u32, best.length + 1);
    }

    #[test]
    fn port_removal_never_shortens_the_path() {
        use std::str::FromStr;

        // Two routes to the goal: the direct port and a two-step detour.
        // The top-down warm start leans on exactly this property.
        let maze = Maze::from_str("normal: W0->W1, W0->E0, E0->W1").unwrap();
        let solver = Solver::new(Strategy::Iddfs).with_max_depth(30);
        let base = solver.length(&maze).unwrap();
        assert_eq!(base, 1);
        let mut lengthened = false;
        for port in maze.active_ports() {
            let mut shrunk = maze.clone();
            shrunk.set_flat(port, false);
            if let Some(length) = solver.length(&shrunk) {
                assert!(length >= base);
                lengthened |= length > base;
            }
        }
        // Deleting the direct port leaves only the detour.
        assert!(lengthened);

        // Removing the last route severs the goal instead of shortening.
        let direct = Maze::from_str("nx: E0->E1").unwrap();
        let mut severed = direct.clone();
        severed.set_flat(direct.active_ports().next().unwrap(), false);
        assert_eq!(solver.length(&severed), None);
    }

    #[test]
    fn cancel_flag_latches_across_clones() {
        let flag = CancelFlag::new();
        let shared = flag.clone();
        assert!(!flag.is_cancelled());
        shared.cancel();
        assert!(flag.is_cancelled());
    }
}
