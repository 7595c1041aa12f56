//! The maze store: three shared port tables over an infinitely tiled block
//! grid, plus the textual format used at the tool boundary.
//!
//! Every block at (x>0, y>0) shares the `normal` table, every block on the
//! west edge (x=0) shares the `nx` table and every block on the south edge
//! (y=0) shares the `ny` table, so a maze is fully described by three byte
//! arrays regardless of how far a path wanders.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

/// The largest supported number of terminal indices per direction.
///
/// The abstract reachability filter packs the 2N terminal classes into a
/// single 64-bit word, which bounds N at 32.
pub const MAX_NTERM: usize = 32;

/// Terminal direction on a block boundary.
///
/// The discriminants fix the source-major ordering of the normal port
/// table: E rows first, then W, N, S.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dir {
    East = 0,
    West = 1,
    North = 2,
    South = 3,
}

impl Dir {
    /// All directions in port-table row order.
    pub const ALL: [Dir; 4] = [Dir::East, Dir::West, Dir::North, Dir::South];

    /// Returns the row index of this direction in the normal port table.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the single-letter name used by the textual format.
    #[inline]
    pub const fn letter(self) -> char {
        match self {
            Dir::East => 'E',
            Dir::West => 'W',
            Dir::North => 'N',
            Dir::South => 'S',
        }
    }

    /// Parses a direction letter, case-insensitively.
    fn from_letter(letter: char) -> Option<Dir> {
        match letter.to_ascii_uppercase() {
            'E' => Some(Dir::East),
            'W' => Some(Dir::West),
            'N' => Some(Dir::North),
            'S' => Some(Dir::South),
            _ => None,
        }
    }
}

/// A named connection point on the boundary of a block, identified by its
/// direction and index within that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminal {
    pub dir: Dir,
    pub index: usize,
}

impl Terminal {
    /// Creates a terminal from a direction and index.
    #[inline]
    pub const fn new(dir: Dir, index: usize) -> Terminal {
        Terminal { dir, index }
    }

    /// Recovers a terminal from its number in a normal block's `0..4N`
    /// source-major numbering.
    #[inline]
    pub const fn from_number(number: usize, nterm: usize) -> Terminal {
        Terminal {
            dir: Dir::ALL[number / nterm],
            index: number % nterm,
        }
    }

    /// Returns this terminal's number in a normal block's `0..4N`
    /// numbering.
    #[inline]
    pub const fn number(self, nterm: usize) -> usize {
        self.dir.index() * nterm + self.index
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.dir.letter(), self.index)
    }
}

/// The kind of block occupying a grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Interior block with all four terminal directions.
    Normal,
    /// West-edge block (x = 0) with only E terminals.
    Nx,
    /// South-edge block (y = 0) with only N terminals.
    Ny,
}

impl BlockKind {
    /// Returns the block kind at a grid position, or `None` for the
    /// excluded origin (0,0).
    #[inline]
    pub const fn at(x: u32, y: u32) -> Option<BlockKind> {
        match (x, y) {
            (0, 0) => None,
            (0, _) => Some(BlockKind::Nx),
            (_, 0) => Some(BlockKind::Ny),
            _ => Some(BlockKind::Normal),
        }
    }

    /// Returns `true` if blocks of this kind expose terminals in the given
    /// direction.
    #[inline]
    pub const fn has_dir(self, dir: Dir) -> bool {
        match self {
            BlockKind::Normal => true,
            BlockKind::Nx => matches!(dir, Dir::East),
            BlockKind::Ny => matches!(dir, Dir::North),
        }
    }
}

/// A repeated maze: the port configuration shared by all blocks of each
/// kind.
///
/// Ports are stored one byte per slot (0 = absent, 1 = present) so the
/// whole maze can be exported as a flat byte key. The flat index space
/// concatenates {normal, nx, ny}.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maze {
    nterm: usize,
    normal: Vec<u8>,
    nx: Vec<u8>,
    ny: Vec<u8>,
}

impl Maze {
    /// Creates a maze with the given number of terminal indices per
    /// direction and no active ports.
    ///
    /// # Panics
    ///
    /// Panics if `nterm` exceeds [`MAX_NTERM`].
    pub fn new(nterm: usize) -> Maze {
        assert!(nterm <= MAX_NTERM, "nterm {nterm} exceeds {MAX_NTERM}");
        let edge = nterm * nterm.saturating_sub(1);
        Maze {
            nterm,
            normal: vec![0; (4 * nterm) * (4 * nterm)],
            nx: vec![0; edge],
            ny: vec![0; edge],
        }
    }

    /// Returns the number of terminal indices per direction.
    #[inline]
    pub const fn nterm(&self) -> usize {
        self.nterm
    }

    /// Returns the number of slots in the normal port table.
    #[inline]
    pub fn normal_len(&self) -> usize {
        self.normal.len()
    }

    /// Returns the number of slots in each edge (nx / ny) port table.
    #[inline]
    pub fn edge_len(&self) -> usize {
        self.nx.len()
    }

    /// Returns the total number of flat port slots.
    #[inline]
    pub fn port_count(&self) -> usize {
        self.normal.len() + self.nx.len() + self.ny.len()
    }

    /// Slot of a normal-block port in the `(4N)²` table.
    #[inline]
    fn normal_slot(&self, src: Terminal, dst: Terminal) -> usize {
        src.number(self.nterm) * 4 * self.nterm + dst.number(self.nterm)
    }

    /// Slot of an edge-block port in the dense `N(N−1)` table.
    ///
    /// Rows are indexed by source; the destination column skips the
    /// diagonal, which keeps the self-loop-free table contiguous.
    #[inline]
    fn edge_slot(&self, src: usize, dst: usize) -> usize {
        debug_assert_ne!(src, dst);
        src * (self.nterm - 1) + if dst < src { dst } else { dst - 1 }
    }

    /// Returns whether the normal-block port from `src` to `dst` is
    /// active.
    #[inline]
    pub fn normal(&self, src: Terminal, dst: Terminal) -> bool {
        self.normal[self.normal_slot(src, dst)] != 0
    }

    /// Sets the normal-block port from `src` to `dst`.
    #[inline]
    pub fn set_normal(&mut self, src: Terminal, dst: Terminal, active: bool) {
        let slot = self.normal_slot(src, dst);
        self.normal[slot] = u8::from(active);
    }

    /// Returns whether the nx-block port from `E[src]` to `E[dst]` is
    /// active.
    #[inline]
    pub fn nx(&self, src: usize, dst: usize) -> bool {
        self.nx[self.edge_slot(src, dst)] != 0
    }

    /// Sets the nx-block port from `E[src]` to `E[dst]`.
    #[inline]
    pub fn set_nx(&mut self, src: usize, dst: usize, active: bool) {
        let slot = self.edge_slot(src, dst);
        self.nx[slot] = u8::from(active);
    }

    /// Returns whether the ny-block port from `N[src]` to `N[dst]` is
    /// active.
    #[inline]
    pub fn ny(&self, src: usize, dst: usize) -> bool {
        self.ny[self.edge_slot(src, dst)] != 0
    }

    /// Sets the ny-block port from `N[src]` to `N[dst]`.
    #[inline]
    pub fn set_ny(&mut self, src: usize, dst: usize, active: bool) {
        let slot = self.edge_slot(src, dst);
        self.ny[slot] = u8::from(active);
    }

    /// Returns whether the port at a flat index is active.
    #[inline]
    pub fn flat(&self, index: usize) -> bool {
        self.flat_slot(index) != 0
    }

    /// Sets the port at a flat index.
    #[inline]
    pub fn set_flat(&mut self, index: usize, active: bool) {
        *self.flat_slot_mut(index) = u8::from(active);
    }

    /// Toggles the port at a flat index.
    #[inline]
    pub fn flip_flat(&mut self, index: usize) {
        let slot = self.flat_slot_mut(index);
        *slot ^= 1;
    }

    #[inline]
    fn flat_slot(&self, index: usize) -> u8 {
        let (normal, edge) = (self.normal.len(), self.nx.len());
        if index < normal {
            self.normal[index]
        } else if index < normal + edge {
            self.nx[index - normal]
        } else {
            self.ny[index - normal - edge]
        }
    }

    #[inline]
    fn flat_slot_mut(&mut self, index: usize) -> &mut u8 {
        let (normal, edge) = (self.normal.len(), self.nx.len());
        if index < normal {
            &mut self.normal[index]
        } else if index < normal + edge {
            &mut self.nx[index - normal]
        } else {
            &mut self.ny[index - normal - edge]
        }
    }

    /// Describes the port at a flat index as its block kind and terminal
    /// pair.
    pub fn describe_flat(&self, index: usize) -> (BlockKind, Terminal, Terminal) {
        let (normal, edge) = (self.normal.len(), self.nx.len());
        if index < normal {
            let src = Terminal::from_number(index / (4 * self.nterm), self.nterm);
            let dst = Terminal::from_number(index % (4 * self.nterm), self.nterm);
            (BlockKind::Normal, src, dst)
        } else {
            let (kind, dir, offset) = if index < normal + edge {
                (BlockKind::Nx, Dir::East, index - normal)
            } else {
                (BlockKind::Ny, Dir::North, index - normal - edge)
            };
            let src = offset / (self.nterm - 1);
            let column = offset % (self.nterm - 1);
            let dst = if column < src { column } else { column + 1 };
            (kind, Terminal::new(dir, src), Terminal::new(dir, dst))
        }
    }

    /// Returns `true` if the flat index names a normal-block self-loop
    /// (`Ti→Ti`), which can never contribute to a path.
    ///
    /// The edge tables are self-loop-free by construction, so indices in
    /// the nx / ny ranges always return `false`.
    #[inline]
    pub fn is_self_loop(&self, index: usize) -> bool {
        index < self.normal.len() && index / (4 * self.nterm) == index % (4 * self.nterm)
    }

    /// Deactivates every port.
    pub fn clear(&mut self) {
        self.normal.fill(0);
        self.nx.fill(0);
        self.ny.fill(0);
    }

    /// Returns the flat `{normal || nx || ny}` byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.port_count());
        bytes.extend_from_slice(&self.normal);
        bytes.extend_from_slice(&self.nx);
        bytes.extend_from_slice(&self.ny);
        bytes
    }

    /// Replaces the port configuration with the given flat byte vector.
    ///
    /// Any nonzero byte activates its slot.
    ///
    /// # Panics
    ///
    /// Panics if `bytes.len()` differs from [`Maze::port_count`].
    pub fn load_bytes(&mut self, bytes: &[u8]) {
        assert_eq!(bytes.len(), self.port_count());
        let (normal, edge) = (self.normal.len(), self.nx.len());
        for (slot, &byte) in self.normal.iter_mut().zip(&bytes[..normal]) {
            *slot = u8::from(byte != 0);
        }
        for (slot, &byte) in self.nx.iter_mut().zip(&bytes[normal..normal + edge]) {
            *slot = u8::from(byte != 0);
        }
        for (slot, &byte) in self.ny.iter_mut().zip(&bytes[normal + edge..]) {
            *slot = u8::from(byte != 0);
        }
    }

    /// Iterates over the flat indices of all active ports.
    pub fn active_ports(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.port_count()).filter(|&index| self.flat(index))
    }

    /// Returns the number of active ports.
    pub fn count_active(&self) -> usize {
        self.active_ports().count()
    }

    /// Resets every slot to an independent Bernoulli(½) draw from `rng`.
    pub fn randomize<R: Rng>(&mut self, rng: &mut R) {
        for slot in self
            .normal
            .iter_mut()
            .chain(self.nx.iter_mut())
            .chain(self.ny.iter_mut())
        {
            *slot = u8::from(rng.gen::<bool>());
        }
    }

    /// Parses the textual port format with an explicit `nterm`.
    ///
    /// Entries whose indices fall outside `0..nterm`, edge entries with
    /// mismatched directions and edge self-loops are dropped silently; a
    /// missing section is treated as empty.
    pub fn parse_with_nterm(text: &str, nterm: usize) -> Result<Maze, ParseMazeError> {
        let mut maze = Maze::new(nterm);
        for section in text.split(';') {
            let section = section.trim();
            if section.is_empty() {
                continue;
            }
            let (name, body) = section
                .split_once(':')
                .ok_or_else(|| ParseMazeError::MalformedSection(section.to_string()))?;
            let kind = match name.trim().to_ascii_lowercase().as_str() {
                "normal" => BlockKind::Normal,
                "nx" => BlockKind::Nx,
                "ny" => BlockKind::Ny,
                other => return Err(ParseMazeError::UnknownSection(other.to_string())),
            };
            let body = body.trim();
            if body.is_empty() || body == "(none)" {
                continue;
            }
            for entry in body.split(',') {
                let (src, dst) = parse_entry(entry)?;
                maze.apply_entry(kind, src, dst);
            }
        }
        Ok(maze)
    }

    /// Activates a parsed port entry if the section can hold it.
    fn apply_entry(&mut self, kind: BlockKind, src: Terminal, dst: Terminal) {
        if src.index >= self.nterm || dst.index >= self.nterm {
            return;
        }
        match kind {
            BlockKind::Normal => self.set_normal(src, dst, true),
            BlockKind::Nx => {
                if src.dir == Dir::East && dst.dir == Dir::East && src.index != dst.index {
                    self.set_nx(src.index, dst.index, true);
                }
            }
            BlockKind::Ny => {
                if src.dir == Dir::North && dst.dir == Dir::North && src.index != dst.index {
                    self.set_ny(src.index, dst.index, true);
                }
            }
        }
    }

}

fn write_section(
    f: &mut fmt::Formatter<'_>,
    entries: impl Iterator<Item = (Terminal, Terminal)>,
) -> fmt::Result {
    let mut first = true;
    for (src, dst) in entries {
        if !first {
            f.write_str(", ")?;
        }
        write!(f, "{src}->{dst}")?;
        first = false;
    }
    if first {
        f.write_str("(none)")?;
    }
    Ok(())
}

/// A failure to parse the textual maze format.
///
/// Only structural problems are errors; entries the maze cannot hold are
/// dropped silently so round-tripped strings stay editable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseMazeError {
    /// A section without a `name:` prefix.
    #[error("malformed section: {0:?}")]
    MalformedSection(String),
    /// A section name other than `normal`, `nx` or `ny`.
    #[error("unknown section name: {0:?}")]
    UnknownSection(String),
    /// A port entry that does not match `<dir><digits>-><dir><digits>`.
    #[error("malformed port entry: {0:?}")]
    MalformedPort(String),
}

/// Parses one `<dir><digits>-><dir><digits>` entry.
fn parse_entry(entry: &str) -> Result<(Terminal, Terminal), ParseMazeError> {
    let malformed = || ParseMazeError::MalformedPort(entry.trim().to_string());
    let (src, dst) = entry.split_once("->").ok_or_else(malformed)?;
    Ok((
        parse_terminal(src).ok_or_else(malformed)?,
        parse_terminal(dst).ok_or_else(malformed)?,
    ))
}

fn parse_terminal(token: &str) -> Option<Terminal> {
    let token = token.trim();
    let mut chars = token.chars();
    let dir = Dir::from_letter(chars.next()?)?;
    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    Some(Terminal::new(dir, digits.parse().ok()?))
}

/// Detects `nterm` from a maze string: one more than the largest terminal
/// index mentioned, and never less than 2.
pub fn detect_nterm(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut max_index = None;
    let mut position = 0;
    while position < bytes.len() {
        if Dir::from_letter(bytes[position] as char).is_some() {
            let mut end = position + 1;
            let mut value = None;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                value = Some(value.unwrap_or(0) * 10 + usize::from(bytes[end] - b'0'));
                end += 1;
            }
            if let Some(value) = value {
                max_index = Some(max_index.map_or(value, |max: usize| max.max(value)));
            }
            position = end;
        } else {
            position += 1;
        }
    }
    max_index.map_or(2, |max| (max + 1).max(2))
}

impl FromStr for Maze {
    type Err = ParseMazeError;

    fn from_str(s: &str) -> Result<Maze, ParseMazeError> {
        Maze::parse_with_nterm(s, detect_nterm(s))
    }
}

impl fmt::Display for Maze {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms = 4 * self.nterm;
        f.write_str("normal: ")?;
        write_section(
            f,
            (0..terms)
                .flat_map(|src| (0..terms).map(move |dst| (src, dst)))
                .filter(|&(src, dst)| self.normal[src * terms + dst] != 0)
                .map(|(src, dst)| {
                    (
                        Terminal::from_number(src, self.nterm),
                        Terminal::from_number(dst, self.nterm),
                    )
                }),
        )?;
        for (name, dir, table) in [("nx", Dir::East, &self.nx), ("ny", Dir::North, &self.ny)] {
            write!(f, "; {name}: ")?;
            write_section(
                f,
                (0..self.nterm)
                    .flat_map(|src| (0..self.nterm).map(move |dst| (src, dst)))
                    .filter(|&(src, dst)| src != dst && table[self.edge_slot(src, dst)] != 0)
                    .map(|(src, dst)| (Terminal::new(dir, src), Terminal::new(dir, dst))),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_case::test_case;

    use super::*;

    #[test]
    fn terminal_numbering() {
        let nterm = 2;
        assert_eq!(Terminal::new(Dir::East, 0).number(nterm), 0);
        assert_eq!(Terminal::new(Dir::West, 1).number(nterm), 3);
        assert_eq!(Terminal::new(Dir::South, 1).number(nterm), 7);
        for number in 0..4 * nterm {
            assert_eq!(Terminal::from_number(number, nterm).number(nterm), number);
        }
    }

    #[test]
    fn edge_slots_are_dense() {
        let maze = Maze::new(3);
        // Row for source 1 skips the diagonal: destinations 0 and 2 pack
        // into columns 0 and 1.
        assert_eq!(maze.edge_slot(1, 0), 2);
        assert_eq!(maze.edge_slot(1, 2), 3);
        let mut seen = vec![false; maze.edge_len()];
        for src in 0..3 {
            for dst in 0..3 {
                if src != dst {
                    let slot = maze.edge_slot(src, dst);
                    assert!(!seen[slot]);
                    seen[slot] = true;
                }
            }
        }
        assert!(seen.into_iter().all(|slot| slot));
    }

    #[test]
    fn flat_round_trip() {
        let mut maze = Maze::new(2);
        let indices = [0, 19, maze.normal_len(), maze.port_count() - 1];
        for &index in &indices {
            maze.set_flat(index, true);
        }
        assert_eq!(maze.active_ports().collect::<Vec<_>>(), indices);
        for &index in &indices {
            let (kind, src, dst) = maze.describe_flat(index);
            match kind {
                BlockKind::Normal => assert!(maze.normal(src, dst)),
                BlockKind::Nx => assert!(maze.nx(src.index, dst.index)),
                BlockKind::Ny => assert!(maze.ny(src.index, dst.index)),
            }
        }
        maze.flip_flat(19);
        assert!(!maze.flat(19));
        maze.clear();
        assert_eq!(maze.count_active(), 0);
    }

    #[test]
    fn describe_flat_inverts_edge_packing() {
        let maze = Maze::new(3);
        let base = maze.normal_len() + maze.edge_len();
        for src in 0..3 {
            for dst in 0..3 {
                if src != dst {
                    let (kind, s, d) = maze.describe_flat(base + maze.edge_slot(src, dst));
                    assert_eq!(kind, BlockKind::Ny);
                    assert_eq!((s.index, d.index), (src, dst));
                }
            }
        }
    }

    #[test]
    fn bytes_round_trip() {
        let mut maze = Maze::new(2);
        maze.set_normal(Terminal::new(Dir::West, 0), Terminal::new(Dir::East, 1), true);
        maze.set_nx(0, 1, true);
        let bytes = maze.to_bytes();
        assert_eq!(bytes.len(), maze.port_count());
        let mut copy = Maze::new(2);
        copy.load_bytes(&bytes);
        assert_eq!(copy, maze);
    }

    #[test]
    fn self_loop_detection() {
        let maze = Maze::new(2);
        for term in 0..8 {
            assert!(maze.is_self_loop(term * 8 + term));
        }
        assert!(!maze.is_self_loop(1));
        assert!(!maze.is_self_loop(maze.normal_len()));
        assert!(!maze.is_self_loop(maze.port_count() - 1));
    }

    #[test]
    fn parse_print_round_trip() {
        let text = "normal: E0->N1, W0->S1; nx: E0->E1; ny: (none)";
        let maze = Maze::from_str(text).unwrap();
        assert_eq!(maze.nterm(), 2);
        assert_eq!(maze.to_string(), text);
        let reparsed = Maze::from_str(&maze.to_string()).unwrap();
        assert_eq!(reparsed, maze);
    }

    #[test]
    fn parse_is_whitespace_and_case_tolerant() {
        let maze = Maze::parse_with_nterm("Normal: e0 -> n1 ; NX: E0->E1", 2).unwrap();
        assert!(maze.normal(Terminal::new(Dir::East, 0), Terminal::new(Dir::North, 1)));
        assert!(maze.nx(0, 1));
    }

    #[test]
    fn parse_drops_entries_the_section_cannot_hold() {
        // Out-of-range indices, edge self-loops and direction kinds an
        // edge section cannot hold all vanish silently.
        let maze =
            Maze::parse_with_nterm("normal: E5->N1; nx: E0->E0, W0->W1, E0->N1; ny: N1->N1", 2)
                .unwrap();
        assert_eq!(maze.count_active(), 0);
    }

    #[test]
    fn missing_sections_are_empty() {
        let maze = Maze::parse_with_nterm("nx: E0->E1", 2).unwrap();
        assert_eq!(maze.count_active(), 1);
        assert!(maze.nx(0, 1));
    }

    #[test_case("normal: E0=>N1" ; "bad arrow")]
    #[test_case("normal: EX->N1" ; "bad digits")]
    #[test_case("normal E0->N1" ; "missing colon")]
    #[test_case("foo: E0->N1" ; "unknown section")]
    fn parse_rejects(text: &str) {
        assert!(Maze::parse_with_nterm(text, 2).is_err());
    }

    #[test_case("normal: (none); nx: (none); ny: (none)", 2)]
    #[test_case("normal: E0->N1, W0->S1; nx: E0->E1; ny: (none)", 2)]
    #[test_case("ny: N4->N2", 5)]
    #[test_case("", 2)]
    fn nterm_detection(text: &str, expected: usize) {
        assert_eq!(detect_nterm(text), expected);
    }

    #[test]
    fn randomize_is_deterministic_per_seed() {
        let mut first = Maze::new(2);
        let mut second = Maze::new(2);
        first.randomize(&mut StdRng::seed_from_u64(7));
        second.randomize(&mut StdRng::seed_from_u64(7));
        assert_eq!(first, second);
        assert!(first.count_active() > 0);
    }
}
