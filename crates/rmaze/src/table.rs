//! Fixed-seed open-addressing tables for the solver and the top-down
//! dedup set.
//!
//! Both tables use power-of-two capacities with linear probing and grow at
//! a load factor of ½. The hashers are hand-rolled so lookups stay cheap
//! and reproducible across runs.

use crate::state::State;

const INITIAL_CAPACITY: usize = 1 << 10;

/// FNV-1a over the four state fields in a fixed order.
fn hash_state(state: &State) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for field in [state.x, state.y, state.axis as u32, state.index] {
        for byte in field.to_le_bytes() {
            hash = (hash ^ u64::from(byte)).wrapping_mul(PRIME);
        }
    }
    hash
}

/// An open-addressing map from canonical states to a `u32` payload.
///
/// The BFS uses the payload as a parent arena index; the IDDFS uses it as
/// the shallowest depth a state has been reached at.
pub(crate) struct StateMap {
    slots: Vec<Option<(State, u32)>>,
    len: usize,
}

impl StateMap {
    pub(crate) fn new() -> StateMap {
        StateMap {
            slots: vec![None; INITIAL_CAPACITY],
            len: 0,
        }
    }

    /// Number of live entries.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Removes every entry, keeping the allocation.
    pub(crate) fn clear(&mut self) {
        self.slots.fill(None);
        self.len = 0;
    }

    /// Index of the slot holding `state`, or of the empty slot where it
    /// would be inserted.
    fn probe(&self, state: &State) -> usize {
        let mask = self.slots.len() - 1;
        let mut index = (hash_state(state) as usize) & mask;
        while let Some((occupant, _)) = &self.slots[index] {
            if occupant == state {
                return index;
            }
            index = (index + 1) & mask;
        }
        index
    }

    pub(crate) fn get(&self, state: &State) -> Option<u32> {
        self.slots[self.probe(state)].map(|(_, value)| value)
    }

    /// Inserts `state` if absent. Returns `true` when the state was new.
    pub(crate) fn try_insert(&mut self, state: State, value: u32) -> bool {
        self.reserve();
        let index = self.probe(&state);
        if self.slots[index].is_some() {
            return false;
        }
        self.slots[index] = Some((state, value));
        self.len += 1;
        true
    }

    /// Inserts `state` when absent or recorded with a larger value.
    /// Returns `true` when the entry was created or lowered.
    pub(crate) fn improve(&mut self, state: State, value: u32) -> bool {
        self.reserve();
        let index = self.probe(&state);
        match &mut self.slots[index] {
            Some((_, existing)) => {
                if *existing > value {
                    *existing = value;
                    true
                } else {
                    false
                }
            }
            slot => {
                *slot = Some((state, value));
                self.len += 1;
                true
            }
        }
    }

    /// Doubles the table when the next insertion could cross load ½.
    fn reserve(&mut self) {
        if (self.len + 1) * 2 <= self.slots.len() {
            return;
        }
        let grown = self.slots.len() * 2;
        let old = std::mem::replace(&mut self.slots, vec![None; grown]);
        let mask = grown - 1;
        for (state, value) in old.into_iter().flatten() {
            let mut index = (hash_state(&state) as usize) & mask;
            while self.slots[index].is_some() {
                index = (index + 1) & mask;
            }
            self.slots[index] = Some((state, value));
        }
    }
}

/// Word-wise xorshift-multiply over a byte string.
///
/// The low bit is forced to 1 so a live hash can never collide with the
/// 0 that marks an empty slot.
fn hash_bytes(bytes: &[u8]) -> u64 {
    const SEED: u64 = 0x517c_c1b7_2722_0a95;
    const MULTIPLIER: u64 = 0x9e37_79b9_7f4a_7c15;
    let mut hash = SEED;
    let chunks = bytes.chunks_exact(8);
    let tail = chunks.remainder();
    for chunk in chunks {
        hash ^= u64::from_le_bytes(chunk.try_into().unwrap());
        hash = hash.wrapping_mul(MULTIPLIER);
        hash ^= hash >> 32;
    }
    for &byte in tail {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(MULTIPLIER);
    }
    hash | 1
}

/// An open-addressing membership set of byte strings, keyed by the flat
/// port vector of a normalized maze.
pub(crate) struct KeySet {
    hashes: Vec<u64>,
    keys: Vec<Box<[u8]>>,
    len: usize,
}

impl KeySet {
    pub(crate) fn new() -> KeySet {
        KeySet {
            hashes: vec![0; INITIAL_CAPACITY],
            keys: (0..INITIAL_CAPACITY).map(|_| Box::default()).collect(),
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    fn probe(&self, hash: u64, key: &[u8]) -> usize {
        let mask = self.hashes.len() - 1;
        let mut index = (hash as usize) & mask;
        while self.hashes[index] != 0 {
            if self.hashes[index] == hash && *self.keys[index] == *key {
                return index;
            }
            index = (index + 1) & mask;
        }
        index
    }

    pub(crate) fn contains(&self, key: &[u8]) -> bool {
        self.hashes[self.probe(hash_bytes(key), key)] != 0
    }

    /// Inserts `key`, returning `true` when it was not already present.
    pub(crate) fn insert(&mut self, key: &[u8]) -> bool {
        self.reserve();
        let hash = hash_bytes(key);
        let index = self.probe(hash, key);
        if self.hashes[index] != 0 {
            return false;
        }
        self.hashes[index] = hash;
        self.keys[index] = Box::from(key);
        self.len += 1;
        true
    }

    fn reserve(&mut self) {
        if (self.len + 1) * 2 <= self.hashes.len() {
            return;
        }
        let grown = self.hashes.len() * 2;
        let old_hashes = std::mem::replace(&mut self.hashes, vec![0; grown]);
        let old_keys = std::mem::replace(
            &mut self.keys,
            (0..grown).map(|_| Box::default()).collect(),
        );
        let mask = grown - 1;
        for (hash, key) in old_hashes.into_iter().zip(old_keys) {
            if hash == 0 {
                continue;
            }
            let mut index = (hash as usize) & mask;
            while self.hashes[index] != 0 {
                index = (index + 1) & mask;
            }
            self.hashes[index] = hash;
            self.keys[index] = key;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::state::Axis;

    use super::*;

    #[test]
    fn state_map_insert_and_get() {
        let mut map = StateMap::new();
        let state = State::new(3, 4, Axis::North, 1);
        assert!(map.try_insert(state, 7));
        assert!(!map.try_insert(state, 9));
        assert_eq!(map.get(&state), Some(7));
        assert_eq!(map.get(&State::START), None);
        assert_eq!(map.len(), 1);
        map.clear();
        assert_eq!(map.len(), 0);
        assert_eq!(map.get(&state), None);
    }

    #[test]
    fn state_map_improve_lowers_depths() {
        let mut map = StateMap::new();
        let state = State::new(0, 0, Axis::East, 0);
        assert!(map.improve(state, 5));
        assert!(!map.improve(state, 5));
        assert!(!map.improve(state, 6));
        assert!(map.improve(state, 2));
        assert_eq!(map.get(&state), Some(2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn state_map_survives_growth() {
        let mut map = StateMap::new();
        for x in 0..2_000 {
            assert!(map.try_insert(State::new(x, x, Axis::East, 0), x));
        }
        assert_eq!(map.len(), 2_000);
        for x in 0..2_000 {
            assert_eq!(map.get(&State::new(x, x, Axis::East, 0)), Some(x));
        }
    }

    #[test]
    fn key_set_membership() {
        let mut set = KeySet::new();
        assert!(!set.contains(b"abc"));
        assert!(set.insert(b"abc"));
        assert!(!set.insert(b"abc"));
        assert!(set.contains(b"abc"));
        assert!(set.insert(b"abd"));
        assert!(set.insert(b""));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn key_set_survives_growth() {
        let mut set = KeySet::new();
        for value in 0u32..2_000 {
            assert!(set.insert(&value.to_le_bytes()));
        }
        for value in 0u32..2_000 {
            assert!(set.contains(&value.to_le_bytes()));
            assert!(!set.insert(&value.to_le_bytes()));
        }
        assert_eq!(set.len(), 2_000);
    }
}
