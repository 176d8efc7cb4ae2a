//! Leaf: an open-addressed hash table sitting at the bottom of
//! every tree, keyed by the low 16 bits of a key's hash (the "leaf
//! selector", see [`crate::hash::leaf_selector`]).

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{invariant_violation, TrieError};
use crate::hash::{hash_key, leaf_selector};

/// Maximum probe attempts before a leaf is considered full and must grow.
pub(crate) const MAX_PROBE: usize = 16;

/// Capacity growth ladder. Beyond the list, capacity grows by a
/// factor of 5/4 (ceiling) each step.
const CAPACITY_LADDER: &[usize] = &[
    1, 2, 3, 4, 5, 6, 8, 11, 13, 15, 19, 23, 27, 33, 41, 47, 59, 73, 89, 113, 127, 147, 163, 191,
    233,
];

/// Smallest leaf capacity able to hold `count` entries, per the growth
/// ladder. Clamped to at least 1, so an empty leaf never asks for a
/// zero-capacity table.
pub(crate) fn leaf_table_size(count: usize) -> usize {
    let count = count.max(1);
    for &cap in CAPACITY_LADDER {
        if cap >= count {
            return cap;
        }
    }
    let mut cap = *CAPACITY_LADDER.last().unwrap();
    while cap < count {
        cap = (cap * 5 + 3) / 4;
    }
    cap
}

pub(crate) struct Leaf<K, V> {
    mutable: AtomicBool,
    slots: Vec<Option<(K, V)>>,
    len: usize,
}

impl<K, V> Leaf<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    pub(crate) fn singleton(key: K, value: V) -> Self {
        let mut leaf = Self::empty();
        leaf.insert_mut(key, value)
            .expect("a freshly created leaf is always mutable");
        leaf
    }

    pub(crate) fn empty() -> Self {
        Leaf {
            mutable: AtomicBool::new(true),
            slots: vec![None; leaf_table_size(0)],
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_mutable(&self) -> bool {
        self.mutable.load(Ordering::Acquire)
    }

    pub(crate) fn mark_immutable(&self) {
        self.mutable.store(false, Ordering::Release);
    }

    fn probe_sequence(h16: u16, capacity: usize) -> impl Iterator<Item = usize> {
        let base = h16 as usize;
        let capacity = capacity.max(1);
        (0..MAX_PROBE.min(capacity)).map(move |i| (base ^ i) % capacity)
    }

    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        let h16 = leaf_selector(hash_key(key));
        for slot in Self::probe_sequence(h16, self.slots.len()) {
            if let Some((k, v)) = &self.slots[slot] {
                if k == key {
                    return Some(v);
                }
            }
        }
        None
    }

    pub(crate) fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Clones this leaf's entries into a fresh, private, mutable leaf. Used
    /// for copy-on-write when a mutation must pass through an immutable
    /// leaf reached via a shared path.
    pub(crate) fn clone_mutable(&self) -> Self {
        Leaf {
            mutable: AtomicBool::new(true),
            slots: self.slots.clone(),
            len: self.len,
        }
    }

    /// Rebuilds this leaf at the capacity appropriate for `target_len`
    /// entries, rehashing every existing entry into the new table.
    fn rebuilt(&self, target_len: usize) -> Self {
        let capacity = leaf_table_size(target_len);
        log::trace!(
            "leaf growing from {} slots to {capacity} for {target_len} entries",
            self.slots.len()
        );
        let mut slots = vec![None; capacity];
        for entry in self.slots.iter().flatten() {
            let h16 = leaf_selector(hash_key(&entry.0));
            Self::place(&mut slots, h16, entry.clone());
        }
        Leaf {
            mutable: AtomicBool::new(true),
            slots,
            len: self.len,
        }
    }

    fn place(slots: &mut [Option<(K, V)>], h16: u16, entry: (K, V)) {
        let capacity = slots.len();
        for slot in Self::probe_sequence(h16, capacity) {
            if slots[slot].is_none() {
                slots[slot] = Some(entry);
                return;
            }
        }
        unreachable!("a table rebuilt for its own entry count must fit them");
    }

    /// Inserts or overwrites `key`, assuming this leaf is privately mutable.
    /// Returns the previous value, if any — overwrite never changes the
    /// table's occupancy. Grows in place (rebuilding at a
    /// larger capacity) when the probe sequence is exhausted.
    pub(crate) fn insert_mut(&mut self, key: K, value: V) -> Result<Option<V>, TrieError> {
        if !self.is_mutable() {
            return Err(TrieError::ImmutableMutation);
        }
        let h16 = leaf_selector(hash_key(&key));

        for slot in Self::probe_sequence(h16, self.slots.len()) {
            if let Some((k, v)) = &mut self.slots[slot] {
                if *k == key {
                    return Ok(Some(std::mem::replace(v, value)));
                }
            }
        }

        loop {
            for slot in Self::probe_sequence(h16, self.slots.len()) {
                if self.slots[slot].is_none() {
                    self.slots[slot] = Some((key, value));
                    self.len += 1;
                    return Ok(None);
                }
            }
            *self = self.rebuilt(self.len + 1);
        }
    }

    /// Removes `key`, assuming this leaf is privately mutable.
    pub(crate) fn remove_mut(&mut self, key: &K) -> Result<Option<V>, TrieError> {
        if !self.is_mutable() {
            return Err(TrieError::ImmutableMutation);
        }
        let h16 = leaf_selector(hash_key(key));
        for slot in Self::probe_sequence(h16, self.slots.len()) {
            let matches_key = matches!(&self.slots[slot], Some((k, _)) if k == key);
            if matches_key {
                let (_, v) = self.slots[slot].take().unwrap();
                self.len -= 1;
                return Ok(Some(v));
            }
        }
        Ok(None)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.slots.iter().flatten().map(|(k, v)| (k, v))
    }

    #[cfg(debug_assertions)]
    pub(crate) fn debug_check_invariants(&self) -> Result<(), TrieError> {
        if !crate::assert_level::checks_enabled() {
            return Ok(());
        }
        let counted = self.slots.iter().flatten().count();
        if counted != self.len {
            return Err(invariant_violation(format!(
                "leaf length {} does not match occupied slot count {counted}",
                self.len
            )));
        }
        if crate::assert_level::aggressive_checks_enabled() {
            for entry in self.slots.iter().flatten() {
                let h16 = leaf_selector(hash_key(&entry.0));
                let reachable = Self::probe_sequence(h16, self.slots.len())
                    .any(|slot| matches!(&self.slots[slot], Some((k, _)) if k == &entry.0));
                if !reachable {
                    return Err(invariant_violation(
                        "key unreachable via its own probe sequence",
                    ));
                }
            }
        }
        Ok(())
    }
}
