//! The persistent, versioned associative container.
//!
//! A [`HashTrie`] is a hash-partitioned tree of up to seven levels: a root
//! that is either a [`leaf::Leaf`] (small maps) or chain of
//! [`inode::Inode`]s terminating in leaves, shaped by [`crate::config`]'s
//! population-driven schedule. Containers follow a "mutable until shared"
//! discipline: freshly built or freshly [`HashTrie::branch`]ed
//! containers may be mutated in place; once a node is shared (by branching,
//! or by aliasing during a lazy fan-out grow) the next write through it
//! copies first.

mod inode;
mod iter;
mod leaf;
mod node;
mod setops;

use std::sync::Arc;

use crate::config::{config_for, Configuration};
use crate::error::TrieError;
use crate::hash::{hash_key, level_selector_at_depth};

use inode::Inode;
use node::{build_subtree, filtered_subtree, Node};

pub use iter::Iter;

/// A persistent, versioned, hash-partitioned associative container.
/// Cloning the container itself is cheap ([`HashTrie::branch`]); the
/// cost of diverging two branches is paid lazily, one shared node at a
/// time, the first time each is actually written through.
pub struct HashTrie<K, V> {
    root: Node<K, V>,
    len: u64,
    depth: usize,
}

impl<K, V> Default for HashTrie<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> HashTrie<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    /// An empty, privately mutable container.
    pub fn new() -> Self {
        HashTrie {
            root: Node::empty_leaf(),
            len: 0,
            depth: 0,
        }
    }

    /// Number of key/value pairs stored.
    pub fn length(&self) -> u64 {
        self.len
    }

    /// Alias for [`HashTrie::length`], for callers used to the standard
    /// collection naming.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True while this container's root may still be mutated in place.
    /// Containers start mutable; [`HashTrie::branch`] and
    /// [`HashTrie::mark_immutable`] freeze them.
    pub fn is_mutable(&self) -> bool {
        self.root.is_mutable()
    }

    /// Freezes this container's root in place, idempotently. Containers are
    /// normally frozen implicitly by [`HashTrie::branch`]; this is for
    /// callers that want to publish a container without also retaining a
    /// sibling handle.
    pub fn mark_immutable(&self) {
        self.root.mark_immutable();
    }

    /// Looks up `key`, returning `None` if absent.
    pub fn get(&self, key: &K) -> Option<&V> {
        let h = hash_key(key);
        let d = self.depth;
        let mut node = &self.root;
        for depth_index in 0..d {
            let inode = match node {
                Node::Inode(inode) => inode,
                Node::Leaf(_) => return None,
            };
            let bits = (inode.fanout() as u16).trailing_zeros();
            let idx = level_selector_at_depth(h, d, depth_index, bits);
            node = inode.child(idx);
        }
        match node {
            Node::Leaf(leaf) => leaf.get(key),
            Node::Inode(_) => None,
        }
    }

    /// Looks up `key`, falling back to `default` if absent.
    pub fn get_or<'a>(&'a self, key: &K, default: &'a V) -> &'a V {
        self.get(key).unwrap_or(default)
    }

    /// Looks up `key`, returning [`TrieError::MissingKey`] if absent — the
    /// indexed-access form.
    pub fn get_indexed(&self, key: &K) -> Result<&V, TrieError> {
        self.get(key).ok_or(TrieError::MissingKey)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn contains_pair(&self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.get(key).is_some_and(|v| v == value)
    }

    /// Inserts `key` → `value`, overwriting and returning any previous
    /// value. Requires the container to be mutable; errors with
    /// [`TrieError::ImmutableMutation`] otherwise. Reshapes the tree ahead
    /// of the write whenever the population is about to cross a
    /// depth-changing threshold.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, TrieError> {
        if !self.is_mutable() {
            return Err(TrieError::ImmutableMutation);
        }
        let h = hash_key(&key);
        let target_config = config_for(self.len + 1);
        self.reshape_if_needed(&target_config);

        let old = insert_rec(
            &mut self.root,
            key,
            value,
            h,
            &target_config,
            self.depth,
            0,
        )?;
        if old.is_none() {
            self.len += 1;
        }
        Ok(old)
    }

    /// Removes `key`, returning its value if present. Requires the
    /// container to be mutable.
    pub fn delete(&mut self, key: &K) -> Result<Option<V>, TrieError> {
        if !self.is_mutable() {
            return Err(TrieError::ImmutableMutation);
        }
        let h = hash_key(key);
        let config = config_for(self.len);
        let removed = delete_rec(&mut self.root, key, h, &config, self.depth, 0)?;
        if removed.is_some() {
            self.len -= 1;
        }
        Ok(removed)
    }

    /// Alias for [`HashTrie::delete`].
    pub fn remove(&mut self, key: &K) -> Result<Option<V>, TrieError> {
        self.delete(key)
    }

    fn reshape_if_needed(&mut self, target_config: &Configuration) {
        if target_config.depth() == self.depth {
            return;
        }
        log::debug!(
            "reshaping container from depth {} to depth {} at n={}",
            self.depth,
            target_config.depth(),
            self.len
        );
        let mut entries = Vec::with_capacity(self.len as usize);
        self.root.collect_into(&mut entries);
        self.root = build_subtree(entries, target_config, 0);
        self.depth = target_config.depth();
    }

    /// Forks this container in O(1): freezes the root (if not already
    /// frozen) and returns an independent sibling sharing the same
    /// structure. Both handles may be mutated afterward; the first write
    /// through either one copies only the nodes on the path it touches.
    pub fn branch(&mut self) -> HashTrie<K, V> {
        log::debug!("branching container of length {}", self.len);
        self.root.mark_immutable();
        HashTrie {
            root: self.root.clone_mutable(),
            len: self.len,
            depth: self.depth,
        }
    }

    /// [`HashTrie::branch`], twice, paying the freeze cost once.
    pub fn double_branch(&mut self) -> (HashTrie<K, V>, HashTrie<K, V>) {
        self.root.mark_immutable();
        let a = HashTrie {
            root: self.root.clone_mutable(),
            len: self.len,
            depth: self.depth,
        };
        let b = HashTrie {
            root: self.root.clone_mutable(),
            len: self.len,
            depth: self.depth,
        };
        (a, b)
    }

    /// Returns a writable handle onto this container's contents: `self`'s
    /// own root if it is still mutable, or else [`HashTrie::branch`]'s
    /// result against an equivalent frozen root. Either way the returned
    /// container is an independent, privately mutable shallow clone — it
    /// never disturbs `self`'s own mutability, since `self` is only
    /// borrowed here, not consumed.
    pub fn get_mutable_version(&self) -> Result<HashTrie<K, V>, TrieError> {
        Ok(HashTrie {
            root: self.root.clone_mutable(),
            len: self.len,
            depth: self.depth,
        })
    }

    /// Iterates over all key/value pairs, in an order that is unspecified
    /// but stable for the lifetime of this particular snapshot.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.root)
    }

    /// Structure-sharing-aware set difference: entries present in `self`
    /// but not in `other`.
    pub fn setdiff(&self, other: &HashTrie<K, V>) -> Vec<(K, V)>
    where
        V: PartialEq,
    {
        setops::setdiff(self, other)
    }

    /// Deep equality: same keys, same values, regardless of tree shape or
    /// structural sharing.
    pub fn equals(&self, other: &HashTrie<K, V>) -> bool
    where
        V: PartialEq,
    {
        setops::equals(self, other)
    }

    /// Merges `other` into a branch of `self`, resolving collisions with
    /// `combine(ours, theirs)`. The result is returned frozen, the same as
    /// [`HashTrie::branch`]'s sibling would be.
    pub fn merge(&self, other: &HashTrie<K, V>, combine: impl Fn(&V, &V) -> V) -> HashTrie<K, V> {
        setops::merge(self, other, combine)
    }

    /// Merges `other` into `self` in place, resolving collisions with
    /// `combine(ours, theirs)`. Requires `self` to be mutable.
    pub fn merge_inplace(
        &mut self,
        other: &HashTrie<K, V>,
        combine: impl Fn(&V, &V) -> V,
    ) -> Result<(), TrieError> {
        if !self.is_mutable() {
            return Err(TrieError::ImmutableMutation);
        }
        for (k, v) in other.iter() {
            let combined = match self.get(k) {
                Some(existing) => combine(existing, v),
                None => v.clone(),
            };
            self.insert(k.clone(), combined)?;
        }
        Ok(())
    }

    #[cfg(debug_assertions)]
    pub(crate) fn debug_check_invariants(&self) -> Result<(), TrieError> {
        self.root.debug_check_invariants()
    }
}

/// Ensures `node` (an interior node at `depth_index`) has at least
/// `config.fanout(depth_index)` children, growing it by aliasing —
/// duplicating the child array, unspecialized — as many times as needed.
fn ensure_fanout<K, V>(node: &mut Node<K, V>, config: &Configuration, depth_index: usize)
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    let expected = config.fanout(depth_index) as usize;
    let inode_arc = match node {
        Node::Inode(inode_arc) => inode_arc,
        Node::Leaf(_) => return,
    };
    if inode_arc.fanout() >= expected {
        return;
    }
    let mut grown = inode_arc.doubled();
    while grown.fanout() < expected {
        grown = grown.doubled();
    }
    *node = Node::Inode(Arc::new(grown));
}

fn insert_rec<K, V>(
    node: &mut Node<K, V>,
    key: K,
    value: V,
    h: u64,
    config: &Configuration,
    d: usize,
    depth_index: usize,
) -> Result<Option<V>, TrieError>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    if depth_index == d {
        return insert_into_leaf(node, key, value);
    }

    ensure_fanout(node, config, depth_index);
    let bits = config.bits(depth_index);
    let idx = level_selector_at_depth(h, d, depth_index, bits);

    let inode_arc = match node {
        Node::Inode(inode_arc) => inode_arc,
        Node::Leaf(_) => unreachable!("depth_index < d always addresses an interior node"),
    };
    ensure_exclusive_inode(inode_arc);
    let inode = Arc::get_mut(inode_arc).expect("just ensured exclusive ownership");

    if !inode.child(idx).is_exclusive() {
        let specialized = filtered_subtree(inode.child(idx), config, depth_index, bits, idx);
        inode.set_child(idx, specialized)?;
    }

    insert_rec(
        inode.child_mut(idx),
        key,
        value,
        h,
        config,
        d,
        depth_index + 1,
    )
}

fn insert_into_leaf<K, V>(node: &mut Node<K, V>, key: K, value: V) -> Result<Option<V>, TrieError>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    let leaf_arc = match node {
        Node::Leaf(leaf_arc) => leaf_arc,
        Node::Inode(_) => unreachable!("depth_index == d always addresses a leaf"),
    };
    ensure_exclusive_leaf(leaf_arc);
    let leaf = Arc::get_mut(leaf_arc).expect("just ensured exclusive ownership");
    leaf.insert_mut(key, value)
}

fn delete_rec<K, V>(
    node: &mut Node<K, V>,
    key: &K,
    h: u64,
    config: &Configuration,
    d: usize,
    depth_index: usize,
) -> Result<Option<V>, TrieError>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    if depth_index == d {
        let leaf_arc = match node {
            Node::Leaf(leaf_arc) => leaf_arc,
            Node::Inode(_) => unreachable!("depth_index == d always addresses a leaf"),
        };
        ensure_exclusive_leaf(leaf_arc);
        let leaf = Arc::get_mut(leaf_arc).expect("just ensured exclusive ownership");
        return leaf.remove_mut(key);
    }

    let bits = config.bits(depth_index);
    let idx = level_selector_at_depth(h, d, depth_index, bits);
    let inode_arc = match node {
        Node::Inode(inode_arc) => inode_arc,
        Node::Leaf(_) => unreachable!("depth_index < d always addresses an interior node"),
    };
    ensure_exclusive_inode(inode_arc);
    let inode = Arc::get_mut(inode_arc).expect("just ensured exclusive ownership");

    if !inode.child(idx).is_exclusive() {
        let specialized = filtered_subtree(inode.child(idx), config, depth_index, bits, idx);
        inode.set_child(idx, specialized)?;
    }

    delete_rec(inode.child_mut(idx), key, h, config, d, depth_index + 1)
}

fn ensure_exclusive_leaf<K, V>(leaf_arc: &mut Arc<leaf::Leaf<K, V>>)
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    let already_ours = leaf_arc.is_mutable() && Arc::get_mut(leaf_arc).is_some();
    if !already_ours {
        *leaf_arc = Arc::new(leaf_arc.clone_mutable());
    }
}

fn ensure_exclusive_inode<K, V>(inode_arc: &mut Arc<Inode<K, V>>)
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    let already_ours = inode_arc.is_mutable() && Arc::get_mut(inode_arc).is_some();
    if !already_ours {
        *inode_arc = Arc::new(inode_arc.clone_mutable());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let mut trie = HashTrie::new();
        assert_eq!(trie.insert("a", 1).unwrap(), None);
        assert_eq!(trie.get(&"a"), Some(&1));
        assert_eq!(trie.length(), 1);
    }

    #[test]
    fn overwrite_returns_previous_value_and_keeps_length() {
        let mut trie = HashTrie::new();
        trie.insert("a", 1).unwrap();
        let previous = trie.insert("a", 2).unwrap();
        assert_eq!(previous, Some(1));
        assert_eq!(trie.get(&"a"), Some(&2));
        assert_eq!(trie.length(), 1);
    }

    #[test]
    fn delete_removes_and_reports_absence() {
        let mut trie = HashTrie::new();
        trie.insert("a", 1).unwrap();
        assert_eq!(trie.delete(&"a").unwrap(), Some(1));
        assert_eq!(trie.get(&"a"), None);
        assert_eq!(trie.length(), 0);
        assert_eq!(trie.delete(&"a").unwrap(), None);
    }

    #[test]
    fn get_indexed_reports_missing_key() {
        let trie: HashTrie<&str, i32> = HashTrie::new();
        assert_eq!(trie.get_indexed(&"missing"), Err(TrieError::MissingKey));
    }

    #[test]
    fn immutable_container_rejects_mutation() {
        let mut trie = HashTrie::new();
        trie.insert("a", 1).unwrap();
        let _branch = trie.branch();
        assert_eq!(
            trie.insert("b", 2).unwrap_err(),
            TrieError::ImmutableMutation
        );
    }

    #[test]
    fn branching_preserves_independent_futures() {
        let mut trie = HashTrie::new();
        for i in 0..200 {
            trie.insert(i, i).unwrap();
        }
        let mut branch = trie.branch();
        branch.insert(999, 999).unwrap();
        assert_eq!(trie.get(&999), None);
        assert_eq!(branch.get(&999), Some(&999));
        for i in 0..200 {
            assert_eq!(trie.get(&i), Some(&i));
            assert_eq!(branch.get(&i), Some(&i));
        }
    }

    #[test]
    fn growing_past_a_depth_threshold_keeps_every_key_reachable() {
        let mut trie = HashTrie::new();
        for i in 0..20_000i64 {
            trie.insert(i, i * 2).unwrap();
        }
        assert_eq!(trie.length(), 20_000);
        for i in 0..20_000i64 {
            assert_eq!(trie.get(&i), Some(&(i * 2)));
        }
    }

    #[test]
    fn get_mutable_version_of_a_mutable_container_does_not_disturb_it() {
        let mut trie = HashTrie::new();
        trie.insert("a", 1).unwrap();
        let mut copy = trie.get_mutable_version().unwrap();
        assert!(trie.is_mutable());
        copy.insert("b", 2).unwrap();
        assert_eq!(trie.get(&"b"), None);
        assert_eq!(copy.get(&"b"), Some(&2));
    }

    #[test]
    fn get_mutable_version_of_a_frozen_container_branches_it() {
        let mut trie = HashTrie::new();
        trie.insert("a", 1).unwrap();
        trie.mark_immutable();
        let mut copy = trie.get_mutable_version().unwrap();
        assert!(copy.is_mutable());
        copy.insert("b", 2).unwrap();
        assert_eq!(trie.get(&"b"), None);
        assert_eq!(copy.get(&"b"), Some(&2));
    }
}
