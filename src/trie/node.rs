//! The node type threading leaves and interior nodes together, and the
//! generic whole-subtree operations (`collect_into`, `build_subtree`,
//! `filtered_subtree`) that work over either.

use std::sync::Arc;

use crate::config::Configuration;
use crate::hash::{hash_key, level_selector_at_depth};
use crate::trie::inode::Inode;
use crate::trie::leaf::Leaf;

pub(crate) enum Node<K, V> {
    Leaf(Arc<Leaf<K, V>>),
    Inode(Arc<Inode<K, V>>),
}

impl<K, V> Clone for Node<K, V> {
    fn clone(&self) -> Self {
        match self {
            Node::Leaf(leaf) => Node::Leaf(Arc::clone(leaf)),
            Node::Inode(inode) => Node::Inode(Arc::clone(inode)),
        }
    }
}

impl<K, V> Node<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    pub(crate) fn empty_leaf() -> Self {
        Node::Leaf(Arc::new(Leaf::empty()))
    }

    pub(crate) fn is_mutable(&self) -> bool {
        match self {
            Node::Leaf(leaf) => leaf.is_mutable(),
            Node::Inode(inode) => inode.is_mutable(),
        }
    }

    /// True when this handle is the only reference to its underlying node
    /// — i.e. it is not aliased with a sibling slot from a lazy fan-out
    /// grow, nor shared with another branch. The signal that decides
    /// whether a write can proceed in place or must first specialize a
    /// filtered copy.
    pub(crate) fn is_exclusive(&self) -> bool {
        match self {
            Node::Leaf(leaf) => Arc::strong_count(leaf) == 1,
            Node::Inode(inode) => Arc::strong_count(inode) == 1,
        }
    }

    pub(crate) fn mark_immutable(&self) {
        match self {
            Node::Leaf(leaf) => leaf.mark_immutable(),
            Node::Inode(inode) => inode.mark_immutable(),
        }
    }

    /// A fresh, privately mutable, shallow clone of this node: a leaf gets a
    /// full copy of its slots, an interior node gets a new child array whose
    /// entries still alias the original children. Used to hand out a second,
    /// independent, mutable handle onto a node without disturbing the
    /// original — the subtrees below stay shared until a write actually
    /// forces one side to specialize.
    pub(crate) fn clone_mutable(&self) -> Self {
        match self {
            Node::Leaf(leaf) => Node::Leaf(Arc::new(leaf.clone_mutable())),
            Node::Inode(inode) => Node::Inode(Arc::new(inode.clone_mutable())),
        }
    }

    /// Flattens every `(key, value)` pair reachable from this node into
    /// `out`. Used to rebuild filtered subtrees during copy-on-write
    /// specialization of an aliased child, and by the naive `setops`
    /// fallback for small maps.
    pub(crate) fn collect_into(&self, out: &mut Vec<(K, V)>) {
        match self {
            Node::Leaf(leaf) => out.extend(leaf.iter().map(|(k, v)| (k.clone(), v.clone()))),
            Node::Inode(inode) => {
                for child in inode.children() {
                    child.collect_into(out);
                }
            }
        }
    }

    #[cfg(debug_assertions)]
    pub(crate) fn debug_check_invariants(&self) -> Result<(), crate::error::TrieError> {
        match self {
            Node::Leaf(leaf) => leaf.debug_check_invariants(),
            Node::Inode(inode) => {
                inode.debug_check_invariants()?;
                if crate::assert_level::aggressive_checks_enabled() {
                    for child in inode.children() {
                        child.debug_check_invariants()?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Builds a subtree from a flat list of entries, shaped to `config` starting
/// at `depth_index` levels below the root. `depth_index == config.depth()`
/// builds a leaf directly; otherwise entries are partitioned by their
/// selector bits at this level and the interior node's children are built
/// recursively.
///
/// This is the one place tree shape is derived from `Configuration`: used
/// both to promote a leaf into a full multi-level tree as the population
/// crosses a threshold, and to rebuild a single aliased child's content
/// filtered down to the entries that actually belong to it.
pub(crate) fn build_subtree<K, V>(
    entries: Vec<(K, V)>,
    config: &Configuration,
    depth_index: usize,
) -> Node<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    if depth_index >= config.depth() {
        let mut leaf = Leaf::empty();
        for (k, v) in entries {
            leaf.insert_mut(k, v)
                .expect("a freshly built leaf is always mutable");
        }
        return Node::Leaf(Arc::new(leaf));
    }

    let fanout = config.fanout(depth_index) as usize;
    let bits = config.bits(depth_index);
    let d = config.depth();

    let mut buckets: Vec<Vec<(K, V)>> = (0..fanout).map(|_| Vec::new()).collect();
    for (k, v) in entries {
        let h = hash_key(&k);
        let idx = level_selector_at_depth(h, d, depth_index, bits);
        buckets[idx].push((k, v));
    }

    let children: Vec<Node<K, V>> = buckets
        .into_iter()
        .map(|bucket| build_subtree(bucket, config, depth_index + 1))
        .collect();

    Node::Inode(Arc::new(Inode::new(children)))
}

/// Filters `node`'s full content down to the entries whose selector at
/// `(depth_index, bits)` equals `target_index`, then rebuilds a fresh
/// subtree from just those — the filtered-rebuild half of aliased-child
/// specialization: without this filter, both aliases of a doubled
/// child would retain each other's entries and be double-counted.
pub(crate) fn filtered_subtree<K, V>(
    node: &Node<K, V>,
    config: &Configuration,
    depth_index: usize,
    bits: u32,
    target_index: usize,
) -> Node<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    let d = config.depth();
    let mut all = Vec::new();
    node.collect_into(&mut all);
    let filtered: Vec<(K, V)> = all
        .into_iter()
        .filter(|(k, _)| {
            let h = hash_key(k);
            level_selector_at_depth(h, d, depth_index, bits) == target_index
        })
        .collect();
    build_subtree(filtered, config, depth_index + 1)
}
