//! Interior node: a fixed power-of-two fan-out child array. Children
//! are homogeneous — either all leaves or all interior nodes — and capacity
//! doubles lazily by aliasing: the child array is duplicated verbatim
//! (cheap `Arc` clones), and each half only pays the cost of diverging from
//! the other the first time something writes through it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{invariant_violation, TrieError};
use crate::trie::node::Node;

pub(crate) struct Inode<K, V> {
    mutable: AtomicBool,
    children: Vec<Node<K, V>>,
}

impl<K, V> Inode<K, V> {
    pub(crate) fn new(children: Vec<Node<K, V>>) -> Self {
        Inode {
            mutable: AtomicBool::new(true),
            children,
        }
    }

    pub(crate) fn fanout(&self) -> usize {
        self.children.len()
    }

    pub(crate) fn child(&self, index: usize) -> &Node<K, V> {
        &self.children[index]
    }

    pub(crate) fn child_mut(&mut self, index: usize) -> &mut Node<K, V> {
        &mut self.children[index]
    }

    pub(crate) fn children(&self) -> &[Node<K, V>] {
        &self.children
    }

    pub(crate) fn is_mutable(&self) -> bool {
        self.mutable.load(Ordering::Acquire)
    }

    pub(crate) fn mark_immutable(&self) {
        self.mutable.store(false, Ordering::Release);
    }
}

impl<K, V> Inode<K, V>
where
    Node<K, V>: Clone,
{
    /// Clones this inode's child array into a fresh, private, mutable
    /// inode. Used for copy-on-write when a mutation must pass through an
    /// immutable inode.
    pub(crate) fn clone_mutable(&self) -> Self {
        Inode {
            mutable: AtomicBool::new(true),
            children: self.children.clone(),
        }
    }

    /// Doubles the child array by aliasing: the new upper half is a
    /// verbatim duplicate of the lower half, sharing the same child `Arc`s.
    /// Neither half is specialized by this call; that happens lazily, the
    /// first time a write actually targets one specific occurrence.
    pub(crate) fn doubled(&self) -> Self {
        log::trace!("inode aliasing-doubling from fanout {}", self.children.len());
        let mut children = Vec::with_capacity(self.children.len() * 2);
        children.extend(self.children.iter().cloned());
        children.extend(self.children.iter().cloned());
        Inode {
            mutable: AtomicBool::new(true),
            children,
        }
    }

    /// Returns a copy of this inode with `index` replaced by `child`,
    /// assuming this inode is privately mutable. Used by the in-place
    /// mutation path once `Arc::get_mut` has granted exclusive access.
    pub(crate) fn set_child(&mut self, index: usize, child: Node<K, V>) -> Result<(), TrieError> {
        if !self.is_mutable() {
            return Err(TrieError::ImmutableMutation);
        }
        self.children[index] = child;
        Ok(())
    }
}

impl<K, V> Inode<K, V> {
    #[cfg(debug_assertions)]
    pub(crate) fn debug_check_invariants(&self) -> Result<(), TrieError> {
        if !crate::assert_level::checks_enabled() {
            return Ok(());
        }
        if self.children.is_empty() {
            return Err(invariant_violation("inode has an empty child array"));
        }
        if !self.children.len().is_power_of_two() {
            return Err(invariant_violation(format!(
                "inode fanout {} is not a power of two",
                self.children.len()
            )));
        }
        let all_leaves = self.children.iter().all(|c| matches!(c, Node::Leaf(_)));
        let all_inodes = self.children.iter().all(|c| matches!(c, Node::Inode(_)));
        if !(all_leaves || all_inodes) {
            return Err(invariant_violation(
                "inode children are not homogeneous (mixed leaves and inodes)",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::leaf::Leaf;

    fn leaf_node(entries: &[(i32, i32)]) -> Node<i32, i32> {
        let mut leaf = Leaf::empty();
        for &(k, v) in entries {
            leaf.insert_mut(k, v).unwrap();
        }
        Node::Leaf(Arc::new(leaf))
    }

    #[test]
    fn doubling_preserves_every_child_by_identity() {
        let inode = Inode::new(vec![leaf_node(&[(1, 1)]), leaf_node(&[(2, 2)])]);
        let doubled = inode.doubled();
        assert_eq!(doubled.fanout(), 4);
        assert!(Arc::ptr_eq(
            as_leaf_arc(doubled.child(0)),
            as_leaf_arc(doubled.child(2))
        ));
        assert!(Arc::ptr_eq(
            as_leaf_arc(doubled.child(1)),
            as_leaf_arc(doubled.child(3))
        ));
    }

    fn as_leaf_arc(node: &Node<i32, i32>) -> &Arc<Leaf<i32, i32>> {
        match node {
            Node::Leaf(l) => l,
            Node::Inode(_) => panic!("expected a leaf"),
        }
    }

    #[test]
    fn freshly_built_inode_is_mutable() {
        let inode = Inode::new(vec![leaf_node(&[]), leaf_node(&[])]);
        assert!(inode.is_mutable());
        inode.mark_immutable();
        assert!(!inode.is_mutable());
    }
}
