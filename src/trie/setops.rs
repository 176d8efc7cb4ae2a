//! Whole-container set operations: difference, equality, and
//! combiner-merge.

use std::sync::Arc;

use crate::trie::node::Node;
use crate::trie::HashTrie;

pub(crate) fn equals<K, V>(a: &HashTrie<K, V>, b: &HashTrie<K, V>) -> bool
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone + PartialEq,
{
    if a.length() != b.length() {
        return false;
    }
    a.iter().all(|(k, v)| b.get(k) == Some(v))
}

/// Same underlying node, by `Arc` identity — a shared subtree coming out of
/// a branch, untouched by any write since.
fn node_identity_eq<K, V>(a: &Node<K, V>, b: &Node<K, V>) -> bool {
    match (a, b) {
        (Node::Leaf(a), Node::Leaf(b)) => Arc::ptr_eq(a, b),
        (Node::Inode(a), Node::Inode(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// Entries reachable from `node` that are absent, or mapped to a different
/// value, in `other`. A flat fallback for subtrees whose shape has
/// diverged too far to descend pairwise.
fn diff_against_container<K, V>(node: &Node<K, V>, other: &HashTrie<K, V>, out: &mut Vec<(K, V)>)
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone + PartialEq,
{
    let mut entries = Vec::new();
    node.collect_into(&mut entries);
    for (k, v) in entries {
        if other.get(&k) != Some(&v) {
            out.push((k, v));
        }
    }
}

/// Descends `a` and `b` in lockstep, pruning any subtree the two sides
/// still share by identity — the cost of a [`HashTrie::setdiff`] against a
/// recent [`HashTrie::branch`] is then proportional to how much has
/// actually diverged, not to the size of either tree. Recursion only
/// widens past a shared prefix at the nodes that have been written
/// through since the branch.
fn diff_nodes<K, V>(a: &Node<K, V>, b: &Node<K, V>, other: &HashTrie<K, V>, out: &mut Vec<(K, V)>)
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone + PartialEq,
{
    if node_identity_eq(a, b) {
        return;
    }
    match (a, b) {
        (Node::Leaf(a_leaf), Node::Leaf(b_leaf)) => {
            for (k, v) in a_leaf.iter() {
                if b_leaf.get(k) != Some(v) {
                    out.push((k.clone(), v.clone()));
                }
            }
        }
        (Node::Inode(a_inode), Node::Inode(b_inode))
            if a_inode.fanout() == b_inode.fanout() =>
        {
            for i in 0..a_inode.fanout() {
                diff_nodes(a_inode.child(i), b_inode.child(i), other, out);
            }
        }
        _ => {
            // The two sides have reshaped to different depths at this
            // point (one crossed a fan-out threshold the other didn't);
            // fall back to a flat comparison against `other` as a whole
            // for just this subtree.
            diff_against_container(a, other, out);
        }
    }
}

/// The structure-sharing-aware set difference: entries present in `a` but
/// not in `b`, computed by pruning subtrees `a` and `b` still share
/// (see [`diff_nodes`]) rather than scanning every entry of `a`.
pub(crate) fn setdiff<K, V>(a: &HashTrie<K, V>, b: &HashTrie<K, V>) -> Vec<(K, V)>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone + PartialEq,
{
    let mut out = Vec::new();
    diff_nodes(&a.root, &b.root, b, &mut out);
    out
}

/// `mark_immutable(merge!(branch(a), [b]))`: branches `a` (without
/// disturbing the caller's handle on it, since `merge` only borrows),
/// folds `b`'s entries into that branch via `merge_inplace`, and freezes
/// the result.
pub(crate) fn merge<K, V>(
    a: &HashTrie<K, V>,
    b: &HashTrie<K, V>,
    combine: impl Fn(&V, &V) -> V,
) -> HashTrie<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    let mut result = HashTrie {
        root: a.root.clone_mutable(),
        len: a.len,
        depth: a.depth,
    };
    result
        .merge_inplace(b, combine)
        .expect("a freshly branched container is always mutable");
    result.mark_immutable();
    result
}

#[cfg(test)]
mod tests {
    use crate::trie::HashTrie;

    fn trie_from(entries: &[(i32, i32)]) -> HashTrie<i32, i32> {
        let mut trie = HashTrie::new();
        for &(k, v) in entries {
            trie.insert(k, v).unwrap();
        }
        trie
    }

    #[test]
    fn equals_ignores_structural_sharing() {
        let mut a = trie_from(&[(1, 1), (2, 2), (3, 3)]);
        let b = a.branch();
        assert!(a.equals(&b));
    }

    #[test]
    fn equals_detects_a_differing_value() {
        let a = trie_from(&[(1, 1)]);
        let b = trie_from(&[(1, 2)]);
        assert!(!a.equals(&b));
    }

    #[test]
    fn setdiff_returns_entries_only_in_self() {
        let a = trie_from(&[(1, 1), (2, 2), (3, 3)]);
        let b = trie_from(&[(2, 2)]);
        let mut diff = a.setdiff(&b);
        diff.sort();
        assert_eq!(diff, vec![(1, 1), (3, 3)]);
    }

    #[test]
    fn merge_combines_overlapping_keys() {
        let a = trie_from(&[(1, 10), (2, 20)]);
        let b = trie_from(&[(2, 2), (3, 30)]);
        let merged = a.merge(&b, |x, y| x + y);
        assert_eq!(merged.get(&1), Some(&10));
        assert_eq!(merged.get(&2), Some(&22));
        assert_eq!(merged.get(&3), Some(&30));
    }
}
