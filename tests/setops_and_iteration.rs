use hashtrie::HashTrie;
use std::collections::HashSet;

fn trie_from(entries: impl IntoIterator<Item = (i64, i64)>) -> HashTrie<i64, i64> {
    let mut trie = HashTrie::new();
    for (k, v) in entries {
        trie.insert(k, v).unwrap();
    }
    trie
}

#[test]
fn setdiff_is_cheap_after_a_branch_with_few_changes() {
    let mut base = trie_from((0..10_000i64).map(|i| (i, i)));
    let mut branch = base.branch();
    branch.insert(10_000, 10_000).unwrap();
    branch.delete(&0).unwrap();

    let diff = branch.setdiff(&base);
    assert_eq!(diff.len(), 1);
    assert_eq!(diff[0], (10_000, 10_000));

    let reverse_diff = base.setdiff(&branch);
    assert_eq!(reverse_diff.len(), 1);
    assert_eq!(reverse_diff[0], (0, 0));
}

#[test]
fn equals_is_insensitive_to_insertion_order() {
    let forward = trie_from((0..500i64).map(|i| (i, i * i)));
    let backward = trie_from((0..500i64).rev().map(|i| (i, i * i)));
    assert!(forward.equals(&backward));
}

#[test]
fn merge_resolves_collisions_with_the_provided_combiner() {
    let a = trie_from([(1, 10), (2, 20), (3, 30)]);
    let b = trie_from([(2, 2), (3, 3), (4, 40)]);
    let merged = a.merge(&b, |ours, theirs| ours - theirs);
    assert_eq!(merged.get(&1), Some(&10));
    assert_eq!(merged.get(&2), Some(&18));
    assert_eq!(merged.get(&3), Some(&27));
    assert_eq!(merged.get(&4), Some(&40));
}

#[test]
fn merge_inplace_requires_a_mutable_receiver() {
    let mut a = trie_from([(1, 1)]);
    let b = trie_from([(1, 100), (2, 2)]);
    a.merge_inplace(&b, |ours, theirs| ours + theirs).unwrap();
    assert_eq!(a.get(&1), Some(&101));
    assert_eq!(a.get(&2), Some(&2));

    let frozen = a.branch();
    let mut stale_handle = a;
    assert!(stale_handle.merge_inplace(&frozen, |x, _| *x).is_err());
}

#[test]
fn iteration_visits_every_key_exactly_once_across_every_size_regime() {
    for size in [0usize, 1, 15, 16, 1_000, 20_000] {
        let trie = trie_from((0..size as i64).map(|i| (i, i)));
        let keys: HashSet<i64> = trie.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys.len(), size);
        assert_eq!(trie.iter().count() as u64, trie.length());
    }
}
