use assert_matches::assert_matches;
use proptest::prelude::*;

use super::*;
use crate::{
    CommitmentHash,
    test_utils::{ToyHash, test_commitment},
};

type ToyTree = IncrementalMerkleTree<ToyHash, 4>;
type ToyWitness = MerkleWitness<ToyHash, 4>;

/// Append `leaves` to a fresh tree, witnessing the leaf at `witnessed`.
fn tree_with_witness(leaves: &[u16], witnessed: usize) -> (ToyTree, ToyWitness) {
    let mut tree = ToyTree::new();
    let mut witness = None;
    for (i, &leaf) in leaves.iter().enumerate() {
        tree.append(ToyHash(leaf)).unwrap().expect("tree append");
        if let Some(w) = witness.as_mut() {
            MerkleWitness::append(w, ToyHash(leaf)).unwrap().expect("witness append");
        }
        if i == witnessed {
            witness = Some(ToyWitness::from_leaf(&tree).expect("witness"));
        }
    }
    (tree, witness.expect("witnessed index in range"))
}

#[test]
fn test_witness_of_empty_tree_fails() {
    assert_matches!(
        ToyWitness::from_leaf(&ToyTree::new()),
        Err(CommitmentTreeError::EmptyTree)
    );
}

#[test]
fn test_completing_cursor_counts_subtree_hashing() {
    let (_, mut witness) = tree_with_witness(&[1, 2, 3], 2);
    for leaf in 4..=7 {
        witness.append(ToyHash(leaf)).unwrap().expect("witness append");
    }
    assert_eq!(witness.cursor_depth, 2);
    assert!(witness.cursor.is_some());

    let cost = witness.append(ToyHash(8)).cost;
    assert_eq!(cost.compress_calls, 2);
    assert!(witness.cursor.is_none());
    assert_eq!(witness.filled.len(), 2);
}

#[test]
fn test_every_leaf_path_matches_tree_root() {
    let leaves: Vec<u16> = (1..=11).collect();
    for witnessed in 0..leaves.len() {
        let (tree, witness) = tree_with_witness(&leaves, witnessed);
        assert_eq!(witness.position(), witnessed as u64);
        assert_eq!(witness.element(), Some(&ToyHash(leaves[witnessed])));
        assert_eq!(witness.root(), tree.root());

        let path = witness.padded_path().expect("padded path");
        assert_eq!(path.position(), witnessed as u64);
        assert!(path.verify(&ToyHash(leaves[witnessed]), &tree.root()));
    }
}

#[test]
fn test_strict_path_requires_all_levels() {
    let (_, mut witness) = tree_with_witness(&[7], 0);
    assert_eq!(witness.resolved_levels(), 0);
    assert_matches!(
        witness.path(),
        Err(CommitmentTreeError::Incomplete {
            resolved: 0,
            depth: 4
        })
    );

    // The right sibling at level 0 is a single leaf.
    witness.append(ToyHash(8)).unwrap().expect("append 8");
    assert_eq!(witness.resolved_levels(), 1);

    // Level 1 needs two more leaves; the first leaves a cursor open.
    witness.append(ToyHash(9)).unwrap().expect("append 9");
    assert_eq!(witness.resolved_levels(), 1);
    assert!(witness.cursor.is_some());
    witness.append(ToyHash(10)).unwrap().expect("append 10");
    assert_eq!(witness.resolved_levels(), 2);
    assert!(witness.cursor.is_none());

    for leaf in 11..23 {
        witness.append(ToyHash(leaf)).unwrap().expect("append");
    }
    assert!(witness.is_complete());
    assert_eq!(witness.resolved_levels(), 4);

    let mut leaves: Vec<u16> = vec![7];
    leaves.extend(8..23);
    let mut tree = ToyTree::new();
    for leaf in &leaves {
        tree.append(ToyHash(*leaf)).unwrap().expect("tree append");
    }
    let path = witness.path().expect("complete path");
    assert_eq!(path, witness.padded_path().expect("padded"));
    assert!(path.verify(&ToyHash(7), &tree.root()));
}

#[test]
fn test_last_leaf_of_full_tree_is_complete_immediately() {
    let leaves: Vec<u16> = (0..16).collect();
    let (tree, witness) = tree_with_witness(&leaves, 15);
    assert!(witness.is_complete());
    assert!(witness.path().expect("path").verify(&ToyHash(15), &tree.root()));
}

#[test]
fn test_witness_rejects_append_past_capacity() {
    let leaves: Vec<u16> = (0..16).collect();
    let (_, mut witness) = tree_with_witness(&leaves, 3);
    let before = witness.clone();
    assert_matches!(
        witness.append(ToyHash(1)).unwrap(),
        Err(CommitmentTreeError::DepthExceeded { depth: 4 })
    );
    assert_eq!(witness, before);
}

#[test]
fn test_commitment_hash_witness_survives_many_appends() {
    let mut tree = IncrementalMerkleTree::<CommitmentHash, 16>::new();
    for i in 0..5 {
        tree.append(test_commitment(i)).unwrap().expect("append");
    }
    let mut witness = MerkleWitness::from_leaf(&tree).expect("witness");
    for i in 5..300 {
        tree.append(test_commitment(i)).unwrap().expect("append");
        witness.append(test_commitment(i)).unwrap().expect("witness append");
    }
    assert_eq!(witness.root(), tree.root());
    let path = witness.padded_path().expect("path");
    assert_eq!(path.position(), 4);
    assert!(path.verify(&test_commitment(4), &tree.root()));
    assert!(!path.verify(&test_commitment(5), &tree.root()));
}

proptest! {
    #[test]
    fn prop_witness_path_verifies(
        leaves in proptest::collection::vec(any::<u16>(), 1..=64),
        pick in any::<prop::sample::Index>(),
    ) {
        let witnessed = pick.index(leaves.len());
        let mut tree = IncrementalMerkleTree::<ToyHash, 6>::new();
        let mut witness = None;
        for (i, leaf) in leaves.iter().enumerate() {
            tree.append(ToyHash(*leaf)).unwrap().expect("append");
            if let Some(w) = witness.as_mut() {
                MerkleWitness::append(w, ToyHash(*leaf)).unwrap().expect("witness append");
            }
            if i == witnessed {
                witness = Some(MerkleWitness::from_leaf(&tree).expect("witness"));
            }
        }
        let witness = witness.expect("witness created");
        prop_assert_eq!(witness.root(), tree.root());
        let path = witness.padded_path().expect("path");
        prop_assert_eq!(path.position(), witnessed as u64);
        prop_assert!(path.verify(&ToyHash(leaves[witnessed]), &tree.root()));
    }
}
