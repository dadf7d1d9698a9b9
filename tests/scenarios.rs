//! End-to-end scenarios against the public API: commitment determinism
//! across operation orderings, deletion reorganization, persistence
//! round-trips, and proof soundness.

mod common;

use auth_trie::{proof, Arity, Blake2b256, HashCommitmentModel, Trie};
use common::MemoryStore;
use rand::prelude::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

fn new_trie(store: &MemoryStore, arity: Arity, opt_key_commit: bool) -> Trie<'_, MemoryStore, HashCommitmentModel<Blake2b256>> {
    Trie::new(HashCommitmentModel::new(arity), store, arity, opt_key_commit)
}

/// S1 — insertion order does not affect the committed root.
#[test]
fn s1_insertion_order_independence() {
    let store_a = MemoryStore::default();
    let mut a = new_trie(&store_a, Arity::Binary, false);
    a.update(b"a", b"k").unwrap();
    a.update(b"ab", b"l").unwrap();
    let root_a = a.commit();

    let store_b = MemoryStore::default();
    let mut b = new_trie(&store_b, Arity::Binary, false);
    b.update(b"ab", b"l").unwrap();
    b.update(b"a", b"k").unwrap();
    let root_b = b.commit();

    assert_eq!(root_a, root_b);
    assert!(root_a.is_some());
}

/// S2 — inserting and then deleting an extra key leaves the root unchanged
/// relative to never having inserted it.
#[test]
fn s2_insert_then_delete_matches_never_inserted() {
    let store_a = MemoryStore::default();
    let mut a = new_trie(&store_a, Arity::Byte, false);
    a.update(b"ab1", b"1").unwrap();
    a.update(b"ab2c", b"2").unwrap();
    a.update(b"ab4", b"4").unwrap();
    let root_a = a.commit();

    let store_b = MemoryStore::default();
    let mut b = new_trie(&store_b, Arity::Byte, false);
    b.update(b"ab1", b"1").unwrap();
    b.update(b"ab2c", b"2").unwrap();
    b.update(b"ab4", b"4").unwrap();
    b.update(b"ab2a", b"x").unwrap();
    b.delete(b"ab2a").unwrap();
    let root_b = b.commit();

    assert_eq!(root_a, root_b);
}

/// S3 — presence and absence proofs over a small nibble-arity trie.
#[test]
fn s3_presence_and_absence_proofs() {
    let store = MemoryStore::default();
    let mut trie = new_trie(&store, Arity::Nibble, false);
    for key in [b"".as_slice(), b"1".as_slice(), b"2".as_slice()] {
        trie.update(key, key).unwrap();
    }
    let root = trie.commit().unwrap();

    let present = proof(&mut trie, b"1").unwrap();
    assert!(!present.is_absence());
    present.validate(&root, Some(b"1")).unwrap();

    let absent = proof(&mut trie, b"3").unwrap();
    assert!(absent.is_absence());
    absent.validate(&root, None).unwrap();
}

/// A key that lands exactly on a pure-branch node (no terminal, only
/// children) must prove absent, not present.
#[test]
fn absence_proof_for_key_landing_on_a_branch_node() {
    let store = MemoryStore::default();
    let mut trie = new_trie(&store, Arity::Byte, false);
    trie.update(b"ab1", b"1").unwrap();
    trie.update(b"ab2c", b"2").unwrap();
    trie.update(b"ab4", b"4").unwrap();
    let root = trie.commit().unwrap();

    let p = proof(&mut trie, b"ab").unwrap();
    assert!(p.is_absence());
    p.validate(&root, None).unwrap();
}

/// S4 — deleting a later insertion restores the root the trie had before it.
#[test]
fn s4_delete_restores_prior_root() {
    let store_a = MemoryStore::default();
    let mut a = new_trie(&store_a, Arity::Byte, false);
    a.update(b"abcd", b"1").unwrap();
    a.update(b"ab1234", b"2").unwrap();
    a.commit();
    a.delete(b"ab1234").unwrap();
    let root_after_delete = a.commit();

    let store_b = MemoryStore::default();
    let mut b = new_trie(&store_b, Arity::Byte, false);
    b.update(b"abcd", b"1").unwrap();
    let root_single = b.commit();

    assert_eq!(root_after_delete, root_single);
}

/// S5 — a large permuted insertion order reaches the same root and the same
/// persisted store contents, after clearing the cache in between.
#[test]
fn s5_large_permutation_reaches_identical_store() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
    let keys: Vec<Vec<u8>> = (0u32..2000).map(|i| i.to_le_bytes().to_vec()).collect();

    let store_a = MemoryStore::default();
    let root_a = {
        let mut a = new_trie(&store_a, Arity::Byte, false);
        for k in &keys {
            a.update(k, k).unwrap();
        }
        let root = a.commit();
        a.persist_mutations(&mut MemoryStoreWriter(&store_a)).unwrap();
        a.clear_cache();
        root
    };

    let mut permuted = keys.clone();
    permuted.shuffle(&mut rng);

    let store_b = MemoryStore::default();
    let root_b = {
        let mut b = new_trie(&store_b, Arity::Byte, false);
        for k in &permuted {
            b.update(k, k).unwrap();
        }
        let root = b.commit();
        b.persist_mutations(&mut MemoryStoreWriter(&store_b)).unwrap();
        b.clear_cache();
        root
    };

    assert_eq!(root_a, root_b);
    assert_eq!(store_a.snapshot(), store_b.snapshot());
}

/// A thin `KVWriter` forwarding to the interior-mutable `MemoryStore`, since
/// `persist_mutations` takes `&mut W` but the trie only ever holds `&R`.
struct MemoryStoreWriter<'a>(&'a MemoryStore);

impl<'a> auth_trie::KVWriter for MemoryStoreWriter<'a> {
    type Error = std::convert::Infallible;

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), Self::Error> { self.0.put_through(key, value) }

    fn delete(&mut self, key: &[u8]) -> Result<(), Self::Error> { self.0.delete_through(key) }
}

/// S6 — a proof round-trips through its wire format with validation intact.
#[test]
fn s6_proof_roundtrips_through_bytes() {
    let store = MemoryStore::default();
    let mut trie = new_trie(&store, Arity::Nibble, false);
    trie.update(b"alpha", b"1").unwrap();
    trie.update(b"alter", b"2").unwrap();
    let root = trie.commit().unwrap();

    let p = proof(&mut trie, b"alter").unwrap();
    let encoded = p.bytes();
    let decoded = auth_trie::Proof::<Blake2b256>::from_bytes(&encoded).unwrap();

    assert_eq!(decoded.key_with_terminal().0, p.key_with_terminal().0);
    decoded.validate(&root, Some(b"2")).unwrap();
    assert_eq!(decoded.is_absence(), p.is_absence());
}

/// Invariant 7 — deleting every inserted key empties the root.
#[test]
fn deletion_to_empty_is_idempotent() {
    let store = MemoryStore::default();
    let mut trie = new_trie(&store, Arity::Byte, false);
    let keys: Vec<&[u8]> = vec![b"one", b"two", b"three", b"onetwothree"];
    for k in &keys {
        trie.update(k, k).unwrap();
    }
    trie.commit();
    for k in &keys {
        trie.delete(k).unwrap();
    }
    let root = trie.commit();
    assert!(root.is_none());
}

/// Invariant 8 — a trie rebuilt from a snapshot via `update_all` reconciles
/// clean against the same entries.
#[test]
fn reconcile_after_update_all_is_clean() {
    let entries = vec![
        (b"a".to_vec(), b"1".to_vec()),
        (b"b".to_vec(), b"22".to_vec()),
        (b"c".to_vec(), b"333".to_vec()),
    ];

    let store = MemoryStore::default();
    let mut trie = new_trie(&store, Arity::Byte, false);
    trie.update_all(entries.clone()).unwrap();
    trie.commit();

    let mismatched = trie.reconcile(entries).unwrap();
    assert!(mismatched.is_empty());
}

/// Invariant 9 — the key-commitment optimization is transparent: the root
/// is identical whether or not `opt_key_commit` is enabled, for entries
/// where the value equals the key.
#[test]
fn key_commitment_optimization_is_transparent() {
    let entries = vec![(b"same".to_vec(), b"same".to_vec()), (b"other".to_vec(), b"value".to_vec())];

    let store_plain = MemoryStore::default();
    let mut plain = new_trie(&store_plain, Arity::Byte, false);
    plain.update_all(entries.clone()).unwrap();
    let root_plain = plain.commit();

    let store_opt = MemoryStore::default();
    let mut opt = new_trie(&store_opt, Arity::Byte, true);
    opt.update_all(entries).unwrap();
    let root_opt = opt.commit();

    assert_eq!(root_plain, root_opt);
}
