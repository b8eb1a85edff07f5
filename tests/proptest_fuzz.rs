//! Property-based tests (fuzzing) for cart sync resilience.
//!
//! Uses proptest to generate random/malformed inputs and verify the local
//! store never panics on a bad payload, the merge never loses a line, and
//! cart mutations keep their invariants.
//!
//! Run with: `cargo test --test proptest_fuzz`

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::Value;

use cart_sync::{Cart, CartItem, DurableLocalStore, ItemDescriptor, LocalTier, MemoryTier, MergeEngine, Seller};

// =============================================================================
// Strategies for generating test data
// =============================================================================

fn make_item(id: u64, quantity: u32, saved: bool, minutes: i64) -> CartItem {
    CartItem {
        id,
        title: format!("Card {}", id),
        price: 1.5,
        currency: "USD".into(),
        image: String::new(),
        quantity,
        seller: Seller {
            name: "shop".into(),
            verified: id % 2 == 0,
        },
        saved_for_later: saved,
        added_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes),
    }
}

/// A cart snapshot with unique ids, as either side would hold it
fn snapshot_strategy() -> impl Strategy<Value = Vec<CartItem>> {
    prop::collection::btree_map(0u64..30, (1u32..10, any::<bool>(), 0i64..10_000), 0..15).prop_map(
        |lines: BTreeMap<u64, (u32, bool, i64)>| {
            lines
                .into_iter()
                .map(|(id, (quantity, saved, minutes))| make_item(id, quantity, saved, minutes))
                .collect()
        },
    )
}

/// Generate arbitrary JSON values (including invalid structures)
fn arbitrary_json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        ".*".prop_map(Value::String),
    ];

    leaf.prop_recursive(
        4,   // depth
        64,  // max nodes
        10,  // items per collection
        |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..10)
                    .prop_map(Value::Array),
                prop::collection::hash_map(".*", inner, 0..10)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        },
    )
}

#[derive(Debug, Clone)]
enum Op {
    Add(u64),
    Remove(u64),
    SetQuantity(u64, u32),
    SaveForLater(u64),
    MoveToCart(u64),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u64..8).prop_map(Op::Add),
        1 => (0u64..8).prop_map(Op::Remove),
        2 => (0u64..8, 1u32..20).prop_map(|(id, q)| Op::SetQuantity(id, q)),
        1 => (0u64..8).prop_map(Op::SaveForLater),
        1 => (0u64..8).prop_map(Op::MoveToCart),
        1 => Just(Op::Clear),
    ]
}

/// Store whose only tier holds `payload`
fn store_holding(payload: &str) -> DurableLocalStore {
    let tier = MemoryTier::new();
    tier.write("eceCart", payload).unwrap();
    DurableLocalStore::new("eceCart", vec![Box::new(tier)])
}

// =============================================================================
// Local Payload Fuzz Tests
// =============================================================================

proptest! {
    /// Loading random bytes never panics; garbage resets to an empty cart
    #[test]
    fn fuzz_local_load_from_random_bytes(bytes in prop::collection::vec(any::<u8>(), 0..4096)) {
        let store = store_holding(&String::from_utf8_lossy(&bytes));
        let loaded = store.load();

        if loaded.recovered {
            prop_assert!(loaded.cart.is_empty());
            // The bad payload is gone
            prop_assert!(store.load().tier.is_none());
        }
    }

    /// Arbitrary JSON either happens to be a cart or is discarded cleanly
    #[test]
    fn fuzz_local_load_from_arbitrary_json(json in arbitrary_json_strategy()) {
        let store = store_holding(&serde_json::to_string(&json).unwrap());
        let loaded = store.load();

        prop_assert!(loaded.recovered || loaded.tier.is_some());
        prop_assert!(loaded.cart.items().iter().all(|i| i.quantity >= 1));
    }

    /// Corrupted serialized cart should fail gracefully
    #[test]
    fn fuzz_corrupted_local_cart(
        items in snapshot_strategy(),
        corruption in prop::collection::vec(any::<u8>(), 1..50),
        position in 0usize..10000,
    ) {
        let mut corrupted = serde_json::to_vec(&items).unwrap();
        let pos = position % corrupted.len();

        for (i, b) in corruption.iter().enumerate() {
            let idx = (pos + i) % corrupted.len();
            corrupted[idx] ^= b;
        }

        // Should never panic
        let store = store_holding(&String::from_utf8_lossy(&corrupted));
        let _ = store.load();
    }
}

// =============================================================================
// Merge Invariant Tests
// =============================================================================

proptest! {
    /// No line from either side is lost, and no id appears twice
    #[test]
    fn prop_merge_keeps_every_line_once(local in snapshot_strategy(), remote in snapshot_strategy()) {
        let report = MergeEngine::merge(&local, &remote);

        let expected: HashSet<u64> = local.iter().chain(&remote).map(|i| i.id).collect();
        let merged: Vec<u64> = report.items.iter().map(|i| i.id).collect();
        let unique: HashSet<u64> = merged.iter().copied().collect();

        prop_assert_eq!(merged.len(), unique.len());
        prop_assert_eq!(unique, expected);
        prop_assert_eq!(report.combined + report.remote_only + report.local_only, report.items.len());
    }

    /// Quantity is the max of both sides, addedAt the later one, saved flag local
    #[test]
    fn prop_merge_tie_breaks(local in snapshot_strategy(), remote in snapshot_strategy()) {
        let report = MergeEngine::merge(&local, &remote);

        for item in &report.items {
            let l = local.iter().find(|i| i.id == item.id);
            let r = remote.iter().find(|i| i.id == item.id);
            match (l, r) {
                (Some(l), Some(r)) => {
                    prop_assert_eq!(item.quantity, l.quantity.max(r.quantity));
                    prop_assert_eq!(item.added_at, l.added_at.max(r.added_at));
                    prop_assert_eq!(item.saved_for_later, l.saved_for_later);
                }
                (Some(only), None) | (None, Some(only)) => prop_assert_eq!(item, only),
                (None, None) => prop_assert!(false, "merged line {} came from nowhere", item.id),
            }
        }
    }

    /// Remote order is kept; local-only lines follow in local order
    #[test]
    fn prop_merge_order(local in snapshot_strategy(), remote in snapshot_strategy()) {
        let report = MergeEngine::merge(&local, &remote);
        let remote_ids: Vec<u64> = remote.iter().map(|i| i.id).collect();
        let local_only: Vec<u64> = local
            .iter()
            .map(|i| i.id)
            .filter(|id| !remote_ids.contains(id))
            .collect();

        let merged: Vec<u64> = report.items.iter().map(|i| i.id).collect();
        prop_assert_eq!(&merged[..remote_ids.len()], &remote_ids[..]);
        prop_assert_eq!(&merged[remote_ids.len()..], &local_only[..]);
    }

    /// Merging a merged cart against itself changes nothing
    #[test]
    fn prop_merge_converges(local in snapshot_strategy(), remote in snapshot_strategy()) {
        let first = MergeEngine::merge(&local, &remote);
        let second = MergeEngine::merge(&first.items, &first.items);

        prop_assert!(!second.differs_from_remote);
        prop_assert_eq!(second.items, first.items);
    }
}

// =============================================================================
// Cart Invariant Tests
// =============================================================================

proptest! {
    /// Any sequence of mutations keeps ids unique and quantities positive
    #[test]
    fn prop_cart_invariants(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut cart = Cart::new();
        let now = Utc::now();

        for op in ops {
            match op {
                Op::Add(id) => {
                    cart.add(
                        ItemDescriptor {
                            id,
                            title: format!("Card {}", id),
                            price: 2.0,
                            currency: "USD".into(),
                            image: String::new(),
                            seller: Seller { name: "shop".into(), verified: true },
                        },
                        now,
                    );
                }
                Op::Remove(id) => {
                    cart.remove(id);
                }
                Op::SetQuantity(id, q) => {
                    cart.set_quantity(id, q);
                }
                Op::SaveForLater(id) => {
                    cart.save_for_later(id);
                }
                Op::MoveToCart(id) => {
                    cart.move_to_cart(id, now);
                }
                Op::Clear => cart.clear(),
            }

            let ids: HashSet<u64> = cart.items().iter().map(|i| i.id).collect();
            prop_assert_eq!(ids.len(), cart.len());
            prop_assert!(cart.items().iter().all(|i| i.quantity >= 1));

            let active: u32 = cart.items().iter().filter(|i| !i.saved_for_later).map(|i| i.quantity).sum();
            prop_assert_eq!(cart.item_count(), active);
            prop_assert!((cart.subtotal() - f64::from(active) * 2.0).abs() < 1e-6);
        }
    }

    /// Whatever the cart holds survives a write and reload through the store
    #[test]
    fn prop_local_store_reload(items in snapshot_strategy()) {
        let cart = Cart::from_items(items);
        let store = DurableLocalStore::new("eceCart", vec![Box::new(MemoryTier::new())]);
        store.persist(&cart).unwrap();

        let loaded = store.load();
        prop_assert!(!loaded.recovered);
        prop_assert_eq!(loaded.cart.items(), cart.items());
    }
}
