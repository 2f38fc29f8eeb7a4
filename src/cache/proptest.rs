//! Property-Based Tests for the LRU Cache
//!
//! # Test Properties
//!
//! 1. **Capacity Law**: after every `add`, `used_bytes <= capacity` when bounded
//! 2. **Recency Set**: the surviving entries are exactly the most recently
//!    touched ones that fit the budget, in recency order
//! 3. **Accounting**: `used_bytes` always equals the sum of live entry sizes

#![cfg(test)]

use proptest::prelude::*;

use super::lru::LruCache;

#[derive(Debug, Clone)]
enum Op {
    Add(String, String),
    Get(String),
}

fn key_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "bb", "k1", "k2", "key3", "longer-key"])
        .prop_map(str::to_string)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (key_strategy(), "[a-z]{0,12}").prop_map(|(k, v)| Op::Add(k, v)),
        1 => key_strategy().prop_map(Op::Get),
    ]
}

/// Reference model: entries most-recent first, evicted from the back
fn model_apply(model: &mut Vec<(String, String)>, capacity: i64, op: &Op) {
    match op {
        Op::Add(key, value) => {
            model.retain(|(k, _)| k != key);
            model.insert(0, (key.clone(), value.clone()));
            while capacity != 0 && model_size(model) > capacity {
                model.pop();
            }
        }
        Op::Get(key) => {
            if let Some(pos) = model.iter().position(|(k, _)| k == key) {
                let entry = model.remove(pos);
                model.insert(0, entry);
            }
        }
    }
}

fn model_size(model: &[(String, String)]) -> i64 {
    model.iter().map(|(k, v)| (k.len() + v.len()) as i64).sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: bounded caches never exceed their budget after an add.
    #[test]
    fn prop_capacity_law(
        capacity in 1i64..64,
        ops in prop::collection::vec(op_strategy(), 1..80),
    ) {
        let mut cache = LruCache::new(capacity);
        for op in &ops {
            match op {
                Op::Add(k, v) => {
                    cache.add(k.as_str(), v.clone());
                    prop_assert!(cache.used_bytes() <= capacity);
                }
                Op::Get(k) => {
                    cache.get(k);
                }
            }
        }
    }

    /// Property: the cache matches a straightforward recency-list model.
    #[test]
    fn prop_matches_recency_model(
        capacity in prop_oneof![Just(0i64), 1i64..64],
        ops in prop::collection::vec(op_strategy(), 1..80),
    ) {
        let mut cache = LruCache::new(capacity);
        let mut model: Vec<(String, String)> = Vec::new();

        for op in &ops {
            match op {
                Op::Add(k, v) => cache.add(k.as_str(), v.clone()),
                Op::Get(k) => {
                    let expected = model.iter().find(|(mk, _)| mk == k).map(|(_, v)| v.clone());
                    prop_assert_eq!(cache.get(k).cloned(), expected);
                }
            }
            model_apply(&mut model, capacity, op);

            let keys: Vec<&str> = cache.keys().collect();
            let model_keys: Vec<&str> = model.iter().map(|(k, _)| k.as_str()).collect();
            prop_assert_eq!(keys, model_keys);
            prop_assert_eq!(cache.used_bytes(), model_size(&model));
        }
    }
}
