use std::collections::BTreeMap;
use std::thread;

use augbtree::{Map, Set};

#[test]
fn basic_sort_order() {
    let mut set = Set::new();
    set.upsert(2);
    set.upsert(12);
    set.upsert(1);

    let mut it = set.iter();
    it.first();
    for expected in [1, 2, 12] {
        assert!(it.valid());
        assert_eq!(it.key(), &expected);
        it.next();
    }
    assert!(!it.valid());
}

#[test]
fn delete_cascade() {
    let mut map = Map::new();
    for i in 0..768 {
        map.upsert(i, i);
    }
    for i in 0..768 {
        assert_eq!(map.delete(&i), Some((i, i)));
        assert_eq!(map.len(), (767 - i) as usize);

        let mut it = map.iter();
        it.first();
        let mut expected = i + 1;
        while it.valid() {
            assert_eq!(it.key(), &expected);
            expected += 1;
            it.next();
        }
        assert_eq!(expected, 768);
    }
    assert!(map.is_empty());
    assert_eq!(map.height(), 0);
}

#[test]
fn reverse_insert() {
    let mut map = Map::new();
    for i in (1..768).rev() {
        map.upsert(i, ());
    }
    let mut it = map.iter();
    it.first();
    for expected in 1..768 {
        assert!(it.valid());
        assert_eq!(it.key(), &expected);
        it.next();
    }
    assert!(!it.valid());
}

#[test]
fn seek_around_even_keys() {
    let mut map = Map::new();
    for k in (0..=1024).step_by(2) {
        map.upsert(k, ());
    }
    let mut it = map.iter();
    for k in (1..1024).step_by(2) {
        it.seek_ge(&k);
        assert!(it.valid(), "seek_ge({k}) found nothing");
        assert_eq!(it.key(), &(k + 1));

        it.seek_lt(&k);
        assert!(it.valid(), "seek_lt({k}) found nothing");
        assert_eq!(it.key(), &(k - 1));
    }

    it.seek_ge(&0);
    assert_eq!(it.key(), &0);
    it.seek_lt(&0);
    assert!(!it.valid());
    it.seek_ge(&1025);
    assert!(!it.valid());
}

#[test]
fn iterate_backwards() {
    let map: Map<i64, i64> = (0..500).map(|i| (i, -i)).collect();
    let mut it = map.iter();
    it.last();
    for expected in (0..500).rev() {
        assert!(it.valid());
        assert_eq!(it.key(), &expected);
        assert_eq!(it.value(), &-expected);
        it.prev();
    }
    assert!(!it.valid());
}

#[test]
fn upsert_returns_replaced_entry() {
    let mut map = Map::new();
    assert_eq!(map.upsert(1, "a"), None);
    assert_eq!(map.upsert(1, "b"), Some((1, "a")));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&1), Some(&"b"));
}

#[test]
fn delete_missing_is_none() {
    let mut map: Map<i64, ()> = Map::new();
    assert_eq!(map.delete(&3), None);
    map.upsert(1, ());
    assert_eq!(map.delete(&3), None);
    assert_eq!(map.len(), 1);
}

#[test]
fn matches_std_btreemap_on_mixed_workload() {
    let mut map = Map::new();
    let mut model = BTreeMap::new();
    let mut state: u64 = 0x9E3779B97F4A7C15;
    for _ in 0..20_000 {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let key = ((state >> 33) % 2048) as i64;
        let value = (state >> 17) as i64;
        match state % 3 {
            0 | 1 => {
                assert_eq!(
                    map.upsert(key, value).map(|(_, v)| v),
                    model.insert(key, value)
                );
            }
            _ => {
                assert_eq!(map.delete(&key).map(|(_, v)| v), model.remove(&key));
            }
        }
        assert_eq!(map.len(), model.len());
    }

    let mut it = map.iter();
    it.first();
    for (k, v) in &model {
        assert!(it.valid());
        assert_eq!(it.key(), k);
        assert_eq!(it.value(), v);
        it.next();
    }
    assert!(!it.valid());
}

#[test]
fn clone_preserves_snapshot() {
    let mut map = Map::new();
    for i in 0..512 {
        map.upsert(i, i * 2);
    }
    let snapshot = map.clone();

    for i in 0..256 {
        map.delete(&i);
    }
    map.upsert(9999, 0);

    assert_eq!(snapshot.len(), 512);
    let mut it = snapshot.iter();
    it.first();
    for i in 0..512 {
        assert!(it.valid());
        assert_eq!(it.key(), &i);
        assert_eq!(it.value(), &(i * 2));
        it.next();
    }
    assert!(!it.valid());
    assert_eq!(snapshot.get(&9999), None);
}

#[test]
fn clones_mutate_concurrently() {
    let mut map = Map::new();
    let mut clones = Vec::new();
    for i in 0..1000 {
        map.upsert(i, ());
        if (i + 1) % 200 == 0 {
            clones.push((map.clone(), i + 1));
        }
    }

    let handles: Vec<_> = clones
        .into_iter()
        .map(|(mut clone, size)| {
            thread::spawn(move || {
                for k in size / 2..size {
                    assert!(clone.delete(&k).is_some());
                }
                let mut it = clone.iter();
                it.first();
                let mut expected = 0;
                while it.valid() {
                    assert_eq!(it.key(), &expected);
                    expected += 1;
                    it.next();
                }
                assert_eq!(expected, size / 2);
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("clone worker panicked");
    }

    assert_eq!(map.len(), 1000);
    for i in 0..1000 {
        assert!(map.contains_key(&i));
    }
}

#[test]
fn newick_rendering() {
    let mut map: Map<i64, i64> = Map::new();
    assert_eq!(map.to_string(), ";");

    map.upsert(2, 20);
    map.upsert(1, 10);
    map.upsert(12, 120);
    assert_eq!(map.to_string(), "1:10,2:20,12:120");

    // Enough entries to force a split: the root renders parenthesized
    // subtrees around its separators.
    for i in 0..40 {
        map.upsert(i, i);
    }
    let rendered = map.to_string();
    assert!(rendered.starts_with('('));
    assert!(rendered.ends_with(')'));
}

#[test]
fn reset_empties_the_map() {
    let mut map: Map<i64, i64> = (0..300).map(|i| (i, i)).collect();
    assert_eq!(map.len(), 300);
    map.reset();
    assert!(map.is_empty());
    assert_eq!(map.get(&5), None);
    let mut it = map.iter();
    it.first();
    assert!(!it.valid());
    drop(it);

    map.upsert(1, 1);
    assert_eq!(map.len(), 1);
}

#[test]
fn set_operations() {
    let mut set: Set<&str> = ["b", "a", "c"].into_iter().collect();
    assert_eq!(set.len(), 3);
    assert!(set.contains(&"a"));
    assert_eq!(set.upsert("a"), Some("a"));
    assert_eq!(set.delete(&"b"), Some("b"));
    assert!(!set.contains(&"b"));
    assert_eq!(format!("{set:?}"), r#"{"a", "c"}"#);
}

#[test]
fn debug_renders_entries() {
    let mut map = Map::new();
    map.upsert(2, 'b');
    map.upsert(1, 'a');
    assert_eq!(format!("{map:?}"), "{1: 'a', 2: 'b'}");
}

#[test]
fn custom_comparator_orders_iteration() {
    let mut map = Map::with_cmp(|a: &i64, b: &i64| b.cmp(a));
    for i in 0..100 {
        map.upsert(i, ());
    }
    let mut it = map.iter();
    it.first();
    for expected in (0..100).rev() {
        assert!(it.valid());
        assert_eq!(it.key(), &expected);
        it.next();
    }
}
