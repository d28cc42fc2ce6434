use augbtree::{IntervalMap, KeyBound};

fn collect_overlaps<V>(map: &IntervalMap<(i64, i64), V, i64>, query: (i64, i64)) -> Vec<(i64, i64)> {
    let mut hits = Vec::new();
    let mut it = map.iter();
    it.first_overlap(query);
    while it.valid() {
        hits.push(*it.interval());
        it.next_overlap();
    }
    hits
}

#[test]
fn overlap_scan_emits_in_start_order() {
    let mut map = IntervalMap::new();
    for interval in [(1, 2), (2, 3), (1, 5), (0, 6), (2, 7)] {
        map.upsert(interval, 0);
    }
    assert_eq!(collect_overlaps(&map, (4, 5)), [(0, 6), (1, 5), (2, 7)]);
}

#[test]
fn overlap_scan_includes_points() {
    let mut map = IntervalMap::new();
    for interval in [(1, 4), (2, 5), (3, 3), (3, 6), (4, 7)] {
        map.upsert(interval, 0);
    }
    assert_eq!(collect_overlaps(&map, (2, 3)), [(1, 4), (2, 5)]);
    assert_eq!(
        collect_overlaps(&map, (2, 4)),
        [(1, 4), (2, 5), (3, 3), (3, 6)]
    );
}

#[test]
fn iteration_orders_by_start_then_end() {
    let mut map = IntervalMap::new();
    for (i, interval) in [(1, 4), (2, 5), (3, 3), (3, 6), (4, 7)].into_iter().enumerate() {
        map.upsert(interval, i as i64);
    }
    let mut it = map.iter();
    it.first();
    for expected in [(1, 4), (2, 5), (3, 3), (3, 6), (4, 7)] {
        assert!(it.valid());
        assert_eq!(it.interval(), &expected);
        it.next();
    }
    assert!(!it.valid());
}

#[test]
fn point_queries_hit_covering_intervals() {
    let mut map = IntervalMap::new();
    map.upsert((0, 10), 'a');
    map.upsert((5, 5), 'b');
    map.upsert((6, 8), 'c');

    // A point query overlaps intervals covering that point.
    assert_eq!(collect_overlaps(&map, (5, 5)), [(0, 10), (5, 5)]);
    assert_eq!(collect_overlaps(&map, (9, 9)), [(0, 10)]);
    assert!(collect_overlaps(&map, (10, 10)).is_empty());
}

#[test]
fn no_overlaps_leaves_iterator_invalid() {
    let mut map = IntervalMap::new();
    map.upsert((0, 2), ());
    map.upsert((10, 12), ());

    let mut it = map.iter();
    it.first_overlap((4, 9));
    assert!(!it.valid());

    let empty: IntervalMap<(i64, i64), (), i64> = IntervalMap::new();
    let mut it = empty.iter();
    it.first_overlap((0, 100));
    assert!(!it.valid());
}

#[test]
fn upsert_and_delete_by_interval() {
    let mut map = IntervalMap::new();
    map.upsert((1, 4), 'x');
    assert_eq!(map.upsert((1, 4), 'y'), Some(((1, 4), 'x')));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&(1, 4)), Some(&'y'));

    assert_eq!(map.delete(&(1, 4)), Some(((1, 4), 'y')));
    assert!(map.is_empty());
    assert_eq!(map.delete(&(1, 4)), None);
}

fn lcg(state: &mut u64) -> u64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    *state >> 33
}

/// The emitted set must equal exactly the stored intervals whose start
/// lies below the query's upper bound and whose upper bound lies above
/// the query's start, in ascending (start, end) order.
#[test]
fn overlap_scan_matches_brute_force() {
    let mut state = 0xDEADBEEFu64;
    let mut map = IntervalMap::new();
    for i in 0..400 {
        let start = (lcg(&mut state) % 1000) as i64;
        let len = (lcg(&mut state) % 40) as i64;
        map.upsert((start, start + len), i);
    }

    for _ in 0..200 {
        let q_start = (lcg(&mut state) % 1000) as i64;
        let q_len = (lcg(&mut state) % 60) as i64;
        let query = (q_start, q_start + q_len);
        let query_upper = KeyBound::upper(&query);

        let mut expected = Vec::new();
        let mut it = map.iter();
        it.first();
        while it.valid() {
            let stored = *it.interval();
            if query_upper.contains(&stored.0) && KeyBound::upper(&stored).contains(&query.0) {
                expected.push(stored);
            }
            it.next();
        }

        assert_eq!(
            collect_overlaps(&map, query),
            expected,
            "overlap mismatch for query {query:?}"
        );
    }
}

#[test]
fn overlap_scan_survives_deletions() {
    let mut state = 0xC0FFEEu64;
    let mut map = IntervalMap::new();
    let mut intervals = Vec::new();
    for i in 0..300 {
        let start = (lcg(&mut state) % 500) as i64;
        let len = (lcg(&mut state) % 30) as i64;
        intervals.push((start, start + len));
        map.upsert((start, start + len), i);
    }

    for interval in intervals.iter().step_by(2) {
        map.delete(interval);
    }

    let query = (100, 160);
    let query_upper = KeyBound::upper(&query);
    let mut expected = Vec::new();
    let mut it = map.iter();
    it.first();
    while it.valid() {
        let stored = *it.interval();
        if query_upper.contains(&stored.0) && KeyBound::upper(&stored).contains(&query.0) {
            expected.push(stored);
        }
        it.next();
    }
    assert_eq!(collect_overlaps(&map, query), expected);
}

#[test]
fn range_keys_work_directly() {
    let mut map = IntervalMap::new();
    map.upsert(0..6, "wide");
    map.upsert(1..2, "narrow");

    let mut it = map.iter();
    it.first_overlap(4..5);
    assert!(it.valid());
    assert_eq!(it.interval(), &(0..6));
    assert_eq!(it.value(), &"wide");
    it.next_overlap();
    assert!(!it.valid());
}

#[test]
fn snapshots_scan_independently() {
    let mut map = IntervalMap::new();
    for start in 0..200 {
        map.upsert((start, start + 10), start);
    }
    let snapshot = map.clone();
    for start in 0..100 {
        map.delete(&(start, start + 10));
    }

    assert_eq!(collect_overlaps(&map, (0, 5)).len(), 0);
    let hits = collect_overlaps(&snapshot, (0, 5));
    assert_eq!(hits.first(), Some(&(0, 10)));
    assert!(!hits.is_empty());
}
