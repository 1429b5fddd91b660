//! End-to-end tests for the range-scan core against a real on-disk store.

use rangedb::{
    Bounds, Cursor, CursorOp, Database, DbError, Environment, EnvironmentArguments, Query,
    WriteFlags,
};
use tempfile::TempDir;

/// Opens a fresh environment and database seeded with A→"0" … D→"3".
fn seeded() -> (TempDir, Environment, Database) {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(dir.path(), EnvironmentArguments::new()).unwrap();
    let db = Database::create(&env, "scan_tests").unwrap();

    for (key, value) in [("A", "0"), ("B", "1"), ("C", "2"), ("D", "3")] {
        db.put(key, Some(value)).unwrap();
    }

    (dir, env, db)
}

fn to_string(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap()
}

fn collect_keys(range: &rangedb::KeyRange) -> Vec<String> {
    range.iter().map(to_string).collect()
}

fn collect_entries(range: &rangedb::EntryRange) -> Vec<(String, Option<String>)> {
    range.iter().map(|(k, v)| (to_string(k), v.map(to_string))).collect()
}

#[test]
fn unbounded_forward_yields_all_keys_ascending() {
    let (_dir, _env, db) = seeded();
    let range = db.key_range(None::<&str>, None, false);
    assert_eq!(collect_keys(&range), ["A", "B", "C", "D"]);
}

#[test]
fn unbounded_reversed_yields_all_keys_descending() {
    let (_dir, _env, db) = seeded();
    let range = db.key_range(None::<&str>, None, true);
    assert_eq!(collect_keys(&range), ["D", "C", "B", "A"]);
}

#[test]
fn insertion_order_does_not_affect_scan_order() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(dir.path(), EnvironmentArguments::new()).unwrap();
    let db = Database::create(&env, "shuffled").unwrap();
    for key in ["D", "B", "A", "C"] {
        db.put(key, Some("x")).unwrap();
    }

    let range = db.key_range(None::<&str>, None, false);
    assert_eq!(collect_keys(&range), ["A", "B", "C", "D"]);
}

#[test]
fn start_key_forward() {
    let (_dir, _env, db) = seeded();
    let range = db.key_range(Some("B"), None, false);
    assert_eq!(collect_keys(&range), ["B", "C", "D"]);
}

#[test]
fn start_key_reversed_walks_down_from_start() {
    let (_dir, _env, db) = seeded();
    let range = db.key_range(Some("B"), None, true);
    assert_eq!(collect_keys(&range), ["B", "A"]);
}

#[test]
fn end_key_is_included_exactly_once() {
    let (_dir, _env, db) = seeded();
    let range = db.key_range(Some("A"), Some("C"), false);
    assert_eq!(collect_keys(&range), ["A", "B", "C"]);
}

#[test]
fn reversed_span() {
    let (_dir, _env, db) = seeded();
    let range = db.entry_range(Some("C"), Some("B"), true);
    assert_eq!(
        collect_entries(&range),
        [
            ("C".to_string(), Some("2".to_string())),
            ("B".to_string(), Some("1".to_string())),
        ]
    );
}

#[test]
fn reversed_with_end_bound_only() {
    let (_dir, _env, db) = seeded();
    let range = db.key_range(None, Some("B"), true);
    assert_eq!(collect_keys(&range), ["D", "C", "B"]);
}

#[test]
fn entries_carry_values() {
    let (_dir, _env, db) = seeded();
    let range = db.entry_range(None::<&str>, None, false);
    assert_eq!(
        collect_entries(&range),
        [
            ("A".to_string(), Some("0".to_string())),
            ("B".to_string(), Some("1".to_string())),
            ("C".to_string(), Some("2".to_string())),
            ("D".to_string(), Some("3".to_string())),
        ]
    );
}

/// The eight-case bound-type × direction truth table.
#[test]
fn precise_bounds_matrix() {
    let (_dir, _env, db) = seeded();

    let cases: [(Bounds, bool, &[&str]); 8] = [
        (Bounds::new().gte("B"), false, &["B", "C", "D"]),
        (Bounds::new().gt("B"), false, &["C", "D"]),
        (Bounds::new().lte("C"), false, &["A", "B", "C"]),
        (Bounds::new().lt("C"), false, &["A", "B"]),
        (Bounds::new().gte("C"), true, &["C", "B", "A"]),
        (Bounds::new().gt("C"), true, &["B", "A"]),
        (Bounds::new().lte("B"), true, &["D", "C", "B"]),
        (Bounds::new().lt("B"), true, &["D", "C"]),
    ];

    for (bounds, reversed, expected) in cases {
        let got: Vec<String> = db
            .range(&bounds, reversed)
            .iter()
            .map(|(k, _)| to_string(k))
            .collect();
        assert_eq!(got, *expected, "bounds {bounds:?}, reversed {reversed}");
    }
}

#[test]
fn exclusive_start_skips_only_the_exact_bound_key() {
    let (_dir, _env, db) = seeded();

    // Bound exists: B itself is excluded.
    let got: Vec<String> = db
        .range(&Bounds::new().gt("B"), false)
        .iter()
        .map(|(k, _)| to_string(k))
        .collect();
    assert_eq!(got, ["C", "D"]);

    // Bound is absent: nothing is skipped, the walk starts at the first
    // key past it.
    let got: Vec<String> = db
        .range(&Bounds::new().gt("Bb"), false)
        .iter()
        .map(|(k, _)| to_string(k))
        .collect();
    assert_eq!(got, ["C", "D"]);
}

#[test]
fn both_sides_exclusive() {
    let (_dir, _env, db) = seeded();
    let got: Vec<String> = db
        .range(&Bounds::new().gt("A").lt("D"), false)
        .iter()
        .map(|(k, _)| to_string(k))
        .collect();
    assert_eq!(got, ["B", "C"]);
}

#[test]
fn exclusive_start_reversed_from_the_top() {
    let (_dir, _env, db) = seeded();
    let got: Vec<String> = db
        .range(&Bounds::new().gt("D"), true)
        .iter()
        .map(|(k, _)| to_string(k))
        .collect();
    assert_eq!(got, ["C", "B", "A"]);
}

#[test]
fn inclusive_form_wins_when_both_are_supplied() {
    let (_dir, _env, db) = seeded();
    let got: Vec<String> = db
        .range(&Bounds::new().gte("B").gt("A").lte("C").lt("B"), false)
        .iter()
        .map(|(k, _)| to_string(k))
        .collect();
    assert_eq!(got, ["B", "C"]);
}

#[test]
fn start_equal_to_end_yields_the_key_exactly_once() {
    let (_dir, _env, db) = seeded();
    let got: Vec<String> = db
        .range(&Bounds::new().gte("B").lte("B"), false)
        .iter()
        .map(|(k, _)| to_string(k))
        .collect();
    assert_eq!(got, ["B"]);
}

#[test]
fn inverted_range_yields_nothing() {
    let (_dir, _env, db) = seeded();
    let range = db.key_range(Some("C"), Some("A"), false);
    assert_eq!(collect_keys(&range), Vec::<String>::new());
}

#[test]
fn absent_bound_keys_resolve_to_the_nearest_key_in_walk_direction() {
    let (_dir, _env, db) = seeded();

    // Forward: first key >= "Bb" is C.
    let range = db.key_range(Some("Bb"), None, false);
    assert_eq!(collect_keys(&range), ["C", "D"]);

    // Reversed: last key <= "Bb" is B.
    let range = db.key_range(Some("Bb"), None, true);
    assert_eq!(collect_keys(&range), ["B", "A"]);

    // Reversed from above the whole key space.
    let range = db.key_range(Some("Z"), None, true);
    assert_eq!(collect_keys(&range), ["D", "C", "B", "A"]);

    // Forward from above the whole key space.
    let range = db.key_range(Some("Z"), None, false);
    assert_eq!(collect_keys(&range), Vec::<String>::new());

    // Reversed from below the whole key space.
    let range = db.key_range(Some("0"), None, true);
    assert_eq!(collect_keys(&range), Vec::<String>::new());
}

#[test]
fn ranges_are_restartable_and_idempotent() {
    let (_dir, _env, db) = seeded();
    let range = db.key_range(Some("B"), None, false);

    let first = collect_keys(&range);
    let second = collect_keys(&range);
    assert_eq!(first, second);
    assert_eq!(first, ["B", "C", "D"]);
}

#[test]
fn concurrent_iterators_do_not_interfere() {
    let (_dir, _env, db) = seeded();
    let range = db.key_range(None::<&str>, None, false);

    let mut a = range.iter();
    let mut b = range.iter();

    assert_eq!(a.next(), Some(b"A".to_vec()));
    assert_eq!(b.next(), Some(b"A".to_vec()));
    assert_eq!(a.next(), Some(b"B".to_vec()));
    assert_eq!(b.next(), Some(b"B".to_vec()));
    drop(a);
    assert_eq!(b.next(), Some(b"C".to_vec()));
}

#[test]
fn exhausted_iterators_stay_exhausted() {
    let (_dir, _env, db) = seeded();
    let mut iter = db.key_range(Some("D"), None, false).iter();

    assert_eq!(iter.next(), Some(b"D".to_vec()));
    assert_eq!(iter.next(), None);
    assert_eq!(iter.next(), None);
}

#[test]
fn dropped_scans_release_their_reader_slots() {
    let (_dir, _env, db) = seeded();
    let range = db.key_range(None::<&str>, None, false);

    // Far more scans than the environment has reader slots; a leaked
    // transaction would surface as empty iterators long before the end.
    for i in 0..300 {
        let keys = collect_keys(&range);
        assert_eq!(keys.len(), 4, "iteration {i} came up short");
    }
    for _ in 0..300 {
        let mut iter = range.iter();
        assert_eq!(iter.next(), Some(b"A".to_vec()));
        // Early abandonment; cleanup must still run.
    }

    // The abandoned scans held no locks that would block this write.
    db.put("E", Some("4")).unwrap();
    assert_eq!(collect_keys(&range).len(), 5);
}

#[test]
fn failed_setup_degrades_to_an_empty_iterator() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(
        dir.path(),
        EnvironmentArguments::new().with_max_readers(1),
    )
    .unwrap();
    let db = Database::create(&env, "tiny").unwrap();
    db.put("A", Some("0")).unwrap();

    // Occupy the only reader slot.
    let held = env.begin_ro().unwrap();

    let range = db.key_range(None::<&str>, None, false);
    assert_eq!(range.iter().count(), 0);

    // The transaction API surfaces what the iterator swallowed.
    assert!(env.begin_ro().is_err());

    drop(held);
    assert_eq!(range.iter().count(), 1);
}

#[test]
fn reset_and_renew_reuse_a_read_transaction() {
    let (_dir, env, db) = seeded();

    let txn = env.begin_ro().unwrap();
    txn.reset();

    // A write lands while the transaction is reset; the renewed snapshot
    // must see it, while the original snapshot could not have.
    db.put("E", Some("4")).unwrap();
    txn.renew().unwrap();

    let query = Query::span(&db, None::<&str>, None, false);
    let mut cursor = Cursor::open(txn, &query).unwrap();
    assert_eq!(
        cursor.get(None, CursorOp::Last).unwrap(),
        Some((b"E".to_vec(), Some(b"4".to_vec())))
    );
}

#[test]
fn put_get_round_trip_preserves_exact_bytes() {
    let (_dir, _env, db) = seeded();
    let key = [0x01u8, 0xff, 0x7f];
    let value = [0x00u8, 0xfe, 0x80, 0x00];

    db.put(&key, Some(&value)).unwrap();
    assert_eq!(db.get(&key).unwrap(), Some(value.to_vec()));
}

#[test]
fn overwrite_then_delete() {
    let (_dir, _env, db) = seeded();

    db.put("A", Some("9")).unwrap();
    assert_eq!(db.get("A").unwrap(), Some(b"9".to_vec()));

    db.delete("A").unwrap();
    assert_eq!(db.get("A").unwrap(), None);

    // Deleting a key that does not exist is a no-op success.
    db.delete("A").unwrap();
}

#[test]
fn absent_value_reads_back_as_none() {
    let (_dir, _env, db) = seeded();

    db.put("E", None::<&str>).unwrap();
    assert_eq!(db.get("E").unwrap(), None);

    let range = db.entry_range(Some("E"), Some("E"), false);
    assert_eq!(collect_entries(&range), [("E".to_string(), None)]);
}

#[test]
fn empty_keys_are_rejected() {
    let (_dir, _env, db) = seeded();

    assert_eq!(db.get("").unwrap_err(), DbError::InvalidParameter);
    assert_eq!(db.put("", Some("x")).unwrap_err(), DbError::InvalidParameter);
    assert_eq!(db.delete("").unwrap_err(), DbError::InvalidParameter);
}

#[test]
fn no_overwrite_flag_reports_existing_keys() {
    let (_dir, _env, db) = seeded();

    let err = db
        .put_with_flags("A", Some("clobber"), WriteFlags::NO_OVERWRITE)
        .unwrap_err();
    assert_eq!(err, DbError::KeyExists);
    assert_eq!(db.get("A").unwrap(), Some(b"0".to_vec()));
}

#[test]
fn clear_empties_the_database() {
    let (_dir, _env, db) = seeded();

    db.clear().unwrap();
    let range = db.key_range(None::<&str>, None, false);
    assert_eq!(collect_keys(&range), Vec::<String>::new());

    // Still usable afterwards.
    db.put("Z", Some("z")).unwrap();
    assert_eq!(collect_keys(&range), ["Z"]);
}
