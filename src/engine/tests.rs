use chrono::NaiveDate;
use ulid::Ulid;

use super::*;
use crate::limits::*;
use crate::model::*;

const SINGLE: u128 = 1000;
const DOUBLE: u128 = 2000;

fn id(n: u128) -> Ulid {
    Ulid::from(n)
}

fn day(d: u32) -> Day {
    NaiveDate::from_ymd_opt(2020, 10, d).unwrap()
}

fn span(a: u32, b: u32) -> Span {
    Span::new(day(a), day(b))
}

fn single(n: u128, a: u32, b: u32) -> Booking {
    Booking::new(id(n), id(SINGLE), span(a, b))
}

fn categories() -> Vec<Category> {
    vec![Category::new(id(SINGLE)), Category::new(id(DOUBLE))]
}

fn plain_units(ids: impl IntoIterator<Item = u128>) -> Vec<Unit> {
    ids.into_iter().map(|n| Unit::new(id(n), id(SINGLE))).collect()
}

/// Bookings 1..=9 over October, densely overlapping at the start.
fn october(locks: &[(u128, u128)]) -> Vec<Booking> {
    let raw = [
        (1, 1, 3),
        (2, 1, 4),
        (3, 3, 6),
        (4, 3, 8),
        (5, 4, 8),
        (6, 8, 12),
        (7, 9, 20),
        (8, 15, 20),
        (9, 21, 30),
    ];
    raw.iter()
        .map(|&(n, a, b)| {
            let booking = single(n, a, b);
            match locks.iter().find(|(bid, _)| *bid == n) {
                Some(&(_, unit)) => booking.locked_to(id(unit)),
                None => booking,
            }
        })
        .collect()
}

/// Booking ids placed on each unit, in assignment row order.
fn rows(allocation: &Allocation) -> Vec<(Ulid, Vec<Ulid>)> {
    allocation
        .assignment
        .rows
        .iter()
        .map(|r| (r.unit, r.bookings.iter().map(|b| b.id).collect()))
        .collect()
}

fn ids(ns: &[u128]) -> Vec<Ulid> {
    ns.iter().map(|&n| id(n)).collect()
}

// ── Allocation: plain units ──────────────────────────────────

#[test]
fn dense_month_packs_tightest_chains_first() {
    let snap = Snapshot::new(categories(), plain_units(101..=105), october(&[])).unwrap();
    let a = allocate(&snap, id(SINGLE), &[]).unwrap();
    assert!(a.success);
    assert!(a.leftover.is_empty());
    assert_eq!(
        rows(&a),
        vec![
            (id(101), ids(&[1, 4, 7, 9])),
            (id(102), ids(&[2, 5, 6, 8])),
            (id(103), ids(&[3])),
            (id(104), vec![]),
            (id(105), vec![]),
        ]
    );
}

#[test]
fn dense_month_honours_locks() {
    let locks = [(1, 103), (4, 105), (5, 103), (7, 103)];
    let snap = Snapshot::new(categories(), plain_units(101..=105), october(&locks)).unwrap();
    let a = allocate(&snap, id(SINGLE), &[]).unwrap();
    assert!(a.success);
    assert_eq!(
        rows(&a),
        vec![
            (id(101), ids(&[2, 6, 8, 9])),
            (id(102), ids(&[3])),
            (id(103), ids(&[1, 5, 7])),
            (id(104), vec![]),
            (id(105), ids(&[4])),
        ]
    );
}

#[test]
fn too_few_units_leaves_leftover() {
    let snap = Snapshot::new(categories(), plain_units(101..=102), october(&[])).unwrap();
    let a = allocate(&snap, id(SINGLE), &[]).unwrap();
    assert!(!a.success);
    assert_eq!(a.leftover.iter().map(|b| b.id).collect::<Vec<_>>(), ids(&[3]));
    assert_eq!(a.assignment.booking_count() + a.leftover.len(), 9);
}

#[test]
fn allocation_is_deterministic() {
    let locks = [(4, 102)];
    let snap = Snapshot::new(categories(), plain_units(101..=103), october(&locks)).unwrap();
    let first = allocate(&snap, id(SINGLE), &[]).unwrap();
    for _ in 0..5 {
        assert_eq!(allocate(&snap, id(SINGLE), &[]).unwrap(), first);
    }
}

#[test]
fn assigned_bookings_never_overlap_on_a_unit() {
    let snap = Snapshot::new(categories(), plain_units(101..=104), october(&[(7, 104)])).unwrap();
    let a = allocate(&snap, id(SINGLE), &[]).unwrap();
    for row in &a.assignment.rows {
        for pair in row.bookings.windows(2) {
            assert!(pair[0].span.end <= pair[1].span.start);
        }
        for b in &row.bookings {
            if let Some(lock) = b.unit {
                assert_eq!(lock, row.unit);
            }
        }
    }
}

// ── Allocation: composite units ──────────────────────────────

/// Plain singles 3, 4, 5 and singles 1 + 2 forming double 9.
fn with_pair(bookings: Vec<Booking>) -> Snapshot {
    let mut units = vec![
        Unit::new(id(9), id(DOUBLE)),
        Unit::new(id(1), id(SINGLE)).part_of(id(9)),
        Unit::new(id(2), id(SINGLE)).part_of(id(9)),
    ];
    units.extend(plain_units(3..=5));
    Snapshot::new(categories(), units, bookings).unwrap()
}

#[test]
fn plain_units_fill_before_parts() {
    let bookings = october(&[]).into_iter().map(|mut b| {
        b.id = id(b.id.0 + 10);
        b
    });
    let snap = with_pair(bookings.collect());
    let a = allocate(&snap, id(SINGLE), &[]).unwrap();
    assert!(a.success);
    assert_eq!(
        rows(&a),
        vec![
            (id(3), ids(&[11, 14, 17, 19])),
            (id(4), ids(&[12, 15, 16, 18])),
            (id(5), ids(&[13])),
            (id(1), vec![]),
            (id(2), vec![]),
        ]
    );
}

#[test]
fn locks_push_overflow_onto_parts() {
    let locks = [(11, 3), (14, 5), (15, 3), (17, 3)];
    let bookings = october(&[]).into_iter().map(|mut b| {
        b.id = id(b.id.0 + 10);
        if let Some(&(_, unit)) = locks.iter().find(|(bid, _)| *bid == b.id.0) {
            b.unit = Some(id(unit));
        }
        b
    });
    let snap = with_pair(bookings.collect());
    let a = allocate(&snap, id(SINGLE), &[]).unwrap();
    assert!(a.success);
    assert_eq!(
        rows(&a),
        vec![
            (id(3), ids(&[11, 15, 17, 19])),
            (id(4), ids(&[12, 16, 18])),
            (id(5), ids(&[14])),
            (id(1), ids(&[13])),
            (id(2), vec![]),
        ]
    );
}

#[test]
fn new_lock_next_to_existing_lock_is_irreconcilable() {
    let snap = with_pair(vec![single(20, 5, 8).locked_to(id(1))]);
    let probe = single(21, 6, 9).locked_to(id(1));
    let a = allocate(&snap, id(SINGLE), &[probe]).unwrap();
    assert!(!a.success);
    assert_eq!(a.leftover.len(), 2);
}

#[test]
fn double_fits_when_plain_units_absorb_singles() {
    let snap = with_pair(vec![single(20, 5, 7), single(21, 5, 7), single(22, 5, 7)]);
    let probe = Booking::new(id(30), id(DOUBLE), span(5, 7));
    let a = allocate(&snap, id(DOUBLE), &[probe]).unwrap();
    assert!(a.success);
    assert_eq!(rows(&a), vec![(id(9), ids(&[30]))]);
    assert!(available_between(&snap, id(DOUBLE), span(5, 7), None).unwrap());
}

#[test]
fn double_fails_when_a_part_is_needed() {
    let snap = with_pair(vec![
        single(20, 5, 7),
        single(21, 5, 7),
        single(22, 5, 7),
        single(23, 6, 8),
    ]);
    let probe = Booking::new(id(30), id(DOUBLE), span(5, 7));
    let a = allocate(&snap, id(DOUBLE), &[probe]).unwrap();
    assert!(!a.success);
    assert!(!available_between(&snap, id(DOUBLE), span(5, 7), None).unwrap());
    assert!(available_between(&snap, id(DOUBLE), span(8, 10), None).unwrap());
}

#[test]
fn adding_bookings_never_makes_infeasible_feasible() {
    let snap = Snapshot::new(categories(), plain_units(101..=101), vec![single(1, 5, 8).locked_to(id(101))])
        .unwrap();
    let overlapping = single(2, 6, 9);
    assert!(!allocate(&snap, id(SINGLE), &[overlapping.clone()]).unwrap().success);
    let more = [overlapping, single(3, 20, 22)];
    assert!(!allocate(&snap, id(SINGLE), &more).unwrap().success);
}

// ── Engine write path ────────────────────────────────────────

fn engine_with_units(n: u128) -> Engine {
    let engine = Engine::new();
    engine.create_category(id(SINGLE), Some("single".into())).unwrap();
    engine.create_category(id(DOUBLE), None).unwrap();
    for u in 1..=n {
        engine.create_unit(id(100 + u), id(SINGLE), None, None).unwrap();
    }
    engine
}

#[test]
fn create_category_rejects_duplicates_and_long_names() {
    let engine = engine_with_units(0);
    assert!(matches!(
        engine.create_category(id(SINGLE), None),
        Err(EngineError::AlreadyExists(_))
    ));
    assert!(matches!(
        engine.create_category(id(3000), Some("x".repeat(MAX_NAME_LEN + 1))),
        Err(EngineError::LimitExceeded(_))
    ));
    assert_eq!(engine.list_categories().len(), 2);
}

#[test]
fn create_unit_validates_hierarchy() {
    let engine = engine_with_units(1);
    assert!(matches!(
        engine.create_unit(id(101), id(SINGLE), None, None),
        Err(EngineError::AlreadyExists(_))
    ));
    assert!(matches!(
        engine.create_unit(id(200), id(9999), None, None),
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        engine.create_unit(id(200), id(SINGLE), Some(id(200)), None),
        Err(EngineError::CycleDetected(_))
    ));
    assert!(matches!(
        engine.create_unit(id(200), id(SINGLE), Some(id(999)), None),
        Err(EngineError::UnknownParent { .. })
    ));

    let mut parent = id(101);
    for n in 0..MAX_HIERARCHY_DEPTH as u128 {
        engine.create_unit(id(300 + n), id(SINGLE), Some(parent), None).unwrap();
        parent = id(300 + n);
    }
    assert!(matches!(
        engine.create_unit(id(400), id(SINGLE), Some(parent), None),
        Err(EngineError::LimitExceeded(_))
    ));
}

#[test]
fn delete_unit_guards_parts_and_locks() {
    let engine = engine_with_units(0);
    engine.create_unit(id(9), id(DOUBLE), None, None).unwrap();
    engine.create_unit(id(1), id(SINGLE), Some(id(9)), None).unwrap();
    assert!(matches!(engine.delete_unit(id(9)), Err(EngineError::HasChildren(_))));

    engine.book(single(20, 1, 3).locked_to(id(1))).unwrap();
    assert!(matches!(engine.delete_unit(id(1)), Err(EngineError::HasLockedBookings(_))));

    engine.cancel(id(20)).unwrap();
    engine.delete_unit(id(1)).unwrap();
    engine.delete_unit(id(9)).unwrap();
    assert!(matches!(engine.delete_unit(id(9)), Err(EngineError::NotFound(_))));
}

#[test]
fn book_rejects_what_cannot_be_placed() {
    let engine = engine_with_units(1);
    engine.book(single(1, 5, 7)).unwrap();
    assert!(matches!(
        engine.book(single(2, 6, 8)),
        Err(EngineError::Unavailable { .. })
    ));
    engine.book(single(3, 7, 9)).unwrap();
    assert_eq!(engine.list_bookings(id(SINGLE)).unwrap().len(), 2);
}

#[test]
fn reschedule_moves_or_keeps_the_booking() {
    let engine = engine_with_units(1);
    engine.book(single(1, 5, 7).with_label("Kim")).unwrap();
    engine.book(single(2, 7, 9)).unwrap();

    let moved = engine.reschedule(id(1), span(4, 6)).unwrap();
    assert_eq!(moved.span, span(4, 6));
    assert_eq!(moved.label.as_deref(), Some("Kim"));

    assert!(matches!(
        engine.reschedule(id(2), span(5, 8)),
        Err(EngineError::Unavailable { .. })
    ));
    assert_eq!(engine.get_booking(id(2)).unwrap().span, span(7, 9));

    engine.cancel(id(1)).unwrap();
    engine.reschedule(id(2), span(5, 8)).unwrap();
    assert!(matches!(engine.cancel(id(1)), Err(EngineError::NotFound(_))));
}

#[test]
fn book_validates_before_locking() {
    let engine = engine_with_units(1);
    let long = single(1, 5, 7).with_label("x".repeat(MAX_LABEL_LEN + 1));
    assert!(matches!(engine.book(long), Err(EngineError::LimitExceeded(_))));
    let stray = single(1, 5, 7).locked_to(id(999));
    assert!(matches!(engine.book(stray), Err(EngineError::NotFound(_))));
    assert_eq!(engine.store().booking_count(), 0);
}

#[test]
fn engine_queries_follow_store() {
    let engine = engine_with_units(2);
    engine.book(single(1, 5, 7)).unwrap();
    assert!(engine.available_between(id(SINGLE), span(5, 7), None).unwrap());
    engine.book(single(2, 5, 7)).unwrap();
    assert!(!engine.available_between(id(SINGLE), span(5, 7), None).unwrap());

    let report = engine
        .availability_between_dates(id(SINGLE), day(4), day(7))
        .unwrap();
    let allot: Vec<_> = report.per_day.iter().map(|d| d.allotment).collect();
    assert_eq!(allot, vec![2, 0, 0, 2]);

    let a = engine.allocate(id(SINGLE), &[]).unwrap();
    assert!(a.success);
    let text = engine.render(id(SINGLE), Some(day(1)), 10).unwrap();
    assert!(text.starts_with("Day of Month"));
    assert_eq!(text.lines().count(), 2 + 2 + 1 + 2);
    assert_eq!(engine.list_units(id(SINGLE)).unwrap().len(), 2);
    assert!(engine.list_units(id(9999)).is_err());
}

#[test]
fn render_starts_at_requested_day() {
    let engine = engine_with_units(1);
    engine.book(single(1, 5, 7)).unwrap();
    let first_cell = |text: String| text.lines().next().unwrap()[20..23].to_string();
    let text = engine.render(id(SINGLE), Some(day(3)), 5).unwrap();
    assert_eq!(first_cell(text), "  3");
    let text = engine.render(id(SINGLE), None, 5).unwrap();
    assert_eq!(first_cell(text), "  5");
}

#[test]
fn engine_loads_snapshot_file() {
    let file = SnapshotFile {
        categories: categories(),
        units: plain_units(101..=105),
        bookings: october(&[]),
    };
    let engine = Engine::from_snapshot_file(file).unwrap();
    assert!(engine.allocate(id(SINGLE), &[]).unwrap().success);
    assert!(engine.available_between(id(SINGLE), span(3, 4), None).unwrap());
}
