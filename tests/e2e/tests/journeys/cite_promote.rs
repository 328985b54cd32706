//! Citation and promotion journeys
//!
//! Covers the dual-score arithmetic as it lands on disk: glyph
//! rendering at known score pairs, the uses cap, the strict threshold
//! crossing, and what promotion carries across scope files.

use chrono::NaiveDate;
use recite_core::rating::render_glyph;
use recite_core::record::{NewLesson, Scope};
use recite_core::store::StoreError;
use recite_e2e_tests::{TestDataFactory, TestStoreManager};

#[test]
fn test_fresh_then_hot_glyph() {
    let mgr = TestStoreManager::new();
    let lessons = mgr.lessons();
    let added = lessons
        .add(
            TestDataFactory::lesson_titled("Prefer borrowed arguments"),
            Scope::Project,
            false,
        )
        .unwrap();

    // A fresh record: one use, no velocity.
    assert_eq!(render_glyph(added.uses, added.velocity), "[*----|-----]");

    for _ in 0..5 {
        lessons.cite(&added.id).unwrap();
    }
    let hot = lessons.get(&added.id).unwrap();
    assert_eq!(hot.uses, 6);
    assert!((hot.velocity - 5.0).abs() < f64::EPSILON);
    assert_eq!(render_glyph(hot.uses, hot.velocity), "[***--|****+]");

    // The injection payload carries the same glyph right after the id.
    let markdown = lessons.inject(10).unwrap().to_markdown();
    assert!(markdown.contains(&format!("- [{}] [***--|****+] ", added.id)));
}

#[test]
fn test_uses_caps_at_maximum() {
    let mgr = TestStoreManager::new();
    let lessons = mgr.lessons();
    lessons
        .add(
            TestDataFactory::lesson_titled("Ancient workhorse record"),
            Scope::Project,
            false,
        )
        .unwrap();
    mgr.rewrite_lessons(Scope::Project, |doc| {
        for lesson in doc.records_mut() {
            lesson.uses = 998;
            lesson.promotable = false;
        }
    });

    let once = lessons.cite("L001").unwrap();
    assert_eq!(once.lesson.uses, 999);
    let twice = lessons.cite("L001").unwrap();
    assert_eq!(twice.lesson.uses, 999, "uses pins at the cap");
    assert!(
        twice.lesson.velocity > once.lesson.velocity,
        "velocity keeps climbing past the uses cap"
    );
}

#[test]
fn test_promotion_fires_exactly_once_at_crossing() {
    let mgr = TestStoreManager::tuned(|c| c.promote_threshold = 3);
    let lessons = mgr.lessons();
    let added = lessons
        .add(
            TestDataFactory::lesson_titled("Widely applicable insight"),
            Scope::Project,
            false,
        )
        .unwrap();

    let below = lessons.cite(&added.id).unwrap();
    assert_eq!(below.lesson.uses, 2);
    assert!(below.promoted_to.is_none());

    let crossing = lessons.cite(&added.id).unwrap();
    assert_eq!(crossing.lesson.uses, 3);
    let new_id = crossing.promoted_to.expect("crossing must promote");
    assert_eq!(new_id, "S001");

    // The project record is gone; only the system copy remains.
    assert!(matches!(
        lessons.get(&added.id).unwrap_err(),
        StoreError::NotFound(_)
    ));
    assert_eq!(mgr.lesson_count(Scope::Project), 0);

    // Further citations land on the system record and never re-promote.
    let after = lessons.cite(&new_id).unwrap();
    assert!(after.promoted_to.is_none());
    assert_eq!(after.lesson.uses, 4);
}

#[test]
fn test_promotion_preserves_history() {
    let mgr = TestStoreManager::tuned(|c| c.promote_threshold = 5);
    let lessons = mgr.lessons();
    lessons
        .add(
            TestDataFactory::lesson_titled("Battle-tested project insight"),
            Scope::Project,
            false,
        )
        .unwrap();
    let learned = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
    mgr.rewrite_lessons(Scope::Project, |doc| {
        for lesson in doc.records_mut() {
            lesson.uses = 4;
            lesson.velocity = 2.5;
            lesson.learned = learned;
        }
    });

    let outcome = lessons.cite("L001").unwrap();
    let new_id = outcome.promoted_to.expect("fifth use crosses");

    let promoted = lessons.get(&new_id).unwrap();
    assert_eq!(promoted.uses, 5, "uses travel with the record");
    assert!((promoted.velocity - 3.5).abs() < f64::EPSILON);
    assert_eq!(promoted.learned, learned, "learned date travels too");
    assert_eq!(promoted.title, "Battle-tested project insight");
}

#[test]
fn test_no_promote_flag_suppresses_crossing() {
    let mgr = TestStoreManager::tuned(|c| c.promote_threshold = 2);
    let lessons = mgr.lessons();
    let pinned = lessons
        .add(
            NewLesson {
                promotable: false,
                ..TestDataFactory::lesson_titled("Deliberately project-local")
            },
            Scope::Project,
            false,
        )
        .unwrap();

    let outcome = lessons.cite(&pinned.id).unwrap();
    assert_eq!(outcome.lesson.uses, 2, "at the threshold");
    assert!(outcome.promoted_to.is_none(), "flagged records stay put");
    assert_eq!(mgr.lesson_count(Scope::Project), 1);
    assert_eq!(mgr.lesson_count(Scope::System), 0);
}

#[test]
fn test_system_records_never_promote() {
    let mgr = TestStoreManager::tuned(|c| c.promote_threshold = 2);
    let lessons = mgr.lessons();
    let system = lessons
        .add(
            TestDataFactory::lesson_titled("Already system-wide"),
            Scope::System,
            false,
        )
        .unwrap();

    for _ in 0..3 {
        let outcome = lessons.cite(&system.id).unwrap();
        assert!(outcome.promoted_to.is_none());
    }
    assert_eq!(lessons.get(&system.id).unwrap().uses, 4);
}

#[test]
fn test_duplicate_rejected_then_forced() {
    let mgr = TestStoreManager::new();
    let lessons = mgr.lessons();
    let original = lessons
        .add(
            TestDataFactory::lesson_titled("Always quote shell arguments"),
            Scope::Project,
            false,
        )
        .unwrap();

    let err = lessons
        .add(
            TestDataFactory::lesson_titled("quote shell arguments"),
            Scope::Project,
            false,
        )
        .unwrap_err();
    match err {
        StoreError::Duplicate { id, title } => {
            assert_eq!(id, original.id);
            assert_eq!(title, original.title);
        }
        other => panic!("expected Duplicate, got {other:?}"),
    }

    let forced = lessons
        .add(
            TestDataFactory::lesson_titled("quote shell arguments"),
            Scope::Project,
            true,
        )
        .unwrap();
    assert_eq!(forced.id, "L002");
    assert_eq!(mgr.lesson_count(Scope::Project), 2);
}

#[test]
fn test_citing_unknown_ids() {
    let mgr = TestStoreManager::new();
    let lessons = mgr.lessons();
    mgr.seed_lessons(Scope::Project, 1);

    assert!(matches!(
        lessons.cite("L999").unwrap_err(),
        StoreError::NotFound(_)
    ));
    assert!(matches!(
        lessons.cite("H001").unwrap_err(),
        StoreError::NotFound(_)
    ));
    // The failure left the real record untouched.
    assert_eq!(lessons.get("L001").unwrap().uses, 1);
}
