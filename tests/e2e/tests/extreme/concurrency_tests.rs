//! Concurrency tests
//!
//! Every mutation goes through the exclusive file lock, so concurrent
//! writers must serialize: no lost updates, no duplicate ids, no torn
//! files. These tests drive real threads against one store root, each
//! thread holding its own store handle the way separate hook
//! invocations would.

use std::fs;
use std::thread;
use std::time::Duration;

use recite_core::record::Scope;
use recite_core::store::{FileLock, StoreError};
use recite_e2e_tests::{TestDataFactory, TestStoreManager};

const WRITERS: usize = 8;

#[test]
fn test_concurrent_adds_yield_distinct_gapless_ids() {
    let mgr = TestStoreManager::new();

    let mut ids: Vec<String> = thread::scope(|s| {
        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let lessons = mgr.lessons();
                s.spawn(move || {
                    lessons
                        .add(TestDataFactory::lesson(i), Scope::Project, false)
                        .expect("concurrent add must succeed")
                        .id
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    ids.sort();

    // Every writer got its own id and the sequence has no holes.
    let expected: Vec<String> = (1..=WRITERS).map(|i| format!("L{i:03}")).collect();
    assert_eq!(ids, expected);
    assert_eq!(mgr.lesson_count(Scope::Project), WRITERS);
}

#[test]
fn test_concurrent_cites_all_land() {
    let mgr = TestStoreManager::new();
    let added = mgr
        .lessons()
        .add(TestDataFactory::lesson(0), Scope::Project, false)
        .unwrap();

    thread::scope(|s| {
        for _ in 0..WRITERS {
            let lessons = mgr.lessons();
            let id = added.id.clone();
            s.spawn(move || {
                lessons.cite(&id).expect("concurrent cite must succeed");
            });
        }
    });

    let after = mgr.lessons().get(&added.id).unwrap();
    assert_eq!(after.uses, 1 + WRITERS as u32, "no cite was lost");
    assert!((after.velocity - WRITERS as f64).abs() < f64::EPSILON);
}

#[test]
fn test_concurrent_handoff_adds_yield_distinct_stems() {
    let mgr = TestStoreManager::new();

    let mut stems: Vec<String> = thread::scope(|s| {
        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let handoffs = mgr.handoffs();
                s.spawn(move || {
                    let id = handoffs
                        .add(TestDataFactory::handoff(i))
                        .expect("concurrent handoff add must succeed")
                        .id;
                    id[..4].to_string()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    stems.sort();

    let expected: Vec<String> = (1..=WRITERS).map(|i| format!("H{i:03}")).collect();
    assert_eq!(stems, expected);
    assert_eq!(mgr.handoffs().list().unwrap().len(), WRITERS);
}

#[test]
fn test_lesson_and_handoff_writers_do_not_interfere() {
    let mgr = TestStoreManager::new();

    thread::scope(|s| {
        for i in 0..4 {
            let lessons = mgr.lessons();
            s.spawn(move || {
                lessons
                    .add(TestDataFactory::lesson(i), Scope::Project, false)
                    .unwrap();
            });
            let handoffs = mgr.handoffs();
            s.spawn(move || {
                handoffs.add(TestDataFactory::handoff(i)).unwrap();
            });
        }
    });

    assert_eq!(mgr.lesson_count(Scope::Project), 4);
    assert_eq!(mgr.handoffs().list().unwrap().len(), 4);
}

#[test]
fn test_held_lock_times_out_as_an_error() {
    let mgr = TestStoreManager::tuned(|c| c.lock_timeout = Duration::from_millis(60));
    let path = mgr.lessons_path(Scope::Project);
    fs::create_dir_all(path.parent().unwrap()).unwrap();

    let held = FileLock::acquire(&path, Duration::from_millis(100))
        .unwrap()
        .expect("uncontended acquire");

    let err = mgr
        .lessons()
        .add(TestDataFactory::lesson(0), Scope::Project, false)
        .unwrap_err();
    assert!(matches!(err, StoreError::LockTimeout(_)));
    // The blocked writer never created the file.
    assert!(!path.exists());

    drop(held);
}

#[test]
fn test_waiters_proceed_after_release() {
    let mgr = TestStoreManager::new();
    let path = mgr.lessons_path(Scope::Project);
    fs::create_dir_all(path.parent().unwrap()).unwrap();

    let held = FileLock::acquire(&path, Duration::from_millis(100))
        .unwrap()
        .expect("uncontended acquire");

    thread::scope(|s| {
        let lessons = mgr.lessons();
        let waiter = s.spawn(move || {
            // Default timeout is far longer than the hold below.
            lessons.add(TestDataFactory::lesson(0), Scope::Project, false)
        });

        thread::sleep(Duration::from_millis(150));
        drop(held);

        let added = waiter.join().unwrap().expect("waiter proceeds on release");
        assert_eq!(added.id, "L001");
    });
}
