//! Decay and maintenance journeys
//!
//! Runs the periodic maintenance pass against real files: erosion of
//! stale scores, the vacation no-op, convergence to the score floors,
//! and eviction once the project file outgrows its bound.

use chrono::{DateTime, Utc};
use recite_core::record::Scope;
use recite_e2e_tests::TestStoreManager;

fn parse_stamp(text: &str) -> DateTime<Utc> {
    text.trim().parse().expect("stamp must be a timestamp")
}

#[test]
fn test_decay_erodes_stale_records() {
    let mgr = TestStoreManager::tuned(|c| c.stale_days = 0);
    let lessons = mgr.lessons();
    mgr.seed_lessons(Scope::Project, 2);
    mgr.seed_lessons(Scope::System, 1);
    mgr.rewrite_lessons(Scope::Project, |doc| {
        for lesson in doc.records_mut() {
            match lesson.id.as_str() {
                "L001" => {
                    lesson.uses = 3;
                    lesson.velocity = 2.0;
                }
                _ => lesson.velocity = 0.5,
            }
        }
    });
    mgr.rewrite_lessons(Scope::System, |doc| {
        for lesson in doc.records_mut() {
            lesson.velocity = 1.0;
        }
    });

    let report = lessons.decay().unwrap();
    assert!(!report.vacation);
    assert_eq!(report.decayed, 3, "both scopes erode");
    assert_eq!(report.evicted, 0);

    let project = mgr.read_lessons(Scope::Project);
    assert_eq!(project[0].uses, 2, "uses step down by one");
    assert!((project[0].velocity - 1.8).abs() < 1e-9);
    assert_eq!(project[1].uses, 1, "uses floor at one");
    assert!((project[1].velocity - 0.45).abs() < 1e-9);

    let system = mgr.read_lessons(Scope::System);
    assert!((system[0].velocity - 0.9).abs() < 1e-9);

    // The run is stamped.
    parse_stamp(&mgr.last_decay_text().expect("stamp written"));
}

#[test]
fn test_fresh_records_left_alone() {
    let mgr = TestStoreManager::new();
    let lessons = mgr.lessons();
    let ids = mgr.seed_lessons(Scope::Project, 2);
    lessons.cite(&ids[0]).unwrap();

    let report = lessons.decay().unwrap();
    assert!(!report.vacation);
    assert_eq!(report.decayed, 0, "nothing stale under the default window");

    let after = lessons.get(&ids[0]).unwrap();
    assert_eq!(after.uses, 2);
    assert!((after.velocity - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_vacation_run_is_a_stamp_only_noop() {
    let mgr = TestStoreManager::tuned(|c| c.stale_days = 0);
    let lessons = mgr.lessons();
    mgr.seed_lessons(Scope::Project, 1);
    mgr.rewrite_lessons(Scope::Project, |doc| {
        for lesson in doc.records_mut() {
            lesson.velocity = 2.0;
        }
    });
    mgr.touch_activity();

    // First run has no stamp yet and must do real work.
    let first = lessons.decay().unwrap();
    assert!(!first.vacation);
    assert_eq!(first.decayed, 1);
    let stamp_one = parse_stamp(&mgr.last_decay_text().unwrap());
    let eroded = mgr.read_lessons(Scope::Project)[0].velocity;
    assert!((eroded - 1.8).abs() < 1e-9);

    // No session evidence since: the run skips but still stamps.
    let second = lessons.decay().unwrap();
    assert!(second.vacation);
    assert_eq!(second.decayed, 0);
    assert_eq!(second.evicted, 0);
    let stamp_two = parse_stamp(&mgr.last_decay_text().unwrap());
    assert!(stamp_two >= stamp_one, "vacation still advances the stamp");
    assert!(
        (mgr.read_lessons(Scope::Project)[0].velocity - eroded).abs() < 1e-9,
        "scores untouched on vacation"
    );

    // Fresh activity against a long-past stamp wakes the pass up.
    mgr.set_decay_stamp("2026-01-01T00:00:00+00:00\n");
    mgr.touch_activity();
    let third = lessons.decay().unwrap();
    assert!(!third.vacation);
    assert_eq!(third.decayed, 1);
    assert!(mgr.read_lessons(Scope::Project)[0].velocity < eroded);
}

#[test]
fn test_unreadable_stamp_does_not_block_decay() {
    let mgr = TestStoreManager::tuned(|c| c.stale_days = 0);
    mgr.seed_lessons(Scope::Project, 1);
    mgr.rewrite_lessons(Scope::Project, |doc| {
        for lesson in doc.records_mut() {
            lesson.velocity = 1.0;
        }
    });
    mgr.set_decay_stamp("not a timestamp");

    let report = mgr.lessons().decay().unwrap();
    assert!(!report.vacation);
    assert_eq!(report.decayed, 1);
    // The garbage was replaced by a real stamp.
    parse_stamp(&mgr.last_decay_text().unwrap());
}

#[test]
fn test_decay_converges_to_the_floor() {
    let mgr = TestStoreManager::tuned(|c| c.stale_days = 0);
    let lessons = mgr.lessons();
    mgr.seed_lessons(Scope::Project, 1);
    mgr.rewrite_lessons(Scope::Project, |doc| {
        for lesson in doc.records_mut() {
            lesson.uses = 5;
            lesson.velocity = 1.0;
        }
    });

    let mut runs = 0;
    loop {
        mgr.clear_decay_stamp();
        lessons.decay().unwrap();
        runs += 1;
        let record = &mgr.read_lessons(Scope::Project)[0];
        if record.velocity == 0.0 && record.uses == 1 {
            break;
        }
        assert!(runs < 100, "decay must reach the floor in bounded runs");
    }

    let settled = &mgr.read_lessons(Scope::Project)[0];
    assert_eq!(settled.velocity, 0.0, "velocity snaps to exactly zero");
    assert_eq!(settled.uses, 1, "uses never drop below one");

    // Further runs hold the floor.
    mgr.clear_decay_stamp();
    lessons.decay().unwrap();
    let held = &mgr.read_lessons(Scope::Project)[0];
    assert_eq!(held.velocity, 0.0);
    assert_eq!(held.uses, 1);
}

#[test]
fn test_eviction_trims_lowest_rated_first() {
    let mgr = TestStoreManager::tuned(|c| c.max_lessons = 5);
    let lessons = mgr.lessons();
    let ids = mgr.seed_lessons(Scope::Project, 7);
    for _ in 0..3 {
        lessons.cite(&ids[1]).unwrap();
    }
    lessons.cite(&ids[3]).unwrap();

    let report = lessons.decay().unwrap();
    assert_eq!(report.evicted, 2);
    assert_eq!(mgr.lesson_count(Scope::Project), 5);

    let survivors: Vec<String> = mgr
        .read_lessons(Scope::Project)
        .iter()
        .map(|l| l.id.clone())
        .collect();
    // The two lowest-rated, earliest-id records went first.
    assert!(!survivors.contains(&"L001".to_string()));
    assert!(!survivors.contains(&"L003".to_string()));
    assert!(survivors.contains(&"L002".to_string()));
    assert!(survivors.contains(&"L004".to_string()));
}

#[test]
fn test_system_scope_is_never_evicted() {
    let mgr = TestStoreManager::tuned(|c| c.max_lessons = 2);
    mgr.seed_lessons(Scope::System, 4);

    let report = mgr.lessons().decay().unwrap();
    assert_eq!(report.evicted, 0, "the bound covers the project file only");
    assert_eq!(mgr.lesson_count(Scope::System), 4);
}
