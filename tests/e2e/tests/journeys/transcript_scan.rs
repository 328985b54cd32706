//! Transcript scan journeys
//!
//! Drives the scanner over real transcript files on disk: the
//! checkpoint claim and what it makes idempotent, incremental tails,
//! corrupt-checkpoint recovery, the directive grammar end to end, and
//! orphaned-checkpoint cleanup.

use std::fs;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use recite_core::record::{Category, Scope, Source};
use recite_core::transcript::{cleanup_orphans, CheckpointState, ORPHAN_CLEANUP_LIMIT};
use recite_e2e_tests::{TestDataFactory, TestStoreManager};

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().expect("fixture timestamp")
}

#[test]
fn test_rescan_of_unchanged_transcript_is_a_noop() {
    let mgr = TestStoreManager::new();
    let lessons = mgr.lessons();
    let added = lessons
        .add(TestDataFactory::lesson(1), Scope::Project, false)
        .unwrap();

    let path = mgr.write_transcript(
        "session-a",
        &[TestDataFactory::assistant_event(
            "2026-03-01T10:00:00Z",
            &format!("Applying {} before the refactor.", added.id),
        )],
    );

    let first = mgr.scanner().scan(&path).unwrap();
    assert_eq!(first.events, 1);
    assert_eq!(first.cited, 1);
    assert!(first.full_scan);
    assert_eq!(lessons.get(&added.id).unwrap().uses, 2);

    // Nothing new on disk, so the claim leaves nothing to extract.
    let second = mgr.scanner().scan(&path).unwrap();
    assert_eq!(second.events, 1);
    assert_eq!(second.cited, 0);
    assert!(!second.full_scan);
    assert_eq!(lessons.get(&added.id).unwrap().uses, 2);
}

#[test]
fn test_incremental_scan_takes_only_the_tail() {
    let mgr = TestStoreManager::new();
    let lessons = mgr.lessons();
    let early = lessons
        .add(TestDataFactory::lesson(1), Scope::Project, false)
        .unwrap();
    let late = lessons
        .add(TestDataFactory::lesson(2), Scope::Project, false)
        .unwrap();

    let path = mgr.write_transcript(
        "session-a",
        &[TestDataFactory::assistant_event(
            "2026-03-01T10:00:00Z",
            &format!("{} covers this case.", early.id),
        )],
    );
    mgr.scanner().scan(&path).unwrap();

    mgr.append_transcript(
        &path,
        &[
            TestDataFactory::user_event("2026-03-01T10:04:00Z", "keep going"),
            TestDataFactory::assistant_event(
                "2026-03-01T10:05:00Z",
                &format!("Switching to the shape from {}.", late.id),
            ),
        ],
    );

    let report = mgr.scanner().scan(&path).unwrap();
    assert_eq!(report.events, 3);
    assert_eq!(report.cited, 1);
    assert_eq!(lessons.get(&early.id).unwrap().uses, 2);
    assert_eq!(lessons.get(&late.id).unwrap().uses, 2);

    // The claim now sits on the newest event.
    let expected = CheckpointState::render(ts("2026-03-01T10:05:00Z"));
    assert_eq!(mgr.checkpoint_text(&path).unwrap(), expected);
}

#[test]
fn test_corrupt_checkpoint_skips_extraction_and_reanchors() {
    let mgr = TestStoreManager::new();
    let lessons = mgr.lessons();
    let added = lessons
        .add(TestDataFactory::lesson(1), Scope::Project, false)
        .unwrap();

    let path = mgr.write_transcript(
        "session-a",
        &[TestDataFactory::assistant_event(
            "2026-03-01T10:00:00Z",
            &format!("Reusing {} here.", added.id),
        )],
    );
    mgr.set_checkpoint(&path, "not a timestamp\n");

    let report = mgr.scanner().scan(&path).unwrap();
    assert!(report.corrupt_checkpoint);
    assert_eq!(report.cited, 0);
    assert!(!report.full_scan);
    assert_eq!(lessons.get(&added.id).unwrap().uses, 1);

    // The pass still re-anchored the claim on the newest event, so the
    // next scan runs clean and the skipped event stays skipped.
    let expected = CheckpointState::render(ts("2026-03-01T10:00:00Z"));
    assert_eq!(mgr.checkpoint_text(&path).unwrap(), expected);
    let next = mgr.scanner().scan(&path).unwrap();
    assert!(!next.corrupt_checkpoint);
    assert_eq!(next.cited, 0);
}

#[test]
fn test_untimestamped_events_count_only_on_full_scan() {
    let mgr = TestStoreManager::new();
    let lessons = mgr.lessons();
    let a = lessons
        .add(TestDataFactory::lesson(1), Scope::Project, false)
        .unwrap();
    let b = lessons
        .add(TestDataFactory::lesson(2), Scope::Project, false)
        .unwrap();

    let path = mgr.write_transcript(
        "session-a",
        &[
            TestDataFactory::assistant_event(
                "2026-03-01T10:00:00Z",
                &format!("{} applies.", a.id),
            ),
            TestDataFactory::untimestamped_assistant(&format!("{} also applies.", b.id)),
        ],
    );

    let first = mgr.scanner().scan(&path).unwrap();
    assert_eq!(first.cited, 2);
    assert_eq!(lessons.get(&b.id).unwrap().uses, 2);

    // After a claim exists, an undated event cannot be told apart from
    // one already processed, so it is left alone.
    mgr.append_transcript(
        &path,
        &[TestDataFactory::untimestamped_assistant(&format!(
            "{} once more.",
            b.id
        ))],
    );
    let second = mgr.scanner().scan(&path).unwrap();
    assert_eq!(second.cited, 0);
    assert_eq!(lessons.get(&b.id).unwrap().uses, 2);
}

#[test]
fn test_unknown_citations_are_counted_not_fatal() {
    let mgr = TestStoreManager::new();
    let path = mgr.write_transcript(
        "session-a",
        &[TestDataFactory::assistant_event(
            "2026-03-01T10:00:00Z",
            "L999 looked relevant but is long gone.",
        )],
    );

    let report = mgr.scanner().scan(&path).unwrap();
    assert_eq!(report.cited, 0);
    assert_eq!(report.unknown_citations, 1);
    assert_eq!(report.directives_failed, 0);
}

#[test]
fn test_listed_records_with_glyphs_are_not_citations() {
    let mgr = TestStoreManager::new();
    let lessons = mgr.lessons();
    let added = lessons
        .add(TestDataFactory::lesson(1), Scope::Project, false)
        .unwrap();

    // First line mirrors an injected listing; second is genuine prose.
    let path = mgr.write_transcript(
        "session-a",
        &[TestDataFactory::assistant_parts(
            "2026-03-01T10:00:00Z",
            &[
                &format!("- [{}] [*----|-----] Generated insight", added.id),
                &format!("{} is exactly what this bug needs.", added.id),
            ],
        )],
    );

    let report = mgr.scanner().scan(&path).unwrap();
    assert_eq!(report.cited, 1);
    assert_eq!(lessons.get(&added.id).unwrap().uses, 2);
}

#[test]
fn test_every_directive_form_applies() {
    let mgr = TestStoreManager::new();
    let handoffs = mgr.handoffs();

    let path = mgr.write_transcript(
        "session-a",
        &[
            TestDataFactory::assistant_event(
                "2026-03-01T10:00:00Z",
                "lesson: (gotcha) Flush before rename -- the journal lags the data file",
            ),
            TestDataFactory::assistant_event(
                "2026-03-01T10:01:00Z",
                "Lesson(system): Pin the toolchain -- nightly drift broke the build twice",
            ),
            TestDataFactory::assistant_event(
                "2026-03-01T10:02:00Z",
                "handoff: Stabilize the flaky suite -- quarantine first, then fix root causes",
            ),
            TestDataFactory::assistant_parts(
                "2026-03-01T10:03:00Z",
                &[
                    "handoff status: H001 in_progress",
                    "handoff tried: H001 fail pinning rayon did not help",
                    "handoff next: H001 bisect the scheduler change",
                ],
            ),
            TestDataFactory::assistant_event("2026-03-01T10:04:00Z", "handoff complete: H001"),
        ],
    );

    let report = mgr.scanner().scan(&path).unwrap();
    assert_eq!(report.directives_applied, 7);
    assert_eq!(report.directives_failed, 0);

    let project = mgr.read_lessons(Scope::Project);
    assert_eq!(project.len(), 1);
    assert_eq!(project[0].title, "Flush before rename");
    assert_eq!(project[0].category, Category::Gotcha);
    assert_eq!(project[0].source, Source::Ai);
    assert!(project[0].promotable);

    let system = mgr.read_lessons(Scope::System);
    assert_eq!(system.len(), 1);
    assert_eq!(system[0].title, "Pin the toolchain");

    let handoff = handoffs.get("H001").unwrap();
    assert_eq!(handoff.title, "Stabilize the flaky suite");
    assert!(handoff.is_completed());
    assert_eq!(handoff.tried.len(), 1);
    assert_eq!(handoff.tried[0].description, "pinning rayon did not help");
    assert_eq!(handoff.next_steps, "bisect the scheduler change");
}

#[test]
fn test_failed_directives_are_counted_not_fatal() {
    let mgr = TestStoreManager::new();
    let lessons = mgr.lessons();
    lessons
        .add(
            TestDataFactory::lesson_titled("Flush before rename"),
            Scope::Project,
            false,
        )
        .unwrap();

    let path = mgr.write_transcript(
        "session-a",
        &[TestDataFactory::assistant_parts(
            "2026-03-01T10:00:00Z",
            &[
                // Duplicate of the seeded title.
                "lesson: Flush before rename -- the journal lags the data file",
                // No such handoff.
                "handoff complete: H009",
            ],
        )],
    );

    let report = mgr.scanner().scan(&path).unwrap();
    assert_eq!(report.directives_applied, 0);
    assert_eq!(report.directives_failed, 2);
    assert_eq!(mgr.lesson_count(Scope::Project), 1);
}

#[test]
fn test_malformed_lines_and_other_event_kinds_are_skipped() {
    let mgr = TestStoreManager::new();
    let lessons = mgr.lessons();
    let added = lessons
        .add(TestDataFactory::lesson(1), Scope::Project, false)
        .unwrap();

    let path = mgr.write_transcript(
        "session-a",
        &[
            "{ this is not json".to_string(),
            TestDataFactory::user_event(
                "2026-03-01T10:00:00Z",
                &format!("does {} apply here?", added.id),
            ),
            TestDataFactory::summary_event("earlier work, compacted"),
            TestDataFactory::assistant_event(
                "2026-03-01T10:01:00Z",
                &format!("Yes, {} applies.", added.id),
            ),
        ],
    );

    let report = mgr.scanner().scan(&path).unwrap();
    // The malformed line never becomes an event; the user mention never
    // becomes a citation.
    assert_eq!(report.events, 3);
    assert_eq!(report.cited, 1);
    assert_eq!(lessons.get(&added.id).unwrap().uses, 2);
}

#[test]
fn test_claim_advances_even_when_nothing_extracted() {
    let mgr = TestStoreManager::new();
    let path = mgr.write_transcript(
        "session-a",
        &[
            TestDataFactory::user_event("2026-03-01T10:00:00Z", "hello"),
            TestDataFactory::user_event("2026-03-01T10:09:00Z", "still here"),
        ],
    );

    let report = mgr.scanner().scan(&path).unwrap();
    assert_eq!(report.events, 2);
    assert_eq!(report.cited, 0);
    assert_eq!(report.directives_applied, 0);
    assert_eq!(report.orphans_removed, 0);

    let expected = CheckpointState::render(ts("2026-03-01T10:09:00Z"));
    assert_eq!(mgr.checkpoint_text(&path).unwrap(), expected);
}

#[test]
fn test_orphan_cleanup_ages_out_stale_checkpoints() {
    let mgr = TestStoreManager::new();
    let live = mgr.write_transcript(
        "live-session",
        &[TestDataFactory::user_event("2026-03-01T10:00:00Z", "hi")],
    );
    mgr.scanner().scan(&live).unwrap();

    let checkpoints = mgr.config().checkpoints_dir();
    fs::write(checkpoints.join("dead-session"), "2026-01-01T00:00:00Z\n").unwrap();
    fs::write(checkpoints.join("dead-session.lock"), "").unwrap();
    fs::write(checkpoints.join("dead-session.tmp"), "partial").unwrap();

    // Young orphans survive a present-time pass.
    let now = SystemTime::now();
    let transcript_dir = live.parent().unwrap();
    assert_eq!(
        cleanup_orphans(&checkpoints, transcript_dir, live.extension(), now),
        0
    );

    // Eight days on, only the plain orphan goes; markers and the live
    // session's claim stay.
    let later = now + Duration::from_secs(8 * 24 * 60 * 60);
    assert_eq!(
        cleanup_orphans(&checkpoints, transcript_dir, live.extension(), later),
        1
    );
    assert!(!checkpoints.join("dead-session").exists());
    assert!(checkpoints.join("dead-session.lock").exists());
    assert!(checkpoints.join("dead-session.tmp").exists());
    assert!(mgr.checkpoint_text(&live).is_some());
}

#[test]
fn test_orphan_cleanup_is_bounded_per_pass() {
    let mgr = TestStoreManager::new();
    let live = mgr.write_transcript(
        "live-session",
        &[TestDataFactory::user_event("2026-03-01T10:00:00Z", "hi")],
    );
    mgr.scanner().scan(&live).unwrap();

    let checkpoints = mgr.config().checkpoints_dir();
    for i in 0..ORPHAN_CLEANUP_LIMIT + 2 {
        fs::write(checkpoints.join(format!("gone-{i:02}")), "x\n").unwrap();
    }

    let later = SystemTime::now() + Duration::from_secs(8 * 24 * 60 * 60);
    let transcript_dir = live.parent().unwrap();
    assert_eq!(
        cleanup_orphans(&checkpoints, transcript_dir, live.extension(), later),
        ORPHAN_CLEANUP_LIMIT
    );
    assert_eq!(
        cleanup_orphans(&checkpoints, transcript_dir, live.extension(), later),
        2
    );
}
