//! Durability tests
//!
//! Record files are hand-editable and live through crashes, so the
//! store has to survive what that implies: foreign text it cannot
//! parse, stale temp files from interrupted writes, content that
//! imitates the format's own markers, and mutations that fail halfway.

use std::collections::BTreeSet;
use std::fs;

use recite_core::lessons::LessonPatch;
use recite_core::record::{NewLesson, Scope, MAX_TITLE_LEN};
use recite_core::store::StoreError;
use recite_e2e_tests::{TestDataFactory, TestStoreManager};

const GARBAGE_BLOCK: &str = "### [broken header with no close\nstray continuation line\n";

#[test]
fn test_foreign_blocks_survive_every_mutation() {
    let mgr = TestStoreManager::new();
    let lessons = mgr.lessons();
    let ids = mgr.seed_lessons(Scope::Project, 2);

    // A hand-edit drops two blocks the codec cannot own: one broken,
    // one carrying a handoff id in the lessons file.
    let path = mgr.lessons_path(Scope::Project);
    let mut text = fs::read_to_string(&path).unwrap();
    text.push('\n');
    text.push_str(GARBAGE_BLOCK);
    text.push_str("\n### [H001-ab12] a record of the wrong kind\n> payload\n");
    fs::write(&path, text).unwrap();

    // A full round of mutations rewrites the file each time.
    lessons.cite(&ids[0]).unwrap();
    let added = lessons
        .add(TestDataFactory::lesson(9), Scope::Project, false)
        .unwrap();
    lessons
        .edit(
            &added.id,
            LessonPatch {
                content: Some("edited body".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    lessons.delete(&ids[1]).unwrap();

    let after = mgr.lessons_text(Scope::Project);
    assert!(after.contains("### [broken header with no close\nstray continuation line"));
    assert!(after.contains("### [H001-ab12] a record of the wrong kind\n> payload"));

    // The foreign header never fed the id sequence.
    assert_eq!(added.id, "L003");
    assert_eq!(mgr.lesson_count(Scope::Project), 2);
    assert_eq!(mgr.lessons().stats().unwrap().raw_blocks, 2);
}

#[test]
fn test_stale_temp_file_is_swept_by_the_next_write() {
    let mgr = TestStoreManager::new();
    let path = mgr.lessons_path(Scope::Project);
    fs::create_dir_all(path.parent().unwrap()).unwrap();

    // An interrupted write left a partial temp sibling behind.
    let tmp = path.with_file_name("lessons.md.tmp");
    fs::write(&tmp, "half a rec").unwrap();

    mgr.seed_lessons(Scope::Project, 1);
    assert!(!tmp.exists(), "the rename consumed the temp path");
    assert_eq!(mgr.lesson_count(Scope::Project), 1);
}

#[test]
fn test_mutations_leave_only_the_file_and_its_marker() {
    let mgr = TestStoreManager::new();
    let lessons = mgr.lessons();
    let ids = mgr.seed_lessons(Scope::Project, 3);
    lessons.cite(&ids[0]).unwrap();
    lessons.delete(&ids[2]).unwrap();

    let dir = mgr.lessons_path(Scope::Project).parent().unwrap().to_path_buf();
    let names: BTreeSet<String> = fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    let expected: BTreeSet<String> = ["lessons.md", "lessons.md.lock"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(names, expected);
}

#[test]
fn test_content_imitating_the_format_round_trips() {
    let mgr = TestStoreManager::new();
    let lessons = mgr.lessons();
    let content = "### [L999] not a header, just prose\n- **Uses**: 7 is part of the text\n> quoted inside quoted";
    let added = lessons
        .add(
            NewLesson {
                title: "Record whose body imitates the file format".to_string(),
                content: content.to_string(),
                ..Default::default()
            },
            Scope::Project,
            false,
        )
        .unwrap();

    // A fresh read sees one record with the body intact.
    let reread = mgr.lessons().get(&added.id).unwrap();
    assert_eq!(reread.content, content);
    assert_eq!(mgr.lesson_count(Scope::Project), 1);

    // And a rewrite on top of it stays stable.
    lessons.cite(&added.id).unwrap();
    assert_eq!(mgr.lessons().get(&added.id).unwrap().content, content);
}

#[test]
fn test_multibyte_titles_clamp_on_char_boundaries() {
    let mgr = TestStoreManager::new();
    let added = mgr
        .lessons()
        .add(
            NewLesson {
                title: "é".repeat(100),
                content: "accented title twice the cap in bytes".to_string(),
                ..Default::default()
            },
            Scope::Project,
            false,
        )
        .unwrap();

    assert!(added.title.len() <= MAX_TITLE_LEN);
    assert!(!added.title.is_empty());
    assert!(added.title.chars().all(|c| c == 'é'));

    let reread = mgr.lessons().get(&added.id).unwrap();
    assert_eq!(reread.title, added.title);
}

#[test]
fn test_unicode_content_survives_the_file() {
    let mgr = TestStoreManager::new();
    let content = "キャッシュは UTF-8 で保存する\nsecond line with emoji 🚀 and ümlauts";
    let added = mgr
        .lessons()
        .add(
            NewLesson {
                title: "Unicode bodies round-trip through the codec".to_string(),
                content: content.to_string(),
                ..Default::default()
            },
            Scope::Project,
            false,
        )
        .unwrap();

    assert_eq!(mgr.lessons().get(&added.id).unwrap().content, content);
}

#[test]
fn test_failed_mutation_leaves_the_file_byte_identical() {
    let mgr = TestStoreManager::new();
    mgr.seed_lessons(Scope::Project, 2);
    let before = mgr.lessons_text(Scope::Project);

    let err = mgr.lessons().cite("L999").unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert_eq!(mgr.lessons_text(Scope::Project), before);

    let err = mgr.lessons().delete("L999").unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert_eq!(mgr.lessons_text(Scope::Project), before);
}

#[test]
fn test_whitespace_only_file_behaves_as_empty() {
    let mgr = TestStoreManager::new();
    let path = mgr.lessons_path(Scope::Project);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "\n\n  \n").unwrap();

    assert_eq!(mgr.lesson_count(Scope::Project), 0);

    // The id sequence starts fresh on top of it.
    let added = mgr
        .lessons()
        .add(TestDataFactory::lesson(0), Scope::Project, false)
        .unwrap();
    assert_eq!(added.id, "L001");
    assert_eq!(mgr.lesson_count(Scope::Project), 1);
}

#[test]
fn test_unclosed_context_fence_parks_the_handoff_as_raw() {
    let mgr = TestStoreManager::new();
    let handoffs = mgr.handoffs();
    let first = handoffs.add(TestDataFactory::handoff(1)).unwrap();

    // Simulate a crash mid-append: a block whose context fence never
    // closes. It must not swallow the rest of the file.
    let path = mgr.config().handoffs_path();
    let mut text = fs::read_to_string(&path).unwrap();
    text.push_str("\n### [H002-dead] Broken context carrier\n- **Status**: in_progress\n```context\n{\"summary\": \"truncat");
    fs::write(&path, text).unwrap();

    let second = handoffs.add(TestDataFactory::handoff(3)).unwrap();
    assert!(second.id.starts_with("H003-"), "raw header still feeds the sequence");

    let listed = handoffs.list().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first.id);
    assert_eq!(listed[1].id, second.id);
    assert!(mgr.handoffs_text().contains("Broken context carrier"));
}
