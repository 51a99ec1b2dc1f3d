mod helpers;

use helpers::{engine, engine_in_project, engine_with, near, spike, StubEmbedder};
use mnemon::error::MemoryError;
use mnemon::memory::types::{MemoryType, RecallOptions, RememberInput, Source};

#[test]
fn remember_applies_defaults() {
    let mut bed = engine();
    let ids = bed
        .engine
        .remember(RememberInput::new("SQLite WAL mode allows concurrent readers"))
        .unwrap();
    assert_eq!(ids.len(), 1);

    let rows = bed.engine.list_recent(10, None, true).unwrap();
    let m = &rows[0];
    assert_eq!(m.memory_type, MemoryType::Fact);
    assert_eq!(m.source, Source::Manual);
    assert_eq!(m.importance, 3);
    assert!((m.confidence - 1.0).abs() < f64::EPSILON);
    assert!(m.tags.is_empty());
    assert!(m.project.is_none());
    assert_eq!(m.access_count, 0);
    assert!(m.last_accessed.is_none());
}

#[test]
fn preferences_are_always_global() {
    let mut bed = engine_in_project(StubEmbedder::new(), "web");

    let ids = bed
        .engine
        .remember(
            RememberInput::new("Prefer early returns")
                .memory_type(MemoryType::Preference)
                .project("web"),
        )
        .unwrap();

    let rows = bed.engine.list_recent(10, None, true).unwrap();
    let m = rows.iter().find(|m| m.id == ids[0]).unwrap();
    assert_eq!(m.memory_type, MemoryType::Preference);
    assert!(m.project.is_none(), "preference must be stored global");
}

#[test]
fn non_preferences_inherit_detected_project() {
    let mut bed = engine_in_project(StubEmbedder::new(), "web");

    let ids = bed
        .engine
        .remember(RememberInput::new("The API gateway lives in gateway.ts"))
        .unwrap();

    let rows = bed.engine.list_recent(10, None, true).unwrap();
    let m = rows.iter().find(|m| m.id == ids[0]).unwrap();
    assert_eq!(m.project.as_deref(), Some("web"));
}

#[test]
fn explicit_project_wins_over_detection() {
    let mut bed = engine_in_project(StubEmbedder::new(), "web");

    let ids = bed
        .engine
        .remember(RememberInput::new("Deploy script expects bash").project("infra"))
        .unwrap();

    let rows = bed.engine.list_recent(10, None, true).unwrap();
    let m = rows.iter().find(|m| m.id == ids[0]).unwrap();
    assert_eq!(m.project.as_deref(), Some("infra"));
}

#[test]
fn sensitive_content_is_redacted_at_rest() {
    let mut bed = engine();
    bed.engine
        .remember(RememberInput::new(
            "Staging uses password: hunter2 for the admin account",
        ))
        .unwrap();

    let rows = bed.engine.list_recent(10, None, true).unwrap();
    assert!(rows[0].content.contains("[REDACTED]"));
    assert!(!rows[0].content.contains("hunter2"));
}

#[test]
fn long_content_chunks_with_part_markers() {
    let mut bed = engine_with(StubEmbedder::new(), |c| {
        c.chunking.max_tokens = 16;
        c.chunking.min_chunk_size = 1;
        c.dedup.enabled = false;
    });

    let para = "the migration plan starts with the user table and continues onward";
    let content = format!("{para}\n\n{para} again\n\n{para} a third time");
    let ids = bed.engine.remember(RememberInput::new(content)).unwrap();
    assert!(ids.len() > 1);

    let rows = bed.engine.list_recent(10, None, true).unwrap();
    let total = ids.len();
    for id in &ids {
        let m = rows.iter().find(|m| m.id == *id).unwrap();
        assert!(
            m.content.starts_with("[part "),
            "chunked content must carry a part marker: {:?}",
            m.content
        );
        assert!(m.content.contains(&format!("/{total}]")));
    }
}

#[test]
fn dedup_merges_near_duplicates_keeping_max_importance() {
    let short = "Using JWT in httpOnly cookies";
    let long = "Using JWT tokens stored in httpOnly cookies for CSRF resilience";
    let base = spike(0);
    let embedder = StubEmbedder::new()
        .set(short, base.clone())
        .set(long, near(&base));

    let mut bed = engine_with(embedder, |c| {
        c.dedup.similarity_threshold = 5.0;
        c.dedup.prefer_longer = true;
    });

    let first = bed
        .engine
        .remember(RememberInput::new(short).importance(3))
        .unwrap();
    let second = bed
        .engine
        .remember(RememberInput::new(long).importance(4))
        .unwrap();

    assert_eq!(first, second, "second remember must merge into the first row");

    let rows = bed.engine.list_recent(10, None, true).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].content, long, "prefer_longer replaces the content");
    assert_eq!(rows[0].importance, 4, "merge keeps the max importance");
}

#[test]
fn dedup_keeps_existing_content_when_new_is_shorter() {
    let long = "Using JWT tokens stored in httpOnly cookies for CSRF resilience";
    let short = "Using JWT in httpOnly cookies";
    let base = spike(0);
    let embedder = StubEmbedder::new()
        .set(long, base.clone())
        .set(short, near(&base));

    let mut bed = engine_with(embedder, |c| {
        c.dedup.similarity_threshold = 5.0;
    });

    bed.engine.remember(RememberInput::new(long)).unwrap();
    bed.engine.remember(RememberInput::new(short)).unwrap();

    let rows = bed.engine.list_recent(10, None, true).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].content, long);
}

#[test]
fn skip_dedup_inserts_a_fresh_row() {
    let a = "Using JWT in httpOnly cookies";
    let b = "Using JWT tokens in httpOnly cookies";
    let base = spike(0);
    let embedder = StubEmbedder::new().set(a, base.clone()).set(b, near(&base));

    let mut bed = engine_with(embedder, |c| {
        c.dedup.similarity_threshold = 5.0;
    });

    let first = bed.engine.remember(RememberInput::new(a)).unwrap();
    let second = bed
        .engine
        .remember(RememberInput::new(b).skip_dedup())
        .unwrap();

    assert_ne!(first[0], second[0]);
    assert_eq!(bed.engine.list_recent(10, None, true).unwrap().len(), 2);
}

#[test]
fn supersedes_retires_the_old_row() {
    let mut bed = engine();
    let old = bed
        .engine
        .remember(RememberInput::new("Using Prisma ORM").memory_type(MemoryType::Decision))
        .unwrap()[0];

    let new = bed
        .engine
        .remember(
            RememberInput::new("Migrated to Drizzle ORM")
                .memory_type(MemoryType::Decision)
                .supersedes(old),
        )
        .unwrap()[0];

    let rows = bed.engine.list_recent(10, None, true).unwrap();
    let new_row = rows.iter().find(|m| m.id == new).unwrap();
    assert_eq!(new_row.supersedes, Some(old));
    assert!(!new_row.is_obsolete);

    // The target of the supersedes pointer is now obsolete.
    let stats = bed.engine.stats(None).unwrap();
    assert_eq!(stats.obsolete_memories, 1);

    // The superseded row is retained but out of recall.
    let results = bed
        .engine
        .recall("Migrated to Drizzle ORM", &RecallOptions::default())
        .unwrap();
    let ids: Vec<i64> = results.iter().map(|r| r.memory.id).collect();
    assert!(ids.contains(&new));
    assert!(!ids.contains(&old));
}

#[test]
fn supersedes_missing_target_fails_cleanly() {
    let mut bed = engine();
    let err = bed
        .engine
        .remember(RememberInput::new("replaces nothing").supersedes(9999))
        .unwrap_err();
    assert!(matches!(err, MemoryError::NotFound(_)));
}

#[test]
fn empty_content_is_invalid() {
    let mut bed = engine();
    let err = bed.engine.remember(RememberInput::new("   ")).unwrap_err();
    assert!(matches!(err, MemoryError::InvalidInput(_)));
}

#[test]
fn out_of_range_importance_is_invalid() {
    let mut bed = engine();
    for bad in [0, 6, -1] {
        let err = bed
            .engine
            .remember(RememberInput::new("x".repeat(30)).importance(bad))
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInput(_)));
    }
}

#[test]
fn embedder_outage_fails_the_whole_call() {
    let mut bed = engine_with(StubEmbedder::unavailable(), |_| {});
    assert!(!bed.engine.is_ready());

    let err = bed
        .engine
        .remember(RememberInput::new("never lands anywhere"))
        .unwrap_err();
    assert!(err.is_embedder());

    // No partial writes: the store stayed empty.
    assert_eq!(bed.engine.stats(None).unwrap().total_memories, 0);
}
