mod helpers;

use helpers::{engine, engine_in_project, engine_with, spike, StubEmbedder};
use mnemon::error::MemoryError;
use mnemon::memory::types::{MemoryType, ProjectScope, RecallOptions, RememberInput, Source};

#[test]
fn update_replaces_content_and_embedding() {
    let before = "The scheduler polls every minute";
    let after = "The scheduler is event-driven now";
    let embedder = StubEmbedder::new()
        .set(before, spike(0))
        .set(after, spike(3))
        .set("event driven scheduler", spike(3));

    let mut bed = engine_with(embedder, |c| c.dedup.enabled = false);
    let id = bed.engine.remember(RememberInput::new(before)).unwrap()[0];

    bed.engine.update(id, after).unwrap();

    // The row now answers for its new embedding.
    let results = bed
        .engine
        .recall("event driven scheduler", &RecallOptions::default())
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].memory.id, id);
    assert_eq!(results[0].memory.content, after);
    assert!(results[0].distance < 1e-5);
}

#[test]
fn update_missing_row_is_not_found() {
    let mut bed = engine();
    let err = bed.engine.update(404, "does not matter").unwrap_err();
    assert!(matches!(err, MemoryError::NotFound(_)));
}

#[test]
fn forget_removes_the_row_for_good() {
    let mut bed = engine();
    let id = bed
        .engine
        .remember(RememberInput::new("about to be deleted entirely"))
        .unwrap()[0];

    bed.engine.forget(id).unwrap();

    assert_eq!(bed.engine.stats(None).unwrap().total_memories, 0);
    assert!(matches!(
        bed.engine.forget(id).unwrap_err(),
        MemoryError::NotFound(_)
    ));
}

#[test]
fn forget_by_category_scopes_and_dry_runs() {
    let mut bed = engine();
    bed.engine
        .remember(RememberInput::new("global styling note").category("styling"))
        .unwrap();
    bed.engine
        .remember(
            RememberInput::new("web styling note")
                .category("styling")
                .project("web"),
        )
        .unwrap();
    bed.engine
        .remember(RememberInput::new("unrelated fact entirely"))
        .unwrap();

    // Dry run counts without deleting.
    let count = bed
        .engine
        .forget_by_category("styling", &ProjectScope::Any, true)
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(bed.engine.stats(None).unwrap().total_memories, 3);

    // Global-only leaves the project row.
    let count = bed
        .engine
        .forget_by_category("styling", &ProjectScope::GlobalOnly, false)
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(bed.engine.stats(None).unwrap().total_memories, 2);

    // Unknown category is a lookup failure.
    let err = bed
        .engine
        .forget_by_category("nonexistent", &ProjectScope::Any, false)
        .unwrap_err();
    assert!(matches!(err, MemoryError::NotFound(_)));
}

#[test]
fn forget_by_source_deletes_only_that_channel() {
    let mut bed = engine();
    bed.engine
        .remember(RememberInput::new("auto captured summary").source(Source::AutoSession))
        .unwrap();
    bed.engine
        .remember(RememberInput::new("precompact snapshot").source(Source::AutoPrecompact))
        .unwrap();
    bed.engine
        .remember(RememberInput::new("hand-written note"))
        .unwrap();

    let count = bed
        .engine
        .forget_by_source(Source::AutoSession, &ProjectScope::Any, false)
        .unwrap();
    assert_eq!(count, 1);

    let stats = bed.engine.stats(None).unwrap();
    assert_eq!(stats.total_memories, 2);
    assert_eq!(stats.by_source.get("auto:session"), None);
    assert_eq!(stats.by_source["auto:precompact"], 1);
    assert_eq!(stats.by_source["manual"], 1);

    // A source with no rows deletes nothing and is not an error.
    let count = bed
        .engine
        .forget_by_source(Source::AutoCommit, &ProjectScope::Any, false)
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn list_recent_scopes_to_project_plus_globals() {
    let mut bed = engine_in_project(StubEmbedder::new(), "web");
    bed.engine
        .remember(RememberInput::new("web-scoped memo one"))
        .unwrap();
    bed.engine
        .remember(RememberInput::new("other-project memo").project("api"))
        .unwrap();
    bed.engine
        .remember(
            RememberInput::new("global preference memo").memory_type(MemoryType::Preference),
        )
        .unwrap();

    // Default scope: detected project (web) plus globals.
    let rows = bed.engine.list_recent(10, None, false).unwrap();
    let contents: Vec<&str> = rows.iter().map(|m| m.content.as_str()).collect();
    assert!(contents.contains(&"web-scoped memo one"));
    assert!(contents.contains(&"global preference memo"));
    assert!(!contents.contains(&"other-project memo"));

    // All projects.
    let rows = bed.engine.list_recent(10, None, true).unwrap();
    assert_eq!(rows.len(), 3);

    // Newest first.
    assert_eq!(rows[0].content, "global preference memo");
}

#[test]
fn list_recent_excludes_obsolete() {
    let mut bed = engine();
    let id = bed
        .engine
        .remember(RememberInput::new("soon to be retired memo"))
        .unwrap()[0];
    bed.engine.mark_obsolete(id).unwrap();

    assert!(bed.engine.list_recent(10, None, true).unwrap().is_empty());

    // Stats still count it, as an obsolete row.
    let stats = bed.engine.stats(None).unwrap();
    assert_eq!(stats.total_memories, 1);
    assert_eq!(stats.active_memories, 0);
    assert_eq!(stats.obsolete_memories, 1);
}

#[test]
fn detect_project_resolves_registered_paths() {
    let bed = engine_in_project(StubEmbedder::new(), "web");
    assert_eq!(
        bed.engine.detect_project(bed.dir.path()),
        Some("web".to_string())
    );
    assert_eq!(bed.engine.detect_project(std::path::Path::new("/")), None);
}

#[test]
fn is_ready_reflects_embedder_health() {
    let up = engine();
    assert!(up.engine.is_ready());

    let down = engine_with(StubEmbedder::unavailable(), |_| {});
    assert!(!down.engine.is_ready());
}

#[test]
fn engine_maintenance_wrappers_round_trip() {
    let near_a = "use TypeScript strict mode";
    let near_b = "enable strict mode in TypeScript";
    let mut base = spike(0);
    base[1] += 0.1;
    let embedder = StubEmbedder::new()
        .set(near_a, spike(0))
        .set(near_b, base)
        .set("junk", spike(5));

    let mut bed = engine_with(embedder, |c| c.dedup.enabled = false);
    let a = bed
        .engine
        .remember(RememberInput::new(near_a).importance(5))
        .unwrap()[0];
    let b = bed.engine.remember(RememberInput::new(near_b)).unwrap()[0];
    bed.engine.remember(RememberInput::new("junk")).unwrap();

    let report = bed.engine.consolidate(&ProjectScope::Any, false).unwrap();
    assert_eq!(report.clusters.len(), 1);
    assert_eq!(report.clusters[0].kept, a);
    assert_eq!(report.clusters[0].merged, vec![b]);

    let cleanup = bed.engine.cleanup_corrupted(&ProjectScope::Any, false).unwrap();
    assert_eq!(cleanup.deleted, 1, "the sub-20-char row is corrupted");

    let collected = bed.engine.garbage_collect(&ProjectScope::Any).unwrap();
    assert_eq!(collected, 0, "fresh full-confidence rows survive gc");

    let stats = bed.engine.stats(None).unwrap();
    assert_eq!(stats.total_memories, 2);
    assert_eq!(stats.active_memories, 1);
}
