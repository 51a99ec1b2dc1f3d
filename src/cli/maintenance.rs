//! CLI maintenance commands — `gc`, `consolidate`, and `cleanup`.

use anyhow::Result;

use mnemon::memory::types::ProjectScope;
use mnemon::memory::MemoryEngine;

pub fn gc(engine: &mut MemoryEngine, scope: ProjectScope) -> Result<()> {
    let deleted = engine.garbage_collect(&scope)?;
    if deleted == 0 {
        println!("Nothing to collect.");
    } else {
        println!("Deleted {deleted} stale or expired memories.");
    }
    Ok(())
}

pub fn consolidate(engine: &mut MemoryEngine, scope: ProjectScope, dry_run: bool) -> Result<()> {
    let report = engine.consolidate(&scope, dry_run)?;

    if report.clusters.is_empty() {
        println!("No near-duplicate clusters found.");
        return Ok(());
    }

    let verb = if dry_run { "Would merge" } else { "Merged" };
    println!(
        "{verb} {} memories across {} clusters:",
        report.obsoleted,
        report.clusters.len()
    );
    for cluster in &report.clusters {
        let merged: Vec<String> = cluster.merged.iter().map(|id| id.to_string()).collect();
        println!("  keep {} ← {}", cluster.kept, merged.join(", "));
    }
    Ok(())
}

pub fn cleanup(engine: &mut MemoryEngine, scope: ProjectScope, dry_run: bool) -> Result<()> {
    let report = engine.cleanup_corrupted(&scope, dry_run)?;

    if report.matched == 0 {
        println!("No corrupted memories found.");
        return Ok(());
    }

    if dry_run {
        println!(
            "Found {} corrupted candidate(s) (dry run — nothing deleted):",
            report.matched
        );
        for sample in &report.samples {
            println!("  {sample}");
        }
    } else {
        println!("Deleted {} corrupted memories.", report.deleted);
    }
    Ok(())
}
