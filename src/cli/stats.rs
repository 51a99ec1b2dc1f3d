//! CLI stats output.

use anyhow::Result;

use mnemon::memory::MemoryEngine;

pub fn stats(engine: &MemoryEngine, project: Option<String>) -> Result<()> {
    let report = engine.stats(project.as_deref())?;

    println!("Memories: {} total, {} active, {} obsolete",
        report.total_memories, report.active_memories, report.obsolete_memories);
    println!("Scope:    {} global, {} project-scoped",
        report.global_memories, report.project_memories);

    let mut types: Vec<_> = report.by_type.iter().collect();
    types.sort();
    for (t, n) in types {
        println!("  {t:<14} {n}");
    }

    let mut sources: Vec<_> = report.by_source.iter().collect();
    sources.sort();
    for (s, n) in sources {
        println!("  {s:<16} {n}");
    }

    if report.db_size_bytes > 0 {
        println!("Store:    {} KiB on disk", report.db_size_bytes / 1024);
    }
    Ok(())
}
