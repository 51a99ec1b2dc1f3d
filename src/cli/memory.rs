//! CLI entry points for the ingestion and recall paths.

use anyhow::Result;

use mnemon::memory::types::{MemoryType, RecallOptions, RememberInput, Source};
use mnemon::memory::MemoryEngine;

#[allow(clippy::too_many_arguments)]
pub fn remember(
    engine: &mut MemoryEngine,
    content: String,
    memory_type: Option<MemoryType>,
    project: Option<String>,
    category: Option<String>,
    reasoning: Option<String>,
    source: Option<Source>,
    importance: Option<i64>,
    tags: Vec<String>,
    supersedes: Option<i64>,
    skip_dedup: bool,
) -> Result<()> {
    let mut input = RememberInput {
        content,
        memory_type,
        project,
        category,
        reasoning,
        source,
        importance,
        supersedes,
        ..Default::default()
    };
    if !tags.is_empty() {
        input.tags = Some(tags);
    }
    if skip_dedup {
        input.skip_dedup = true;
    }

    let ids = engine.remember(input)?;
    if ids.len() == 1 {
        println!("Stored memory {}", ids[0]);
    } else {
        println!(
            "Stored {} chunks: {}",
            ids.len(),
            ids.iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}

pub fn recall(
    engine: &mut MemoryEngine,
    query: String,
    limit: Option<usize>,
    memory_type: Option<MemoryType>,
    min_importance: Option<i64>,
    include_obsolete: bool,
) -> Result<()> {
    let options = RecallOptions {
        limit,
        memory_type,
        min_importance,
        include_obsolete,
    };
    let results = engine.recall(&query, &options)?;

    if results.is_empty() {
        println!("No memories matched.");
        return Ok(());
    }

    for r in &results {
        let scope = r.source.as_deref().unwrap_or("global");
        println!(
            "[{}] {:.3} ({:.3}) {} · {} · imp {}",
            r.memory.id, r.score, r.distance, scope, r.memory.memory_type, r.memory.importance
        );
        println!("    {}", r.memory.content);
    }
    Ok(())
}

pub fn list(
    engine: &MemoryEngine,
    limit: usize,
    project: Option<String>,
    all_projects: bool,
) -> Result<()> {
    let rows = engine.list_recent(limit, project.as_deref(), all_projects)?;
    if rows.is_empty() {
        println!("No memories.");
        return Ok(());
    }
    for m in &rows {
        let scope = m.project.as_deref().unwrap_or("global");
        println!("[{}] {} · {} · {}", m.id, m.memory_type, scope, m.content);
    }
    Ok(())
}

pub fn update(engine: &mut MemoryEngine, id: i64, content: String) -> Result<()> {
    engine.update(id, &content)?;
    println!("Updated memory {id}");
    Ok(())
}

pub fn obsolete(engine: &mut MemoryEngine, id: i64) -> Result<()> {
    engine.mark_obsolete(id)?;
    println!("Marked memory {id} obsolete");
    Ok(())
}

pub fn forget(engine: &mut MemoryEngine, id: i64) -> Result<()> {
    engine.forget(id)?;
    println!("Forgot memory {id}");
    Ok(())
}
