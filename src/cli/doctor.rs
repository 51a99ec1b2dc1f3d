//! Health diagnostics for the store and the embedding service.

use anyhow::Result;
use std::path::Path;

use mnemon::config::MnemonConfig;
use mnemon::db;
use mnemon::embedding::http::HttpEmbedder;
use mnemon::embedding::Embedder;

pub fn doctor(dir: &Path) -> Result<()> {
    let config = MnemonConfig::load(dir)?;
    let conn = db::open_database(
        dir.join("memories.db"),
        config.embedding.dimensions,
        &config.embedding.model,
    )?;

    let report = db::check_database_health(&conn)?;
    println!("Schema version:   {}", report.schema_version);
    println!(
        "Embedding model:  {} ({} dimensions)",
        report.embedding_model.as_deref().unwrap_or("(unset)"),
        report
            .embedding_dimensions
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".into()),
    );
    println!("sqlite-vec:       {}", report.sqlite_vec_version);
    println!(
        "Rows:             {} memories, {} embeddings",
        report.memory_count, report.embedding_count
    );
    if report.memory_count != report.embedding_count {
        println!("  WARNING: memory/embedding counts disagree — run any delete to sweep orphans");
    }
    println!(
        "Integrity:        {}",
        if report.integrity_ok {
            "ok"
        } else {
            report.integrity_details.as_str()
        }
    );

    let embedder = HttpEmbedder::new(&config.embedding)?;
    if embedder.is_available() {
        println!("Embedder:         ok at {}", config.embedding.base_url);
    } else {
        println!(
            "Embedder:         UNAVAILABLE at {} (remember/recall will fail until it is up)",
            config.embedding.base_url
        );
    }
    Ok(())
}
