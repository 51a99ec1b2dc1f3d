//! CLI entry points for project registry management.

use anyhow::Result;
use std::path::PathBuf;

use mnemon::memory::MemoryEngine;

pub fn create(
    engine: &mut MemoryEngine,
    name: String,
    path: Option<PathBuf>,
    description: Option<String>,
) -> Result<()> {
    engine
        .registry_mut()
        .create(&name, path.as_deref(), description)?;
    println!("Created project '{name}'");
    Ok(())
}

pub fn add_path(engine: &mut MemoryEngine, name: String, path: PathBuf) -> Result<()> {
    engine.registry_mut().add_path(&name, &path)?;
    println!("Added {} to project '{name}'", path.display());
    Ok(())
}

pub fn delete(engine: &mut MemoryEngine, name: String) -> Result<()> {
    engine.registry_mut().delete(&name)?;
    println!("Deleted project '{name}' (stored memories are untouched)");
    Ok(())
}

pub fn describe(engine: &mut MemoryEngine, name: String, description: Option<String>) -> Result<()> {
    engine.registry_mut().update_description(&name, description)?;
    println!("Updated description for '{name}'");
    Ok(())
}

pub fn list(engine: &MemoryEngine) -> Result<()> {
    let projects = engine.registry().list();
    if projects.is_empty() {
        println!("No projects registered.");
        return Ok(());
    }
    for p in projects {
        let desc = p.description.as_deref().unwrap_or("");
        println!("{:<20} {}", p.name, desc);
        for path in &p.paths {
            println!("    {}", path.display());
        }
    }
    Ok(())
}

pub fn detect(engine: &MemoryEngine, cwd: PathBuf) -> Result<()> {
    match engine.detect_project(&cwd) {
        Some(name) => println!("{name}"),
        None => println!("(no project)"),
    }
    Ok(())
}
