mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use mnemon::config::{default_mnemon_dir, MnemonConfig};
use mnemon::memory::types::{MemoryType, Source};
use mnemon::memory::MemoryEngine;

#[derive(Parser)]
#[command(name = "mnemon", version, about = "Persistent semantic memory for developer-assistant sessions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a memory
    Remember {
        content: String,
        #[arg(long, value_name = "TYPE")]
        r#type: Option<MemoryType>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        reasoning: Option<String>,
        #[arg(long)]
        source: Option<Source>,
        #[arg(long)]
        importance: Option<i64>,
        #[arg(long)]
        tag: Vec<String>,
        #[arg(long)]
        supersedes: Option<i64>,
        #[arg(long)]
        skip_dedup: bool,
    },
    /// Search memories by natural-language query
    Recall {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, value_name = "TYPE")]
        r#type: Option<MemoryType>,
        #[arg(long)]
        min_importance: Option<i64>,
        #[arg(long)]
        include_obsolete: bool,
    },
    /// List the most recently created memories
    List {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        all_projects: bool,
    },
    /// Replace a memory's content (re-embeds)
    Update { id: i64, content: String },
    /// Mark a memory obsolete without deleting it
    Obsolete { id: i64 },
    /// Permanently delete a memory
    Forget { id: i64 },
    /// Delete all memories in a category
    ForgetCategory {
        category: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        global: bool,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete all memories from an ingestion source
    ForgetSource {
        source: Source,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        global: bool,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Garbage-collect stale and expired memories
    Gc {
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        global: bool,
        #[arg(long)]
        all: bool,
    },
    /// Merge near-duplicate memories into their best representative
    Consolidate {
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        global: bool,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete corrupted memories (serialization debris, leaked prompts)
    Cleanup {
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        global: bool,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Show store statistics
    Stats {
        #[arg(long)]
        project: Option<String>,
    },
    /// Manage the project registry
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Check store integrity and embedder availability
    Doctor,
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Register a new project
    Create {
        name: String,
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Add a path prefix to an existing project
    AddPath { name: String, path: PathBuf },
    /// Remove a project mapping (memories are untouched)
    Delete { name: String },
    /// Set or clear a project description
    Describe {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List registered projects
    List,
    /// Resolve a directory to its project
    Detect {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let dir = default_mnemon_dir();

    // Load config early for the log level; errors fall back to defaults so
    // diagnostics still work on a broken config.
    let log_level = MnemonConfig::load(&dir)
        .map(|c| c.log_level)
        .unwrap_or_else(|_| "info".into());
    let filter = EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Command::Doctor = cli.command {
        return cli::doctor::doctor(&dir);
    }

    let mut engine = MemoryEngine::open(&dir)?;

    match cli.command {
        Command::Remember {
            content,
            r#type,
            project,
            category,
            reasoning,
            source,
            importance,
            tag,
            supersedes,
            skip_dedup,
        } => cli::memory::remember(
            &mut engine,
            content,
            r#type,
            project,
            category,
            reasoning,
            source,
            importance,
            tag,
            supersedes,
            skip_dedup,
        ),
        Command::Recall {
            query,
            limit,
            r#type,
            min_importance,
            include_obsolete,
        } => cli::memory::recall(&mut engine, query, limit, r#type, min_importance, include_obsolete),
        Command::List {
            limit,
            project,
            all_projects,
        } => cli::memory::list(&engine, limit, project, all_projects),
        Command::Update { id, content } => cli::memory::update(&mut engine, id, content),
        Command::Obsolete { id } => cli::memory::obsolete(&mut engine, id),
        Command::Forget { id } => cli::memory::forget(&mut engine, id),
        Command::ForgetCategory {
            category,
            project,
            global,
            all,
            dry_run,
        } => {
            let scope = cli::scope_from_flags(project, global, all);
            let count = engine.forget_by_category(&category, &scope, dry_run)?;
            if dry_run {
                println!("Would delete {count} memories.");
            } else {
                println!("Deleted {count} memories.");
            }
            Ok(())
        }
        Command::ForgetSource {
            source,
            project,
            global,
            all,
            dry_run,
        } => {
            let scope = cli::scope_from_flags(project, global, all);
            let count = engine.forget_by_source(source, &scope, dry_run)?;
            if dry_run {
                println!("Would delete {count} memories.");
            } else {
                println!("Deleted {count} memories.");
            }
            Ok(())
        }
        Command::Gc {
            project,
            global,
            all,
        } => cli::maintenance::gc(&mut engine, cli::scope_from_flags(project, global, all)),
        Command::Consolidate {
            project,
            global,
            all,
            dry_run,
        } => cli::maintenance::consolidate(
            &mut engine,
            cli::scope_from_flags(project, global, all),
            dry_run,
        ),
        Command::Cleanup {
            project,
            global,
            all,
            dry_run,
        } => cli::maintenance::cleanup(
            &mut engine,
            cli::scope_from_flags(project, global, all),
            dry_run,
        ),
        Command::Stats { project } => cli::stats::stats(&engine, project),
        Command::Project { action } => match action {
            ProjectAction::Create {
                name,
                path,
                description,
            } => cli::project::create(&mut engine, name, path, description),
            ProjectAction::AddPath { name, path } => cli::project::add_path(&mut engine, name, path),
            ProjectAction::Delete { name } => cli::project::delete(&mut engine, name),
            ProjectAction::Describe { name, description } => {
                cli::project::describe(&mut engine, name, description)
            }
            ProjectAction::List => cli::project::list(&engine),
            ProjectAction::Detect { path } => cli::project::detect(&engine, path),
        },
        Command::Doctor => unreachable!("handled above"),
    }
}
