//! Project registry — maps working directories to project names.
//!
//! The registry is a JSON file holding an ordered list of projects, each
//! with one or more absolute path prefixes. [`ProjectRegistry::detect`]
//! resolves a cwd to the first project owning a matching prefix; non-preference
//! memories are scoped to that name. Deleting a project only removes the
//! mapping — stored memories are untouched.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MemoryError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    pub paths: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: i64,
}

/// Registry of known projects, persisted as a JSON array so insertion
/// order survives round-trips.
#[derive(Debug)]
pub struct ProjectRegistry {
    path: PathBuf,
    projects: Vec<ProjectEntry>,
}

impl ProjectRegistry {
    /// Load the registry from `path`. A missing file is an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let projects = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents).map_err(|e| {
                MemoryError::InvalidInput(format!("project-registry.json: {e}"))
            })?
        } else {
            Vec::new()
        };
        Ok(Self { path, projects })
    }

    /// Resolve a working directory to a project name. First match wins, in
    /// registry insertion order.
    pub fn detect(&self, cwd: &Path) -> Option<&str> {
        let canonical = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());
        for entry in &self.projects {
            if entry.paths.iter().any(|p| canonical.starts_with(p)) {
                return Some(&entry.name);
            }
        }
        None
    }

    /// Register a new project, optionally seeded with a path.
    pub fn create(
        &mut self,
        name: &str,
        path: Option<&Path>,
        description: Option<String>,
    ) -> Result<()> {
        if name.trim().is_empty() {
            return Err(MemoryError::InvalidInput("project name must not be empty".into()));
        }
        if self.projects.iter().any(|p| p.name == name) {
            return Err(MemoryError::AlreadyExists(format!("project '{name}'")));
        }
        let paths = match path {
            Some(p) => vec![validated_path(p)?],
            None => Vec::new(),
        };
        self.projects.push(ProjectEntry {
            name: name.to_string(),
            paths,
            description,
            created_at: Utc::now().timestamp(),
        });
        self.persist()
    }

    /// Add a path prefix to an existing project.
    pub fn add_path(&mut self, name: &str, path: &Path) -> Result<()> {
        let path = validated_path(path)?;
        let entry = self
            .projects
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| MemoryError::NotFound(format!("project '{name}'")))?;
        if entry.paths.contains(&path) {
            return Err(MemoryError::AlreadyExists(format!(
                "path {} under project '{name}'",
                path.display()
            )));
        }
        entry.paths.push(path);
        self.persist()
    }

    /// Remove a project mapping. Stored memories keep their project tag.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let before = self.projects.len();
        self.projects.retain(|p| p.name != name);
        if self.projects.len() == before {
            return Err(MemoryError::NotFound(format!("project '{name}'")));
        }
        self.persist()
    }

    pub fn update_description(&mut self, name: &str, description: Option<String>) -> Result<()> {
        let entry = self
            .projects
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| MemoryError::NotFound(format!("project '{name}'")))?;
        entry.description = description;
        self.persist()
    }

    pub fn get(&self, name: &str) -> Option<&ProjectEntry> {
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn list(&self) -> &[ProjectEntry] {
        &self.projects
    }

    /// Atomic write: serialize to a temp file next to the target, then rename.
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.projects)
            .map_err(|e| MemoryError::InvalidInput(format!("registry serialize: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn validated_path(path: &Path) -> Result<PathBuf> {
    if !path.is_absolute() {
        return Err(MemoryError::InvalidInput(format!(
            "project path must be absolute: {}",
            path.display()
        )));
    }
    // Canonicalize when the directory exists so detection matches resolved cwds.
    Ok(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()))
}
