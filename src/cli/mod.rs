pub mod doctor;
pub mod maintenance;
pub mod memory;
pub mod project;
pub mod stats;

use mnemon::memory::types::ProjectScope;

/// Translate the shared `--project` / `--global` / `--all` flags into a
/// store scope. `--all` wins, then an explicit project, then global-only.
pub fn scope_from_flags(project: Option<String>, global: bool, all: bool) -> ProjectScope {
    if all {
        ProjectScope::Any
    } else if let Some(name) = project {
        ProjectScope::Project(name)
    } else if global {
        ProjectScope::GlobalOnly
    } else {
        ProjectScope::Any
    }
}
