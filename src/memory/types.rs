//! Core memory type definitions.
//!
//! Defines [`MemoryType`] (the five memory categories), [`Source`] (the
//! closed set of ingestion channels), [`Memory`] (a full record), and the
//! input/output shapes of the engine API.

use serde::{Deserialize, Serialize};

/// What kind of knowledge a memory captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// A choice made and the state it leaves behind.
    Decision,
    /// A user preference — always global, never project-scoped.
    Preference,
    Fact,
    /// A recurring code or workflow pattern.
    Pattern,
    /// A session or conversation summary.
    Conversation,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decision => "decision",
            Self::Preference => "preference",
            Self::Fact => "fact",
            Self::Pattern => "pattern",
            Self::Conversation => "conversation",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "decision" => Ok(Self::Decision),
            "preference" => Ok(Self::Preference),
            "fact" => Ok(Self::Fact),
            "pattern" => Ok(Self::Pattern),
            "conversation" => Ok(Self::Conversation),
            _ => Err(format!("unknown memory type: {s}")),
        }
    }
}

/// How a memory entered the store. Closed set; the `auto:` tags are written
/// by the host's hook scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "manual")]
    Manual,
    #[serde(rename = "auto:session")]
    AutoSession,
    #[serde(rename = "auto:commit")]
    AutoCommit,
    #[serde(rename = "auto:pattern")]
    AutoPattern,
    #[serde(rename = "auto:bootstrap")]
    AutoBootstrap,
    #[serde(rename = "auto:ingest")]
    AutoIngest,
    #[serde(rename = "auto:response")]
    AutoResponse,
    #[serde(rename = "auto:precompact")]
    AutoPrecompact,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::AutoSession => "auto:session",
            Self::AutoCommit => "auto:commit",
            Self::AutoPattern => "auto:pattern",
            Self::AutoBootstrap => "auto:bootstrap",
            Self::AutoIngest => "auto:ingest",
            Self::AutoResponse => "auto:response",
            Self::AutoPrecompact => "auto:precompact",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "auto:session" => Ok(Self::AutoSession),
            "auto:commit" => Ok(Self::AutoCommit),
            "auto:pattern" => Ok(Self::AutoPattern),
            "auto:bootstrap" => Ok(Self::AutoBootstrap),
            "auto:ingest" => Ok(Self::AutoIngest),
            "auto:response" => Ok(Self::AutoResponse),
            "auto:precompact" => Ok(Self::AutoPrecompact),
            _ => Err(format!("unknown source: {s}")),
        }
    }
}

/// A memory record, matching the `memories` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: i64,
    pub content: String,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// Owning project, or `None` for global memories. Preferences are
    /// always global.
    pub project: Option<String>,
    pub category: Option<String>,
    pub reasoning: Option<String>,
    pub source: Source,
    /// Integer in [1, 5]; default 3.
    pub importance: i64,
    /// Real in [0, 1]; manual saves are 1.0, auto-captures lower.
    pub confidence: f64,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds of the last recall return; `None` until first recall.
    pub last_accessed: Option<i64>,
    pub access_count: i64,
    pub expires_at: Option<i64>,
    /// Id of the row this one replaces.
    pub supersedes: Option<i64>,
    pub is_obsolete: bool,
    pub tags: Vec<String>,
}

/// Input to `remember`. Unset fields take the documented defaults.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RememberInput {
    pub content: String,
    #[serde(rename = "type")]
    pub memory_type: Option<MemoryType>,
    pub category: Option<String>,
    pub project: Option<String>,
    pub reasoning: Option<String>,
    pub source: Option<Source>,
    pub importance: Option<i64>,
    pub confidence: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub expires_at: Option<i64>,
    pub supersedes: Option<i64>,
    #[serde(default)]
    pub skip_dedup: bool,
}

impl RememberInput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn memory_type(mut self, t: MemoryType) -> Self {
        self.memory_type = Some(t);
        self
    }

    pub fn project(mut self, p: impl Into<String>) -> Self {
        self.project = Some(p.into());
        self
    }

    pub fn category(mut self, c: impl Into<String>) -> Self {
        self.category = Some(c.into());
        self
    }

    pub fn source(mut self, s: Source) -> Self {
        self.source = Some(s);
        self
    }

    pub fn importance(mut self, i: i64) -> Self {
        self.importance = Some(i);
        self
    }

    pub fn confidence(mut self, c: f64) -> Self {
        self.confidence = Some(c);
        self
    }

    pub fn tags(mut self, t: Vec<String>) -> Self {
        self.tags = Some(t);
        self
    }

    pub fn expires_at(mut self, ts: i64) -> Self {
        self.expires_at = Some(ts);
        self
    }

    pub fn supersedes(mut self, id: i64) -> Self {
        self.supersedes = Some(id);
        self
    }

    pub fn skip_dedup(mut self) -> Self {
        self.skip_dedup = true;
        self
    }
}

/// Options for `recall`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecallOptions {
    pub limit: Option<usize>,
    #[serde(rename = "type")]
    pub memory_type: Option<MemoryType>,
    pub min_importance: Option<i64>,
    #[serde(default)]
    pub include_obsolete: bool,
}

/// One recalled memory with its retrieval metadata.
#[derive(Debug, Clone, Serialize)]
pub struct RecallResult {
    #[serde(flatten)]
    pub memory: Memory,
    /// L2 distance between the query and the memory embedding.
    pub distance: f64,
    /// Final relevance score, scope boosts included.
    pub score: f64,
    /// Project the row belongs to (`None` for globals).
    pub source: Option<String>,
}

/// Project scoping for deletes, GC, and maintenance passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectScope {
    /// No restriction.
    Any,
    /// Rows with `project IS NULL` only.
    GlobalOnly,
    /// Rows belonging to the named project.
    Project(String),
}

impl ProjectScope {
    /// SQL fragment and optional bound parameter for this scope.
    pub fn sql_clause(&self) -> (&'static str, Option<&str>) {
        match self {
            Self::Any => ("1=1", None),
            Self::GlobalOnly => ("project IS NULL", None),
            Self::Project(name) => ("project = ?", Some(name.as_str())),
        }
    }
}
