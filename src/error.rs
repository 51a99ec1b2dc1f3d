//! Typed errors surfaced by the memory core.
//!
//! Hook callers treat embedder and store failures as "skip memory for this
//! call" — the kinds here exist so they can tell those apart from caller
//! mistakes ([`MemoryError::InvalidInput`], [`MemoryError::NotFound`]).

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("embedding service unavailable: {0}")]
    EmbedderUnavailable(String),

    #[error("embedding service protocol error: {0}")]
    EmbedderProtocol(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("embedding dimension mismatch: configured {configured}, store has {stored}")]
    DimensionMismatch { configured: usize, stored: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MemoryError>;

impl MemoryError {
    /// True when the failure came from the embedding service rather than
    /// the store or the caller. Hook scripts use this to downgrade the
    /// whole call to a no-op.
    pub fn is_embedder(&self) -> bool {
        matches!(
            self,
            Self::EmbedderUnavailable(_) | Self::EmbedderProtocol(_)
        )
    }
}
