use std::fmt;

/// Classification of a persistence failure, independent of the storage backend.
///
/// Consumers branch on this instead of inspecting vendor error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// A unique index rejected the write. For idempotency records this means
    /// a concurrent delivery of the same event already committed.
    UniqueConstraintViolation,
    /// The store could not be reached (connection refused, pool exhausted).
    Unavailable,
    Other,
}

impl StoreErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UniqueConstraintViolation => "UNIQUE_CONSTRAINT_VIOLATION",
            Self::Unavailable => "UNAVAILABLE",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed store operation with its classification.
#[derive(Debug, thiserror::Error)]
#[error("store error ({kind}): {source}")]
pub struct StoreError {
    kind: StoreErrorKind,
    #[source]
    source: anyhow::Error,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, source: impl Into<anyhow::Error>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn unique_violation(source: impl Into<anyhow::Error>) -> Self {
        Self::new(StoreErrorKind::UniqueConstraintViolation, source)
    }

    pub fn unavailable(source: impl Into<anyhow::Error>) -> Self {
        Self::new(StoreErrorKind::Unavailable, source)
    }

    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    pub fn is_unique_violation(&self) -> bool {
        self.kind == StoreErrorKind::UniqueConstraintViolation
    }

    pub fn into_inner(self) -> anyhow::Error {
        self.source
    }
}
