//! Errors reported by the runtime.

/// Why [`Runtime::block_on`](crate::Runtime::block_on) returned without a
/// value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockOnError<E> {
    /// The future settled with a rejection.
    #[error("`{name}` was rejected: {error}")]
    Rejected { name: String, error: E },

    /// The future's node was skipped by a rejection cascade and will never
    /// settle.
    #[error("`{name}` was cancelled before it ran")]
    Cancelled { name: String },

    /// No pending timer is left that could settle the future.
    #[error("`{name}` stalled: nothing left to drive it")]
    Stalled { name: String },
}

impl<E> BlockOnError<E> {
    /// Name of the future that was being waited on.
    pub fn name(&self) -> &str {
        match self {
            Self::Rejected { name, .. } | Self::Cancelled { name } | Self::Stalled { name } => name,
        }
    }

    /// The rejection value, if the future was rejected.
    pub fn into_rejection(self) -> Option<E> {
        match self {
            Self::Rejected { error, .. } => Some(error),
            Self::Cancelled { .. } | Self::Stalled { .. } => None,
        }
    }
}
