// Domain error kinds. Setup paths (main, tests) use anyhow instead.

use crate::models::MetricKind;

/// A single counter family was unreadable on this host. Non-fatal: the
/// sampling cycle logs it and continues with the remaining kinds.
#[derive(Debug, thiserror::Error)]
#[error("{kind} counters unreadable: {reason}")]
pub struct CollectionError {
    pub kind: MetricKind,
    pub reason: String,
}

impl CollectionError {
    pub fn new(kind: MetricKind, reason: impl std::fmt::Display) -> Self {
        Self {
            kind,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error(transparent)]
    Collection(#[from] CollectionError),

    /// Malformed client window token. Surfaced as a client-input error (422),
    /// never a server fault.
    #[error("invalid time window '{0}': expected digits followed by one of s, m, h, d, w")]
    InvalidWindowFormat(String),

    /// Sample store unreachable or corrupt. Terminal for the request that hit
    /// it; surfaced as a server fault (500). No retry inside the core.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// A sampling cycle exceeded its budget and was abandoned. The next cycle
    /// proceeds independently.
    #[error("sampling cycle exceeded its {0}ms budget and was abandoned")]
    CycleTimeout(u64),
}
