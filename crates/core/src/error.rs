use thiserror::Error;

/// The error taxonomy shared across crates. The Dispatcher classifies
/// every failure into one of these before deciding whether to abort,
/// skip, or panic — nothing propagates past a tick boundary uncaught.
#[derive(Error, Debug)]
pub enum LyncupError {
    /// Shared-store or identity-source outage. Recovered at the next tick.
    #[error("transient external failure: {0}")]
    TransientExternal(String),

    /// No ANN artifact present on disk. Expected during cold start.
    #[error("ANN artifact missing")]
    ArtifactMissing,

    /// A malformed waiting-set entry or corrupt map file.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Per-user publish failure. Logged; user stays in the WaitingSet.
    #[error("publish failed for user: {0}")]
    PublishFailure(String),

    /// A programming invariant was violated (e.g. an under-sized group
    /// emitted outside the terminal leftover chunk). Callers should treat
    /// this as fatal and let process supervision restart.
    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(String),
}

pub type Result<T> = std::result::Result<T, LyncupError>;
