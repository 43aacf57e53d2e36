use thiserror::Error;

pub type Result<T> = std::result::Result<T, ViewError>;

/// Which kind of record failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Lease,
    Policy,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Lease => f.write_str("lease"),
            RecordKind::Policy => f.write_str("policy"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ViewError {
    /// The event's revision is not newer than the last one accepted for its
    /// resource. The event is dropped whole.
    #[error("stale revision {revision} for resource '{resource}' (last accepted {last})")]
    StaleRevision {
        resource: String,
        revision: u64,
        last: u64,
    },

    /// A record is missing a field the view keys on. The whole event is
    /// rejected.
    #[error("invalid {kind} record: {reason}")]
    InvalidRecord { kind: RecordKind, reason: String },

    /// Raised alongside the connectivity banner. Row state is kept.
    #[error("transport interrupted: {0}")]
    TransportInterrupted(String),

    #[error("unable to decode '{event}' event")]
    Decode {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(&'static str),
}

impl ViewError {
    pub(crate) fn invalid(kind: RecordKind, reason: impl Into<String>) -> Self {
        ViewError::InvalidRecord {
            kind,
            reason: reason.into(),
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, ViewError::StaleRevision { .. })
    }
}
