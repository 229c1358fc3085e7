use crate::source::SourceError;
use std::time::Duration;

/// Why a single family refresh did not publish a new snapshot.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("refreshing {family} failed: {source}")]
    Source {
        family: &'static str,
        #[source]
        source: SourceError,
    },
    #[error("refreshing {family} exceeded its {deadline:?} deadline")]
    Timeout { family: &'static str, deadline: Duration },
    #[error("refreshing {family} was cancelled")]
    Cancelled { family: &'static str },
    #[error("publishing {family} failed: {source}")]
    Registry {
        family: &'static str,
        #[source]
        source: prometheus::Error,
    },
}

impl RefreshError {
    pub fn family(&self) -> &'static str {
        match self {
            RefreshError::Source { family, .. }
            | RefreshError::Timeout { family, .. }
            | RefreshError::Cancelled { family }
            | RefreshError::Registry { family, .. } => *family,
        }
    }

    /// Short label used for the failure counter.
    pub fn kind(&self) -> &'static str {
        match self {
            RefreshError::Source { .. } => "source",
            RefreshError::Timeout { .. } => "timeout",
            RefreshError::Cancelled { .. } => "cancelled",
            RefreshError::Registry { .. } => "registry",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RefreshError::Cancelled { .. })
    }
}

/// Errors raised while assembling or running the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown family '{family}' in cadence group '{group}'")]
    UnknownFamily { group: String, family: String },
    #[error("failed to declare metrics: {0}")]
    Registry(#[from] prometheus::Error),
    #[error(transparent)]
    Refresh(#[from] RefreshError),
    #[error("cadence group task aborted: {0}")]
    GroupAborted(#[from] tokio::task::JoinError),
}
