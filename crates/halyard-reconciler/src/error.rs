use halyard_core::{CoreError, Resource};
use halyard_transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid {kind}: {source}")]
    Validation {
        kind: &'static str,
        #[source]
        source: CoreError,
    },

    #[error("apply infeasible: {0}")]
    ApplyInfeasible(String),

    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to decode {kind} response: {source}")]
    Decode {
        kind: &'static str,
        #[source]
        source: CoreError,
    },

    #[error("{} diff(s) remain after apply: {}", .diffs.len(), .diffs.join("; "))]
    DiffAfterApply {
        diffs: Vec<String>,
        state: Box<Resource>,
    },

    #[error("{resource} still exists after {attempts} delete confirmation attempts")]
    NotDeleted { resource: String, attempts: u32 },

    #[error("cancelled while {0}")]
    Cancelled(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{} operation(s) failed: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<ReconcileError>),
}

fn join_errors(errors: &[ReconcileError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ReconcileError {
    /// Wrap a transport failure with what was being attempted.
    pub fn transport(context: impl Into<String>, source: TransportError) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    /// Optimistic-concurrency conflict (HTTP 409). The apply loop restarts
    /// from fresh state on these.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_conflict())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_not_found())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled(_)
                | Self::Transport {
                    source: TransportError::Cancelled { .. },
                    ..
                }
        )
    }

    /// Best-known state carried by a [`ReconcileError::DiffAfterApply`].
    pub fn state(&self) -> Option<&Resource> {
        match self {
            Self::DiffAfterApply { state, .. } => Some(&**state),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_classification() {
        let err = ReconcileError::transport(
            "creating Service(p/s)",
            TransportError::Conflict {
                url: "u".into(),
                message: "busy".into(),
            },
        );
        assert!(err.is_conflict());
        assert!(!err.is_not_found());

        let err = ReconcileError::ApplyInfeasible("recreate".into());
        assert!(!err.is_conflict());
    }
}
