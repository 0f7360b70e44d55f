use thiserror::Error;

use crate::repositories::StoreError;

#[derive(Debug, Error)]
pub(crate) enum DomainError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Conflict(String),
    #[error("exam is not ready to open: {}", .0.join("; "))]
    NotReady(Vec<String>),
    #[error("{0} open-response answer(s) still need a manual grade")]
    UngradedAnswers(usize),
    #[error(transparent)]
    Storage(StoreError),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RevisionConflict { .. } => {
                Self::Conflict(format!("{err}; reload and retry"))
            }
            other => Self::Storage(other),
        }
    }
}

impl DomainError {
    pub(crate) fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub(crate) type DomainResult<T> = Result<T, DomainError>;
