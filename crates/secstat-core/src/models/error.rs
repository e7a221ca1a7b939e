use thiserror::Error;

use crate::models::{SourceAction, SourceId};

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CoreErrorKind {
    Unavailable,
    InvalidInput,
    ParseFailure,
    Timeout,
    ProcessFailure,
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub collaborator: Option<SourceId>,
    pub action: Option<SourceAction>,
    pub kind: CoreErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(
        collaborator: SourceId,
        action: SourceAction,
        kind: CoreErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            collaborator: Some(collaborator),
            action: Some(action),
            kind,
            message: message.into(),
        }
    }
}
