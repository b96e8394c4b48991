//! Caller-facing projection of mutation errors.
//!
//! # Invariants
//! - Only validation failures carry detail (the full field → messages map).
//! - Not-found is a bare code.
//! - Every other failure is `internal` with no detail; the full error is
//!   logged instead.

use crate::repo::entity_repo::RepoError;
use crate::service::mutation_service::MutationError;
use crate::validation::validator::ValidationErrors;
use log::error;
use serde::Serialize;

/// Error shape safe to return to untrusted callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum PublicError {
    ValidationFailed {
        mutation: String,
        errors: ValidationErrors,
    },
    NotFound,
    Internal,
}

impl PublicError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationFailed { .. } => "validation_failed",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

impl From<&MutationError> for PublicError {
    fn from(value: &MutationError) -> Self {
        match value {
            MutationError::Validation(failure) => Self::ValidationFailed {
                mutation: failure.mutation.clone(),
                errors: failure.errors.clone(),
            },
            MutationError::Repo(RepoError::NotFound(_)) => Self::NotFound,
            other => {
                error!("event=mutation_failed module=service status=error error={other}");
                Self::Internal
            }
        }
    }
}

impl From<MutationError> for PublicError {
    fn from(value: MutationError) -> Self {
        Self::from(&value)
    }
}
