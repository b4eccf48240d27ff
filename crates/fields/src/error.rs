use analog_core::error::CoreError;
use analog_core::types::DbId;
use analog_db::repositories::RepoError;

use crate::storage::StorageError;

/// Failure of a fields-engine operation.
#[derive(Debug, thiserror::Error)]
pub enum FieldsError {
    /// A domain-level error from `analog_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<RepoError> for FieldsError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Core(e) => Self::Core(e),
            RepoError::Database(e) => Self::Database(e),
        }
    }
}

impl FieldsError {
    /// Log this failure against the operation that produced it.
    ///
    /// Caller mistakes are warnings; database and storage failures are errors.
    pub fn log(&self, operation: &'static str) {
        match self {
            Self::Core(CoreError::Validation(_) | CoreError::NotFound { .. } | CoreError::Conflict(_)) => {
                tracing::warn!(operation, error = %self, "Fields operation rejected");
            }
            _ => tracing::error!(operation, error = %self, "Fields operation failed"),
        }
    }
}

pub(crate) fn not_found(entity: &'static str, id: DbId) -> FieldsError {
    FieldsError::Core(CoreError::NotFound { entity, id })
}

pub(crate) fn validation(message: impl Into<String>) -> FieldsError {
    FieldsError::Core(CoreError::Validation(message.into()))
}
