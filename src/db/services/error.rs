use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

/// Failure kinds of the tagging core. Every operation returns one of these
/// instead of panicking; only `Database` represents an unexpected fault.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Already exists: {0}")]
    Duplicate(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Tag {0} is still assigned to one or more VMs")]
    TagInUse(Uuid),
    #[error("User {user_id} may not delete tag {tag_id}")]
    Unauthorized { tag_id: Uuid, user_id: i32 },
    #[error("Invalid action: {0}")]
    InvalidAction(String),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Maps a unique-constraint violation raised by an insert to `Duplicate`, so a
/// lost race reports the same outcome as the pre-check would have.
pub(crate) fn duplicate_on_conflict(err: DbErr, what: impl FnOnce() -> String) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::Duplicate(what())
    } else {
        ServiceError::Database(err)
    }
}
