//! Shared database error types used across every domain's repository layer.

use crate::error::Error;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    AlreadyExists,

    #[error("field already assigned: {0}")]
    AlreadyAssigned(String),

    #[error("database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Error::NotFound("record not found".to_string()),
            RepositoryError::AlreadyExists => {
                Error::Conflict("record already exists".to_string())
            }
            RepositoryError::AlreadyAssigned(msg) => Error::Unprocessable(msg),
            RepositoryError::Connection(e) => Error::Database(e),
            RepositoryError::InvalidData(msg) => Error::BadRequest(msg),
        }
    }
}

/// True when a `sqlx::Error` reflects a Postgres serialization failure or
/// deadlock (SQLSTATE `40001`/`40P01`) — the two conditions the
/// transactional writer retries on.
pub fn is_write_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => matches!(db_err.code().as_deref(), Some("40001") | Some("40P01")),
        _ => false,
    }
}
