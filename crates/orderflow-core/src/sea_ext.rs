use sea_orm::sqlx::error::DatabaseError as _;
use sea_orm::{DbErr, RuntimeErr, SqlErr, sqlx};

use crate::error::{StoreError, StoreErrorKind};

/// Classify a sea-orm error without looking at backend-specific error codes.
pub fn classify_db_err(err: &DbErr) -> StoreErrorKind {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return StoreErrorKind::UniqueConstraintViolation;
    }
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
            if e.is_unique_violation() =>
        {
            StoreErrorKind::UniqueConstraintViolation
        }
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => StoreErrorKind::Unavailable,
        _ => StoreErrorKind::Other,
    }
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        let kind = classify_db_err(&err);
        StoreError::new(kind, err)
    }
}

/// Repositories attach `.context(..)` to sea-orm errors; the root `DbErr`
/// still decides the classification.
impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        let kind = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<DbErr>())
            .map(classify_db_err)
            .unwrap_or(StoreErrorKind::Other);
        StoreError::new(kind, err)
    }
}
