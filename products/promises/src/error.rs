use platform_api::ApiError;
use platform_db::DbError;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::lifecycle::Rejection;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    BusinessRule(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    StageMove(#[from] StageMoveError),
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Machine-readable reason for callers that branch on the failure kind.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            ServiceError::StageMove(err) => Some(err.reason()),
            ServiceError::BusinessRule(_) => Some("business-rule"),
            ServiceError::Conflict(_) => Some("conflict"),
            _ => None,
        }
    }

    /// Turns unique-index violations into a conflict carrying `message`.
    pub fn from_db_with_conflict(err: DbErr, message: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::Conflict(message.to_string()),
            _ => Self::Db(err),
        }
    }
}

impl From<Rejection> for ServiceError {
    fn from(value: Rejection) -> Self {
        Self::BusinessRule(value.to_string())
    }
}

impl From<DbError> for ServiceError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Db(err) => Self::Db(err),
            other => Self::Db(DbErr::Custom(other.to_string())),
        }
    }
}

/// Failure taxonomy of the pipeline stage mover.
#[derive(Debug, Error)]
pub enum StageMoveError {
    #[error("identificador inválido: {0}")]
    InvalidId(String),
    #[error("la promesa no existe")]
    PromiseNotFound,
    #[error("la etapa no existe")]
    StageNotFound,
    #[error("la etapa pertenece a otro estudio")]
    StageWrongTenant,
    #[error("la etapa está inactiva")]
    StageInactive,
    #[error(
        "la promesa está aprobada y tiene un evento vinculado; solo puede moverse a archivado"
    )]
    RestrictedByLinkedEvent,
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

impl StageMoveError {
    pub fn reason(&self) -> &'static str {
        match self {
            StageMoveError::InvalidId(_) => "validation-shape-error",
            StageMoveError::PromiseNotFound => "promise-not-found",
            StageMoveError::StageNotFound => "stage-not-found",
            StageMoveError::StageWrongTenant => "stage-wrong-tenant",
            StageMoveError::StageInactive => "stage-inactive",
            StageMoveError::RestrictedByLinkedEvent => "restricted-due-to-linked-event",
            StageMoveError::Db(_) => "internal",
        }
    }
}

impl From<StageMoveError> for ApiError {
    fn from(value: StageMoveError) -> Self {
        match value {
            StageMoveError::InvalidId(_) => ApiError::InvalidInput(value.to_string()),
            StageMoveError::PromiseNotFound | StageMoveError::StageNotFound => {
                ApiError::NotFound(value.to_string())
            }
            StageMoveError::StageWrongTenant
            | StageMoveError::StageInactive
            | StageMoveError::RestrictedByLinkedEvent => ApiError::BusinessRule(value.to_string()),
            StageMoveError::Db(err) => ApiError::internal(err.into()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::Validation(msg) => ApiError::InvalidInput(msg),
            ServiceError::BusinessRule(msg) => ApiError::BusinessRule(msg),
            ServiceError::Conflict(msg) => ApiError::Conflict(msg),
            ServiceError::StageMove(err) => err.into(),
            ServiceError::Db(err) => ApiError::internal(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_move_errors_keep_their_reason() {
        let err = ServiceError::from(StageMoveError::RestrictedByLinkedEvent);
        assert_eq!(err.reason(), Some("restricted-due-to-linked-event"));
        let api: ApiError = err.into();
        assert_eq!(api.code(), "BUSINESS_RULE");
    }

    #[test]
    fn invalid_id_is_a_validation_error() {
        let api: ApiError = StageMoveError::InvalidId("abc".into()).into();
        assert_eq!(api.code(), "VALIDATION");
    }

    #[test]
    fn plain_db_errors_are_not_conflicts() {
        let err = ServiceError::from_db_with_conflict(DbErr::Custom("boom".into()), "dup");
        assert!(matches!(err, ServiceError::Db(_)));
    }
}
