use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{sqlx, DbErr, RuntimeErr};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Credit pool not found: {0}")]
    PoolNotFound(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Credit pool already exists for order {0}")]
    DuplicatePool(Uuid),

    #[error("No credits available for user {0}")]
    NoCreditsAvailable(String),

    /// An authorize/pool-create pair was half-applied; needs operator attention
    #[error("Inconsistent ledger state: {0}")]
    Inconsistent(String),

    #[error("Contention: {0}")]
    Contention(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl LedgerError {
    /// Store-level faults that are safe to retry for idempotent operations.
    /// Business-rule failures are never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            LedgerError::Database(e) => is_transient_db_error(e),
            LedgerError::Contention(_) => true,
            _ => false,
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            _ if self.is_transient() => (StatusCode::SERVICE_UNAVAILABLE, "TEMPORARILY_UNAVAILABLE"),
            LedgerError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            LedgerError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
            LedgerError::PoolNotFound(_) => (StatusCode::NOT_FOUND, "POOL_NOT_FOUND"),
            LedgerError::InvalidTransition(_) => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            LedgerError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            LedgerError::DuplicatePool(_) => (StatusCode::CONFLICT, "DUPLICATE_POOL"),
            LedgerError::NoCreditsAvailable(_) => {
                (StatusCode::PAYMENT_REQUIRED, "NO_CREDITS_AVAILABLE")
            }
            LedgerError::Inconsistent(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INCONSISTENT_STATE")
            }
            LedgerError::Contention(_) => (StatusCode::SERVICE_UNAVAILABLE, "TEMPORARILY_UNAVAILABLE"),
            LedgerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            LedgerError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            LedgerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let message = match self {
            ref e if e.is_transient() => {
                tracing::warn!("Transient failure: {:?}", e);
                "The service is temporarily unavailable, please try again".to_string()
            }
            LedgerError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                "An internal database error occurred".to_string()
            }
            LedgerError::NoCreditsAvailable(_) => {
                "No credits available: purchase a plan or wait for a pending order to be authorized"
                    .to_string()
            }
            LedgerError::Inconsistent(ref msg) => {
                tracing::error!(alert = true, "Inconsistent ledger state: {}", msg);
                "The ledger is in an inconsistent state; an operator has been notified".to_string()
            }
            LedgerError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                "An internal error occurred".to_string()
            }
            ref other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Postgres serialization failure and deadlock; SQLite BUSY/LOCKED and their extended codes
const TRANSIENT_DB_CODES: &[&str] = &["40001", "40P01", "5", "6", "261", "262", "517"];

fn is_transient_db_error(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => return true,
        DbErr::Exec(e) | DbErr::Query(e) => e,
        _ => return false,
    };

    match runtime {
        RuntimeErr::SqlxError(sqlx::Error::Database(db_err)) => db_err
            .code()
            .is_some_and(|code| is_transient_db_code(&code)),
        RuntimeErr::SqlxError(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) => true,
        _ => false,
    }
}

fn is_transient_db_code(code: &str) -> bool {
    TRANSIENT_DB_CODES.contains(&code)
}

// Helper type for results
pub type Result<T> = std::result::Result<T, LedgerError>;
