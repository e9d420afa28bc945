use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::error;

use crate::validation::FieldErrors;

#[derive(Error, Debug)]
pub enum MandatoError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    ValidationError(FieldErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("Messaging error: {0}")]
    MessagingError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T, E = MandatoError> = std::result::Result<T, E>;

impl From<sqlx::Error> for MandatoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound("record not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(format!("duplicate value: {}", db.message()))
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Self::Conflict(format!("related record missing or in use: {}", db.message()))
            }
            sqlx::Error::Database(db) if db.is_check_violation() => {
                Self::BadRequest(format!("value outside allowed set: {}", db.message()))
            }
            _ => Self::DatabaseError(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for MandatoError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::DatabaseError(format!("Migration failed: {}", err))
    }
}

impl From<serde_json::Error> for MandatoError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<FieldErrors> for MandatoError {
    fn from(errors: FieldErrors) -> Self {
        Self::ValidationError(errors)
    }
}

impl MandatoError {
    pub fn not_found(entity: &str, id: i64) -> Self {
        Self::NotFound(format!("{} {} not found", entity, id))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            MandatoError::NotFound(_) => StatusCode::NOT_FOUND,
            MandatoError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MandatoError::Conflict(_) => StatusCode::CONFLICT,
            MandatoError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            MandatoError::Forbidden(_) => StatusCode::FORBIDDEN,
            MandatoError::BadRequest(_) => StatusCode::BAD_REQUEST,
            MandatoError::MessagingError(_) => StatusCode::BAD_GATEWAY,
            MandatoError::ConfigError(_)
            | MandatoError::DatabaseError(_)
            | MandatoError::ExportError(_)
            | MandatoError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MandatoError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = match &self {
            MandatoError::ValidationError(fields) => serde_json::json!({
                "error": "validation failed",
                "fields": fields,
            }),
            other => serde_json::json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
