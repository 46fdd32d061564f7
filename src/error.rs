use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// 统一错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{kind} {id} not found")]
    ReferenceNotFound { kind: &'static str, id: i64 },

    #[error("Consistency error: {0}")]
    Consistency(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("No transactions for party {party_id} between {from} and {to}")]
    NoTransactions {
        party_id: i64,
        from: String,
        to: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn product_not_found(id: i64) -> Self {
        AppError::ReferenceNotFound { kind: "Product", id }
    }

    pub fn party_not_found(id: i64) -> Self {
        AppError::ReferenceNotFound { kind: "Party", id }
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Export(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Export(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            success: bool,
            message: String,
        }

        let status = match &self {
            AppError::Validation(_) | AppError::InvalidDateRange(_) => StatusCode::BAD_REQUEST,
            AppError::ReferenceNotFound { .. } | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Consistency(_) => StatusCode::CONFLICT,
            AppError::NoTransactions { .. } => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Export(_) | AppError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            AppError::Database(_) => "Database error".to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        (
            status,
            Json(ErrorResponse {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}
