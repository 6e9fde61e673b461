use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::result::DatabaseErrorKind;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Pet errors
/// - E3xxx: Interaction and match errors
/// - E4xxx: Conversation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    TokenExpired,
    TokenInvalid,

    // Pets (E1xxx)
    PetNotFound,

    // Interactions (E3xxx)
    DuplicateInteraction,
    ConflictRetryable,
    MatchNotFound,

    // Conversations (E4xxx)
    NotMatchMember,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::TokenExpired => "E0010",
            Self::TokenInvalid => "E0011",

            // Pets
            Self::PetNotFound => "E1001",

            // Interactions
            Self::DuplicateInteraction => "E3001",
            Self::ConflictRetryable => "E3002",
            Self::MatchNotFound => "E3003",

            // Conversations
            Self::NotMatchMember => "E4001",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::PetNotFound | Self::MatchNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotMatchMember => StatusCode::FORBIDDEN,
            Self::DuplicateInteraction | Self::ConflictRetryable => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known { code: ErrorCode, message: String },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn conflict_retryable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConflictRetryable, message)
    }

    /// The error code this error renders with.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Internal(_) => ErrorCode::InternalError,
            // A row that vanished between the access check and the write.
            AppError::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            AppError::Database(_) => ErrorCode::InternalError,
        }
    }

    /// Store-level races that a fresh transaction can resolve.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Known { code, .. } => *code == ErrorCode::ConflictRetryable,
            AppError::Database(diesel::result::Error::DatabaseError(kind, _)) => matches!(
                kind,
                DatabaseErrorKind::SerializationFailure | DatabaseErrorKind::UniqueViolation
            ),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message } => {
                let status = code.status_code();
                if status.is_server_error() {
                    tracing::error!(code = code.code(), "{message}");
                }
                (status, ApiErrorResponse::new(code.code(), message))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                let code = self.code();
                let message = match code {
                    ErrorCode::NotFound => "resource not found",
                    _ => "database error",
                };
                (code.status_code(), ApiErrorResponse::new(code.code(), message))
            }
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn known_error_envelope() {
        let value = body_json(AppError::new(ErrorCode::DuplicateInteraction, "like already exists")).await;

        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "E3001");
        assert_eq!(value["error"]["message"], "like already exists");
    }

    #[tokio::test]
    async fn status_codes_follow_error_kind() {
        let cases = [
            (AppError::validation("bad"), StatusCode::BAD_REQUEST),
            (AppError::new(ErrorCode::PetNotFound, "gone"), StatusCode::NOT_FOUND),
            (AppError::forbidden("nope"), StatusCode::FORBIDDEN),
            (AppError::new(ErrorCode::NotMatchMember, "nope"), StatusCode::FORBIDDEN),
            (AppError::new(ErrorCode::DuplicateInteraction, "again"), StatusCode::CONFLICT),
            (AppError::Database(diesel::result::Error::NotFound), StatusCode::NOT_FOUND),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn vanished_row_renders_generic_not_found() {
        let value = body_json(AppError::Database(diesel::result::Error::NotFound)).await;

        assert_eq!(value["error"]["code"], ErrorCode::NotFound.code());
        assert_eq!(value["error"]["message"], "resource not found");
        assert!(value["error"].get("details").is_none());
    }

    #[test]
    fn retryable_errors() {
        assert!(AppError::conflict_retryable("race").is_retryable());
        assert!(!AppError::new(ErrorCode::DuplicateInteraction, "dup").is_retryable());
        assert!(!AppError::Database(diesel::result::Error::NotFound).is_retryable());
    }

    #[test]
    fn code_of_wrapped_errors() {
        assert_eq!(
            AppError::Database(diesel::result::Error::NotFound).code(),
            ErrorCode::NotFound
        );
        assert_eq!(AppError::Internal(anyhow::anyhow!("boom")).code(), ErrorCode::InternalError);
        assert_eq!(AppError::validation("x").code().code(), "E0002");
    }
}
