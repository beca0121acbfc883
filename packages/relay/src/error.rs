use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pr4kh4r_auth::AuthError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Main application error type that all handlers should return
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

/// Error body shared by every relay endpoint
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(err) => match err {
                AuthError::UnknownProvider(_) => StatusCode::NOT_FOUND,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UnverifiedEmail => StatusCode::FORBIDDEN,
                AuthError::EmailAlreadyClaimed => StatusCode::CONFLICT,
                err if err.is_client_error() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-friendly error message (sanitized for external consumption)
    fn to_user_message(&self) -> String {
        match self {
            // The provider's own diagnostic, e.g. "The code passed is incorrect or expired."
            AppError::Auth(AuthError::TokenExchangeFailed(msg)) => msg.clone(),
            AppError::Auth(AuthError::InvalidPassword(msg)) => msg.clone(),
            AppError::Auth(AuthError::Configuration(_)) => "Server configuration error".to_string(),
            AppError::Auth(AuthError::Storage(_)) | AppError::Auth(AuthError::Io(_)) => {
                "OAuth authentication failed".to_string()
            }
            AppError::Auth(err) => err.to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        if status_code.is_server_error() {
            error!(
                request_id = %request_id,
                error = %self,
                "❌ OAuth relay error"
            );
        } else {
            tracing::info!(
                request_id = %request_id,
                status = %status_code,
                error = %self,
                "API error response"
            );
        }

        let body = ErrorResponse {
            error: self.to_user_message(),
        };
        (status_code, Json(body)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_failure_is_500_with_provider_message() {
        let error = AppError::from(AuthError::TokenExchangeFailed(
            "The code passed is incorrect or expired.".to_string(),
        ));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            error.to_user_message(),
            "The code passed is incorrect or expired."
        );
    }

    #[test]
    fn test_client_errors() {
        assert_eq!(
            AppError::from(AuthError::UnknownProvider("gitlab".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(AuthError::MissingAuthorizationCode).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AuthError::InvalidCredentials).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(AuthError::InvalidPassword("too short".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AuthError::UnverifiedEmail).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(AuthError::EmailAlreadyClaimed).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::validation("nope").status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_user_message_sanitization() {
        let config_error = AppError::from(AuthError::Configuration(
            "GOOGLE_CLIENT_SECRET=abc is invalid".to_string(),
        ));
        let message = config_error.to_user_message();
        assert_eq!(message, "Server configuration error");
        assert!(!message.contains("abc"));

        let internal = AppError::Internal(anyhow::anyhow!("token gho_123 leaked"));
        assert!(!internal.to_user_message().contains("gho_123"));
    }
}
