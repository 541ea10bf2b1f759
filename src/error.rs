use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    /// A catalog record failed validation (e.g. rating outside 0-10)
    #[error("Invalid catalog record: {0}")]
    InvalidRecord(String),

    #[error("Assistant run ended with status '{status}': {message}")]
    AssistantRun { status: String, message: String },

    #[error("Assistant did not finish within {0:?}")]
    AssistantTimeout(std::time::Duration),

    /// The assistant reply could not be turned into a discovery filter
    #[error("Could not read the assistant's suggestions: {0}")]
    InvalidFilter(String),

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("You must be logged in")]
    Unauthorized,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AppError::PasswordHash(err.to_string())
    }
}

impl AppError {
    /// HTTP status reported to clients for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::UsernameTaken => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidFilter(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::AssistantTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::ExternalApi(_)
            | AppError::HttpClient(_)
            | AppError::InvalidRecord(_)
            | AppError::AssistantRun { .. } => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::PasswordHash(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_client_statuses() {
        assert_eq!(AppError::UsernameTaken.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::NotFound("entry 3".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_workflow_errors_are_distinct() {
        assert_eq!(
            AppError::InvalidFilter("bad json".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::AssistantTimeout(std::time::Duration::from_secs(5)).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::AssistantRun {
                status: "failed".to_string(),
                message: "rate limited".to_string()
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_assistant_run_message() {
        let err = AppError::AssistantRun {
            status: "expired".to_string(),
            message: "no response".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Assistant run ended with status 'expired': no response"
        );
    }
}
