use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tokio_postgres::error::SqlState;

/// A store-independent classification of relational store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique constraint was violated (duplicate email).
    #[error("A record with this value already exists")]
    UniqueConstraintViolation,

    /// A foreign key references a row that does not exist.
    #[error("Referenced record does not exist")]
    ForeignKeyViolation,

    /// A required column was left empty.
    #[error("Required field is missing")]
    NotNullViolation,

    /// The author referenced by a post draft does not exist.
    #[error("Author not found")]
    AuthorNotFound,

    /// Anything else the store reported.
    #[error("Database operation failed: {0}")]
    Unknown(String),
}

impl StoreError {
    /// Maps a PostgreSQL error code to its stable kind.
    pub fn from_sql_state(state: &SqlState, detail: impl Into<String>) -> Self {
        if *state == SqlState::UNIQUE_VIOLATION {
            StoreError::UniqueConstraintViolation
        } else if *state == SqlState::FOREIGN_KEY_VIOLATION {
            StoreError::ForeignKeyViolation
        } else if *state == SqlState::NOT_NULL_VIOLATION {
            StoreError::NotNullViolation
        } else {
            StoreError::Unknown(detail.into())
        }
    }
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        match e.code() {
            Some(state) => StoreError::from_sql_state(state, e.to_string()),
            None => StoreError::Unknown(e.to_string()),
        }
    }
}

impl From<deadpool_postgres::PoolError> for StoreError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        match e {
            deadpool_postgres::PoolError::Backend(inner) => StoreError::from(inner),
            other => StoreError::Unknown(format!("pool: {}", other)),
        }
    }
}

impl From<deadpool_postgres::CreatePoolError> for StoreError {
    fn from(e: deadpool_postgres::CreatePoolError) -> Self {
        StoreError::Unknown(format!("pool creation: {}", e))
    }
}

/// A `Result` type for repository operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures reported by an identity provider.
///
/// The session resolver never lets these escape; only the sign-in, sign-up
/// and sign-out actions surface them.
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("No credentials supplied")]
    MissingCredentials,

    #[error("Session not found or expired")]
    SessionNotFound,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Malformed identity payload: {0}")]
    Malformed(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Session cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Password hashing error: {0}")]
    Hashing(String),
}

impl From<tokio_postgres::Error> for IdentityError {
    fn from(e: tokio_postgres::Error) -> Self {
        IdentityError::Store(e.into())
    }
}

impl From<deadpool_postgres::PoolError> for IdentityError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        IdentityError::Store(e.into())
    }
}

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A relational store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An identity provider error.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// A validation error carrying the first failing field's message.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// A page failed to render.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// The status code and the message safe to show to the client.
    ///
    /// Server-side failures are logged here and replaced by a generic message.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Store(e) => store_status(e),

            AppError::Identity(e) => match e {
                IdentityError::InvalidCredentials => {
                    tracing::warn!("Sign-in rejected: {}", e);
                    (StatusCode::UNAUTHORIZED, e.to_string())
                }
                IdentityError::MissingCredentials | IdentityError::SessionNotFound => {
                    tracing::debug!("Identity: {}", e);
                    (StatusCode::UNAUTHORIZED, e.to_string())
                }
                IdentityError::EmailTaken => (StatusCode::CONFLICT, e.to_string()),
                IdentityError::Store(inner) => store_status(inner),
                IdentityError::Malformed(_)
                | IdentityError::Cache(_)
                | IdentityError::Hashing(_) => {
                    tracing::error!("Identity provider error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Authentication service unavailable".to_string(),
                    )
                }
            },

            AppError::Validation(msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, "Resource not found".to_string())
            }

            AppError::Template(e) => {
                tracing::error!("Template error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        }
    }
}

fn store_status(e: &StoreError) -> (StatusCode, String) {
    match e {
        StoreError::UniqueConstraintViolation => (StatusCode::CONFLICT, e.to_string()),
        StoreError::ForeignKeyViolation | StoreError::AuthorNotFound => {
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        StoreError::NotNullViolation => (StatusCode::BAD_REQUEST, e.to_string()),
        StoreError::Unknown(detail) => {
            tracing::error!("Database error: {}", detail);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (
            status,
            [(http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_codes_map_to_stable_kinds() {
        assert!(matches!(
            StoreError::from_sql_state(&SqlState::UNIQUE_VIOLATION, ""),
            StoreError::UniqueConstraintViolation
        ));
        assert!(matches!(
            StoreError::from_sql_state(&SqlState::FOREIGN_KEY_VIOLATION, ""),
            StoreError::ForeignKeyViolation
        ));
        assert!(matches!(
            StoreError::from_sql_state(&SqlState::NOT_NULL_VIOLATION, ""),
            StoreError::NotNullViolation
        ));
        match StoreError::from_sql_state(&SqlState::UNDEFINED_TABLE, "no such table") {
            StoreError::Unknown(detail) => assert_eq!(detail, "no such table"),
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (AppError::Store(StoreError::UniqueConstraintViolation), StatusCode::CONFLICT),
            (AppError::Store(StoreError::AuthorNotFound), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::Store(StoreError::NotNullViolation), StatusCode::BAD_REQUEST),
            (AppError::Identity(IdentityError::InvalidCredentials), StatusCode::UNAUTHORIZED),
            (AppError::Identity(IdentityError::EmailTaken), StatusCode::CONFLICT),
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound, StatusCode::NOT_FOUND),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_and_message().0, expected);
        }
    }

    #[test]
    fn unknown_store_errors_hide_details() {
        let (status, message) =
            AppError::Store(StoreError::Unknown("relation \"users\" does not exist".into()))
                .status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Database error");
    }
}
