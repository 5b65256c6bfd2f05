use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use serde::Serialize;

pub async fn handler404(path: Uri) -> Error {
    Error::NotFound {
        message: format!("Invalid path: {}", path),
    }
}

/// Body of every failed response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("{message}")]
    Validation { message: String },
    #[error("{message}")]
    Unauthenticated { message: String },
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("{message}")]
    RoleMismatch { message: String },
    #[error("{message}")]
    Forbidden { message: String },
    #[error("{message}")]
    NotFound { message: String },
    #[error("{message}")]
    Conflict { message: String },
    #[error("{kind}: {message}")]
    InternalError { kind: &'static str, message: String },
}

impl Error {
    pub fn validation<S: Into<String>>(msg: S) -> Error {
        Error::Validation {
            message: msg.into(),
        }
    }

    pub fn unauthenticated<S: Into<String>>(msg: S) -> Error {
        Error::Unauthenticated {
            message: msg.into(),
        }
    }

    pub fn forbidden<S: Into<String>>(msg: S) -> Error {
        Error::Forbidden {
            message: msg.into(),
        }
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound {
            message: msg.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthenticated { .. }
            | Error::InvalidCredentials
            | Error::RoleMismatch { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Error::InternalError { kind, message } => {
                log::error!("{} while handling request: {}", kind, message);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<std::io::Error> for Error {
    fn from(io: std::io::Error) -> Self {
        Self::InternalError {
            kind: "IOError",
            message: io.to_string(),
        }
    }
}

impl From<uuid::Error> for Error {
    fn from(id: uuid::Error) -> Self {
        Self::Validation {
            message: format!("Invalid identifier: {}", id),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return Self::NotFound {
                message: "Record not found".to_string(),
            };
        }
        let unique = err
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique {
            return Self::Conflict {
                message: "Record already exists".to_string(),
            };
        }
        Self::InternalError {
            kind: "DatabaseError",
            message: err.to_string(),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::InternalError {
            kind: "MigrationError",
            message: err.to_string(),
        }
    }
}

impl From<pbkdf2::password_hash::Error> for Error {
    fn from(err: pbkdf2::password_hash::Error) -> Self {
        Self::InternalError {
            kind: "PasswordHashError",
            message: err.to_string(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::unauthenticated("Token expired"),
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => Self::unauthenticated("Invalid token"),
            _ => Self::InternalError {
                kind: "TokenError",
                message: err.to_string(),
            },
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation {
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation {
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartError> for Error {
    fn from(err: MultipartError) -> Self {
        // body cap hit while streaming the file
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::validation(crate::io::FILE_TOO_LARGE);
        }
        Self::Validation {
            message: format!("Invalid upload: {}", err.body_text()),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError {
            kind: "Unknown",
            message: format!("{:#}", err),
        }
    }
}
