//! Application error type shared by the ORM procedures and the HTTP layer.
//!
//! Every failure a procedure can report maps to exactly one HTTP status.
//! Messages are relayed to the client verbatim, except for database
//! failures which are logged and reported as a generic 500.

use diesel::result::DatabaseErrorKind;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder, status};
use rocket::serde::json::Json;
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

/// Error body returned by every failing endpoint.
#[derive(Serialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid credentials")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[source] diesel::result::Error),
}

impl AppError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{} not found", what))
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Unauthorized => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
            Self::BadRequest(_) | Self::InvalidTransition { .. } => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
            Self::Conflict(_) => Status::Conflict,
            Self::Internal(_) | Self::Database(_) => Status::InternalServerError,
        }
    }

    /// Message safe to hand back to the client.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) | Self::Database(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => Self::NotFound("Resource not found".to_string()),
            diesel::result::Error::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::Conflict(info.message().to_string()),
                DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::CheckViolation
                | DatabaseErrorKind::NotNullViolation => {
                    Self::BadRequest(info.message().to_string())
                }
                other => Self::Database(diesel::result::Error::DatabaseError(other, info)),
            },
            other => Self::Database(other),
        }
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status == Status::InternalServerError {
            error!("{} {} failed: {}", req.method(), req.uri().path(), self);
        }
        status::Custom(status, Json(ErrorResponse::new(self.public_message()))).respond_to(req)
    }
}
