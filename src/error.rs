//! Error types for the circulation desk

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Numeric error codes exposed in API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    StorageFailure = 3,
    NoSuchPatron = 4,
    NoSuchBook = 5,
    NoSuchLoan = 6,
    Duplicate = 8,
    AlreadyBorrowed = 13,
    AlreadyQueued = 14,
    AlreadyReturned = 15,
    BadValue = 18,
    PatronHasActiveLoans = 21,
    IndexOutOfRange = 22,
}

/// Failure category, as seen by callers deciding how to recover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty required field, out-of-range year, malformed number
    Validation,
    /// Unknown ISBN, username or record id
    NotFound,
    /// Business-rule violation
    Conflict,
    /// Internal collection misuse; not expected with correct call sequencing
    Structural,
    /// Session or permission failure
    Access,
    /// Persistence or other environment failure
    Environment,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Book with ISBN {0} not found")]
    BookNotFound(String),

    #[error("Patron {0} not found")]
    PatronNotFound(String),

    #[error("Loan record {0} not found")]
    LoanNotFound(String),

    #[error("Patron {username} already has an active loan for {isbn}")]
    DuplicateActiveLoan { isbn: String, username: String },

    #[error("Patron {username} is already waiting for {isbn}")]
    AlreadyQueued { isbn: String, username: String },

    #[error("Loan record {0} has already been returned")]
    AlreadyReturned(u64),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Patron {0} still has active loans")]
    PatronHasActiveLoans(String),

    #[error("Index {index} out of range for collection of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::BookNotFound(_) | AppError::PatronNotFound(_) | AppError::LoanNotFound(_) => {
                ErrorKind::NotFound
            }
            AppError::DuplicateActiveLoan { .. }
            | AppError::AlreadyQueued { .. }
            | AppError::AlreadyReturned(_)
            | AppError::Conflict(_)
            | AppError::PatronHasActiveLoans(_) => ErrorKind::Conflict,
            AppError::IndexOutOfRange { .. } => ErrorKind::Structural,
            AppError::Authentication(_) | AppError::Authorization(_) => ErrorKind::Access,
            AppError::Io(_) | AppError::Serialization(_) | AppError::Internal(_) => {
                ErrorKind::Environment
            }
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::BookNotFound(_) => ErrorCode::NoSuchBook,
            AppError::PatronNotFound(_) => ErrorCode::NoSuchPatron,
            AppError::LoanNotFound(_) => ErrorCode::NoSuchLoan,
            AppError::DuplicateActiveLoan { .. } => ErrorCode::AlreadyBorrowed,
            AppError::AlreadyQueued { .. } => ErrorCode::AlreadyQueued,
            AppError::AlreadyReturned(_) => ErrorCode::AlreadyReturned,
            AppError::Conflict(_) => ErrorCode::Duplicate,
            AppError::PatronHasActiveLoans(_) => ErrorCode::PatronHasActiveLoans,
            AppError::IndexOutOfRange { .. } => ErrorCode::IndexOutOfRange,
            AppError::Authentication(_) | AppError::Authorization(_) => ErrorCode::NotAuthorized,
            AppError::Io(_) | AppError::Serialization(_) => ErrorCode::StorageFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Access => match self {
                AppError::Authorization(_) => StatusCode::FORBIDDEN,
                _ => StatusCode::UNAUTHORIZED,
            },
            ErrorKind::Structural | ErrorKind::Environment => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let code = self.code();
        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Internal error: {}", self);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
