use axum::http::StatusCode;
use std::convert::Infallible;
use std::fmt;
use thiserror::Error;

/// An error the adapter can turn into an HTTP response.
///
/// The adapter only asks for the capability, never for a concrete type, so a
/// new error kind plugs in by implementing this trait. Errors that report no
/// status are answered with `500 Internal Server Error`.
pub trait ClassifiedError: fmt::Display {
    fn status_code(&self) -> Option<StatusCode> {
        None
    }

    fn message(&self) -> String {
        self.to_string()
    }
}

/// A handler error with an explicit HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Build an [`ApiError`] from a status and a format string.
///
/// ```ignore
/// return Err(api_error!(StatusCode::NOT_FOUND, "user {} not found", id));
/// ```
#[macro_export]
macro_rules! api_error {
    ($status:expr, $($arg:tt)+) => {
        $crate::interface_adapters::errors::ApiError::new($status, format!($($arg)+))
    };
}

impl ClassifiedError for ApiError {
    fn status_code(&self) -> Option<StatusCode> {
        Some(self.status)
    }
}

// Type-erased errors keep their status when an ApiError sits anywhere in the
// cause chain, e.g. under `.context(..)`.
impl ClassifiedError for anyhow::Error {
    fn status_code(&self) -> Option<StatusCode> {
        self.chain()
            .find_map(|cause| cause.downcast_ref::<ApiError>())
            .map(ApiError::status)
    }

    fn message(&self) -> String {
        format!("{self:#}")
    }
}

impl ClassifiedError for Box<dyn std::error::Error + Send + Sync> {}

impl ClassifiedError for Infallible {
    fn status_code(&self) -> Option<StatusCode> {
        match *self {}
    }
}
