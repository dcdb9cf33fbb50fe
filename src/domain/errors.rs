use thiserror::Error;

// Domain-level errors for user lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserError {
    #[error("user not found")]
    NotFound { id: String },
}
