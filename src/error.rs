//! Error types for the booklist client

use thiserror::Error;

/// One variant per client-side validation rule, checked in declaration order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Empty Isbn")]
    EmptyIsbn,

    #[error("Isbn must have at most {max} characters")]
    IsbnTooLong { max: usize },

    #[error("Empty Title")]
    EmptyTitle,

    #[error("Empty Author")]
    EmptyAuthor,

    #[error("Empty publication date")]
    EmptyDatePublished,

    #[error("Empty Language")]
    EmptyLanguage,

    #[error("The total number of books must be at least the number of available books")]
    AvailableExceedsTotal { total: u32, available: u32 },
}

/// Input that could not be turned into a typed value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{field} must be a non-negative whole number, got '{value}'")]
    Count { field: &'static str, value: String },

    #[error("'{value}' is not a valid date")]
    Date { value: String },
}

/// Failure reported by (or while talking to) the remote entity collection.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service answered {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_path_to_error::Error<serde_json::Error>),

    #[error("Invalid service url: {0}")]
    Url(String),
}

/// Everything that can end a search, save or delete attempt.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("No book selected")]
    NoSelection,

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("No edit in progress")]
    NotEditing,
}

impl WorkflowError {
    /// Errors raised before anything was sent to the service.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            WorkflowError::Validation(_) | WorkflowError::Parse(_) | WorkflowError::NoSelection
        )
    }
}
