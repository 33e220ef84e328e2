use std::fmt::Display;

use serde::Serialize;

/// Rejected caller input
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid shelf status: {0}")]
    InvalidStatus(String),

    #[error("Invalid genre: {0}")]
    InvalidGenre(String),

    #[error("Invalid sort field: {0}")]
    InvalidSort(String),

    #[error("Invalid sort direction: {0}")]
    InvalidDirection(String),

    #[error("Sort direction '{0}' supplied without a sort field")]
    DirectionWithoutSort(String),
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Insufficient shelf: {found} read books, at least {required} required")]
    InsufficientShelf { required: usize, found: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Coarse error classes callers map onto their own transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Precondition,
    Storage,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::InsufficientShelf { .. } => ErrorKind::Precondition,
            AppError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn user_not_found(user_id: impl Display) -> Self {
        AppError::NotFound {
            entity: "User",
            id: user_id.to_string(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
