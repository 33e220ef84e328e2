use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, UserId};
use crate::error::ValidationError;

/// Reading status stored on a shelf entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShelfStatus {
    WantToRead,
    Reading,
    Read,
}

impl ShelfStatus {
    pub const ALL: [ShelfStatus; 3] = [
        ShelfStatus::WantToRead,
        ShelfStatus::Reading,
        ShelfStatus::Read,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShelfStatus::WantToRead => "want-to-read",
            ShelfStatus::Reading => "reading",
            ShelfStatus::Read => "read",
        }
    }
}

impl Display for ShelfStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShelfStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "want-to-read" | "want_to_read" => Ok(ShelfStatus::WantToRead),
            "reading" => Ok(ShelfStatus::Reading),
            "read" => Ok(ShelfStatus::Read),
            _ => Err(ValidationError::InvalidStatus(s.to_string())),
        }
    }
}

/// Status filter for shelf queries. `All` is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShelfFilter {
    All,
    Only(ShelfStatus),
}

impl ShelfFilter {
    /// The concrete status to restrict to, if any
    pub fn status(&self) -> Option<ShelfStatus> {
        match self {
            ShelfFilter::All => None,
            ShelfFilter::Only(status) => Some(*status),
        }
    }

    pub fn matches(&self, status: ShelfStatus) -> bool {
        self.status().map_or(true, |s| s == status)
    }
}

impl FromStr for ShelfFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(ShelfFilter::All);
        }
        s.parse().map(ShelfFilter::Only)
    }
}

/// A book placed on a user's shelf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfEntry {
    pub user_id: UserId,
    pub book_id: BookId,
    pub status: ShelfStatus,
    pub updated_at: DateTime<Utc>,
}
