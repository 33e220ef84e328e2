use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Book, OwnRating, RatingStats, ShelfFilter, ShelfStatus};
use crate::error::ValidationError;

/// Fields a shelf listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    PublicationDate,
    TotalRatings,
    AvgRatings,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::PublicationDate => "publication_date",
            SortField::TotalRatings => "total_ratings",
            SortField::AvgRatings => "avg_ratings",
        }
    }
}

impl Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "publication_date" => Ok(SortField::PublicationDate),
            "total_ratings" => Ok(SortField::TotalRatings),
            "avg_ratings" => Ok(SortField::AvgRatings),
            _ => Err(ValidationError::InvalidSort(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(ValidationError::InvalidDirection(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    /// Unsorted shelves list the best rated books first
    fn default() -> Self {
        Self {
            field: SortField::AvgRatings,
            direction: SortDirection::Desc,
        }
    }
}

/// Raw shelf query as supplied by a caller
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShelfQueryParams {
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

fn default_status() -> String {
    "all".to_string()
}

/// Shelf query whose status, sort and direction are checked against the
/// recognized values. The genre still needs resolving against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfQuery {
    pub filter: ShelfFilter,
    pub genre: Option<String>,
    pub sort: Option<SortSpec>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ShelfQueryParams {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Default::default()
        }
    }

    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }

    pub fn validate(self) -> Result<ShelfQuery, ValidationError> {
        let filter: ShelfFilter = self.status.parse()?;

        let sort = match (non_empty(self.sort), non_empty(self.direction)) {
            (None, Some(direction)) => {
                return Err(ValidationError::DirectionWithoutSort(direction));
            }
            (None, None) => None,
            (Some(field), direction) => Some(SortSpec {
                field: field.parse()?,
                direction: direction
                    .map(|d| d.parse())
                    .transpose()?
                    .unwrap_or_default(),
            }),
        };

        Ok(ShelfQuery {
            filter,
            genre: non_empty(self.genre),
            sort,
        })
    }
}

/// One row of a shelf listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShelfItemView {
    pub book: Book,
    pub status: ShelfStatus,
    pub shelved_at: DateTime<Utc>,
    pub stats: RatingStats,
    pub own_rating: Option<OwnRating>,
}
