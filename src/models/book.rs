use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, RatingStats, UserId};

/// A catalog book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author_id: UserId,
    pub description: String,
    pub pages: i32,
    pub published_at: Option<NaiveDate>,
    pub language: String,
    /// Canonical genre names, sorted
    pub genres: Vec<String>,
    /// Denormalized rating figures kept for display only. Ranking always
    /// uses stats recomputed from rating records.
    pub rating_snapshot: RatingStats,
    /// When the book was listed in the catalog
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// A catalog entry with empty metadata, listed now
    pub fn new(id: BookId, title: impl Into<String>, author_id: UserId) -> Self {
        Self {
            id,
            title: title.into(),
            author_id,
            description: String::new(),
            pages: 0,
            published_at: None,
            language: "en".to_string(),
            genres: Vec::new(),
            rating_snapshot: RatingStats::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self.genres.sort_by_key(|g| g.to_lowercase());
        self.genres.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
        self
    }

    pub fn published(mut self, date: NaiveDate) -> Self {
        self.published_at = Some(date);
        self
    }

    pub fn listed_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// Whether the book carries the genre, ignoring case
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
    }
}
