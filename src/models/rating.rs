use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, UserId};

/// A single user's rating of a book, with optional review text.
/// At most one exists per (user, book).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user_id: UserId,
    pub book_id: BookId,
    /// 1 to 5
    pub rating: u8,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Average and count over all rating records of a book
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingStats {
    pub average_rating: f64,
    pub total_ratings: u64,
}

impl RatingStats {
    /// Aggregates the given ratings; no ratings yields zero average and count
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = u8>,
    {
        let (sum, count) = ratings
            .into_iter()
            .fold((0u64, 0u64), |(sum, count), r| (sum + u64::from(r), count + 1));

        if count == 0 {
            return Self::default();
        }

        Self {
            average_rating: sum as f64 / count as f64,
            total_ratings: count,
        }
    }
}

/// The requesting user's own rating and review of a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnRating {
    pub rating: u8,
    pub review: Option<String>,
}

impl From<&RatingRecord> for OwnRating {
    fn from(record: &RatingRecord) -> Self {
        Self {
            rating: record.rating,
            review: record.review.clone(),
        }
    }
}
