use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Book, BookId, RatingStats, UserId};

/// A book paired with its live rating aggregate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedBook {
    pub book: Book,
    pub stats: RatingStats,
}

impl RecommendedBook {
    pub fn id(&self) -> BookId {
        self.book.id
    }
}

/// Ranked recommendations for one of the user's preferred genres
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreRecommendations {
    pub genre: String,
    pub books: Vec<RecommendedBook>,
}

/// How a friend is connected to a recommended book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Authored,
    Reviewed,
}

/// A book surfaced through a friend's activity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendRecommendation {
    pub book: Book,
    pub friend_id: UserId,
    pub kind: ActivityKind,
    pub activity_at: DateTime<Utc>,
}
