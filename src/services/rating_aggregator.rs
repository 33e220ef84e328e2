use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    db::RatingStore,
    error::AppResult,
    models::{BookId, OwnRating, RatingRecord, RatingStats, UserId},
};

/// Live aggregate of a book's ratings plus the requesting user's own entry.
/// The overlay is reported next to the aggregate and never adds to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookRatings {
    pub stats: RatingStats,
    pub own: Option<OwnRating>,
}

/// Computes rating statistics from the current rating records
#[derive(Clone)]
pub struct RatingAggregator {
    ratings: Arc<dyn RatingStore>,
}

impl RatingAggregator {
    pub fn new(ratings: Arc<dyn RatingStore>) -> Self {
        Self { ratings }
    }

    /// Average and count for one book; zero for an unrated book
    pub async fn aggregate(&self, book_id: BookId) -> AppResult<RatingStats> {
        let records = self.ratings.get_rating_records(book_id).await?;
        Ok(aggregate_records(&records))
    }

    /// Aggregates for several books in one store round trip. Every requested
    /// id is present in the result.
    pub async fn aggregate_many(&self, ids: &[BookId]) -> AppResult<HashMap<BookId, RatingStats>> {
        let records = self.ratings.get_rating_records_for_books(ids).await?;
        let by_book = group_by_book(&records);

        Ok(ids
            .iter()
            .map(|id| {
                let stats = by_book
                    .get(id)
                    .map(|rs| RatingStats::from_ratings(rs.iter().map(|r| r.rating)))
                    .unwrap_or_default();
                (*id, stats)
            })
            .collect())
    }

    /// The user's own rating of a book, if any
    pub async fn own_rating(&self, user_id: UserId, book_id: BookId) -> AppResult<Option<OwnRating>> {
        let record = self.ratings.get_own_rating(user_id, book_id).await?;
        Ok(record.as_ref().map(OwnRating::from))
    }

    /// Aggregates plus the user's overlay for several books
    pub async fn ratings_for_user(
        &self,
        user_id: UserId,
        ids: &[BookId],
    ) -> AppResult<HashMap<BookId, BookRatings>> {
        let records = self.ratings.get_rating_records_for_books(ids).await?;
        let by_book = group_by_book(&records);

        Ok(ids
            .iter()
            .map(|id| {
                let ratings = match by_book.get(id) {
                    Some(rs) => BookRatings {
                        stats: RatingStats::from_ratings(rs.iter().map(|r| r.rating)),
                        own: rs
                            .iter()
                            .find(|r| r.user_id == user_id)
                            .map(|r| OwnRating::from(*r)),
                    },
                    None => BookRatings::default(),
                };
                (*id, ratings)
            })
            .collect())
    }
}

/// Arithmetic mean and count of the given records
pub fn aggregate_records(records: &[RatingRecord]) -> RatingStats {
    RatingStats::from_ratings(records.iter().map(|r| r.rating))
}

fn group_by_book(records: &[RatingRecord]) -> HashMap<BookId, Vec<&RatingRecord>> {
    let mut by_book: HashMap<BookId, Vec<&RatingRecord>> = HashMap::new();
    for record in records {
        by_book.entry(record.book_id).or_default().push(record);
    }
    by_book
}
