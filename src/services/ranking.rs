use std::cmp::Ordering;

use crate::models::RecommendedBook;

/// Best rated first; equal averages fall back to ascending book id.
/// Unrated books have a 0 average and sort last.
pub fn by_rating_desc(a: &RecommendedBook, b: &RecommendedBook) -> Ordering {
    b.stats
        .average_rating
        .total_cmp(&a.stats.average_rating)
        .then_with(|| a.id().cmp(&b.id()))
}

pub fn rank(mut books: Vec<RecommendedBook>) -> Vec<RecommendedBook> {
    books.sort_by(by_rating_desc);
    books
}

/// Ranks, then keeps the first `limit` books
pub fn rank_and_limit(books: Vec<RecommendedBook>, limit: usize) -> Vec<RecommendedBook> {
    let mut ranked = rank(books);
    ranked.truncate(limit);
    ranked
}
