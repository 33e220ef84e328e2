pub mod book;
pub mod query;
pub mod rating;
pub mod recommendation;
pub mod shelf;

use uuid::Uuid;

/// Catalog identifier of a book
pub type BookId = Uuid;

/// Identifier of a reader (also used for authors, who are readers too)
pub type UserId = Uuid;

pub use book::Book;
pub use query::{ShelfItemView, ShelfQuery, ShelfQueryParams, SortDirection, SortField, SortSpec};
pub use rating::{OwnRating, RatingRecord, RatingStats};
pub use recommendation::{
    ActivityKind, FriendRecommendation, GenreRecommendations, RecommendedBook,
};
pub use shelf::{ShelfEntry, ShelfFilter, ShelfStatus};
