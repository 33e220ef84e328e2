//! Data-access contracts the engine consumes
//!
//! Each collaborator owns its tables; the engine only reads committed data
//! through these traits. Implementations return `AppError::Storage` on
//! failure and must not retry on the engine's behalf.

use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{Book, BookId, RatingRecord, ShelfEntry, ShelfStatus, UserId},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ShelfStore: Send + Sync {
    /// Shelf entries of a user, restricted to one status when given
    async fn get_shelf_entries(
        &self,
        user_id: UserId,
        status: Option<ShelfStatus>,
    ) -> AppResult<Vec<ShelfEntry>>;

    async fn exists_in_shelf(&self, user_id: UserId, book_id: BookId) -> AppResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Canonical spelling of a genre, or `None` when it is not in the vocabulary
    async fn resolve_genre(&self, name: &str) -> AppResult<Option<String>>;

    /// Books carrying `genre`, minus `excluding`, best rated first (live
    /// average, then book id), at most `limit` of them
    async fn get_books_by_genre(
        &self,
        genre: &str,
        excluding: &[BookId],
        limit: usize,
    ) -> AppResult<Vec<Book>>;

    async fn get_genres_for_book(&self, book_id: BookId) -> AppResult<Vec<String>>;

    /// Books for the given ids; unknown ids are left out
    async fn get_books(&self, ids: &[BookId]) -> AppResult<Vec<Book>>;

    async fn get_books_by_authors(&self, author_ids: &[UserId]) -> AppResult<Vec<Book>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingStore: Send + Sync {
    async fn get_rating_records(&self, book_id: BookId) -> AppResult<Vec<RatingRecord>>;

    async fn get_rating_records_for_books(&self, ids: &[BookId]) -> AppResult<Vec<RatingRecord>>;

    async fn get_own_rating(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> AppResult<Option<RatingRecord>>;

    async fn get_ratings_by_users(&self, user_ids: &[UserId]) -> AppResult<Vec<RatingRecord>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn user_exists(&self, user_id: UserId) -> AppResult<bool>;

    /// Users with an accepted friendship with `user_id`, in either direction
    async fn get_friends(&self, user_id: UserId) -> AppResult<Vec<UserId>>;
}

/// The collaborators the engine reads from
#[derive(Clone)]
pub struct Stores {
    pub shelves: Arc<dyn ShelfStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub ratings: Arc<dyn RatingStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    /// Uses one backend for every collaborator
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: ShelfStore + CatalogStore + RatingStore + UserStore + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            shelves: backend.clone(),
            catalog: backend.clone(),
            ratings: backend.clone(),
            users: backend,
        }
    }
}
