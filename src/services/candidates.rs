use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    db::{CatalogStore, ShelfStore},
    error::{AppResult, ValidationError},
    models::{Book, BookId, UserId},
};

/// Canonical name of a genre, or `InvalidGenre` when the catalog does not know it
pub(crate) async fn resolve_genre(catalog: &dyn CatalogStore, name: &str) -> AppResult<String> {
    catalog
        .resolve_genre(name)
        .await?
        .ok_or_else(|| ValidationError::InvalidGenre(name.to_string()).into())
}

/// Finds books of a genre that are not on the reader's shelf
#[derive(Clone)]
pub struct CandidateRetriever {
    shelves: Arc<dyn ShelfStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl CandidateRetriever {
    pub fn new(shelves: Arc<dyn ShelfStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { shelves, catalog }
    }

    pub async fn resolve_genre(&self, name: &str) -> AppResult<String> {
        resolve_genre(self.catalog.as_ref(), name).await
    }

    /// Ids of every book on the user's shelf, whatever the status
    pub async fn shelved_ids(&self, user_id: UserId) -> AppResult<Vec<BookId>> {
        let entries = self.shelves.get_shelf_entries(user_id, None).await?;
        Ok(entries.into_iter().map(|e| e.book_id).collect())
    }

    /// Up to `limit` unshelved books of `genre`, best rated first
    pub async fn candidates_for_genre(
        &self,
        genre: &str,
        user_id: UserId,
        limit: usize,
    ) -> AppResult<Vec<Book>> {
        let genre = self.resolve_genre(genre).await?;
        let shelved = self.shelved_ids(user_id).await?;
        self.candidates_excluding(&genre, &shelved, limit).await
    }

    /// Candidates for an already resolved genre against a preloaded shelf
    pub async fn candidates_excluding(
        &self,
        genre: &str,
        shelved: &[BookId],
        limit: usize,
    ) -> AppResult<Vec<Book>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut books = self
            .catalog
            .get_books_by_genre(genre, shelved, limit)
            .await?;

        let shelved: HashSet<&BookId> = shelved.iter().collect();
        books.retain(|b| !shelved.contains(&b.id));
        books.truncate(limit);

        tracing::debug!(genre = %genre, candidates = books.len(), "Candidates retrieved");

        Ok(books)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{MockCatalogStore, MockShelfStore};
    use crate::db::{InMemoryStore, Stores};
    use crate::error::{AppError, ErrorKind};
    use crate::models::ShelfStatus;
    use uuid::Uuid;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn retriever(store: InMemoryStore) -> CandidateRetriever {
        let stores = Stores::from_backend(store);
        CandidateRetriever::new(stores.shelves, stores.catalog)
    }

    async fn fantasy_catalog() -> InMemoryStore {
        let store = InMemoryStore::new();
        for n in 1..=6 {
            store
                .add_book(Book::new(id(n), format!("Fantasy {n}"), id(900)).with_genres(["fantasy"]))
                .await;
        }
        store
            .add_book(Book::new(id(7), "Space", id(900)).with_genres(["scifi"]))
            .await;
        store
    }

    #[tokio::test]
    async fn test_excludes_every_shelf_status() {
        let store = fantasy_catalog().await;
        let user = id(100);
        store.shelve(user, id(1), ShelfStatus::Read).await;
        store.shelve(user, id(2), ShelfStatus::Reading).await;
        store.shelve(user, id(3), ShelfStatus::WantToRead).await;

        let books = retriever(store.clone())
            .candidates_for_genre("fantasy", user, 10)
            .await
            .unwrap();

        let shelf: HashSet<BookId> = [id(1), id(2), id(3)].into_iter().collect();
        assert_eq!(books.len(), 3);
        assert!(books.iter().all(|b| !shelf.contains(&b.id)));
        assert!(books.iter().all(|b| b.has_genre("fantasy")));
    }

    #[tokio::test]
    async fn test_limit_is_respected() {
        let books = retriever(fantasy_catalog().await)
            .candidates_for_genre("Fantasy", id(100), 2)
            .await
            .unwrap();
        assert_eq!(books.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_genre_is_invalid() {
        let err = retriever(fantasy_catalog().await)
            .candidates_for_genre("poetry", id(100), 5)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::InvalidGenre(ref g)) if g == "poetry"
        ));
    }

    #[tokio::test]
    async fn test_known_genre_without_candidates_is_empty() {
        let store = fantasy_catalog().await;
        let user = id(100);
        store.shelve(user, id(7), ShelfStatus::Read).await;

        let books = retriever(store)
            .candidates_for_genre("scifi", user, 5)
            .await
            .unwrap();
        assert!(books.is_empty());
    }

    #[tokio::test]
    async fn test_limit_is_passed_to_the_store() {
        let mut shelves = MockShelfStore::new();
        shelves
            .expect_get_shelf_entries()
            .returning(|_, _| Ok(Vec::new()));

        let mut catalog = MockCatalogStore::new();
        catalog
            .expect_resolve_genre()
            .returning(|_| Ok(Some("fantasy".to_string())));
        catalog
            .expect_get_books_by_genre()
            .withf(|genre, excluding, limit| genre == "fantasy" && excluding.is_empty() && *limit == 5)
            .times(1)
            .returning(|_, _, _| Ok(Vec::new()));

        let retriever = CandidateRetriever::new(Arc::new(shelves), Arc::new(catalog));
        let books = retriever
            .candidates_for_genre("fantasy", id(1), 5)
            .await
            .unwrap();
        assert!(books.is_empty());
    }

    #[tokio::test]
    async fn test_shelf_failure_propagates_as_storage() {
        let mut shelves = MockShelfStore::new();
        shelves
            .expect_get_shelf_entries()
            .times(1)
            .returning(|_, _| Err(AppError::Storage(sqlx::Error::PoolClosed)));

        let mut catalog = MockCatalogStore::new();
        catalog
            .expect_resolve_genre()
            .returning(|_| Ok(Some("fantasy".to_string())));
        catalog.expect_get_books_by_genre().never();

        let retriever = CandidateRetriever::new(Arc::new(shelves), Arc::new(catalog));
        let err = retriever
            .candidates_for_genre("fantasy", id(1), 5)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
