//! InMemoryStore - map-backed implementation of every store contract for
//! tests and local development.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::store::{CatalogStore, RatingStore, ShelfStore, UserStore};
use crate::{
    error::AppResult,
    models::{Book, BookId, RatingRecord, RatingStats, ShelfEntry, ShelfStatus, UserId},
};

#[derive(Default)]
struct Inner {
    users: HashSet<UserId>,
    /// (requester, addressee) -> accepted
    friendships: HashMap<(UserId, UserId), bool>,
    genres: BTreeSet<String>,
    books: HashMap<BookId, Book>,
    shelves: BTreeMap<(UserId, BookId), ShelfEntry>,
    /// Keyed by (user, book), so a user holds at most one rating per book
    ratings: BTreeMap<(UserId, BookId), RatingRecord>,
}

impl Inner {
    /// The vocabulary's spelling of `name`, registering it when new.
    /// Genres differing only in case are the same genre.
    fn canonical_genre(&mut self, name: &str) -> String {
        let name = name.trim();
        if let Some(existing) = self.genres.iter().find(|g| g.eq_ignore_ascii_case(name)) {
            return existing.clone();
        }
        self.genres.insert(name.to_string());
        name.to_string()
    }

    fn stats_for(&self, book_id: BookId) -> RatingStats {
        RatingStats::from_ratings(
            self.ratings
                .values()
                .filter(|r| r.book_id == book_id)
                .map(|r| r.rating),
        )
    }
}

/// In-memory store shared through an `Arc`; clones see the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user_id: UserId) {
        self.inner.write().await.users.insert(user_id);
    }

    /// Adds a genre to the recognized vocabulary
    pub async fn add_genre(&self, name: impl AsRef<str>) {
        self.inner.write().await.canonical_genre(name.as_ref());
    }

    /// Lists a book; its genres join the vocabulary, and tags matching a
    /// known genre in another case take the known spelling
    pub async fn add_book(&self, book: Book) {
        let mut inner = self.inner.write().await;
        let genres: Vec<String> = book
            .genres
            .iter()
            .map(|g| inner.canonical_genre(g))
            .collect();
        let book = book.with_genres(genres);
        inner.books.insert(book.id, book);
    }

    /// Places a book on a shelf, or moves it to another status
    pub async fn shelve(&self, user_id: UserId, book_id: BookId, status: ShelfStatus) {
        self.shelve_at(user_id, book_id, status, Utc::now()).await;
    }

    pub async fn shelve_at(
        &self,
        user_id: UserId,
        book_id: BookId,
        status: ShelfStatus,
        at: DateTime<Utc>,
    ) {
        self.inner.write().await.shelves.insert(
            (user_id, book_id),
            ShelfEntry {
                user_id,
                book_id,
                status,
                updated_at: at,
            },
        );
    }

    pub async fn remove_from_shelf(&self, user_id: UserId, book_id: BookId) {
        self.inner.write().await.shelves.remove(&(user_id, book_id));
    }

    /// Records a rating of 1 to 5, replacing any earlier one by the same user
    pub async fn rate(&self, user_id: UserId, book_id: BookId, rating: u8, review: Option<&str>) {
        self.rate_at(user_id, book_id, rating, review, Utc::now())
            .await;
    }

    /// # Panics
    ///
    /// When `rating` is outside 1..=5
    pub async fn rate_at(
        &self,
        user_id: UserId,
        book_id: BookId,
        rating: u8,
        review: Option<&str>,
        at: DateTime<Utc>,
    ) {
        assert!(
            (1..=5).contains(&rating),
            "rating must be between 1 and 5, got {rating}"
        );
        self.inner.write().await.ratings.insert(
            (user_id, book_id),
            RatingRecord {
                user_id,
                book_id,
                rating,
                review: review.map(str::to_string),
                created_at: at,
            },
        );
    }

    /// Records an accepted friendship
    pub async fn befriend(&self, requester: UserId, addressee: UserId) {
        self.inner
            .write()
            .await
            .friendships
            .insert((requester, addressee), true);
    }

    /// Records a friend request that has not been accepted
    pub async fn request_friendship(&self, requester: UserId, addressee: UserId) {
        self.inner
            .write()
            .await
            .friendships
            .insert((requester, addressee), false);
    }
}

#[async_trait::async_trait]
impl ShelfStore for InMemoryStore {
    async fn get_shelf_entries(
        &self,
        user_id: UserId,
        status: Option<ShelfStatus>,
    ) -> AppResult<Vec<ShelfEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .shelves
            .values()
            .filter(|e| e.user_id == user_id)
            .filter(|e| status.map_or(true, |s| e.status == s))
            .cloned()
            .collect())
    }

    async fn exists_in_shelf(&self, user_id: UserId, book_id: BookId) -> AppResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner.shelves.contains_key(&(user_id, book_id)))
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryStore {
    async fn resolve_genre(&self, name: &str) -> AppResult<Option<String>> {
        let inner = self.inner.read().await;
        let name = name.trim();
        Ok(inner
            .genres
            .iter()
            .find(|g| g.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn get_books_by_genre(
        &self,
        genre: &str,
        excluding: &[BookId],
        limit: usize,
    ) -> AppResult<Vec<Book>> {
        let inner = self.inner.read().await;
        let excluded: HashSet<&BookId> = excluding.iter().collect();

        let mut matches: Vec<(RatingStats, &Book)> = inner
            .books
            .values()
            .filter(|b| b.has_genre(genre) && !excluded.contains(&b.id))
            .map(|b| (inner.stats_for(b.id), b))
            .collect();

        matches.sort_by(|(a_stats, a), (b_stats, b)| {
            b_stats
                .average_rating
                .total_cmp(&a_stats.average_rating)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(matches
            .into_iter()
            .take(limit)
            .map(|(_, b)| b.clone())
            .collect())
    }

    async fn get_genres_for_book(&self, book_id: BookId) -> AppResult<Vec<String>> {
        let inner = self.inner.read().await;
        Ok(inner
            .books
            .get(&book_id)
            .map(|b| b.genres.clone())
            .unwrap_or_default())
    }

    async fn get_books(&self, ids: &[BookId]) -> AppResult<Vec<Book>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.books.get(id))
            .cloned()
            .collect())
    }

    async fn get_books_by_authors(&self, author_ids: &[UserId]) -> AppResult<Vec<Book>> {
        let inner = self.inner.read().await;
        let authors: HashSet<&UserId> = author_ids.iter().collect();
        Ok(inner
            .books
            .values()
            .filter(|b| authors.contains(&b.author_id))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl RatingStore for InMemoryStore {
    async fn get_rating_records(&self, book_id: BookId) -> AppResult<Vec<RatingRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .ratings
            .values()
            .filter(|r| r.book_id == book_id)
            .cloned()
            .collect())
    }

    async fn get_rating_records_for_books(&self, ids: &[BookId]) -> AppResult<Vec<RatingRecord>> {
        let inner = self.inner.read().await;
        let wanted: HashSet<&BookId> = ids.iter().collect();
        Ok(inner
            .ratings
            .values()
            .filter(|r| wanted.contains(&r.book_id))
            .cloned()
            .collect())
    }

    async fn get_own_rating(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> AppResult<Option<RatingRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.ratings.get(&(user_id, book_id)).cloned())
    }

    async fn get_ratings_by_users(&self, user_ids: &[UserId]) -> AppResult<Vec<RatingRecord>> {
        let inner = self.inner.read().await;
        let wanted: HashSet<&UserId> = user_ids.iter().collect();
        Ok(inner
            .ratings
            .values()
            .filter(|r| wanted.contains(&r.user_id))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryStore {
    async fn user_exists(&self, user_id: UserId) -> AppResult<bool> {
        Ok(self.inner.read().await.users.contains(&user_id))
    }

    async fn get_friends(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        let inner = self.inner.read().await;
        let friends: BTreeSet<UserId> = inner
            .friendships
            .iter()
            .filter(|(_, accepted)| **accepted)
            .filter_map(|((requester, addressee), _)| {
                if *requester == user_id {
                    Some(*addressee)
                } else if *addressee == user_id {
                    Some(*requester)
                } else {
                    None
                }
            })
            .collect();
        Ok(friends.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[tokio::test]
    async fn test_rating_twice_keeps_one_record() {
        let store = InMemoryStore::new();
        store.add_book(Book::new(id(1), "Emma", id(100))).await;

        store.rate(id(10), id(1), 2, None).await;
        store.rate(id(10), id(1), 5, Some("Better on reread")).await;

        let records = store.get_rating_records(id(1)).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rating, 5);
    }

    #[tokio::test]
    async fn test_shelve_moves_status() {
        let store = InMemoryStore::new();
        store.shelve(id(10), id(1), ShelfStatus::WantToRead).await;
        store.shelve(id(10), id(1), ShelfStatus::Read).await;

        let all = store.get_shelf_entries(id(10), None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, ShelfStatus::Read);

        let wanted = store
            .get_shelf_entries(id(10), Some(ShelfStatus::WantToRead))
            .await
            .unwrap();
        assert!(wanted.is_empty());

        assert!(store.exists_in_shelf(id(10), id(1)).await.unwrap());
        store.remove_from_shelf(id(10), id(1)).await;
        assert!(!store.exists_in_shelf(id(10), id(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_books_by_genre_ranks_excludes_and_limits() {
        let store = InMemoryStore::new();
        for n in 1..=4 {
            store
                .add_book(Book::new(id(n), format!("Book {n}"), id(100)).with_genres(["fantasy"]))
                .await;
        }
        store
            .add_book(Book::new(id(5), "Elsewhere", id(100)).with_genres(["scifi"]))
            .await;
        store.rate(id(10), id(3), 5, None).await;
        store.rate(id(10), id(2), 3, None).await;

        let books = store
            .get_books_by_genre("fantasy", &[id(2)], 2)
            .await
            .unwrap();
        let ids: Vec<Uuid> = books.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![id(3), id(1)]);
    }

    #[tokio::test]
    async fn test_resolve_genre_is_case_insensitive() {
        let store = InMemoryStore::new();
        store.add_genre("Science Fiction").await;

        assert_eq!(
            store.resolve_genre("science fiction").await.unwrap(),
            Some("Science Fiction".to_string())
        );
        assert_eq!(store.resolve_genre("poetry").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_only_accepted_friendships_count() {
        let store = InMemoryStore::new();
        store.befriend(id(1), id(2)).await;
        store.befriend(id(3), id(1)).await;
        store.request_friendship(id(1), id(4)).await;

        let friends = store.get_friends(id(1)).await.unwrap();
        assert_eq!(friends, vec![id(2), id(3)]);
        assert_eq!(store.get_friends(id(4)).await.unwrap(), Vec::<Uuid>::new());
    }

    #[tokio::test]
    async fn test_mixed_case_tags_share_one_genre() {
        let store = InMemoryStore::new();
        store
            .add_book(Book::new(id(1), "First", id(100)).with_genres(["Fantasy"]))
            .await;
        store
            .add_book(Book::new(id(2), "Second", id(100)).with_genres(["fantasy", "Horror"]))
            .await;
        store.add_genre("HORROR").await;

        assert_eq!(
            store.get_genres_for_book(id(2)).await.unwrap(),
            vec!["Fantasy".to_string(), "Horror".to_string()]
        );
        assert_eq!(
            store.resolve_genre("fantasy").await.unwrap(),
            Some("Fantasy".to_string())
        );

        let books = store.get_books_by_genre("Fantasy", &[], 10).await.unwrap();
        let ids: Vec<Uuid> = books.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![id(1), id(2)]);
        assert_eq!(store.inner.read().await.genres.len(), 2);
    }

    #[tokio::test]
    #[should_panic(expected = "rating must be between 1 and 5")]
    async fn test_out_of_range_rating_is_rejected() {
        let store = InMemoryStore::new();
        store.rate(id(10), id(1), 6, None).await;
    }

    #[tokio::test]
    #[should_panic(expected = "rating must be between 1 and 5")]
    async fn test_zero_rating_is_rejected() {
        let store = InMemoryStore::new();
        store.rate(id(10), id(1), 0, None).await;
    }
}
