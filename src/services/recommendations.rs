use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{
    candidates::CandidateRetriever, genre_preferences::GenrePreferenceExtractor, ranking,
    rating_aggregator::RatingAggregator,
};
use crate::{
    db::{CatalogStore, RatingStore, ShelfStore, Stores, UserStore},
    error::{AppError, AppResult},
    models::{
        ActivityKind, Book, BookId, FriendRecommendation, GenreRecommendations, RecommendedBook,
        ShelfEntry, ShelfStatus, UserId,
    },
};

/// Tunables for the recommendation feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendationSettings {
    /// Read books required before genre recommendations are served
    pub min_read_books: usize,
    /// Preferred genres recommended from
    pub top_genre_count: usize,
    /// Books per genre in the top-genres feed
    pub per_genre_limit: usize,
    /// Books in the single-genre feed
    pub more_limit: usize,
    /// Books in the friends feed
    pub friends_limit: usize,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            min_read_books: 5,
            top_genre_count: 3,
            per_genre_limit: 5,
            more_limit: 20,
            friends_limit: 20,
        }
    }
}

/// Generates personalized reading recommendations
///
/// Every call is a stateless read over current shelf, catalog and rating
/// data. Storage failures are returned as they occur.
#[derive(Clone)]
pub struct RecommendationService {
    shelves: Arc<dyn ShelfStore>,
    catalog: Arc<dyn CatalogStore>,
    ratings: Arc<dyn RatingStore>,
    users: Arc<dyn UserStore>,
    preferences: GenrePreferenceExtractor,
    candidates: CandidateRetriever,
    aggregator: RatingAggregator,
    settings: RecommendationSettings,
}

impl RecommendationService {
    pub fn new(stores: &Stores, settings: RecommendationSettings) -> Self {
        Self {
            shelves: stores.shelves.clone(),
            catalog: stores.catalog.clone(),
            ratings: stores.ratings.clone(),
            users: stores.users.clone(),
            preferences: GenrePreferenceExtractor::new(
                stores.shelves.clone(),
                stores.catalog.clone(),
            ),
            candidates: CandidateRetriever::new(stores.shelves.clone(), stores.catalog.clone()),
            aggregator: RatingAggregator::new(stores.ratings.clone()),
            settings,
        }
    }

    pub fn settings(&self) -> RecommendationSettings {
        self.settings
    }

    /// Best rated unread books for each of the user's top genres
    ///
    /// Genres appear in preference order. A genre without eligible books is
    /// still listed, with no books.
    pub async fn get_recommendations(&self, user_id: UserId) -> AppResult<Vec<GenreRecommendations>> {
        self.ensure_user(user_id).await?;
        let read = self.read_entries_with_minimum(user_id).await?;

        let genres = self
            .preferences
            .top_genres_from_entries(&read, self.settings.top_genre_count)
            .await?;
        let shelved = self.candidates.shelved_ids(user_id).await?;

        let mut feed = Vec::with_capacity(genres.len());
        for genre in genres {
            let books = self
                .candidates
                .candidates_excluding(&genre, &shelved, self.settings.per_genre_limit)
                .await?;
            let books = self
                .rank_candidates(books, self.settings.per_genre_limit)
                .await?;
            feed.push(GenreRecommendations { genre, books });
        }

        tracing::info!(
            user_id = %user_id,
            genres = feed.len(),
            books = feed.iter().map(|g| g.books.len()).sum::<usize>(),
            "Genre recommendations generated"
        );

        Ok(feed)
    }

    /// A longer list of best rated unread books for one genre
    pub async fn get_more_recommendations(
        &self,
        user_id: UserId,
        genre: &str,
    ) -> AppResult<Vec<RecommendedBook>> {
        self.ensure_user(user_id).await?;
        let genre = self.candidates.resolve_genre(genre).await?;
        self.read_entries_with_minimum(user_id).await?;

        let shelved = self.candidates.shelved_ids(user_id).await?;
        let books = self
            .candidates
            .candidates_excluding(&genre, &shelved, self.settings.more_limit)
            .await?;
        let books = self.rank_candidates(books, self.settings.more_limit).await?;

        tracing::info!(
            user_id = %user_id,
            genre = %genre,
            books = books.len(),
            "More recommendations generated"
        );

        Ok(books)
    }

    /// Books written or rated by the user's accepted friends, most recent
    /// activity first
    ///
    /// A book reached through several friends or activities appears once,
    /// under its most recent activity. Books already on the user's shelf
    /// are left out.
    pub async fn get_friends_recommendations(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<FriendRecommendation>> {
        self.ensure_user(user_id).await?;

        let friends = self.users.get_friends(user_id).await?;
        if friends.is_empty() {
            tracing::debug!(user_id = %user_id, "No accepted friends");
            return Ok(Vec::new());
        }

        let shelved: HashSet<BookId> = self
            .candidates
            .shelved_ids(user_id)
            .await?
            .into_iter()
            .collect();

        let mut latest: HashMap<BookId, Activity> = HashMap::new();
        let mut books: HashMap<BookId, Book> = HashMap::new();

        for book in self.catalog.get_books_by_authors(&friends).await? {
            record_activity(
                &mut latest,
                book.id,
                Activity {
                    friend_id: book.author_id,
                    kind: ActivityKind::Authored,
                    at: book.created_at,
                },
            );
            books.insert(book.id, book);
        }

        for rating in self.ratings.get_ratings_by_users(&friends).await? {
            record_activity(
                &mut latest,
                rating.book_id,
                Activity {
                    friend_id: rating.user_id,
                    kind: ActivityKind::Reviewed,
                    at: rating.created_at,
                },
            );
        }

        latest.retain(|book_id, _| !shelved.contains(book_id));

        let missing: Vec<BookId> = latest
            .keys()
            .filter(|id| !books.contains_key(id))
            .copied()
            .collect();
        for book in self.catalog.get_books(&missing).await? {
            books.insert(book.id, book);
        }

        let mut feed: Vec<FriendRecommendation> = latest
            .into_iter()
            .filter_map(|(book_id, activity)| match books.remove(&book_id) {
                Some(book) => Some(FriendRecommendation {
                    book,
                    friend_id: activity.friend_id,
                    kind: activity.kind,
                    activity_at: activity.at,
                }),
                None => {
                    tracing::warn!(book_id = %book_id, "Friend activity references a missing book");
                    None
                }
            })
            .collect();

        feed.sort_by(|a, b| {
            b.activity_at
                .cmp(&a.activity_at)
                .then_with(|| a.book.id.cmp(&b.book.id))
        });
        feed.truncate(self.settings.friends_limit);

        tracing::info!(
            user_id = %user_id,
            friends = friends.len(),
            books = feed.len(),
            "Friend recommendations generated"
        );

        Ok(feed)
    }

    async fn ensure_user(&self, user_id: UserId) -> AppResult<()> {
        if self.users.user_exists(user_id).await? {
            Ok(())
        } else {
            Err(AppError::user_not_found(user_id))
        }
    }

    /// The user's "read" entries, or `InsufficientShelf` below the minimum
    async fn read_entries_with_minimum(&self, user_id: UserId) -> AppResult<Vec<ShelfEntry>> {
        let read = self
            .shelves
            .get_shelf_entries(user_id, Some(ShelfStatus::Read))
            .await?;

        if read.len() < self.settings.min_read_books {
            tracing::debug!(
                user_id = %user_id,
                read = read.len(),
                required = self.settings.min_read_books,
                "Not enough read books for recommendations"
            );
            return Err(AppError::InsufficientShelf {
                required: self.settings.min_read_books,
                found: read.len(),
            });
        }

        Ok(read)
    }

    async fn rank_candidates(&self, books: Vec<Book>, limit: usize) -> AppResult<Vec<RecommendedBook>> {
        let ids: Vec<BookId> = books.iter().map(|b| b.id).collect();
        let mut stats = self.aggregator.aggregate_many(&ids).await?;

        let candidates = books
            .into_iter()
            .map(|book| RecommendedBook {
                stats: stats.remove(&book.id).unwrap_or_default(),
                book,
            })
            .collect();

        Ok(ranking::rank_and_limit(candidates, limit))
    }
}

#[derive(Debug, Clone, Copy)]
struct Activity {
    friend_id: UserId,
    kind: ActivityKind,
    at: DateTime<Utc>,
}

impl Activity {
    /// Newest first; at the same instant authorship beats a rating, then
    /// the lower friend id wins
    fn precedence(&self, other: &Activity) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| kind_rank(self.kind).cmp(&kind_rank(other.kind)))
            .then_with(|| self.friend_id.cmp(&other.friend_id))
    }
}

fn kind_rank(kind: ActivityKind) -> u8 {
    match kind {
        ActivityKind::Authored => 0,
        ActivityKind::Reviewed => 1,
    }
}

fn record_activity(latest: &mut HashMap<BookId, Activity>, book_id: BookId, activity: Activity) {
    match latest.get(&book_id) {
        Some(current) if current.precedence(&activity) != Ordering::Greater => {}
        _ => {
            latest.insert(book_id, activity);
        }
    }
}
