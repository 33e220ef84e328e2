use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::{
    db::{CatalogStore, ShelfStore},
    error::AppResult,
    models::{BookId, ShelfEntry, ShelfStatus, UserId},
};

/// How many of a user's read books carry a genre
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreCount {
    pub genre: String,
    pub count: usize,
}

/// Derives a reader's preferred genres from their "read" shelf
#[derive(Clone)]
pub struct GenrePreferenceExtractor {
    shelves: Arc<dyn ShelfStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl GenrePreferenceExtractor {
    pub fn new(shelves: Arc<dyn ShelfStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { shelves, catalog }
    }

    /// Up to `k` genres, most read first. Empty when nothing has been read.
    pub async fn top_genres(&self, user_id: UserId, k: usize) -> AppResult<Vec<String>> {
        let read = self
            .shelves
            .get_shelf_entries(user_id, Some(ShelfStatus::Read))
            .await?;
        self.top_genres_from_entries(&read, k).await
    }

    /// Same as [`Self::top_genres`] over entries the caller already loaded.
    /// Entries with another status than "read" are ignored.
    pub async fn top_genres_from_entries(
        &self,
        entries: &[ShelfEntry],
        k: usize,
    ) -> AppResult<Vec<String>> {
        let ranked = self.genre_counts(entries).await?;
        Ok(ranked.into_iter().take(k).map(|g| g.genre).collect())
    }

    /// Full genre ranking for the read entries
    pub async fn genre_counts(&self, entries: &[ShelfEntry]) -> AppResult<Vec<GenreCount>> {
        let ids: Vec<BookId> = entries
            .iter()
            .filter(|e| e.status == ShelfStatus::Read)
            .map(|e| e.book_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let books = self.catalog.get_books(&ids).await?;
        if books.len() < ids.len() {
            tracing::warn!(
                read_books = ids.len(),
                found = books.len(),
                "Read shelf references missing books"
            );
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for book in &books {
            // A book counts once per genre, however its genres are listed
            let genres: BTreeSet<&String> = book.genres.iter().collect();
            for genre in genres {
                *counts.entry(genre.clone()).or_default() += 1;
            }
        }

        tracing::debug!(
            read_books = ids.len(),
            distinct_genres = counts.len(),
            "Genre counts computed"
        );

        Ok(rank_genres(counts))
    }
}

/// Orders genres by count descending, then name ascending
pub fn rank_genres(counts: HashMap<String, usize>) -> Vec<GenreCount> {
    let mut ranked: Vec<GenreCount> = counts
        .into_iter()
        .map(|(genre, count)| GenreCount { genre, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.genre.cmp(&b.genre)));
    ranked
}
