use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use super::{candidates::resolve_genre, rating_aggregator::RatingAggregator};
use crate::{
    db::{CatalogStore, ShelfStore, Stores, UserStore},
    error::{AppError, AppResult},
    models::{
        Book, BookId, ShelfItemView, ShelfQuery, ShelfQueryParams, SortDirection, SortField,
        SortSpec, UserId,
    },
};

/// Filters and orders a user's shelf, overlaying their own ratings
#[derive(Clone)]
pub struct ShelfQueryEngine {
    shelves: Arc<dyn ShelfStore>,
    catalog: Arc<dyn CatalogStore>,
    users: Arc<dyn UserStore>,
    aggregator: RatingAggregator,
}

impl ShelfQueryEngine {
    pub fn new(stores: &Stores) -> Self {
        Self {
            shelves: stores.shelves.clone(),
            catalog: stores.catalog.clone(),
            users: stores.users.clone(),
            aggregator: RatingAggregator::new(stores.ratings.clone()),
        }
    }

    /// Validates raw caller input, then runs the query
    pub async fn query(
        &self,
        user_id: UserId,
        params: ShelfQueryParams,
    ) -> AppResult<Vec<ShelfItemView>> {
        let query = params.validate()?;
        self.run(user_id, query).await
    }

    pub async fn run(&self, user_id: UserId, query: ShelfQuery) -> AppResult<Vec<ShelfItemView>> {
        if !self.users.user_exists(user_id).await? {
            return Err(AppError::user_not_found(user_id));
        }

        let genre = match &query.genre {
            Some(name) => Some(resolve_genre(self.catalog.as_ref(), name).await?),
            None => None,
        };

        let entries = self
            .shelves
            .get_shelf_entries(user_id, query.filter.status())
            .await?;
        let ids: Vec<BookId> = entries.iter().map(|e| e.book_id).collect();

        let books: HashMap<BookId, Book> = self
            .catalog
            .get_books(&ids)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();
        let mut ratings = self.aggregator.ratings_for_user(user_id, &ids).await?;

        let mut items: Vec<ShelfItemView> = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(book) = books.get(&entry.book_id) else {
                tracing::warn!(
                    user_id = %user_id,
                    book_id = %entry.book_id,
                    "Shelf entry references a missing book, skipping"
                );
                continue;
            };

            if let Some(genre) = &genre {
                if !book.has_genre(genre) {
                    continue;
                }
            }

            let book_ratings = ratings.remove(&entry.book_id).unwrap_or_default();
            items.push(ShelfItemView {
                book: book.clone(),
                status: entry.status,
                shelved_at: entry.updated_at,
                stats: book_ratings.stats,
                own_rating: book_ratings.own,
            });
        }

        let sort = query.sort.unwrap_or_default();
        sort_items(&mut items, sort);

        tracing::info!(
            user_id = %user_id,
            filter = ?query.filter,
            genre = ?genre,
            sort = %sort.field,
            items = items.len(),
            "Shelf query completed"
        );

        Ok(items)
    }
}

/// Orders by the sort field in the requested direction; ties always fall
/// back to ascending book id
pub fn sort_items(items: &mut [ShelfItemView], sort: SortSpec) {
    items.sort_by(|a, b| {
        let ordering = compare_field(a, b, sort.field);
        let ordering = match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        ordering.then_with(|| a.book.id.cmp(&b.book.id))
    });
}

fn compare_field(a: &ShelfItemView, b: &ShelfItemView, field: SortField) -> Ordering {
    match field {
        SortField::PublicationDate => a.book.published_at.cmp(&b.book.published_at),
        SortField::TotalRatings => a.stats.total_ratings.cmp(&b.stats.total_ratings),
        SortField::AvgRatings => a.stats.average_rating.total_cmp(&b.stats.average_rating),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{MockCatalogStore, MockRatingStore, MockShelfStore, MockUserStore};
    use crate::db::InMemoryStore;
    use crate::error::{ErrorKind, ValidationError};
    use crate::models::{OwnRating, ShelfStatus};
    use chrono::NaiveDate;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    const READER: u128 = 1;

    /// Reader 1 has six books across all statuses, rated by readers 2 and 3
    async fn seeded() -> (InMemoryStore, ShelfQueryEngine) {
        let store = InMemoryStore::new();
        for user in [1, 2, 3] {
            store.add_user(id(user)).await;
        }

        let books = [
            (10, "fantasy", 2001, ShelfStatus::Read),
            (11, "fantasy", 1999, ShelfStatus::Read),
            (12, "scifi", 2010, ShelfStatus::Reading),
            (13, "scifi", 1985, ShelfStatus::WantToRead),
            (14, "mystery", 2020, ShelfStatus::WantToRead),
            (15, "fantasy", 1977, ShelfStatus::Reading),
        ];
        for (n, genre, year, status) in books {
            store
                .add_book(
                    Book::new(id(n), format!("Book {n}"), id(500))
                        .with_genres([genre])
                        .published(NaiveDate::from_ymd_opt(year, 1, 1).unwrap()),
                )
                .await;
            store.shelve(id(READER), id(n), status).await;
        }

        store.rate(id(2), id(10), 5, None).await;
        store.rate(id(3), id(10), 4, None).await;
        store.rate(id(2), id(11), 2, None).await;
        store.rate(id(2), id(12), 3, None).await;
        store.rate(id(3), id(12), 3, None).await;
        store.rate(id(2), id(13), 4, None).await;
        store.rate(id(READER), id(11), 1, Some("Dragged on")).await;

        let engine = ShelfQueryEngine::new(&Stores::from_backend(store.clone()));
        (store, engine)
    }

    fn ids(items: &[ShelfItemView]) -> Vec<Uuid> {
        items.iter().map(|i| i.book.id).collect()
    }

    #[tokio::test]
    async fn test_default_order_is_average_descending() {
        let (_, engine) = seeded().await;
        let items = engine
            .query(id(READER), ShelfQueryParams::new("all"))
            .await
            .unwrap();

        // 10: 4.5, 13: 4.0, 12: 3.0, 11: 1.5, 14 and 15 unrated
        assert_eq!(ids(&items), vec![id(10), id(13), id(12), id(11), id(14), id(15)]);
    }

    #[tokio::test]
    async fn test_all_is_union_of_each_status() {
        let (_, engine) = seeded().await;
        let all = engine
            .query(id(READER), ShelfQueryParams::new("all"))
            .await
            .unwrap();

        let mut union: HashSet<Uuid> = HashSet::new();
        let mut total = 0;
        for status in ShelfStatus::ALL {
            let items = engine
                .query(id(READER), ShelfQueryParams::new(status.as_str()))
                .await
                .unwrap();
            assert!(items.iter().all(|i| i.status == status));
            total += items.len();
            union.extend(ids(&items));
        }

        assert_eq!(all.len(), total);
        assert_eq!(ids(&all).into_iter().collect::<HashSet<_>>(), union);
    }

    #[tokio::test]
    async fn test_genre_filter_and_sort() {
        let (_, engine) = seeded().await;
        let items = engine
            .query(
                id(READER),
                ShelfQueryParams::new("all")
                    .genre("FANTASY")
                    .sort("publication_date")
                    .direction("desc"),
            )
            .await
            .unwrap();

        assert_eq!(ids(&items), vec![id(10), id(11), id(15)]);
    }

    #[tokio::test]
    async fn test_sort_total_ratings_ascending_by_default() {
        let (_, engine) = seeded().await;
        let items = engine
            .query(id(READER), ShelfQueryParams::new("all").sort("total_ratings"))
            .await
            .unwrap();

        let totals: Vec<u64> = items.iter().map(|i| i.stats.total_ratings).collect();
        assert_eq!(totals, vec![0, 0, 1, 2, 2, 2]);
        // equal totals keep ascending ids
        assert_eq!(ids(&items), vec![id(14), id(15), id(13), id(10), id(11), id(12)]);
    }

    #[tokio::test]
    async fn test_own_rating_overlay() {
        let (_, engine) = seeded().await;
        let items = engine
            .query(id(READER), ShelfQueryParams::new("read"))
            .await
            .unwrap();

        let disliked = items.iter().find(|i| i.book.id == id(11)).unwrap();
        assert_eq!(
            disliked.own_rating,
            Some(OwnRating {
                rating: 1,
                review: Some("Dragged on".to_string()),
            })
        );
        assert_eq!(disliked.stats.total_ratings, 2);
        assert_eq!(disliked.stats.average_rating, 1.5);

        let liked = items.iter().find(|i| i.book.id == id(10)).unwrap();
        assert_eq!(liked.own_rating, None);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let (_, engine) = seeded().await;
        let reader = id(READER);

        let err = engine
            .query(reader, ShelfQueryParams::new("finished"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::InvalidStatus(_))));

        let err = engine
            .query(reader, ShelfQueryParams::new("all").genre("poetry"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::InvalidGenre(_))));

        let err = engine
            .query(reader, ShelfQueryParams::new("all").sort("title"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::InvalidSort(_))));

        let err = engine
            .query(reader, ShelfQueryParams::new("read").direction("asc"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::DirectionWithoutSort(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let (_, engine) = seeded().await;
        let err = engine
            .query(id(404), ShelfQueryParams::new("all"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_empty_shelf_is_empty_result() {
        let (_, engine) = seeded().await;
        let items = engine
            .query(id(2), ShelfQueryParams::new("all"))
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_missing_book_is_skipped() {
        let (store, engine) = seeded().await;
        store.shelve(id(READER), id(77), ShelfStatus::Read).await;

        let items = engine
            .query(id(READER), ShelfQueryParams::new("read"))
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_once() {
        let mut users = MockUserStore::new();
        users.expect_user_exists().returning(|_| Ok(true));

        let mut shelves = MockShelfStore::new();
        shelves
            .expect_get_shelf_entries()
            .times(1)
            .returning(|_, _| Err(AppError::Storage(sqlx::Error::PoolTimedOut)));

        let mut catalog = MockCatalogStore::new();
        catalog.expect_get_books().never();
        let ratings = MockRatingStore::new();

        let stores = Stores {
            shelves: Arc::new(shelves),
            catalog: Arc::new(catalog),
            ratings: Arc::new(ratings),
            users: Arc::new(users),
        };
        let err = ShelfQueryEngine::new(&stores)
            .query(id(1), ShelfQueryParams::new("all"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
