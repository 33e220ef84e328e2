use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use super::store::{CatalogStore, RatingStore, ShelfStore, UserStore};
use crate::{
    error::AppResult,
    models::{Book, BookId, RatingRecord, RatingStats, ShelfEntry, ShelfStatus, UserId},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.author_id, b.description, b.pages, b.published_at,
           b.language, b.avg_rating, b.total_ratings, b.created_at,
           COALESCE(
               (SELECT ARRAY_AGG(g.name ORDER BY LOWER(g.name))
                FROM book_genres bg
                JOIN genres g ON g.id = bg.genre_id
                WHERE bg.book_id = b.id),
               ARRAY[]::TEXT[]
           ) AS genres
    FROM books b
"#;

#[derive(Debug, FromRow)]
struct BookRow {
    id: Uuid,
    title: String,
    author_id: Uuid,
    description: String,
    pages: i32,
    published_at: Option<NaiveDate>,
    language: String,
    avg_rating: f64,
    total_ratings: i64,
    created_at: DateTime<Utc>,
    genres: Vec<String>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book {
            id: row.id,
            title: row.title,
            author_id: row.author_id,
            description: row.description,
            pages: row.pages,
            published_at: row.published_at,
            language: row.language,
            genres: row.genres,
            rating_snapshot: RatingStats {
                average_rating: row.avg_rating,
                total_ratings: row.total_ratings.max(0) as u64,
            },
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ShelfRow {
    user_id: Uuid,
    book_id: Uuid,
    status: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ShelfRow> for ShelfEntry {
    type Error = sqlx::Error;

    fn try_from(row: ShelfRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<ShelfStatus>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(ShelfEntry {
            user_id: row.user_id,
            book_id: row.book_id,
            status,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RatingRow {
    user_id: Uuid,
    book_id: Uuid,
    rating: i16,
    review: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<RatingRow> for RatingRecord {
    type Error = sqlx::Error;

    fn try_from(row: RatingRow) -> Result<Self, Self::Error> {
        let rating = u8::try_from(row.rating).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(RatingRecord {
            user_id: row.user_id,
            book_id: row.book_id,
            rating,
            review: row.review,
            created_at: row.created_at,
        })
    }
}

fn into_records(rows: Vec<RatingRow>) -> AppResult<Vec<RatingRecord>> {
    rows.into_iter()
        .map(|row| RatingRecord::try_from(row).map_err(Into::into))
        .collect()
}

/// Postgres-backed implementation of every store contract
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ShelfStore for PgStore {
    async fn get_shelf_entries(
        &self,
        user_id: UserId,
        status: Option<ShelfStatus>,
    ) -> AppResult<Vec<ShelfEntry>> {
        let rows = sqlx::query_as::<_, ShelfRow>(
            r#"
            SELECT user_id, book_id, status, updated_at
            FROM shelves
            WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY updated_at DESC, book_id
            "#,
        )
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| ShelfEntry::try_from(row).map_err(Into::into))
            .collect()
    }

    async fn exists_in_shelf(&self, user_id: UserId, book_id: BookId) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM shelves WHERE user_id = $1 AND book_id = $2)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgStore {
    async fn resolve_genre(&self, name: &str) -> AppResult<Option<String>> {
        let genre = sqlx::query_scalar::<_, String>(
            "SELECT name FROM genres WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(genre)
    }

    async fn get_books_by_genre(
        &self,
        genre: &str,
        excluding: &[BookId],
        limit: usize,
    ) -> AppResult<Vec<Book>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT b.id
            FROM books b
            JOIN book_genres bg ON bg.book_id = b.id
            JOIN genres g ON g.id = bg.genre_id
            LEFT JOIN ratings r ON r.book_id = b.id
            WHERE LOWER(g.name) = LOWER($1) AND NOT (b.id = ANY($2))
            GROUP BY b.id
            ORDER BY COALESCE(AVG(r.rating), 0) DESC, b.id ASC
            LIMIT $3
            "#,
        )
        .bind(genre)
        .bind(excluding)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        // Loading by id loses the ranked order, so restore it
        let position: HashMap<Uuid, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut books = self.get_books(&ids).await?;
        books.sort_by_key(|b| position.get(&b.id).copied().unwrap_or(usize::MAX));

        Ok(books)
    }

    async fn get_genres_for_book(&self, book_id: BookId) -> AppResult<Vec<String>> {
        let genres = sqlx::query_scalar::<_, String>(
            r#"
            SELECT g.name
            FROM book_genres bg
            JOIN genres g ON g.id = bg.genre_id
            WHERE bg.book_id = $1
            ORDER BY LOWER(g.name)
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(genres)
    }

    async fn get_books(&self, ids: &[BookId]) -> AppResult<Vec<Book>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, BookRow>(&format!("{BOOK_SELECT} WHERE b.id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    async fn get_books_by_authors(&self, author_ids: &[UserId]) -> AppResult<Vec<Book>> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "{BOOK_SELECT} WHERE b.author_id = ANY($1)"
        ))
        .bind(author_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }
}

#[async_trait::async_trait]
impl RatingStore for PgStore {
    async fn get_rating_records(&self, book_id: BookId) -> AppResult<Vec<RatingRecord>> {
        let rows = sqlx::query_as::<_, RatingRow>(
            r#"
            SELECT user_id, book_id, rating, review, created_at
            FROM ratings
            WHERE book_id = $1
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }

    async fn get_rating_records_for_books(&self, ids: &[BookId]) -> AppResult<Vec<RatingRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, RatingRow>(
            r#"
            SELECT user_id, book_id, rating, review, created_at
            FROM ratings
            WHERE book_id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }

    async fn get_own_rating(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> AppResult<Option<RatingRecord>> {
        let row = sqlx::query_as::<_, RatingRow>(
            r#"
            SELECT user_id, book_id, rating, review, created_at
            FROM ratings
            WHERE user_id = $1 AND book_id = $2
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RatingRecord::try_from).transpose()?)
    }

    async fn get_ratings_by_users(&self, user_ids: &[UserId]) -> AppResult<Vec<RatingRecord>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, RatingRow>(
            r#"
            SELECT user_id, book_id, rating, review, created_at
            FROM ratings
            WHERE user_id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }
}

#[async_trait::async_trait]
impl UserStore for PgStore {
    async fn user_exists(&self, user_id: UserId) -> AppResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn get_friends(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        let friends = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT CASE WHEN requester_id = $1 THEN addressee_id ELSE requester_id END
            FROM friendships
            WHERE (requester_id = $1 OR addressee_id = $1) AND status = 'accepted'
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(friends)
    }
}
