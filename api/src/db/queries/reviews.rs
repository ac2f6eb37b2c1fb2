use sqlx::PgPool;

use crate::db::errors::{DatabaseError, Result};
use crate::models::ReviewRow;

#[tracing::instrument(skip(pool))]
pub async fn list_reviews(pool: &PgPool, venue_id: i64) -> Result<Vec<ReviewRow>> {
    sqlx::query_as::<_, ReviewRow>(
        r#"
        SELECT id, venue_id, rating, author, comment, created_at
        FROM venue_reviews
        WHERE venue_id = $1
        ORDER BY created_at DESC, id DESC
        "#
    )
    .bind(venue_id)
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::QueryError)
}

/// One review per author and venue; posting again replaces the earlier review
#[tracing::instrument(skip(pool, comment))]
pub async fn upsert_review(
    pool: &PgPool,
    venue_id: i64,
    author: &str,
    rating: i16,
    comment: Option<&str>,
) -> Result<ReviewRow> {
    sqlx::query_as::<_, ReviewRow>(
        r#"
        INSERT INTO venue_reviews (venue_id, rating, author, comment, created_at)
        VALUES ($1, $2, LOWER($3), $4, NOW())
        ON CONFLICT ON CONSTRAINT venue_reviews_one_per_author
        DO UPDATE SET rating = EXCLUDED.rating, comment = EXCLUDED.comment, created_at = NOW()
        RETURNING id, venue_id, rating, author, comment, created_at
        "#
    )
    .bind(venue_id)
    .bind(rating)
    .bind(author)
    .bind(comment)
    .fetch_one(pool)
    .await
    .map_err(DatabaseError::QueryError)
}
