use sqlx::PgPool;

use super::DomainError;
use crate::db::queries::{reviews as review_queries, venues as venue_queries};
use crate::models::{CreateReviewRequest, ReviewResponse};

const MAX_COMMENT_LEN: usize = 1000;

pub fn validate_rating(rating: Option<i64>) -> Result<i16, DomainError> {
    match rating {
        Some(r @ 1..=5) => Ok(r as i16),
        Some(r) => Err(DomainError::Validation(format!(
            "rating must be between 1 and 5, got {}",
            r
        ))),
        None => Err(DomainError::Validation("rating is required".to_string())),
    }
}

async fn ensure_venue_exists(venue_id: i64, pool: &PgPool) -> Result<(), DomainError> {
    venue_queries::get_venue(pool, venue_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| DomainError::NotFound(format!("Venue {} not found", venue_id)))
}

#[tracing::instrument(skip(pool))]
pub async fn list_reviews(
    venue_id: i64,
    pool: &PgPool,
) -> Result<Vec<ReviewResponse>, DomainError> {
    ensure_venue_exists(venue_id, pool).await?;
    let rows = review_queries::list_reviews(pool, venue_id).await?;
    Ok(rows.into_iter().map(ReviewResponse::from).collect())
}

#[tracing::instrument(skip(pool, request))]
pub async fn upsert_review(
    venue_id: i64,
    author: &str,
    request: CreateReviewRequest,
    pool: &PgPool,
) -> Result<ReviewResponse, DomainError> {
    let rating = validate_rating(request.rating)?;
    let comment = request
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if comment.as_ref().is_some_and(|c| c.chars().count() > MAX_COMMENT_LEN) {
        return Err(DomainError::Validation(format!(
            "comment must be at most {} characters",
            MAX_COMMENT_LEN
        )));
    }

    ensure_venue_exists(venue_id, pool).await?;
    let row =
        review_queries::upsert_review(pool, venue_id, author, rating, comment.as_deref()).await?;
    Ok(row.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert_eq!(validate_rating(Some(1)).unwrap(), 1);
        assert_eq!(validate_rating(Some(5)).unwrap(), 5);
        assert!(validate_rating(Some(0)).is_err());
        assert!(validate_rating(Some(6)).is_err());
        assert!(validate_rating(Some(-2)).is_err());
        assert!(validate_rating(None).is_err());
    }
}
