use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, warn};

use crate::db::errors::{DatabaseError, Result};

/// Create the connection pool used by the server
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let mut database_url = database_url.to_string();

    // Managed Postgres requires TLS; only add sslmode when the URL does not choose one
    if !database_url.contains("sslmode=") && !is_local(&database_url) {
        let separator = if database_url.contains('?') { "&" } else { "?" };
        database_url = format!("{}{}sslmode=require", database_url, separator);
        info!("Added sslmode=require to database URL");
    }

    info!("Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(3))
        .idle_timeout(Duration::from_secs(60))
        .max_lifetime(Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&database_url)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("Failed to create pool: {}", e)))?;

    info!("Database connection pool created successfully");
    Ok(pool)
}

/// Pool that only connects on first use
pub fn create_lazy_pool(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect_lazy(database_url)
        .map_err(|e| DatabaseError::ConnectionError(format!("Failed to create pool: {}", e)))
}

/// Apply pending schema migrations from `migrations/`
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("Migration failed: {}", e)))?;
    Ok(())
}

/// Health check for the database connection
pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::QueryError)?;

    Ok(())
}

fn is_local(database_url: &str) -> bool {
    database_url.contains("@localhost") || database_url.contains("@127.0.0.1")
}

/// Execute a function with retry logic for handling transient errors
pub async fn with_retry<F, Fut, T>(
    max_retries: u8,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                warn!(
                    attempt = attempt,
                    max_retries = max_retries,
                    error = %e,
                    "Retryable error occurred, retrying..."
                );

                // Exponential backoff with jitter
                let delay_ms = (50 * 2_u64.pow(attempt as u32 - 1))
                    .min(1000)  // Cap at 1 second
                    + rand::random_range(0..50);

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(e) if e.is_retryable() => {
                return Err(DatabaseError::RetryLimitExceeded { attempts: max_retries });
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_retry_logic() {
        let mut call_count = 0;

        let result = with_retry(3, || {
            call_count += 1;
            let current = call_count;
            async move {
                if current < 3 {
                    Err(DatabaseError::ConnectionError("connection reset".to_string()))
                } else {
                    Ok(42)
                }
            }
        }).await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count, 3);
    }

    #[tokio::test]
    async fn test_retry_limit_exceeded() {
        let result: Result<()> = with_retry(2, || async {
            Err(DatabaseError::ConnectionError("connection reset".to_string()))
        }).await;

        assert!(matches!(result.unwrap_err(), DatabaseError::RetryLimitExceeded { attempts: 2 }));
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let mut call_count = 0;

        let result: Result<()> = with_retry(5, || {
            call_count += 1;
            async { Err(DatabaseError::NotFound("venue".to_string())) }
        }).await;

        assert!(matches!(result.unwrap_err(), DatabaseError::NotFound(_)));
        assert_eq!(call_count, 1);
    }

    #[test]
    fn test_local_urls_skip_sslmode() {
        assert!(is_local("postgres://user:pw@localhost:5432/venues"));
        assert!(is_local("postgres://user:pw@127.0.0.1/venues"));
        assert!(!is_local("postgres://user:pw@db.example.com/venues"));
    }
}
