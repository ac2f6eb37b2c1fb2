use eyre::{eyre, Result, WrapErr};
use std::{env, str::FromStr, time::Duration};

const MAX_BACKOFF_SECS: u64 = 300;

pub fn get_env(var: &str) -> Result<String> {
    env::var(var).map_err(|_| eyre!("Required environment variable \"{}\" not set", var))
}

/// Parse an optional environment variable, falling back to `default` when unset
pub fn env_or<T>(var: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .wrap_err_with(|| format!("Invalid value for \"{}\"", var)),
        _ => Ok(default),
    }
}

/// Exponential backoff between restarts: 1s, 2s, 4s ... capped at 5 minutes
pub fn backoff_delay(failures: u32) -> Duration {
    let secs = 2u64
        .checked_pow(failures.saturating_sub(1))
        .unwrap_or(MAX_BACKOFF_SECS)
        .min(MAX_BACKOFF_SECS);
    Duration::from_secs(secs)
}

/// Consecutive failures after a restart. A run that made progress before it
/// failed starts the count over.
pub fn next_failure_count(failures: u32, made_progress: bool) -> u32 {
    if made_progress {
        1
    } else {
        failures.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(5), Duration::from_secs(16));
        assert_eq!(backoff_delay(12), Duration::from_secs(MAX_BACKOFF_SECS));
        assert_eq!(backoff_delay(200), Duration::from_secs(MAX_BACKOFF_SECS));
    }

    #[test]
    fn test_failure_count_resets_after_progress() {
        let mut failures = 0;
        for _ in 0..9 {
            failures = next_failure_count(failures, false);
        }
        assert_eq!(failures, 9);
        assert_eq!(backoff_delay(failures), Duration::from_secs(256));

        // Hours of healthy indexing, then one hiccup
        failures = next_failure_count(failures, true);
        assert_eq!(failures, 1);
        assert_eq!(backoff_delay(failures), Duration::from_secs(1));

        assert_eq!(next_failure_count(u32::MAX, false), u32::MAX);
    }

    #[test]
    fn test_env_or() {
        env::set_var("VENUE_INDEXER_TEST_PAGE", " 250 ");
        assert_eq!(env_or("VENUE_INDEXER_TEST_PAGE", 1000u64).unwrap(), 250);

        env::set_var("VENUE_INDEXER_TEST_BAD", "lots");
        assert!(env_or("VENUE_INDEXER_TEST_BAD", 1000u64).is_err());

        assert_eq!(env_or("VENUE_INDEXER_TEST_UNSET", 3u64).unwrap(), 3);
        assert!(get_env("VENUE_INDEXER_TEST_UNSET").is_err());
    }
}
