//! Polling delay policy toward the accrual service.
//!
//! Delay tables rather than an exponential formula: the tables encode a
//! hand-tuned curve that is gentle on the remote and readable in review,
//! and saturation bounds the worst-case polling rate.

use std::time::Duration;

use crate::client::ClientError;

/// Steady-state poll interval while the remote reports a non-terminal
/// status without erroring.
pub const BASE_POLL_DELAY: Duration = Duration::from_secs(5);

const UNAVAILABLE_DELAYS: [Duration; 5] = [
    Duration::from_secs(10),
    Duration::from_secs(30),
    Duration::from_secs(60),
    Duration::from_secs(120),
    Duration::from_secs(300),
];

const DEFAULT_DELAYS: [Duration; 6] = [
    Duration::from_secs(5),
    Duration::from_secs(10),
    Duration::from_secs(30),
    Duration::from_secs(60),
    Duration::from_secs(120),
    Duration::from_secs(300),
];

/// Total function from (retry count, last error) to the next poll delay.
pub fn next_check_delay(retry_count: i32, last_error: Option<&ClientError>) -> Duration {
    match last_error {
        Some(ClientError::RateLimitExceeded { retry_after }) => *retry_after,
        Some(ClientError::Unavailable) => saturating(&UNAVAILABLE_DELAYS, retry_count),
        _ => saturating(&DEFAULT_DELAYS, retry_count),
    }
}

fn saturating(table: &[Duration], retry_count: i32) -> Duration {
    let idx = usize::try_from(retry_count).unwrap_or(0).min(table.len() - 1);
    table[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_polling_starts_at_the_base_delay() {
        assert_eq!(next_check_delay(0, None), BASE_POLL_DELAY);
    }

    #[test]
    fn generic_failures_walk_the_default_table() {
        let err = ClientError::UnexpectedStatus(404);
        assert_eq!(next_check_delay(1, Some(&err)), Duration::from_secs(10));
        assert_eq!(next_check_delay(2, Some(&err)), Duration::from_secs(30));
        assert_eq!(next_check_delay(5, Some(&err)), Duration::from_secs(300));
    }

    #[test]
    fn tables_saturate_at_the_last_entry() {
        let err = ClientError::Unavailable;
        assert_eq!(next_check_delay(4, Some(&err)), Duration::from_secs(300));
        assert_eq!(next_check_delay(100, Some(&err)), Duration::from_secs(300));

        let generic = ClientError::UnexpectedStatus(418);
        assert_eq!(next_check_delay(1000, Some(&generic)), Duration::from_secs(300));
    }

    #[test]
    fn unavailable_backs_off_faster_than_generic() {
        let err = ClientError::Unavailable;
        assert_eq!(next_check_delay(1, Some(&err)), Duration::from_secs(30));
        assert_eq!(next_check_delay(0, Some(&err)), Duration::from_secs(10));
    }

    #[test]
    fn rate_limit_honors_the_parsed_retry_after() {
        let err = ClientError::RateLimitExceeded {
            retry_after: Duration::from_secs(30),
        };
        assert_eq!(next_check_delay(7, Some(&err)), Duration::from_secs(30));

        let default = ClientError::RateLimitExceeded {
            retry_after: Duration::from_secs(60),
        };
        assert_eq!(next_check_delay(0, Some(&default)), Duration::from_secs(60));
    }

    #[test]
    fn not_registered_uses_the_default_table() {
        let err = ClientError::OrderNotRegistered;
        assert_eq!(next_check_delay(1, Some(&err)), Duration::from_secs(10));
    }

    #[test]
    fn negative_retry_counts_clamp_to_the_first_entry() {
        assert_eq!(next_check_delay(-3, None), BASE_POLL_DELAY);
    }
}
