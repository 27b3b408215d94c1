use chrono::{DateTime, Utc};

/// Get current timestamp (seconds)
pub fn current_timestamp() -> u64 {
    Utc::now().timestamp() as u64
}

/// Get current timestamp (milliseconds)
pub fn current_timestamp_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Seconds elapsed since the given instant (0 if in the future)
pub fn elapsed_secs(since: DateTime<Utc>) -> u64 {
    let delta = Utc::now().signed_duration_since(since).num_seconds();
    delta.max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_elapsed_secs() {
        let past = Utc::now() - Duration::seconds(10);
        let elapsed = elapsed_secs(past);
        assert!((9..=12).contains(&elapsed));

        let future = Utc::now() + Duration::seconds(60);
        assert_eq!(elapsed_secs(future), 0);
    }
}
