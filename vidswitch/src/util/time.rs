use std::time::Duration;

use chrono::{DateTime, Utc};

/// Get the current time as a UTC datetime.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Wall-clock time `delay` from now, saturating on overflow.
pub fn after(delay: Duration) -> DateTime<Utc> {
    let now = now();
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Human readable refresh interval, e.g. `"300 seconds (5 minutes)"`.
pub fn describe_interval(interval: Duration) -> String {
    let secs = interval.as_secs_f64();
    format!(
        "{} seconds ({} minutes)",
        secs.round() as u64,
        (secs / 60.0).round() as u64
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_default_interval() {
        assert_eq!(
            describe_interval(Duration::from_millis(300_000)),
            "300 seconds (5 minutes)"
        );
    }

    #[test]
    fn test_describe_short_interval() {
        assert_eq!(
            describe_interval(Duration::from_secs(45)),
            "45 seconds (1 minutes)"
        );
    }

    #[test]
    fn test_after_is_in_the_future() {
        let start = now();
        let later = after(Duration::from_secs(60));
        assert!(later >= start + chrono::Duration::seconds(60));
    }

    #[test]
    fn test_after_saturates() {
        assert_eq!(after(Duration::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
