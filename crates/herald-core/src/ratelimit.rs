use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{CoreError, Result};

/// Bounds for the three sliding search windows, taken from the current
/// configuration snapshot at call time.
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    pub per_second: u32,
    pub per_minute: u32,
    pub per_hour: u32,
}

#[derive(Debug, Default, Clone, Copy)]
struct Window {
    bucket: u64,
    count: u32,
}

impl Window {
    /// Increment within the given bucket, resetting when the bucket has
    /// rolled over (the old counter has expired). Returns the new count.
    fn tick(&mut self, bucket: u64) -> u32 {
        if self.bucket != bucket {
            self.bucket = bucket;
            self.count = 0;
        }
        self.count += 1;
        self.count
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct UserWindows {
    second: Window,
    minute: Window,
    hour: Window,
}

/// Per-user search rate limiter. Counters are created lazily on the first
/// search in a window and expire when their time bucket passes.
#[derive(Default)]
pub struct SearchRateLimiter {
    users: Mutex<HashMap<String, UserWindows>>,
}

impl SearchRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, user: &str, limits: &RateLimits) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.check_at(user, limits, now)
    }

    fn check_at(&self, user: &str, limits: &RateLimits, now_secs: u64) -> Result<()> {
        let mut users = self
            .users
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // drop users whose hour window has fully expired so the map stays
        // bounded by recently-active users
        if users.len() > 10_000 {
            let hour = now_secs / 3600;
            users.retain(|_, w| w.hour.bucket == hour);
        }

        let windows = users.entry(user.to_string()).or_default();

        if windows.second.tick(now_secs) > limits.per_second {
            return Err(rate_limited("second"));
        }
        if windows.minute.tick(now_secs / 60) > limits.per_minute {
            return Err(rate_limited("minute"));
        }
        if windows.hour.tick(now_secs / 3600) > limits.per_hour {
            return Err(rate_limited("hour"));
        }

        Ok(())
    }
}

fn rate_limited(window: &str) -> CoreError {
    CoreError::RateLimited {
        message: format!("search limit per {window} exceeded, try again next {window}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: RateLimits = RateLimits {
        per_second: 2,
        per_minute: 30,
        per_hour: 500,
    };

    #[test]
    fn third_search_in_one_second_is_rejected() {
        let limiter = SearchRateLimiter::new();
        assert!(limiter.check_at("u", &LIMITS, 100).is_ok());
        assert!(limiter.check_at("u", &LIMITS, 100).is_ok());
        let err = limiter.check_at("u", &LIMITS, 100).unwrap_err();
        assert!(matches!(err, CoreError::RateLimited { .. }));
    }

    #[test]
    fn counters_expire_with_their_bucket() {
        let limiter = SearchRateLimiter::new();
        for _ in 0..2 {
            limiter.check_at("u", &LIMITS, 100).unwrap();
        }
        assert!(limiter.check_at("u", &LIMITS, 100).is_err());
        // next second: the per-second counter has expired
        assert!(limiter.check_at("u", &LIMITS, 101).is_ok());
    }

    #[test]
    fn users_are_limited_independently() {
        let limiter = SearchRateLimiter::new();
        for _ in 0..2 {
            limiter.check_at("a", &LIMITS, 100).unwrap();
        }
        assert!(limiter.check_at("a", &LIMITS, 100).is_err());
        assert!(limiter.check_at("b", &LIMITS, 100).is_ok());
    }

    #[test]
    fn minute_window_outlives_second_resets() {
        let limits = RateLimits {
            per_second: 10,
            per_minute: 3,
            per_hour: 500,
        };
        let limiter = SearchRateLimiter::new();
        assert!(limiter.check_at("u", &limits, 60).is_ok());
        assert!(limiter.check_at("u", &limits, 61).is_ok());
        assert!(limiter.check_at("u", &limits, 62).is_ok());
        let err = limiter.check_at("u", &limits, 63).unwrap_err();
        assert!(err.to_string().contains("minute"));
    }
}
