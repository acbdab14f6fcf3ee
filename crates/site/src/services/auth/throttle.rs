//! Per-IP failed-login counter.
//!
//! Process-local: counts reset on restart and are not shared between
//! instances.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use moka::future::Cache;
use tracing::warn;

use crate::config::LoginConfig;

#[derive(Debug, Clone, Copy)]
struct Attempts {
    failures: u32,
    first_failure: Instant,
}

/// Failed-login throttle keyed by client IP.
///
/// The window starts at the first failure; after `max_attempts` failures the
/// client is locked out until the window has passed.
#[derive(Clone)]
pub struct LoginThrottle {
    attempts: Cache<IpAddr, Attempts>,
    max_attempts: u32,
    window: Duration,
}

impl std::fmt::Debug for LoginThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginThrottle")
            .field("max_attempts", &self.max_attempts)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl LoginThrottle {
    /// Create a throttle from the login configuration.
    #[must_use]
    pub fn new(config: LoginConfig) -> Self {
        let attempts = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(config.window)
            .build();

        Self {
            attempts,
            max_attempts: config.max_attempts,
            window: config.window,
        }
    }

    /// Check whether `ip` may attempt a login.
    ///
    /// # Errors
    ///
    /// Returns the time until the lockout ends if the client is locked out.
    pub async fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        let Some(attempts) = self.attempts.get(&ip).await else {
            return Ok(());
        };

        let elapsed = attempts.first_failure.elapsed();
        if elapsed >= self.window {
            self.attempts.invalidate(&ip).await;
            return Ok(());
        }

        if attempts.failures >= self.max_attempts {
            return Err(self.window.saturating_sub(elapsed).max(Duration::from_secs(1)));
        }
        Ok(())
    }

    /// Record a failed attempt from `ip`.
    pub async fn record_failure(&self, ip: IpAddr) {
        let now = Instant::now();
        let window = self.window;

        let entry = self
            .attempts
            .entry(ip)
            .and_upsert_with(|existing| async move {
                match existing.map(moka::Entry::into_value) {
                    Some(a) if a.first_failure.elapsed() < window => Attempts {
                        failures: a.failures.saturating_add(1),
                        ..a
                    },
                    _ => Attempts {
                        failures: 1,
                        first_failure: now,
                    },
                }
            })
            .await;

        let failures = entry.into_value().failures;
        if failures >= self.max_attempts {
            warn!(ip = %ip, failures, "Login locked out after repeated failures");
        }
    }

    /// Forget the failures of `ip` after a successful login.
    pub async fn reset(&self, ip: IpAddr) {
        self.attempts.invalidate(&ip).await;
    }
}
