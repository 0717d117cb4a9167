//! Client-side token bucket.
//!
//! The bucket holds up to `burst_capacity` tokens and earns
//! `requests_per_minute / 60` tokens per second. Every granted acquisition is
//! also recorded in a log of the last 60 seconds so that no rolling minute
//! ever sees more than `requests_per_minute` grants, even right after a
//! full burst.

use config::RateLimitConfig;
use errors::{PortraitError, PortraitResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Interval of the background refill timer.
pub const REFILL_TICK: Duration = Duration::from_secs(1);

pub const WINDOW: Duration = Duration::from_secs(60);

const WINDOW_NANOS: u128 = 60_000_000_000;

#[derive(Debug)]
struct Bucket {
    tokens: u32,
    capacity: u32,
    requests_per_minute: u32,
    last_refill: Instant,
    granted: VecDeque<Instant>
}

impl Bucket {
    /// Credit whole tokens earned since `last_refill`. Fractional progress
    /// toward the next token is kept by advancing `last_refill` only by the
    /// time the credited tokens cost.
    fn refill(&mut self, now: Instant) -> u32 {
        if self.tokens >= self.capacity {
            self.last_refill = now;
            return 0;
        }

        let elapsed = now.saturating_duration_since(self.last_refill).as_nanos();
        let earned = elapsed * u128::from(self.requests_per_minute) / WINDOW_NANOS;
        if earned == 0 {
            return 0;
        }

        let room = self.capacity - self.tokens;
        let added = u32::try_from(earned).unwrap_or(u32::MAX).min(room);
        self.tokens += added;

        if self.tokens == self.capacity {
            self.last_refill = now;
        } else {
            let cost = u128::from(added) * WINDOW_NANOS / u128::from(self.requests_per_minute);
            self.last_refill += Duration::from_nanos(u64::try_from(cost).unwrap_or(u64::MAX));
        }
        added
    }

    fn expire_grants(&mut self, now: Instant) {
        while let Some(oldest) = self.granted.front() {
            if now.saturating_duration_since(*oldest) >= WINDOW {
                self.granted.pop_front();
            } else {
                break;
            }
        }
    }

    fn try_take(&mut self, now: Instant) -> bool {
        self.refill(now);
        self.expire_grants(now);

        let window_full = self.granted.len() >= self.requests_per_minute as usize;
        if self.tokens == 0 || window_full {
            return false;
        }

        self.tokens -= 1;
        self.granted.push_back(now);
        true
    }

    /// Time until both a token and a window slot are available.
    fn time_until_available(&self, now: Instant) -> Duration {
        let token_wait = if self.tokens > 0 {
            Duration::ZERO
        } else {
            let period = WINDOW_NANOS.div_ceil(u128::from(self.requests_per_minute));
            let period = Duration::from_nanos(u64::try_from(period).unwrap_or(u64::MAX));
            (self.last_refill + period).saturating_duration_since(now)
        };

        let window_wait = if self.granted.len() >= self.requests_per_minute as usize {
            self.granted
                .front()
                .map_or(Duration::ZERO, |oldest| (*oldest + WINDOW).saturating_duration_since(now))
        } else {
            Duration::ZERO
        };

        token_wait.max(window_wait).max(Duration::from_millis(1))
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    refilled: Notify
}

impl RateLimiter {
    /// Build a full bucket. Both values must be positive.
    ///
    /// Without [`start`](Self::start) tokens are still credited lazily on
    /// every acquisition attempt.
    pub fn new(requests_per_minute: u32, burst_capacity: u32) -> PortraitResult<Self> {
        if requests_per_minute == 0 || burst_capacity == 0 {
            return Err(PortraitError::configuration(
                "requests_per_minute and burst_capacity must be positive"
            ));
        }

        Ok(Self {
            bucket: Mutex::new(Bucket {
                tokens: burst_capacity,
                capacity: burst_capacity,
                requests_per_minute,
                last_refill: Instant::now(),
                granted: VecDeque::with_capacity(requests_per_minute.min(1024) as usize)
            }),
            refilled: Notify::new()
        })
    }

    pub fn from_config(config: &RateLimitConfig) -> PortraitResult<Self> {
        Self::new(config.requests_per_minute, config.burst_capacity)
    }

    /// Build the limiter and spawn its refill timer on the current runtime.
    ///
    /// The timer stops once the last `Arc` is dropped.
    pub fn start(requests_per_minute: u32, burst_capacity: u32) -> PortraitResult<Arc<Self>> {
        let limiter = Arc::new(Self::new(requests_per_minute, burst_capacity)?);
        spawn_refill_timer(Arc::downgrade(&limiter));
        Ok(limiter)
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.bucket.lock().requests_per_minute
    }

    pub fn capacity(&self) -> u32 {
        self.bucket.lock().capacity
    }

    /// Tokens currently in the bucket.
    pub fn available_permits(&self) -> u32 {
        let mut bucket = self.bucket.lock();
        bucket.refill(Instant::now());
        bucket.tokens
    }

    /// Credit earned tokens and wake blocked waiters when any were added.
    pub fn refill(&self) -> u32 {
        let added = self.bucket.lock().refill(Instant::now());
        if added > 0 {
            trace!(added, "Rate limit tokens refilled");
            self.refilled.notify_waiters();
        }
        added
    }

    /// Take a token without waiting.
    pub fn try_acquire(&self) -> bool {
        self.bucket.lock().try_take(Instant::now())
    }

    /// Wait until a token is available.
    pub async fn acquire(&self) {
        // Only cancellation can fail the wait.
        let _ = self.wait_for_token(None).await;
    }

    /// Wait until a token is available or `cancel` fires.
    pub async fn acquire_cancellable(&self, cancel: &CancellationToken) -> PortraitResult<()> {
        self.wait_for_token(Some(cancel)).await
    }

    async fn wait_for_token(&self, cancel: Option<&CancellationToken>) -> PortraitResult<()> {
        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(PortraitError::Cancelled);
            }

            // Registered before the bucket check so a refill between the
            // check and the wait is not missed.
            let notified = self.refilled.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let wait = {
                let mut bucket = self.bucket.lock();
                let now = Instant::now();
                if bucket.try_take(now) {
                    return Ok(());
                }
                bucket.time_until_available(now)
            };
            debug!(wait_ms = wait.as_millis() as u64, "Waiting for rate limit token");

            tokio::select! {
                () = cancelled(cancel) => return Err(PortraitError::Cancelled),
                () = &mut notified => {}
                () = tokio::time::sleep(wait) => {}
            }
        }
    }
}

async fn cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await
    }
}

fn spawn_refill_timer(limiter: Weak<RateLimiter>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REFILL_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(limiter) = limiter.upgrade() else {
                break;
            };
            limiter.refill();
        }
        trace!("Rate limiter dropped, refill timer stopped");
    });
}
