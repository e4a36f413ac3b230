//! Request budgets using token bucket rate limiting

use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Direct (un-keyed) rate limiter shared by one connector's requests
pub type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Token bucket guarding one upstream source
pub struct RequestBudget {
    limiter: Arc<DirectLimiter>,
}

impl RequestBudget {
    /// Budget replenishing per minute
    pub fn per_minute(requests: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Budget replenishing per hour
    pub fn per_hour(requests: u32) -> Self {
        let quota = Quota::per_hour(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wait until the next request is allowed
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Non-blocking probe
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}
