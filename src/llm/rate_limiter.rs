//! Rate-limit-aware call scheduling (§4.3), grounded on the `governor` crate
//! the way the pack's rate-limiting benchmark uses it for a `Quota`-bounded
//! limiter. C3 is already single-flight per agent instance (§5), so this
//! only needs a simple direct (non-keyed) limiter.

use std::num::NonZeroU32;
use std::thread;

use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

pub struct CallRateLimiter {
    inner: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    clock: DefaultClock,
}

impl CallRateLimiter {
    /// Allows `per_minute` calls, refilling at a steady rate. At least 1.
    pub fn per_minute(per_minute: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(per_minute.max(1)).expect("max(1) is nonzero"));
        Self { inner: RateLimiter::direct(quota), clock: DefaultClock::default() }
    }

    /// Blocks the calling thread until a call slot is free.
    pub fn wait(&self) {
        loop {
            match self.inner.check() {
                Ok(_) => return,
                Err(not_until) => {
                    let wait = not_until.wait_time_from(self.clock.now());
                    thread::sleep(wait);
                }
            }
        }
    }
}
