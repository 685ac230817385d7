//! Minimum spacing between outbound requests.
//!
//! The exchange rate-limits per IP. Every request goes through `wait()`, which
//! sleeps until `min_interval` has passed since the previous request.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct RequestThrottle {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Block until a request is allowed, then record it.
    pub fn wait(&self) {
        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(at) = *last {
            let remaining = self.min_interval.saturating_sub(at.elapsed());
            if !remaining.is_zero() {
                std::thread::sleep(remaining);
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_request_is_immediate() {
        let throttle = RequestThrottle::new(Duration::from_secs(60));
        let start = Instant::now();
        throttle.wait();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn spaces_consecutive_requests() {
        let throttle = RequestThrottle::new(Duration::from_millis(20));
        let start = Instant::now();
        throttle.wait();
        throttle.wait();
        throttle.wait();
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn zero_interval_never_blocks() {
        let throttle = RequestThrottle::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..5 {
            throttle.wait();
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
