// =============================================================================
// Request Budget: caps outbound provider requests per time window
// =============================================================================
//
// The upstream quote service throttles aggressive clients. The budget counts
// requests in a fixed window (one minute by default) and refuses new ones once
// the cap is reached, so the client fails fast with `RateLimited` instead of
// getting itself blocked.
// =============================================================================

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

/// Fraction of the budget at which a warning is logged.
const WARN_RATIO: f64 = 0.8;

/// Thread-safe request counter over a fixed window.
pub struct RequestBudget {
    limit: u32,
    window: Duration,
    used: AtomicU32,
    window_start: Mutex<Instant>,
}

/// Serialisable view of the budget for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetSnapshot {
    pub used: u32,
    pub limit: u32,
    pub window_secs: u64,
}

impl RequestBudget {
    /// Budget of `limit` requests per minute.
    pub fn per_minute(limit: u32) -> Self {
        Self::with_window(limit, Duration::from_secs(60))
    }

    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            used: AtomicU32::new(0),
            window_start: Mutex::new(Instant::now()),
        }
    }

    /// Reserve one request. Returns `false` when the window is exhausted.
    pub fn try_acquire(&self) -> bool {
        self.roll_window();

        let acquired = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.limit).then_some(used + 1)
            });

        match acquired {
            Ok(prev) => {
                let used = prev + 1;
                let threshold = (self.limit as f64 * WARN_RATIO).ceil() as u32;
                if used == threshold {
                    warn!(used, limit = self.limit, "provider request budget crossed warning threshold");
                }
                debug!(used, limit = self.limit, "provider request budget reserved");
                true
            }
            Err(used) => {
                warn!(used, limit = self.limit, "request blocked, provider budget exhausted");
                false
            }
        }
    }

    /// Produce a snapshot of the current counters.
    pub fn snapshot(&self) -> BudgetSnapshot {
        self.roll_window();
        BudgetSnapshot {
            used: self.used.load(Ordering::Acquire),
            limit: self.limit,
            window_secs: self.window.as_secs(),
        }
    }

    fn roll_window(&self) {
        let mut start = self.window_start.lock();
        if start.elapsed() >= self.window {
            *start = Instant::now();
            self.used.store(0, Ordering::Release);
        }
    }
}

impl std::fmt::Debug for RequestBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBudget")
            .field("used", &self.used.load(Ordering::Relaxed))
            .field("limit", &self.limit)
            .field("window", &self.window)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_blocks_after_limit() {
        let budget = RequestBudget::per_minute(2);
        assert!(budget.try_acquire());
        assert!(budget.try_acquire());
        assert!(!budget.try_acquire());
        assert_eq!(budget.snapshot().used, 2);
    }

    #[test]
    fn zero_budget_blocks_everything() {
        let budget = RequestBudget::per_minute(0);
        assert!(!budget.try_acquire());
    }

    #[test]
    fn expired_window_resets_counter() {
        let budget = RequestBudget::with_window(1, Duration::ZERO);
        assert!(budget.try_acquire());
        assert!(budget.try_acquire());
    }

    #[test]
    fn snapshot_reports_limit() {
        let snap = RequestBudget::per_minute(30).snapshot();
        assert_eq!(snap.limit, 30);
        assert_eq!(snap.used, 0);
        assert_eq!(snap.window_secs, 60);
    }
}
