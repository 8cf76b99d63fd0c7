// =============================================================================
// Application State
// =============================================================================
//
// Shared, read-only state handed to every request handler through
// `Arc<AppState>`. The indicator engine keeps no state of its own; the only
// shared mutable piece is the provider's request budget, which manages its own
// interior mutability.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};

use crate::config::AppConfig;
use crate::market_data::{BudgetSnapshot, MarketDataProvider, RequestBudget};

pub struct AppState {
    pub config: AppConfig,
    pub provider: Arc<dyn MarketDataProvider>,
    budget: Option<Arc<RequestBudget>>,
    started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            config,
            provider,
            budget: None,
            started_at: Instant::now(),
        }
    }

    /// Expose the provider's request budget on the health endpoint.
    pub fn with_budget(mut self, budget: Arc<RequestBudget>) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn budget_snapshot(&self) -> Option<BudgetSnapshot> {
        self.budget.as_ref().map(|b| b.snapshot())
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Current UTC calendar date, the default end of a query range.
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}
