pub mod provider;
pub mod throttle;
pub mod yahoo;

// Re-exports for convenient access (e.g. `use crate::market_data::YahooClient`).
pub use provider::MarketDataProvider;
pub use throttle::{BudgetSnapshot, RequestBudget};
pub use yahoo::YahooClient;
