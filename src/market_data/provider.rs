//! Provider abstraction for historical market data.
//!
//! [`MarketDataProvider`] is the seam between the HTTP layer and whatever
//! vendor supplies daily bars. Implementations must return bars in strictly
//! increasing date order and surface "nothing found" as an explicit
//! [`ProviderError`] instead of an empty vector.

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::types::{Bar, CompanyInfo, DateRange};

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars for `ticker` within `range` (inclusive).
    async fn history(&self, ticker: &str, range: DateRange) -> Result<Vec<Bar>, ProviderError>;

    /// Descriptive metadata for `ticker`.
    async fn company_info(&self, ticker: &str) -> Result<CompanyInfo, ProviderError>;
}

/// Fixed in-memory data set, used by the router tests.
#[cfg(test)]
pub mod fixture {
    use std::collections::HashMap;

    use chrono::NaiveDate;

    use super::*;

    #[derive(Default)]
    pub struct StaticProvider {
        bars: HashMap<String, Vec<Bar>>,
        infos: HashMap<String, CompanyInfo>,
    }

    impl StaticProvider {
        pub fn with_closes(mut self, ticker: &str, start: NaiveDate, closes: &[f64]) -> Self {
            let bars = start
                .iter_days()
                .zip(closes)
                .map(|(date, &c)| Bar::new(date, c, c + 1.0, c - 1.0, c, 1_000.0))
                .collect();
            self.bars.insert(ticker.to_string(), bars);
            self
        }

        /// Serve `info` verbatim for its symbol.
        pub fn with_info(mut self, info: CompanyInfo) -> Self {
            self.infos.insert(info.symbol.clone(), info);
            self
        }
    }

    #[async_trait]
    impl MarketDataProvider for StaticProvider {
        async fn history(&self, ticker: &str, range: DateRange) -> Result<Vec<Bar>, ProviderError> {
            let all = self
                .bars
                .get(ticker)
                .ok_or_else(|| ProviderError::UnknownTicker(ticker.to_string()))?;
            let bars: Vec<Bar> = all
                .iter()
                .filter(|b| b.date >= range.start && b.date <= range.end)
                .cloned()
                .collect();
            if bars.is_empty() {
                return Err(ProviderError::NoData {
                    ticker: ticker.to_string(),
                    range: range.to_string(),
                });
            }
            Ok(bars)
        }

        async fn company_info(&self, ticker: &str) -> Result<CompanyInfo, ProviderError> {
            if let Some(info) = self.infos.get(ticker) {
                return Ok(info.clone());
            }
            let bars = self
                .bars
                .get(ticker)
                .ok_or_else(|| ProviderError::UnknownTicker(ticker.to_string()))?;
            Ok(CompanyInfo {
                symbol: ticker.to_string(),
                long_name: Some(format!("{ticker} Holdings")),
                currency: Some("USD".to_string()),
                market_price: bars.last().map(|b| b.close),
                sector: Some("Industrials".to_string()),
                industry: Some("Specialty Industrial Machinery".to_string()),
                market_cap: Some(1.5e9),
                ..CompanyInfo::default()
            })
        }
    }
}
