// =============================================================================
// Yahoo Finance chart client: daily OHLCV bars and instrument metadata
// =============================================================================
//
// Uses two public endpoints:
//
//   GET {base_url}/v8/finance/chart/{ticker}?period1=..&period2=..&interval=1d
//   GET {base_url}/v10/finance/quoteSummary/{ticker}?modules=assetProfile,price
//
// The chart endpoint supplies bars and quote metadata; quoteSummary supplies
// the company profile (sector, industry, market cap, business summary).
//
// The response carries parallel arrays (timestamp, open, high, low, close,
// volume) where any entry may be `null` on days the exchange reported nothing.
// Those days are skipped; the remaining bars are keyed by their calendar date
// in the exchange's own timezone (`meta.gmtoffset`).
// =============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::ProviderConfig;
use crate::errors::ProviderError;
use crate::market_data::provider::MarketDataProvider;
use crate::market_data::throttle::RequestBudget;
use crate::types::{Bar, CompanyInfo, DateRange};

/// Error code Yahoo returns for symbols it does not know.
const NOT_FOUND_CODE: &str = "Not Found";

// =============================================================================
// Wire format
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: Option<String>,
    currency: Option<String>,
    full_exchange_name: Option<String>,
    exchange_name: Option<String>,
    instrument_type: Option<String>,
    long_name: Option<String>,
    short_name: Option<String>,
    regular_market_price: Option<f64>,
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryEnvelope {
    quote_summary: SummaryBody,
}

#[derive(Debug, Deserialize)]
struct SummaryBody {
    result: Option<Vec<ProfileModules>>,
    error: Option<ChartError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileModules {
    #[serde(default)]
    asset_profile: Option<AssetProfile>,
    #[serde(default)]
    price: Option<PriceModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetProfile {
    sector: Option<String>,
    industry: Option<String>,
    country: Option<String>,
    website: Option<String>,
    long_business_summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    long_name: Option<String>,
    short_name: Option<String>,
    #[serde(default)]
    market_cap: Option<FormattedValue>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`, or `{}` when absent.
#[derive(Debug, Default, Deserialize)]
struct FormattedValue {
    raw: Option<f64>,
}

// =============================================================================
// Client
// =============================================================================

/// Yahoo Finance chart API client.
#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
    budget: Arc<RequestBudget>,
}

impl YahooClient {
    /// Build a client from the provider section of the configuration.
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %config.base_url, "YahooClient initialised");

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            budget: Arc::new(RequestBudget::per_minute(config.max_requests_per_minute)),
        })
    }

    pub fn budget(&self) -> Arc<RequestBudget> {
        Arc::clone(&self.budget)
    }

    /// GET `{base_url}/{path}` and decode the JSON body. Yahoo reports
    /// unknown symbols with a non-2xx status and a JSON error body, so the
    /// body is decoded regardless of status.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        if !self.budget.try_acquire() {
            return Err(ProviderError::RateLimited);
        }

        let url = format!("{}/{}", self.base_url, path);
        let resp = self.client.get(&url).query(query).send().await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(path, "provider answered 429 Too Many Requests");
            return Err(ProviderError::RateLimited);
        }

        let text = resp.text().await?;
        match serde_json::from_str::<T>(&text) {
            Ok(body) => Ok(body),
            Err(e) if status.is_success() => Err(e.into()),
            Err(_) => Err(ProviderError::Upstream(format!("HTTP {status}"))),
        }
    }

    async fn fetch_chart(
        &self,
        ticker: &str,
        query: &[(&str, String)],
    ) -> Result<ChartData, ProviderError> {
        let envelope = self
            .get_json(&format!("v8/finance/chart/{ticker}"), query)
            .await?;
        parse_envelope(ticker, envelope)
    }

    async fn fetch_profile(&self, ticker: &str) -> Result<ProfileModules, ProviderError> {
        let query = [("modules", "assetProfile,price".to_string())];
        let envelope = self
            .get_json(&format!("v10/finance/quoteSummary/{ticker}"), &query)
            .await?;
        parse_summary(ticker, envelope)
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    #[instrument(skip(self, range), fields(range = %range), name = "yahoo::history")]
    async fn history(&self, ticker: &str, range: DateRange) -> Result<Vec<Bar>, ProviderError> {
        let (period1, period2) = period_bounds(range);
        let query = [
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
            ("interval", "1d".to_string()),
            ("includePrePost", "false".to_string()),
        ];
        let chart = self.fetch_chart(ticker, &query).await?;

        let bars: Vec<Bar> = bars_from_chart(&chart)
            .into_iter()
            .filter(|b| b.date >= range.start && b.date <= range.end)
            .collect();
        if bars.is_empty() {
            return Err(ProviderError::NoData {
                ticker: ticker.to_string(),
                range: range.to_string(),
            });
        }

        debug!(ticker, count = bars.len(), "history fetched");
        Ok(bars)
    }

    #[instrument(skip(self), name = "yahoo::company_info")]
    async fn company_info(&self, ticker: &str) -> Result<CompanyInfo, ProviderError> {
        let query = [
            ("range", "1d".to_string()),
            ("interval", "1d".to_string()),
        ];
        let chart = self.fetch_chart(ticker, &query).await?;
        let mut info = company_info_from_meta(ticker, chart.meta);

        match self.fetch_profile(ticker).await {
            Ok(profile) => apply_profile(&mut info, profile),
            Err(e @ (ProviderError::UnknownTicker(_) | ProviderError::RateLimited)) => return Err(e),
            Err(e) => warn!(ticker, error = %e, "company profile unavailable, serving quote metadata only"),
        }
        Ok(info)
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url)
            .field("budget", &self.budget)
            .finish()
    }
}

// =============================================================================
// Parsing helpers
// =============================================================================

/// `[period1, period2)` in Unix seconds covering every day of `range`.
fn period_bounds(range: DateRange) -> (i64, i64) {
    let start = range.start.and_time(NaiveTime::MIN).and_utc().timestamp();
    let end = range
        .end
        .checked_add_days(Days::new(1))
        .unwrap_or(range.end)
        .and_time(NaiveTime::MIN)
        .and_utc()
        .timestamp();
    (start, end)
}

fn api_error(ticker: &str, err: ChartError) -> ProviderError {
    if err.code == NOT_FOUND_CODE {
        return ProviderError::UnknownTicker(ticker.to_string());
    }
    ProviderError::Upstream(format!("{}: {}", err.code, err.description))
}

fn parse_envelope(ticker: &str, envelope: ChartEnvelope) -> Result<ChartData, ProviderError> {
    if let Some(err) = envelope.chart.error {
        return Err(api_error(ticker, err));
    }
    envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ProviderError::UnknownTicker(ticker.to_string()))
}

/// Turn the parallel column arrays into date-ordered bars.
///
/// Rows with any missing or non-finite field are skipped. When two rows fall
/// on the same calendar date the later one wins. High and low are widened to
/// cover open and close.
fn bars_from_chart(chart: &ChartData) -> Vec<Bar> {
    let Some(columns) = chart.indicators.as_ref().and_then(|i| i.quote.first()) else {
        return Vec::new();
    };
    let offset = chart.meta.gmtoffset;
    let column = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten().filter(|v| v.is_finite());

    let mut by_date: BTreeMap<NaiveDate, Bar> = BTreeMap::new();
    let mut skipped = 0usize;
    for (i, &ts) in chart.timestamp.iter().enumerate() {
        let row = (
            local_date(ts, offset),
            column(&columns.open, i),
            column(&columns.high, i),
            column(&columns.low, i),
            column(&columns.close, i),
            column(&columns.volume, i),
        );
        let (Some(date), Some(open), Some(high), Some(low), Some(close), Some(volume)) = row else {
            skipped += 1;
            continue;
        };
        if volume < 0.0 {
            skipped += 1;
            continue;
        }
        let high = high.max(open).max(close);
        let low = low.min(open).min(close);
        by_date.insert(date, Bar::new(date, open, high, low, close, volume));
    }

    if skipped > 0 {
        debug!(skipped, "skipped incomplete chart rows");
    }
    by_date.into_values().collect()
}

fn local_date(timestamp: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp.checked_add(gmtoffset)?, 0).map(|dt| dt.date_naive())
}

fn company_info_from_meta(ticker: &str, meta: ChartMeta) -> CompanyInfo {
    CompanyInfo {
        symbol: meta.symbol.unwrap_or_else(|| ticker.to_string()),
        long_name: meta.long_name,
        short_name: meta.short_name,
        exchange: meta.full_exchange_name.or(meta.exchange_name),
        instrument_type: meta.instrument_type,
        currency: meta.currency,
        market_price: meta.regular_market_price,
        fifty_two_week_high: meta.fifty_two_week_high,
        fifty_two_week_low: meta.fifty_two_week_low,
        ..CompanyInfo::default()
    }
}

fn parse_summary(ticker: &str, envelope: SummaryEnvelope) -> Result<ProfileModules, ProviderError> {
    if let Some(err) = envelope.quote_summary.error {
        return Err(api_error(ticker, err));
    }
    envelope
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ProviderError::UnknownTicker(ticker.to_string()))
}

/// Fill the profile fields of `info`. Names from the profile take precedence
/// over the chart's.
fn apply_profile(info: &mut CompanyInfo, modules: ProfileModules) {
    if let Some(price) = modules.price {
        info.long_name = price.long_name.or(info.long_name.take());
        info.short_name = price.short_name.or(info.short_name.take());
        info.market_cap = price.market_cap.and_then(|v| v.raw);
    }
    if let Some(profile) = modules.asset_profile {
        info.sector = profile.sector;
        info.industry = profile.industry;
        info.country = profile.country;
        info.website = profile.website;
        info.long_business_summary = profile.long_business_summary;
    }
}
