// =============================================================================
// REST API Endpoints: Axum 0.7
// =============================================================================
//
//   GET /                                   welcome message
//   GET /api/v1/health                      liveness, uptime, provider budget
//   GET /stocks/:ticker/info                instrument metadata
//   GET /stocks/:ticker/history             daily OHLCV bars
//   GET /technicals/:ticker/sma             ?window
//   GET /technicals/:ticker/bbands          ?window&num_std
//   GET /technicals/:ticker/macd            ?fast&slow&signal
//   GET /technicals/:ticker/rsi             ?window
//   GET /technicals/:ticker/overview        close + all indicators, one row per date
//
// Every route under /stocks and /technicals accepts `start_date` and
// `end_date` (YYYY-MM-DD). Technical routes also accept `strict=true`, which
// turns a history shorter than the indicator's lookback into an error instead
// of an all-null series.
//
// CORS is permissive: the dashboard front-end is served from another origin.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Request, State},
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::extract::ApiQuery;
use crate::app_state::AppState;
use crate::errors::ProviderError;
use crate::indicators::{self, bollinger, check_period, macd::MacdParams, require_lookback, rsi::RsiZone};
use crate::series::{IndicatorResult, Series};
use crate::types::{DateRange, PriceField};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS, request tracing and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/api/v1/health", get(health))
        // ── Stocks ──────────────────────────────────────────────────
        .route("/stocks/:ticker/info", get(stock_info))
        .route("/stocks/:ticker/history", get(history))
        // ── Technicals ──────────────────────────────────────────────
        .route("/technicals/:ticker/sma", get(sma))
        .route("/technicals/:ticker/bbands", get(bbands))
        .route("/technicals/:ticker/macd", get(macd))
        .route("/technicals/:ticker/rsi", get(rsi))
        .route("/technicals/:ticker/overview", get(overview))
        // ── Middleware & State ───────────────────────────────────────
        .layer(middleware::from_fn(request_span))
        .layer(cors)
        .with_state(state)
}

/// Run each request inside a span tagged with a fresh request id, and echo
/// the id back in `x-request-id`.
async fn request_span(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = info_span!(
        "request",
        id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let started = Instant::now();
    let mut resp = next.run(req).instrument(span.clone()).await;
    span.in_scope(|| {
        info!(
            status = resp.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
    });

    if let Ok(val) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

// =============================================================================
// Query parameters
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct RangeQuery {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    #[serde(default)]
    strict: bool,
}

#[derive(Debug, Deserialize)]
struct WindowQuery {
    window: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct BbandsQuery {
    window: Option<usize>,
    num_std: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MacdQuery {
    fast: Option<usize>,
    slow: Option<usize>,
    signal: Option<usize>,
}

impl MacdQuery {
    fn resolve(&self, defaults: MacdParams) -> MacdParams {
        MacdParams {
            fast: self.fast.unwrap_or(defaults.fast),
            slow: self.slow.unwrap_or(defaults.slow),
            signal: self.signal.unwrap_or(defaults.signal),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OverviewQuery {
    sma_window: Option<usize>,
    bb_window: Option<usize>,
    num_std: Option<f64>,
    rsi_window: Option<usize>,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Serialize)]
struct IndicatorResponse {
    ticker: String,
    indicator: &'static str,
    parameters: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest: Option<Latest>,
    series: IndicatorResult,
}

/// Most recent defined value of the primary component.
#[derive(Serialize)]
struct Latest {
    date: NaiveDate,
    value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    zone: Option<RsiZone>,
}

impl Latest {
    fn of(series: &Series) -> Option<Self> {
        let (date, value) = series.last()?;
        Some(Self {
            date,
            value,
            zone: None,
        })
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Upper-case and sanity-check a ticker symbol from the path.
fn normalize_ticker(raw: &str) -> Result<String, ApiError> {
    let ticker = raw.trim().to_uppercase();
    let valid = !ticker.is_empty()
        && ticker.len() <= 16
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if !valid {
        return Err(ApiError::BadRequest(format!("invalid ticker '{raw}'")));
    }
    Ok(ticker)
}

/// Calendar days that contain at least `bars` trading days.
fn warmup_days(bars: usize) -> u64 {
    (bars as u64).saturating_mul(7).div_ceil(5).saturating_add(7)
}

/// Resolve the query range. Without an explicit start, the range reaches back
/// `default_lookback_days` plus enough extra days to fill the indicator's
/// lookback, so the visible period is fully defined.
fn resolve_range(state: &AppState, q: &RangeQuery, lookback: usize) -> Result<DateRange, ApiError> {
    let end = q.end_date.unwrap_or_else(|| state.today());
    let start = match q.start_date {
        Some(start) => start,
        None => {
            let days = state
                .config
                .default_lookback_days
                .saturating_add(warmup_days(lookback));
            DateRange::trailing(end, days).start
        }
    };
    DateRange::new(start, end).ok_or_else(|| {
        ApiError::BadRequest(format!("start_date {start} is after end_date {end}"))
    })
}

/// Fetch bars and project closing prices.
async fn load_closes(
    state: &AppState,
    ticker: &str,
    q: &RangeQuery,
    indicator: &'static str,
    lookback: usize,
) -> Result<Series, ApiError> {
    let range = resolve_range(state, q, lookback)?;
    let bars = state.provider.history(ticker, range).await?;
    let closes = Series::from_bars(&bars, PriceField::Close)?;
    if q.strict {
        require_lookback(indicator, lookback, closes.len())?;
    }
    Ok(closes)
}

// =============================================================================
// Root & health
// =============================================================================

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the Quant Dashboard API v2!",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "server_time": Utc::now().timestamp_millis(),
        "uptime_secs": state.uptime_secs(),
        "provider_budget": state.budget_snapshot(),
    }))
}

// =============================================================================
// Stocks
// =============================================================================

async fn stock_info(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let ticker = normalize_ticker(&ticker)?;
    let info = state.provider.company_info(&ticker).await?;
    if !info.has_name() {
        return Err(ProviderError::UnknownTicker(ticker).into());
    }
    Ok(Json(json!({ "ticker": ticker, "info": info })))
}

async fn history(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    ApiQuery(range): ApiQuery<RangeQuery>,
) -> Result<Json<Value>, ApiError> {
    let ticker = normalize_ticker(&ticker)?;
    let range = resolve_range(&state, &range, 0)?;
    let bars = state.provider.history(&ticker, range).await?;
    info!(ticker = %ticker, range = %range, count = bars.len(), "history served");
    Ok(Json(json!({ "ticker": ticker, "history": bars })))
}

// =============================================================================
// Technicals
// =============================================================================

async fn sma(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    ApiQuery(range): ApiQuery<RangeQuery>,
    ApiQuery(q): ApiQuery<WindowQuery>,
) -> Result<Json<IndicatorResponse>, ApiError> {
    let ticker = normalize_ticker(&ticker)?;
    let window = q.window.unwrap_or(state.config.defaults.sma_window);
    check_period("window", window)?;

    let closes = load_closes(&state, &ticker, &range, "sma", indicators::sma::lookback(window)).await?;
    let series = indicators::sma(&closes, window)?;
    info!(ticker = %ticker, window, defined = series.defined_count(), "sma computed");

    Ok(Json(IndicatorResponse {
        latest: Latest::of(&series),
        ticker,
        indicator: "sma",
        parameters: json!({ "window": window }),
        series: IndicatorResult::single("sma", series),
    }))
}

async fn bbands(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    ApiQuery(range): ApiQuery<RangeQuery>,
    ApiQuery(q): ApiQuery<BbandsQuery>,
) -> Result<Json<IndicatorResponse>, ApiError> {
    let ticker = normalize_ticker(&ticker)?;
    let defaults = &state.config.defaults;
    let window = q.window.unwrap_or(defaults.bbands_window);
    let num_std = q.num_std.unwrap_or(defaults.bbands_num_std);
    bollinger::validate(window, num_std)?;

    let closes = load_closes(&state, &ticker, &range, "bbands", bollinger::lookback(window)).await?;
    let bands = indicators::bbands(&closes, window, num_std)?;
    info!(ticker = %ticker, window, num_std, "bollinger bands computed");

    Ok(Json(IndicatorResponse {
        latest: bands.get("middle").and_then(Latest::of),
        ticker,
        indicator: "bbands",
        parameters: json!({ "window": window, "num_std": num_std }),
        series: bands,
    }))
}

async fn macd(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    ApiQuery(range): ApiQuery<RangeQuery>,
    ApiQuery(q): ApiQuery<MacdQuery>,
) -> Result<Json<IndicatorResponse>, ApiError> {
    let ticker = normalize_ticker(&ticker)?;
    let params = q.resolve(state.config.defaults.macd);
    params.validate()?;

    let closes = load_closes(&state, &ticker, &range, "macd", params.lookback()).await?;
    let result = indicators::macd(&closes, params)?;
    info!(ticker = %ticker, fast = params.fast, slow = params.slow, signal = params.signal, "macd computed");

    Ok(Json(IndicatorResponse {
        latest: result.get("macd").and_then(Latest::of),
        ticker,
        indicator: "macd",
        parameters: json!(params),
        series: result,
    }))
}

async fn rsi(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    ApiQuery(range): ApiQuery<RangeQuery>,
    ApiQuery(q): ApiQuery<WindowQuery>,
) -> Result<Json<IndicatorResponse>, ApiError> {
    let ticker = normalize_ticker(&ticker)?;
    let window = q.window.unwrap_or(state.config.defaults.rsi_window);
    check_period("window", window)?;

    let closes = load_closes(&state, &ticker, &range, "rsi", indicators::rsi::lookback(window)).await?;
    let series = indicators::rsi(&closes, window)?;
    let latest = Latest::of(&series).map(|l| Latest {
        zone: Some(RsiZone::classify(l.value)),
        ..l
    });
    info!(ticker = %ticker, window, latest = ?latest.as_ref().map(|l| l.value), "rsi computed");

    Ok(Json(IndicatorResponse {
        latest,
        ticker,
        indicator: "rsi",
        parameters: json!({ "window": window }),
        series: IndicatorResult::single("rsi", series),
    }))
}

async fn overview(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    ApiQuery(range): ApiQuery<RangeQuery>,
    ApiQuery(q): ApiQuery<OverviewQuery>,
    ApiQuery(macd_q): ApiQuery<MacdQuery>,
) -> Result<Json<Value>, ApiError> {
    let ticker = normalize_ticker(&ticker)?;
    let defaults = &state.config.defaults;
    let sma_window = q.sma_window.unwrap_or(defaults.sma_window);
    let bb_window = q.bb_window.unwrap_or(defaults.bbands_window);
    let num_std = q.num_std.unwrap_or(defaults.bbands_num_std);
    let rsi_window = q.rsi_window.unwrap_or(defaults.rsi_window);
    let macd_params = macd_q.resolve(defaults.macd);

    check_period("sma_window", sma_window)?;
    bollinger::validate(bb_window, num_std)?;
    macd_params.validate()?;
    check_period("rsi_window", rsi_window)?;

    let lookback = [
        indicators::sma::lookback(sma_window),
        bollinger::lookback(bb_window),
        macd_params.lookback(),
        indicators::rsi::lookback(rsi_window),
    ]
    .into_iter()
    .max()
    .unwrap_or(1);

    let closes = load_closes(&state, &ticker, &range, "overview", lookback).await?;
    let combined = IndicatorResult::single("close", closes.clone())
        .with("sma", indicators::sma(&closes, sma_window)?)?
        .merge("bb", indicators::bbands(&closes, bb_window, num_std)?)?
        .merge("", indicators::macd(&closes, macd_params)?)?
        .with("rsi", indicators::rsi(&closes, rsi_window)?)?;
    info!(ticker = %ticker, rows = combined.len(), "overview computed");

    Ok(Json(json!({
        "ticker": ticker,
        "parameters": {
            "sma_window": sma_window,
            "bb_window": bb_window,
            "num_std": num_std,
            "macd": macd_params,
            "rsi_window": rsi_window,
        },
        "rows": combined.rows(),
    })))
}
