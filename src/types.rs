// =============================================================================
// Shared types used across the quant dashboard
// =============================================================================

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// A single daily OHLCV bar as delivered by the market data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Value of the requested price field.
    pub fn field(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
            PriceField::Volume => self.volume,
        }
    }
}

/// Which column of a [`Bar`] to project into a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceField {
    Open,
    High,
    Low,
    #[default]
    Close,
    Volume,
}

impl std::fmt::Display for PriceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::High => write!(f, "high"),
            Self::Low => write!(f, "low"),
            Self::Close => write!(f, "close"),
            Self::Volume => write!(f, "volume"),
        }
    }
}

/// Inclusive calendar-date range for a history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Returns `None` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Range ending at `end` that reaches `days` calendar days back.
    pub fn trailing(end: NaiveDate, days: u64) -> Self {
        let start = end
            .checked_sub_days(Days::new(days.min(i32::MAX as u64)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Descriptive metadata about an instrument: quote details plus the company
/// profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub symbol: String,
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub exchange: Option<String>,
    pub instrument_type: Option<String>,
    pub currency: Option<String>,
    pub market_price: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub market_cap: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub long_business_summary: Option<String>,
}

impl CompanyInfo {
    /// Whether the provider knows the instrument by name. A record without a
    /// long name is treated as an unknown ticker.
    pub fn has_name(&self) -> bool {
        self.long_name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn bar_field_projection() {
        let bar = Bar::new(d(2024, 1, 2), 1.0, 3.0, 0.5, 2.0, 1000.0);
        assert_eq!(bar.field(PriceField::Open), 1.0);
        assert_eq!(bar.field(PriceField::High), 3.0);
        assert_eq!(bar.field(PriceField::Low), 0.5);
        assert_eq!(bar.field(PriceField::Close), 2.0);
        assert_eq!(bar.field(PriceField::Volume), 1000.0);
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        assert!(DateRange::new(d(2024, 2, 1), d(2024, 1, 1)).is_none());
        assert!(DateRange::new(d(2024, 1, 1), d(2024, 1, 1)).is_some());
    }

    #[test]
    fn trailing_range_counts_calendar_days() {
        let range = DateRange::trailing(d(2024, 3, 1), 29);
        assert_eq!(range.start, d(2024, 2, 1));
        assert_eq!(range.end, d(2024, 3, 1));
    }

    #[test]
    fn trailing_range_saturates_at_min_date() {
        let range = DateRange::trailing(d(2024, 3, 1), u64::MAX);
        assert_eq!(range.start, NaiveDate::MIN);
    }

    #[test]
    fn company_info_requires_long_name() {
        let mut info = CompanyInfo {
            symbol: "AAPL".into(),
            ..CompanyInfo::default()
        };
        assert!(!info.has_name());
        info.long_name = Some("  ".into());
        assert!(!info.has_name());
        info.long_name = Some("Apple Inc.".into());
        assert!(info.has_name());
    }

    #[test]
    fn price_field_parses_lowercase() {
        let f: PriceField = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(f, PriceField::High);
        assert_eq!(PriceField::default(), PriceField::Close);
    }
}
