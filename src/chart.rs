// src/chart.rs
//! Pure adapters from raw API payloads to chart-ready series. No caching:
//! every call recomputes from the latest fetch.

use chrono::NaiveDate;

use crate::models::{HistoryPoint, StockQuote};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimePoint {
    pub x: NaiveDate,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryBars {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Which quote field a bar chart plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteField {
    Price,
    Change,
    ChangePercent,
    Volume,
    MarketCap,
    RiskScore,
}

/// Time series for a line chart, ascending by date regardless of server
/// order (some history endpoints return newest-first).
pub fn to_time_series(points: &[HistoryPoint]) -> Vec<TimePoint> {
    let mut series: Vec<TimePoint> = points
        .iter()
        .map(|p| TimePoint {
            x: p.date,
            y: p.price,
        })
        .collect();
    series.sort_by_key(|p| p.x);
    series
}

/// Labels/values for a bar chart over one quote field, preserving input
/// symbol order. Missing optional fields plot as zero.
pub fn to_category_bars(quotes: &[StockQuote], field: QuoteField) -> CategoryBars {
    let mut bars = CategoryBars {
        labels: Vec::with_capacity(quotes.len()),
        values: Vec::with_capacity(quotes.len()),
    };
    for quote in quotes {
        bars.labels.push(quote.symbol.clone());
        bars.values.push(match field {
            QuoteField::Price => quote.price,
            QuoteField::Change => quote.change,
            QuoteField::ChangePercent => quote.change_percent,
            QuoteField::Volume => quote.volume.unwrap_or_default(),
            QuoteField::MarketCap => quote.market_cap.unwrap_or_default(),
            QuoteField::RiskScore => quote.risk_score.unwrap_or_default(),
        });
    }
    bars
}
