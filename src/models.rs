// src/models.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Authenticated session: opaque tokens plus the display name.
/// Created on login/register success, destroyed on logout. The client
/// never inspects or validates the token locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub contact_no: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Read-only price snapshot for one symbol. The server omits some fields
/// for thin rows, so everything past the symbol is optional-tolerant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default, rename = "changePercent")]
    pub change_percent: f64,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default, rename = "marketCap")]
    pub market_cap: Option<f64>,
    #[serde(default, rename = "riskScore")]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub industry: Option<String>,
}

/// One closing price. History endpoints return these newest-first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteStatus {
    Selected,
    Unselected,
}

/// Body of POST /auth/favorite-stock.
#[derive(Debug, Clone, Serialize)]
pub struct FavoriteUpdate {
    pub symbol: String,
    pub status: FavoriteStatus,
}

/// Server row from GET /auth/favorite-stocks.
#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteEntry {
    pub symbol: String,
    #[serde(default = "FavoriteEntry::default_status")]
    pub status: FavoriteStatus,
}

impl FavoriteEntry {
    fn default_status() -> FavoriteStatus {
        FavoriteStatus::Selected
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PriceAlert,
    AiSignal,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(deserialize_with = "deserialize_server_timestamp")]
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

/// The server emits `created_at` as a naive UTC isoformat string, no
/// offset suffix. Accept that shape as well as proper RFC 3339.
fn deserialize_server_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

/// One page of recent notifications plus the user-wide unread counter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationPage {
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub unread_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioHolding {
    pub symbol: String,
    pub quantity: f64,
    #[serde(default)]
    pub avg_price: f64,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub profit_loss: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioSummary {
    pub total_investment: f64,
    pub total_stocks: usize,
    pub total_profit: f64,
}

impl PortfolioSummary {
    pub fn from_holdings(holdings: &[PortfolioHolding]) -> Self {
        Self {
            total_investment: holdings.iter().map(|h| h.avg_price * h.quantity).sum(),
            total_stocks: holdings.len(),
            total_profit: holdings.iter().map(|h| h.profit_loss).sum(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn path(&self) -> &'static str {
        match self {
            TradeSide::Buy => "/auth/buy",
            TradeSide::Sell => "/auth/sell",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeOrder {
    pub symbol: String,
    pub quantity: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Locally persisted chat transcript (the server keeps no per-user thread).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// The advisory endpoint answers under `response`; older model backends
/// used `reply` or `answer`. Tolerate all three.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    answer: Option<String>,
}

impl ChatReply {
    pub fn text(&self) -> &str {
        self.response
            .as_deref()
            .or(self.reply.as_deref())
            .or(self.answer.as_deref())
            .unwrap_or_default()
    }
}
