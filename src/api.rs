// src/api.rs
use log::{debug, info};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::models::{
    Credentials, FavoriteEntry, FavoriteStatus, FavoriteUpdate, HistoryPoint, LoginResponse,
    NotificationPage, PortfolioHolding, RegisterResponse, Registration, Session, StockQuote,
    TradeOrder, TradeSide,
};
use crate::session::SessionStore;

/// Server answers `{ "message": ... }` on most error paths; capture it when
/// it is there.
#[derive(Deserialize)]
struct ServerMessage {
    #[serde(default)]
    message: Option<String>,
}

/// The favorites endpoint has returned both bare symbol arrays and
/// `{symbol, status}` rows across server versions.
#[derive(Deserialize)]
#[serde(untagged)]
enum FavoriteRow {
    Entry(FavoriteEntry),
    Symbol(String),
}

/// One client per session: reqwest connection pool, base URL, and the
/// session store the bearer token is read from. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    http: reqwest::Client,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(config: ClientConfig, session: SessionStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            config,
            http,
            session,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Token lookup for authenticated calls. Absence short-circuits the
    /// call before any network traffic; callers surface it as a redirect
    /// to sign-in.
    async fn bearer(&self) -> Result<String> {
        self.session
            .access_token()
            .await
            .ok_or(ApiError::NotAuthenticated)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ServerMessage>(&body)
                .ok()
                .and_then(|m| m.message)
                .unwrap_or_else(|| body.trim().to_string());
            return Err(ApiError::Status { status, message });
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_authed<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let token = self.bearer().await?;
        debug!("GET {}", path);
        let request = self
            .http
            .get(self.url(path))
            .bearer_auth(token)
            .query(query);
        self.send_json(request).await
    }

    async fn post_authed<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let token = self.bearer().await?;
        debug!("POST {}", path);
        let request = self.http.post(self.url(path)).bearer_auth(token).json(body);
        self.send_json(request).await
    }

    /// Sign in, install the session, and prime the favorite cache from the
    /// server, mirroring the original sign-in sequence.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let body = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = self.http.post(self.url("/auth/login")).json(&body);
        let response: LoginResponse = self.send_json(request).await?;

        let session = Session {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            username: response.username.unwrap_or_else(|| email.to_string()),
        };
        self.session.set_session(session.clone()).await?;
        info!("Signed in as {}", session.username);

        let favorites = self.list_favorites().await?;
        self.session.set_favorites(favorites).await?;
        Ok(session)
    }

    pub async fn register(&self, registration: &Registration) -> Result<RegisterResponse> {
        let request = self
            .http
            .post(self.url("/auth/register"))
            .json(registration);
        self.send_json(request).await
    }

    /// Destroy the session and every persisted key.
    pub async fn logout(&self) -> Result<()> {
        self.session.clear().await
    }

    /// All quotes, de-duplicated by symbol keeping the first occurrence
    /// (the feed repeats rows).
    pub async fn list_stocks(&self) -> Result<Vec<StockQuote>> {
        let quotes: Vec<StockQuote> = self.get_authed("/auth/stocks", &[]).await?;
        Ok(dedup_by_symbol(quotes))
    }

    pub async fn stock_detail(&self, symbol: &str) -> Result<StockQuote> {
        self.get_authed(&format!("/auth/stock/{symbol}"), &[]).await
    }

    pub async fn stock_history(&self, symbol: &str) -> Result<Vec<HistoryPoint>> {
        self.get_authed(&format!("/auth/stocks/history/{symbol}"), &[])
            .await
    }

    pub async fn market_overview(&self) -> Result<serde_json::Value> {
        self.get_authed("/auth/market/overview", &[]).await
    }

    /// Symbols the server currently reports as selected, uppercased.
    pub async fn list_favorites(&self) -> Result<Vec<String>> {
        let rows: Vec<FavoriteRow> = self.get_authed("/auth/favorite-stocks", &[]).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match row {
                FavoriteRow::Symbol(symbol) => Some(symbol),
                FavoriteRow::Entry(entry) if entry.status == FavoriteStatus::Selected => {
                    Some(entry.symbol)
                }
                FavoriteRow::Entry(_) => None,
            })
            .map(|s| s.to_uppercase())
            .collect())
    }

    pub async fn set_favorite(&self, symbol: &str, status: FavoriteStatus) -> Result<()> {
        let body = FavoriteUpdate {
            symbol: symbol.to_uppercase(),
            status,
        };
        let _: serde_json::Value = self.post_authed("/auth/favorite-stock", &body).await?;
        Ok(())
    }

    pub async fn portfolio(&self) -> Result<Vec<PortfolioHolding>> {
        self.get_authed("/auth/portfolio", &[]).await
    }

    pub async fn place_order(&self, side: TradeSide, order: &TradeOrder) -> Result<()> {
        let _: serde_json::Value = self.post_authed(side.path(), order).await?;
        info!(
            "{:?} {} x{} at {}",
            side, order.symbol, order.quantity, order.price
        );
        Ok(())
    }

    /// One advisory round trip; returns the reply text, whichever key it
    /// came under.
    pub async fn chat(&self, message: &str) -> Result<String> {
        let body = serde_json::json!({ "message": message });
        let reply: crate::models::ChatReply = self.post_authed("/auth/chat", &body).await?;
        Ok(reply.text().to_string())
    }

    /// Latest page of notifications plus the unread counter.
    pub async fn notifications(&self, limit: u32, unread_only: bool) -> Result<NotificationPage> {
        self.get_authed(
            "/api/notifications",
            &[
                ("limit", limit.to_string()),
                ("unread_only", unread_only.to_string()),
            ],
        )
        .await
    }

    pub async fn mark_notification_read(&self, id: i64) -> Result<()> {
        let _: serde_json::Value = self
            .post_authed(&format!("/api/notifications/read/{id}/"), &())
            .await?;
        Ok(())
    }
}

fn dedup_by_symbol(quotes: Vec<StockQuote>) -> Vec<StockQuote> {
    let mut seen = std::collections::HashSet::new();
    quotes
        .into_iter()
        .filter(|q| seen.insert(q.symbol.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(symbol: &str, price: f64) -> StockQuote {
        StockQuote {
            symbol: symbol.into(),
            name: None,
            price,
            change: 0.0,
            change_percent: 0.0,
            volume: None,
            market_cap: None,
            risk_score: None,
            industry: None,
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let out = dedup_by_symbol(vec![
            quote("AAPL", 175.0),
            quote("MSFT", 378.0),
            quote("AAPL", 9999.0),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].symbol, "AAPL");
        assert_eq!(out[0].price, 175.0);
        assert_eq!(out[1].symbol, "MSFT");
    }

    #[test]
    fn favorite_rows_accept_both_shapes() {
        let rows: Vec<FavoriteRow> = serde_json::from_str(
            r#"["aapl", {"symbol":"msft","status":"selected"}, {"symbol":"TSLA","status":"unselected"}]"#,
        )
        .unwrap();
        let selected: Vec<String> = rows
            .into_iter()
            .filter_map(|row| match row {
                FavoriteRow::Symbol(s) => Some(s),
                FavoriteRow::Entry(e) if e.status == FavoriteStatus::Selected => Some(e.symbol),
                FavoriteRow::Entry(_) => None,
            })
            .map(|s| s.to_uppercase())
            .collect();
        assert_eq!(selected, vec!["AAPL", "MSFT"]);
    }

    #[tokio::test]
    async fn authed_calls_short_circuit_without_token() {
        let dir = tempfile::tempdir().unwrap();
        let session = crate::session::SessionStore::open(dir.path().join("s.json")).await;
        // Unroutable base URL: if the call escaped the token check, the
        // error would be Http, not NotAuthenticated.
        let client = ApiClient::new(ClientConfig::new("http://192.0.2.1:1"), session).unwrap();

        let err = client.list_stocks().await.unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
        let err = client.mark_notification_read(1).await.unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
        let err = client.set_favorite("AAPL", FavoriteStatus::Selected).await.unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
    }

    // Full round trip against a live server, opt-in via environment like
    // the rest of the suite's network checks.
    #[tokio::test]
    async fn integration_login_if_credentials_present() -> Result<(), Box<dyn std::error::Error>> {
        let (Ok(email), Ok(password)) = (
            std::env::var("FINSTOCKS_TEST_EMAIL"),
            std::env::var("FINSTOCKS_TEST_PASSWORD"),
        ) else {
            return Ok(()); // skip when no test account configured
        };
        let dir = tempfile::tempdir()?;
        let session = crate::session::SessionStore::open(dir.path().join("s.json")).await;
        let client = ApiClient::new(ClientConfig::default(), session)?;
        let logged_in = client.login(&email, &password).await?;
        assert!(!logged_in.access_token.is_empty());
        let stocks = client.list_stocks().await?;
        assert!(!stocks.is_empty());
        Ok(())
    }
}
