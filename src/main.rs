// src/main.rs
use env_logger::Builder;
use log::{error, info, warn, LevelFilter};
use tokio::time::{self, Duration};

use finstocks_client::chart::{self, QuoteField};
use finstocks_client::{ApiClient, ApiError, ClientConfig, FavoritesSync, NotificationFeed, SessionStore};

#[tokio::main]
async fn main() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    let config = ClientConfig::default();
    info!("Starting the FinStocks watch client...");
    info!("API base: {}", config.base_url);

    let session = SessionStore::open(config.state_file.clone()).await;
    let client = match ApiClient::new(config, session) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build API client: {}", e);
            return;
        }
    };

    // Reuse a persisted session when there is one; otherwise sign in with
    // credentials from the environment.
    if client.session_store().session().await.is_none() {
        let (Ok(email), Ok(password)) = (
            std::env::var("FINSTOCKS_EMAIL"),
            std::env::var("FINSTOCKS_PASSWORD"),
        ) else {
            error!("No session found; set FINSTOCKS_EMAIL and FINSTOCKS_PASSWORD to sign in");
            return;
        };
        if let Err(e) = client.login(&email, &password).await {
            error!("Login failed: {}", e);
            return;
        }
    }
    if let Some(username) = client.session_store().username().await {
        info!("Session active for {}", username);
    }

    let favorites = FavoritesSync::new(client.clone());
    favorites.prime_from_session().await;
    if let Err(e) = favorites.refresh().await {
        warn!("Could not refresh favorites: {}", e);
    }

    let feed = NotificationFeed::new(client.clone());
    feed.start();

    let mut ticker = time::interval(Duration::from_secs(60));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = watch_cycle(&client, &favorites, &feed).await {
                    match e {
                        ApiError::NotAuthenticated => {
                            error!("Session expired; sign in again");
                            break;
                        }
                        e => error!("Watch cycle failed: {}", e),
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }
    feed.stop();
}

async fn watch_cycle(
    client: &ApiClient,
    favorites: &FavoritesSync,
    feed: &NotificationFeed,
) -> finstocks_client::Result<()> {
    let stocks = client.list_stocks().await?;
    let movers = chart::to_category_bars(&stocks, QuoteField::ChangePercent);
    for (symbol, pct) in movers.labels.iter().zip(&movers.values) {
        info!("{:<6} {:+.2}%", symbol, pct);
    }

    for symbol in favorites.favorites().await {
        match client.stock_history(&symbol).await {
            Ok(points) => {
                let series = chart::to_time_series(&points);
                if let (Some(first), Some(last)) = (series.first(), series.last()) {
                    info!(
                        "{}: {} points, {} -> {} ({:.2} to {:.2})",
                        symbol,
                        series.len(),
                        first.x,
                        last.x,
                        first.y,
                        last.y
                    );
                }
            }
            Err(e) => error!("History fetch for {} failed: {}", symbol, e),
        }
    }

    match client.portfolio().await {
        Ok(holdings) => {
            let summary = finstocks_client::models::PortfolioSummary::from_holdings(&holdings);
            info!(
                "Portfolio: {} positions, invested {:.2}, P/L {:+.2}",
                summary.total_stocks, summary.total_investment, summary.total_profit
            );
        }
        Err(e) => error!("Portfolio fetch failed: {}", e),
    }

    let (notifications, unread) = feed.snapshot().await;
    info!("{} notifications cached, {} unread", notifications.len(), unread);
    Ok(())
}
