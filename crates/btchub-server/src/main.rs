mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use btchub_api::files::PUBLIC_PREFIX;
use btchub_api::{AppState, AppStateInner};
use btchub_db::Database;
use btchub_feeds::{
    ChatClient, LegiScanClient, LegislationService, LiquidityClient, NewsClient, NotificationService,
    PriceClient, RedditClient, TwitterClient, WorldBankClient,
};
use btchub_quiz::Catalog;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "btchub=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Database::open(&config.db_path)?;
    btchub_api::auth::ensure_admin_account(
        &db,
        &config.admin_username,
        config.admin_password.as_deref(),
    )?;
    let catalog = Catalog::builtin()?;
    info!(games = catalog.len(), "quiz catalog loaded");

    // Upstream clients share one connection pool
    let http = btchub_feeds::http_client()?;
    let prices = Arc::new(PriceClient::new(http.clone()));
    let news = Arc::new(NewsClient::new(http.clone(), config.news_api_key.clone()));
    let writer = config
        .openai_api_key
        .as_ref()
        .map(|key| ChatClient::openai(http.clone(), key.as_str()));
    let analyst = config
        .xai_api_key
        .as_ref()
        .map(|key| ChatClient::xai(http.clone(), key.as_str()));

    let state: AppState = Arc::new(AppStateInner {
        db,
        catalog,
        prices: prices.clone(),
        news: news.clone(),
        reddit: RedditClient::new(http.clone()),
        twitter: TwitterClient::new(http.clone(), config.twitter_bearer_token.clone()),
        worldbank: WorldBankClient::new(http.clone()),
        liquidity: LiquidityClient::new(http.clone(), config.fred_api_key.clone()),
        legislation: LegislationService::new(
            LegiScanClient::new(http.clone(), config.legiscan_api_key.clone()),
            analyst,
            config.admin_password.clone(),
        ),
        notifications: NotificationService::new(prices, news, writer),
        jwt_secret: config.jwt_secret.clone(),
        admin_username: config.admin_username.clone(),
        upload_dir: config.upload_dir.clone(),
    });

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let app = btchub_api::router(state)
        .nest_service(PUBLIC_PREFIX, ServeDir::new(&config.upload_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("BitcoinHub server listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
