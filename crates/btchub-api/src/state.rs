use std::path::PathBuf;
use std::sync::Arc;

use btchub_db::Database;
use btchub_feeds::{
    LegislationService, LiquidityClient, NewsClient, NotificationService, PriceClient, RedditClient,
    TwitterClient, WorldBankClient,
};
use btchub_quiz::Catalog;
use tracing::error;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub catalog: Catalog,
    pub prices: Arc<PriceClient>,
    pub news: Arc<NewsClient>,
    pub reddit: RedditClient,
    pub twitter: TwitterClient,
    pub worldbank: WorldBankClient,
    pub liquidity: LiquidityClient,
    pub legislation: LegislationService,
    pub notifications: NotificationService,
    pub jwt_secret: String,
    /// The only account allowed to delete forum posts.
    pub admin_username: String,
    /// Uploaded files land here and are served under `/static/uploads`.
    pub upload_dir: PathBuf,
}

/// Run a blocking DB call off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(ApiError::Internal)
}
