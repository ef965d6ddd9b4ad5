//! Read-only proxies over the upstream data clients.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use btchub_feeds::worldbank::is_valid_code;
use btchub_types::liquidity::LiquidityData;
use btchub_types::models::{
    BitcoinMarketData, BitcoinPrice, ChartPoint, EconomicIndicator, GlobalEconomicData,
    IndicatorPoint, NewsItem, SocialPost, Tweet,
};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

fn default_timeframe() -> String {
    "1D".into()
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TweetsQuery {
    #[serde(default)]
    pub refresh: bool,
}

pub async fn bitcoin_price(State(state): State<AppState>) -> Json<BitcoinPrice> {
    Json(state.prices.bitcoin_price().await)
}

pub async fn market_data(State(state): State<AppState>) -> Json<BitcoinMarketData> {
    Json(state.prices.bitcoin_market_data().await)
}

pub async fn chart(
    State(state): State<AppState>,
    Query(query): Query<ChartQuery>,
) -> Json<Vec<ChartPoint>> {
    Json(state.prices.bitcoin_chart(&query.timeframe).await)
}

pub async fn news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Json<Vec<NewsItem>> {
    let category = query.category.as_deref().filter(|c| !c.is_empty() && *c != "all");
    Json(state.news.latest_news(category).await)
}

pub async fn reddit(State(state): State<AppState>) -> Json<Vec<SocialPost>> {
    Json(state.reddit.hot_posts().await)
}

pub async fn tweets(
    State(state): State<AppState>,
    Query(query): Query<TweetsQuery>,
) -> Json<Vec<Tweet>> {
    Json(state.twitter.tweets(query.refresh).await)
}

fn check_codes(country: &str, indicator: &str) -> Result<(), ApiError> {
    if is_valid_code(country) && is_valid_code(indicator) {
        Ok(())
    } else {
        Err(ApiError::bad_request("Invalid country or indicator code"))
    }
}

pub async fn indicator(
    State(state): State<AppState>,
    Path((country, indicator)): Path<(String, String)>,
) -> Result<Json<EconomicIndicator>, ApiError> {
    check_codes(&country, &indicator)?;
    state
        .worldbank
        .indicator(&country, &indicator)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No data for {indicator} in {country}")))
}

pub async fn timeseries(
    State(state): State<AppState>,
    Path((country, indicator)): Path<(String, String)>,
) -> Result<Json<Vec<IndicatorPoint>>, ApiError> {
    check_codes(&country, &indicator)?;
    Ok(Json(state.worldbank.timeseries(&country, &indicator).await))
}

pub async fn economic_data(State(state): State<AppState>) -> Json<GlobalEconomicData> {
    Json(state.worldbank.economic_data().await)
}

pub async fn liquidity(State(state): State<AppState>) -> Json<LiquidityData> {
    Json(state.liquidity.liquidity().await)
}
