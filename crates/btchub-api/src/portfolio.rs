use axum::{Extension, Json, extract::State};

use btchub_types::api::{
    Claims, PortfolioResponse, UpdateBitcoinHoldingRequest, UpdateHoldingRequest,
};

use crate::convert;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::{AppState, with_db};

const MAX_ASSET_LEN: usize = 32;

pub async fn get_portfolio(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<PortfolioResponse>, ApiError> {
    load(&state, claims.sub).await.map(Json)
}

pub async fn update_holding(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<UpdateHoldingRequest>,
) -> Result<Json<PortfolioResponse>, ApiError> {
    let asset = req.asset.trim().to_ascii_lowercase();
    if asset.is_empty() || asset.len() > MAX_ASSET_LEN {
        return Err(ApiError::bad_request("Invalid asset"));
    }
    upsert(&state, claims.sub, asset, req.amount).await
}

pub async fn update_bitcoin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<UpdateBitcoinHoldingRequest>,
) -> Result<Json<PortfolioResponse>, ApiError> {
    upsert(&state, claims.sub, "bitcoin".into(), req.amount).await
}

async fn upsert(
    state: &AppState,
    user_id: i64,
    asset: String,
    amount: f64,
) -> Result<Json<PortfolioResponse>, ApiError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ApiError::bad_request("Amount must be a non-negative number"));
    }
    with_db(state, move |db| db.upsert_portfolio_entry(user_id, &asset, amount)).await?;
    load(state, user_id).await.map(Json)
}

/// Entries valued at the current BTC price.
async fn load(state: &AppState, user_id: i64) -> Result<PortfolioResponse, ApiError> {
    let rows = with_db(state, move |db| db.get_portfolio_entries(user_id)).await?;
    let btc_price = state.prices.bitcoin_price().await.usd;

    let entries: Vec<_> = rows
        .into_iter()
        .map(|row| convert::portfolio_entry(row, btc_price))
        .collect();
    let total_value = entries.iter().map(|e| e.value).sum();

    Ok(PortfolioResponse {
        user_id,
        entries,
        total_value,
    })
}
