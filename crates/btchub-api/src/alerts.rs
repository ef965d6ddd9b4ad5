use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use btchub_types::api::{AlertKind, Claims, CreateAlertRequest, PriceAlertResponse};

use crate::convert;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::{AppState, with_db};

/// The caller's alerts, newest first. Untriggered alerts whose threshold the
/// current price has reached are marked triggered on the way out.
pub async fn list_alerts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<PriceAlertResponse>>, ApiError> {
    let price = state.prices.bitcoin_price().await.usd;
    let user_id = claims.sub;

    let rows = with_db(&state, move |db| {
        let rows = db.get_price_alerts(user_id)?;
        let mut fired = false;
        for row in rows.iter().filter(|r| !r.is_triggered) {
            let met = AlertKind::parse(&row.kind).is_some_and(|k| k.is_met(row.price, price));
            if met && db.mark_alert_triggered(row.id)? {
                info!(alert = row.id, price, "price alert triggered");
                fired = true;
            }
        }
        if fired {
            db.get_price_alerts(user_id)
        } else {
            Ok(rows)
        }
    })
    .await?;

    Ok(Json(rows.into_iter().map(convert::alert).collect()))
}

pub async fn create_alert(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<CreateAlertRequest>,
) -> Result<(StatusCode, Json<PriceAlertResponse>), ApiError> {
    if !req.price.is_finite() || req.price <= 0.0 {
        return Err(ApiError::bad_request("Price must be a positive number"));
    }
    let row = with_db(&state, move |db| {
        db.create_price_alert(claims.sub, req.kind.as_str(), req.price)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(convert::alert(row))))
}

pub async fn delete_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    let id: i64 = id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid alert ID"))?;
    if with_db(&state, move |db| db.delete_price_alert(id, claims.sub)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Alert not found".into()))
    }
}
