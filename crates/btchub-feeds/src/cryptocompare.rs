use std::collections::HashMap;
use std::time::Duration;

use btchub_types::models::{BitcoinMarketData, BitcoinPrice, ChartPoint, UsdValue};
use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::error::{FeedError, fetch_json};

pub const DEFAULT_BASE_URL: &str = "https://min-api.cryptocompare.com/data";

const SERVICE: &str = "cryptocompare";

const PRICE_TTL: Duration = Duration::from_secs(5 * 60);
const CHART_TTL: Duration = Duration::from_secs(60);
const PRICE_TIMEOUT: Duration = Duration::from_secs(5);
const CHART_TIMEOUT: Duration = Duration::from_secs(7);

pub const FALLBACK_PRICE: f64 = 41285.34;
pub const FALLBACK_CHANGE_24H: f64 = 2.14;
const FALLBACK_MARKET_CAP: f64 = 815_200_000_000.0;
const FALLBACK_VOLUME: f64 = 28_900_000_000.0;
const FALLBACK_SUPPLY: f64 = 19_400_000.0;
const FALLBACK_ATH: f64 = 69044.0;
const FALLBACK_HIGH: f64 = 42100.75;
const FALLBACK_LOW: f64 = 40950.25;

/// Not part of the upstream payload.
const KNOWN_ATH: f64 = 69000.0;

/// Upstream history request for one UI timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartRange {
    pub endpoint: &'static str,
    pub limit: u32,
    pub aggregate: u32,
}

impl ChartRange {
    pub fn for_timeframe(timeframe: &str) -> Self {
        let (endpoint, limit, aggregate) = match timeframe {
            "1m" => ("histominute", 60, 1),
            "5m" => ("histominute", 60, 5),
            "1h" | "1d" | "1D" => ("histohour", 24, 1),
            "1w" | "1W" => ("histoday", 7, 1),
            "1mo" | "1M" => ("histoday", 30, 1),
            "3M" => ("histoday", 90, 1),
            "1Y" => ("histoday", 365, 1),
            "ALL" => ("histoday", 2000, 1),
            _ => ("histohour", 24, 1),
        };
        Self {
            endpoint,
            limit,
            aggregate,
        }
    }
}

/// Point count and spacing of the synthetic series served when no history
/// is available for `timeframe`.
fn synthetic_shape(timeframe: &str) -> (usize, TimeDelta) {
    match timeframe {
        "1m" => (60, TimeDelta::minutes(1)),
        "5m" => (60, TimeDelta::minutes(5)),
        "1h" | "1d" | "1D" => (24, TimeDelta::hours(1)),
        "1w" | "1W" => (7, TimeDelta::days(1)),
        "1mo" | "1M" => (30, TimeDelta::days(1)),
        "3M" => (90, TimeDelta::days(1)),
        "1Y" => (52, TimeDelta::weeks(1)),
        "ALL" => (60, TimeDelta::days(30)),
        _ => (60, TimeDelta::minutes(1)),
    }
}

/// Gently rising noisy series ending just before `now`.
pub fn synthetic_chart(timeframe: &str, base_price: f64, now: DateTime<Utc>) -> Vec<ChartPoint> {
    const VOLATILITY: f64 = 0.005;
    const TREND: f64 = 0.01;

    let (points, step) = synthetic_shape(timeframe);
    let mut rng = rand::rng();

    (0..points)
        .map(|i| {
            let drift = (i as f64 / points as f64) * TREND;
            let noise = rng.random_range(-1.0..1.0) * VOLATILITY;
            ChartPoint {
                timestamp: now - step * (points - i) as i32,
                price: base_price * (1.0 + drift + noise).powi(i as i32),
            }
        })
        .collect()
}

pub fn fallback_price() -> BitcoinPrice {
    BitcoinPrice {
        usd: FALLBACK_PRICE,
        usd_24h_change: FALLBACK_CHANGE_24H,
        last_updated_at: unix_now(),
    }
}

pub fn fallback_market_data() -> BitcoinMarketData {
    BitcoinMarketData {
        current_price: UsdValue::new(FALLBACK_PRICE),
        market_cap: UsdValue::new(FALLBACK_MARKET_CAP),
        total_volume: UsdValue::new(FALLBACK_VOLUME),
        price_change_percentage_24h: FALLBACK_CHANGE_24H,
        circulating_supply: FALLBACK_SUPPLY,
        ath: UsdValue::new(FALLBACK_ATH),
        high_24h: UsdValue::new(FALLBACK_HIGH),
        low_24h: UsdValue::new(FALLBACK_LOW),
    }
}

fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

// -- Wire format --

#[derive(Deserialize)]
struct SpotPrice {
    #[serde(rename = "USD")]
    usd: f64,
}

#[derive(Deserialize)]
struct PriceMultiFull {
    #[serde(rename = "RAW", default)]
    raw: HashMap<String, HashMap<String, RawQuote>>,
}

impl PriceMultiFull {
    fn btc_usd(self) -> Option<RawQuote> {
        let mut raw = self.raw;
        raw.remove("BTC")?.remove("USD")
    }
}

#[derive(Deserialize)]
struct RawQuote {
    #[serde(rename = "PRICE")]
    price: f64,
    #[serde(rename = "MKTCAP", default)]
    market_cap: f64,
    #[serde(rename = "VOLUME24HOURTO", default)]
    volume_24h: f64,
    #[serde(rename = "CHANGEPCT24HOUR", default)]
    change_pct_24h: f64,
    #[serde(rename = "SUPPLY", default)]
    supply: f64,
    #[serde(rename = "HIGH24HOUR", default)]
    high_24h: f64,
    #[serde(rename = "LOW24HOUR", default)]
    low_24h: f64,
}

#[derive(Deserialize)]
struct History {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Data")]
    data: Option<HistoryData>,
}

#[derive(Deserialize)]
struct HistoryData {
    #[serde(rename = "Data", default)]
    points: Vec<HistoryPoint>,
}

#[derive(Deserialize)]
struct HistoryPoint {
    time: i64,
    close: f64,
}

/// CryptoCompare client with per-endpoint TTL caches.
///
/// Every public method is infallible: upstream failures degrade to the last
/// cached value, then to fixed fallback data.
pub struct PriceClient {
    http: reqwest::Client,
    base_url: String,
    price: TtlCache<(), BitcoinPrice>,
    market: TtlCache<(), BitcoinMarketData>,
    charts: TtlCache<String, Vec<ChartPoint>>,
}

impl PriceClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            price: TtlCache::new("btc_price", PRICE_TTL),
            market: TtlCache::new("btc_market", PRICE_TTL),
            charts: TtlCache::new("btc_chart", CHART_TTL),
        }
    }

    pub async fn bitcoin_price(&self) -> BitcoinPrice {
        match self.price.get_or_refresh((), || self.fetch_price()).await {
            Ok(price) => price,
            Err(e) => {
                warn!(error = %e, "bitcoin price unavailable, using fallback");
                fallback_price()
            }
        }
    }

    pub async fn bitcoin_market_data(&self) -> BitcoinMarketData {
        match self.market.get_or_refresh((), || self.fetch_market_data()).await {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "market data unavailable, using fallback");
                fallback_market_data()
            }
        }
    }

    pub async fn bitcoin_chart(&self, timeframe: &str) -> Vec<ChartPoint> {
        let key = timeframe.to_string();
        match self
            .charts
            .get_or_refresh(key.clone(), || self.fetch_chart(timeframe))
            .await
        {
            Ok(points) => points,
            Err(e) => {
                warn!(timeframe, error = %e, "chart data unavailable, generating synthetic series");
                let base = self
                    .market
                    .peek(&())
                    .map(|m| m.current_price.usd)
                    .unwrap_or(FALLBACK_PRICE);
                let points = synthetic_chart(timeframe, base, Utc::now());
                self.charts.insert(key, points.clone());
                points
            }
        }
    }

    async fn fetch_price(&self) -> Result<BitcoinPrice, FeedError> {
        let spot: SpotPrice = fetch_json(
            SERVICE,
            self.http
                .get(format!("{}/price", self.base_url))
                .query(&[("fsym", "BTC"), ("tsyms", "USD")])
                .timeout(PRICE_TIMEOUT),
        )
        .await?;

        // The 24h change is best-effort.
        let change = match self.fetch_quote().await {
            Ok(quote) => quote.change_pct_24h,
            Err(e) => {
                debug!(error = %e, "24h change unavailable");
                0.0
            }
        };

        Ok(BitcoinPrice {
            usd: spot.usd,
            usd_24h_change: change,
            last_updated_at: unix_now(),
        })
    }

    async fn fetch_market_data(&self) -> Result<BitcoinMarketData, FeedError> {
        let q = self.fetch_quote().await?;
        Ok(BitcoinMarketData {
            current_price: UsdValue::new(q.price),
            market_cap: UsdValue::new(q.market_cap),
            total_volume: UsdValue::new(q.volume_24h),
            price_change_percentage_24h: q.change_pct_24h,
            circulating_supply: q.supply,
            ath: UsdValue::new(KNOWN_ATH),
            high_24h: UsdValue::new(q.high_24h),
            low_24h: UsdValue::new(q.low_24h),
        })
    }

    async fn fetch_quote(&self) -> Result<RawQuote, FeedError> {
        let full: PriceMultiFull = fetch_json(
            SERVICE,
            self.http
                .get(format!("{}/pricemultifull", self.base_url))
                .query(&[("fsyms", "BTC"), ("tsyms", "USD")])
                .timeout(PRICE_TIMEOUT),
        )
        .await?;

        full.btc_usd()
            .ok_or_else(|| FeedError::format(SERVICE, "missing RAW.BTC.USD"))
    }

    async fn fetch_chart(&self, timeframe: &str) -> Result<Vec<ChartPoint>, FeedError> {
        let range = ChartRange::for_timeframe(timeframe);

        let mut req = self
            .http
            .get(format!("{}/v2/{}", self.base_url, range.endpoint))
            .query(&[("fsym", "BTC"), ("tsym", "USD")])
            .query(&[("limit", range.limit)])
            .timeout(CHART_TIMEOUT);
        if range.aggregate > 1 {
            req = req.query(&[("aggregate", range.aggregate)]);
        }

        let history: History = fetch_json(SERVICE, req).await?;
        if history.response != "Success" {
            return Err(FeedError::format(
                SERVICE,
                format!("history response {}", history.response),
            ));
        }

        let points = history
            .data
            .ok_or_else(|| FeedError::format(SERVICE, "missing history data"))?
            .points
            .into_iter()
            .filter_map(|p| {
                DateTime::from_timestamp(p.time, 0).map(|timestamp| ChartPoint {
                    timestamp,
                    price: p.close,
                })
            })
            .collect();
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{http_client, serve, unreachable_base_url};
    use axum::{Json, Router, extract::Query, routing::get};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quote_body() -> serde_json::Value {
        json!({
            "RAW": { "BTC": { "USD": {
                "PRICE": 105000.5,
                "MKTCAP": 2.08e12,
                "VOLUME24HOURTO": 3.1e10,
                "CHANGEPCT24HOUR": -1.25,
                "SUPPLY": 19850000.0,
                "HIGH24HOUR": 106000.0,
                "LOW24HOUR": 103500.0
            }}}
        })
    }

    fn counting_upstream(hits: Arc<AtomicUsize>) -> Router {
        let price_hits = hits.clone();
        let full_hits = hits.clone();
        let history_hits = hits;
        Router::new()
            .route(
                "/price",
                get(move || {
                    price_hits.fetch_add(1, Ordering::SeqCst);
                    async { Json(json!({ "USD": 105000.5 })) }
                }),
            )
            .route(
                "/pricemultifull",
                get(move || {
                    full_hits.fetch_add(1, Ordering::SeqCst);
                    async { Json(quote_body()) }
                }),
            )
            .route(
                "/v2/histohour",
                get(move |Query(q): Query<HashMap<String, String>>| {
                    history_hits.fetch_add(1, Ordering::SeqCst);
                    let limit: i64 = q.get("limit").and_then(|l| l.parse().ok()).unwrap_or(0);
                    async move {
                        let data: Vec<_> = (0..limit)
                            .map(|i| json!({ "time": 1_700_000_000 + i * 3600, "close": 100.0 + i as f64 }))
                            .collect();
                        Json(json!({ "Response": "Success", "Data": { "Data": data } }))
                    }
                }),
            )
    }

    #[test]
    fn timeframe_mapping() {
        let r = ChartRange::for_timeframe("5m");
        assert_eq!((r.endpoint, r.limit, r.aggregate), ("histominute", 60, 5));
        assert_eq!(ChartRange::for_timeframe("1D").endpoint, "histohour");
        assert_eq!(ChartRange::for_timeframe("1W").limit, 7);
        assert_eq!(ChartRange::for_timeframe("ALL").limit, 2000);
        assert_eq!(ChartRange::for_timeframe("bogus"), ChartRange::for_timeframe("1h"));
    }

    #[test]
    fn synthetic_series_shape() {
        let now = Utc::now();
        let year = synthetic_chart("1Y", 50_000.0, now);
        assert_eq!(year.len(), 52);
        assert_eq!(year[0].timestamp, now - TimeDelta::weeks(52));
        assert_eq!(year[51].timestamp, now - TimeDelta::weeks(1));
        assert_eq!(year[0].price, 50_000.0);

        assert_eq!(synthetic_chart("3M", 1.0, now).len(), 90);
        assert_eq!(synthetic_chart("whatever", 1.0, now).len(), 60);
    }

    #[tokio::test]
    async fn price_within_ttl_hits_upstream_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = serve(counting_upstream(hits.clone())).await;
        let client = PriceClient::with_base_url(http_client(), base);

        let first = client.bitcoin_price().await;
        let second = client.bitcoin_price().await;

        assert_eq!(first.usd, 105000.5);
        assert_eq!(first.usd_24h_change, -1.25);
        assert_eq!(first, second);
        // /price plus /pricemultifull for the change, once.
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn market_data_maps_quote() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = serve(counting_upstream(hits.clone())).await;
        let client = PriceClient::with_base_url(http_client(), base);

        let data = client.bitcoin_market_data().await;
        assert_eq!(data.current_price.usd, 105000.5);
        assert_eq!(data.market_cap.usd, 2.08e12);
        assert_eq!(data.ath.usd, KNOWN_ATH);
        assert_eq!(data.low_24h.usd, 103500.0);

        client.bitcoin_market_data().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_upstream_returns_fallback() {
        let client = PriceClient::with_base_url(http_client(), unreachable_base_url().await);

        assert_eq!(client.bitcoin_market_data().await, fallback_market_data());

        let price = client.bitcoin_price().await;
        assert_eq!(price.usd, FALLBACK_PRICE);
        assert_eq!(price.usd_24h_change, FALLBACK_CHANGE_24H);
    }

    #[tokio::test]
    async fn chart_is_cached_per_timeframe() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = serve(counting_upstream(hits.clone())).await;
        let client = PriceClient::with_base_url(http_client(), base);

        let points = client.bitcoin_chart("1d").await;
        assert_eq!(points.len(), 24);
        assert_eq!(points[0].price, 100.0);
        assert_eq!(points[0].timestamp.timestamp(), 1_700_000_000);

        client.bitcoin_chart("1d").await;
        // "1h" maps to the same range but is a separate cache entry.
        client.bitcoin_chart("1h").await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn chart_fallback_is_synthetic_and_cached() {
        let client = PriceClient::with_base_url(http_client(), unreachable_base_url().await);

        let first = client.bitcoin_chart("1w").await;
        assert_eq!(first.len(), 7);
        assert_eq!(first[0].price, FALLBACK_PRICE);

        let second = client.bitcoin_chart("1w").await;
        assert_eq!(first, second);
    }
}
