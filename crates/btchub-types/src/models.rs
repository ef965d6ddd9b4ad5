use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Market --

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsdValue {
    pub usd: f64,
}

impl UsdValue {
    pub fn new(usd: f64) -> Self {
        Self { usd }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitcoinPrice {
    pub usd: f64,
    pub usd_24h_change: f64,
    /// Unix seconds.
    pub last_updated_at: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitcoinMarketData {
    pub current_price: UsdValue,
    pub market_cap: UsdValue,
    pub total_volume: UsdValue,
    pub price_change_percentage_24h: f64,
    pub circulating_supply: f64,
    pub ath: UsdValue,
    pub high_24h: UsdValue,
    pub low_24h: UsdValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

// -- News --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub categories: Vec<String>,
    pub image_url: Option<String>,
}

// -- Social --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialPost {
    pub id: String,
    pub title: String,
    pub author: String,
    pub score: i64,
    pub num_comments: i64,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub flair: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetAuthor {
    pub name: String,
    pub username: String,
    pub profile_image_url: String,
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetMetrics {
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub quotes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub author: TweetAuthor,
    pub metrics: TweetMetrics,
    pub url: String,
}

// -- Macro --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorPoint {
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomicIndicator {
    pub id: String,
    pub name: String,
    pub country: String,
    pub value: Option<f64>,
    pub date: String,
    pub unit: String,
    /// Percent change against the previous observation, when there is one.
    pub change: Option<f64>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMetrics {
    pub usgdp: Option<EconomicIndicator>,
    pub inflation: Option<EconomicIndicator>,
    pub unemployment: Option<EconomicIndicator>,
    pub money_supply: Option<EconomicIndicator>,
}

/// Dashboard bundle of US and world indicators. Series with no data are
/// left out of the lists and are `null` in `key_metrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalEconomicData {
    pub last_updated: String,
    pub us_indicators: Vec<EconomicIndicator>,
    pub global_indicators: Vec<EconomicIndicator>,
    pub key_metrics: KeyMetrics,
}

// -- Notifications --

/// Ordering is significant: `High` sorts greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PriceAlert,
    News,
    Market,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}
