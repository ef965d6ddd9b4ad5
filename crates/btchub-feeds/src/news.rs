use std::time::Duration;

use btchub_types::models::NewsItem;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::cache::TtlCache;
use crate::error::{FeedError, fetch_json};

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";

const SERVICE: &str = "newsapi";
const TTL: Duration = Duration::from_secs(5 * 60);
const TIMEOUT: Duration = Duration::from_secs(10);
const PAGE_SIZE: u32 = 20;

/// Keyword to category tagging for live articles.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("Mining", &["mining", "miner", "hashrate", "difficulty"]),
    ("ETF", &["etf"]),
    ("Markets", &["price", "market", "rally", "inflow", "trading"]),
    ("Security", &["hack", "phishing", "scam", "exploit", "security"]),
    ("Wallets", &["wallet", "custody"]),
];

#[derive(Deserialize)]
struct Everything {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    source: ArticleSource,
    title: Option<String>,
    description: Option<String>,
    url: String,
    url_to_image: Option<String>,
    published_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

fn categorize(title: &str, description: &str) -> Vec<String> {
    let text = format!("{title} {description}").to_lowercase();
    let mut categories = vec!["News".to_string()];
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|k| text.contains(k)) {
            categories.push(category.to_string());
        }
    }
    categories
}

fn matches_category(item: &NewsItem, category: Option<&str>) -> bool {
    category.is_none_or(|c| item.categories.iter().any(|ic| ic.eq_ignore_ascii_case(c)))
}

/// Built-in headlines served when NewsAPI is unavailable.
pub fn sample_news(now: DateTime<Utc>) -> Vec<NewsItem> {
    let item = |id: &str,
                title: &str,
                description: &str,
                slug: &str,
                source: &str,
                age: TimeDelta,
                categories: &[&str],
                image: &str| NewsItem {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        url: format!("https://example.com/{slug}"),
        source: source.to_string(),
        published_at: now - age,
        categories: categories.iter().map(|c| c.to_string()).collect(),
        image_url: Some(format!("https://images.unsplash.com/{image}?auto=format&fit=crop&w=1400&q=80")),
    };

    vec![
        item(
            "1",
            "Bitcoin Miners Receive $35M in Transaction Fees Amid Price Surge",
            "Bitcoin miners have earned a significant amount in transaction fees as the price of Bitcoin continues to climb, reaching a new yearly high.",
            "bitcoin-miners-fees",
            "CoinDesk",
            TimeDelta::hours(4),
            &["News", "Mining"],
            "photo-1620321023374-d1a68fbc720d",
        ),
        item(
            "2",
            "Spot Bitcoin ETFs See $172 Million Net Inflows as Institutional Interest Grows",
            "Bitcoin ETFs continue to see significant inflows as institutional investors are increasingly allocating funds to Bitcoin exposure through regulated products.",
            "bitcoin-etf-inflows",
            "Bloomberg",
            TimeDelta::hours(6),
            &["ETF", "Markets"],
            "photo-1590283603385-17ffb3a7f29f",
        ),
        item(
            "3",
            "Security Experts Warn of New Phishing Attacks Targeting Bitcoin Wallet Users",
            "A sophisticated phishing campaign is targeting users of popular Bitcoin wallets. Learn how to protect your assets from these threats.",
            "bitcoin-wallet-phishing",
            "CryptoNews",
            TimeDelta::hours(24),
            &["Security", "Wallets"],
            "photo-1624996379697-f01d168b1a52",
        ),
        item(
            "4",
            "Bitcoin Mining Difficulty Reaches All-Time High After Latest Adjustment",
            "The Bitcoin network's mining difficulty has increased by 5.8% to a new record high, reflecting the growing competition among miners.",
            "bitcoin-mining-difficulty",
            "Bitcoin Magazine",
            TimeDelta::days(2),
            &["Mining", "News"],
            "photo-1621761191319-c6fb62004040",
        ),
        item(
            "5",
            "New Bitcoin Reserve Requirement Regulations Proposed by Financial Authorities",
            "Financial regulators are proposing new guidelines for financial institutions holding Bitcoin, which could impact market liquidity.",
            "bitcoin-regulations",
            "Financial Times",
            TimeDelta::days(3),
            &["Markets", "News"],
            "photo-1621504450181-5d356f61d307",
        ),
    ]
}

pub struct NewsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cache: TtlCache<String, Vec<NewsItem>>,
}

impl NewsClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
            cache: TtlCache::new("news", TTL),
        }
    }

    /// Latest Bitcoin headlines, optionally restricted to one category.
    pub async fn latest_news(&self, category: Option<&str>) -> Vec<NewsItem> {
        let key = category.unwrap_or_default().to_ascii_lowercase();
        let items = match self
            .cache
            .get_or_refresh(key, || self.fetch(category))
            .await
        {
            Ok(items) => items,
            Err(e) => {
                if self.api_key.is_some() {
                    warn!(error = %e, "news unavailable, serving samples");
                }
                sample_news(Utc::now())
            }
        };

        items
            .into_iter()
            .filter(|item| matches_category(item, category))
            .collect()
    }

    async fn fetch(&self, category: Option<&str>) -> Result<Vec<NewsItem>, FeedError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(FeedError::NotConfigured("NEWS_API_KEY"))?;

        let query = match category {
            Some(c) => format!("bitcoin {c}"),
            None => "bitcoin".to_string(),
        };

        let body: Everything = fetch_json(
            SERVICE,
            self.http
                .get(format!("{}/everything", self.base_url))
                .query(&[
                    ("q", query.as_str()),
                    ("sortBy", "publishedAt"),
                    ("language", "en"),
                ])
                .query(&[("pageSize", PAGE_SIZE)])
                .header("X-Api-Key", api_key)
                .timeout(TIMEOUT),
        )
        .await?;

        let items = body
            .articles
            .into_iter()
            .filter_map(|a| {
                let title = a.title.filter(|t| !t.is_empty() && t != "[Removed]")?;
                let description = a.description.unwrap_or_default();
                let mut categories = categorize(&title, &description);
                if let Some(c) = category {
                    if !categories.iter().any(|x| x.eq_ignore_ascii_case(c)) {
                        categories.push(c.to_string());
                    }
                }
                Some(NewsItem {
                    id: a.url.clone(),
                    title,
                    description,
                    url: a.url,
                    source: a.source.name.unwrap_or_else(|| "Unknown".to_string()),
                    published_at: a.published_at,
                    categories,
                    image_url: a.url_to_image,
                })
            })
            .collect();
        Ok(items)
    }
}
