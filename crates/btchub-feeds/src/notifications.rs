use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::convert::Infallible;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use btchub_types::models::{BitcoinMarketData, NewsItem, Notification, NotificationKind, Priority};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::cryptocompare::PriceClient;
use crate::llm::ChatClient;
use crate::news::NewsClient;

/// Psychological price levels that raise an alert when crossed.
pub const PRICE_LEVELS: [f64; 5] = [100_000.0, 105_000.0, 110_000.0, 115_000.0, 120_000.0];

const TTL: Duration = Duration::from_secs(5 * 60);
const MAX_NOTIFICATIONS: usize = 10;
const NEWS_COUNT: usize = 3;
const HEADLINE_CHARS: usize = 120;

const WRITER_PROMPT: &str = "You write short push notifications for a Bitcoin education dashboard. \
Respond with JSON: {\"title\": string (max 60 chars), \"message\": string (max 160 chars), \
\"priority\": \"low\"|\"medium\"|\"high\"}.";

#[derive(Deserialize)]
struct Drafted {
    title: String,
    message: String,
    priority: Priority,
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn stable_id(prefix: &str, key: &str) -> String {
    let mut h = DefaultHasher::new();
    key.hash(&mut h);
    format!("{prefix}_{:016x}", h.finish())
}

/// High priority first, then newest first; at most ten.
pub fn sort_and_limit(mut list: Vec<Notification>) -> Vec<Notification> {
    list.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });
    list.truncate(MAX_NOTIFICATIONS);
    list
}

/// One alert per level crossed between `previous` and `current`.
pub fn price_crossings(previous: f64, current: f64, now: DateTime<Utc>) -> Vec<Notification> {
    PRICE_LEVELS
        .iter()
        .filter_map(|&level| {
            let direction = if previous < level && current >= level {
                "above"
            } else if previous > level && current <= level {
                "below"
            } else {
                return None;
            };

            let change = ((current - level) / level * 10_000.0).round() / 100.0;
            let verb = if direction == "above" {
                "crossed above"
            } else {
                "dropped below"
            };

            Some(Notification {
                id: format!("price_alert_{}_{direction}_{}", level as u64, now.timestamp()),
                kind: NotificationKind::PriceAlert,
                title: "Bitcoin Price Alert".into(),
                message: format!(
                    "Bitcoin {verb} ${} ({change:.2}%)",
                    group_thousands(level as u64)
                ),
                timestamp: now,
                read: false,
                priority: if change.abs() > 5.0 {
                    Priority::High
                } else {
                    Priority::Medium
                },
                data: Some(json!({
                    "alertPrice": level,
                    "currentPrice": current,
                    "type": direction,
                    "priceChange": change,
                })),
            })
        })
        .collect()
}

fn fallback_news(item: &NewsItem, index: usize, now: DateTime<Utc>) -> Notification {
    let mut message: String = item.title.chars().take(HEADLINE_CHARS).collect();
    if item.title.chars().count() > HEADLINE_CHARS {
        message.push_str("...");
    }
    Notification {
        id: stable_id("news", &item.url),
        kind: NotificationKind::News,
        title: "Bitcoin News Update".into(),
        message,
        timestamp: news_timestamp(index, now),
        read: false,
        priority: Priority::Medium,
        data: Some(json!({ "source": "direct_news", "url": item.url })),
    }
}

/// Headlines are staggered fifteen minutes apart, newest first.
fn news_timestamp(index: usize, now: DateTime<Utc>) -> DateTime<Utc> {
    now - TimeDelta::minutes(15 * index as i64)
}

fn fallback_insight(market: &BitcoinMarketData, now: DateTime<Utc>) -> Notification {
    let change = market.price_change_percentage_24h;
    let (mood, priority) = match change.abs() {
        c if c >= 5.0 && change > 0.0 => ("surging", Priority::High),
        c if c >= 5.0 => ("sliding sharply", Priority::High),
        c if c >= 2.0 && change > 0.0 => ("climbing", Priority::Medium),
        c if c >= 2.0 => ("falling", Priority::Medium),
        _ => ("trading sideways", Priority::Low),
    };

    Notification {
        id: insight_id(now),
        kind: NotificationKind::Market,
        title: "Market Insight".into(),
        message: format!(
            "Bitcoin is {mood} at ${} ({change:+.2}% over 24h).",
            group_thousands(market.current_price.usd.round() as u64)
        ),
        timestamp: now,
        read: false,
        priority,
        data: Some(json!({ "source": "fallback", "change24h": change })),
    }
}

/// One insight per hour keeps the id stable across cache refreshes.
fn insight_id(now: DateTime<Utc>) -> String {
    format!("market_{}", now.format("%Y%m%d%H"))
}

/// Aggregates news, price-level and market notifications.
///
/// Removal is tracked by id in memory and survives cache refreshes, but
/// not a restart.
pub struct NotificationService {
    prices: Arc<PriceClient>,
    news: Arc<NewsClient>,
    writer: Option<ChatClient>,
    cache: TtlCache<(), Vec<Notification>>,
    removed: Mutex<HashSet<String>>,
    last_price: Mutex<Option<f64>>,
}

impl NotificationService {
    pub fn new(prices: Arc<PriceClient>, news: Arc<NewsClient>, writer: Option<ChatClient>) -> Self {
        Self {
            prices,
            news,
            writer,
            cache: TtlCache::new("notifications", TTL),
            removed: Mutex::new(HashSet::new()),
            last_price: Mutex::new(None),
        }
    }

    pub async fn all_notifications(&self) -> Vec<Notification> {
        match self
            .cache
            .get_or_refresh((), || async { Ok::<_, Infallible>(self.generate_at(Utc::now()).await) })
            .await
        {
            Ok(list) => list,
            Err(never) => match never {},
        }
    }

    pub async fn filtered_notifications(&self) -> Vec<Notification> {
        let all = self.all_notifications().await;
        let removed = self.removed.lock().unwrap_or_else(PoisonError::into_inner);
        all.into_iter().filter(|n| !removed.contains(&n.id)).collect()
    }

    pub fn remove(&self, id: &str) {
        self.removed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string());
        self.cache.modify(&(), |list| list.retain(|n| n.id != id));
    }

    pub fn clear_all(&self) {
        let mut removed = self.removed.lock().unwrap_or_else(PoisonError::into_inner);
        self.cache.modify(&(), |list| {
            removed.extend(list.drain(..).map(|n| n.id));
        });
    }

    async fn generate_at(&self, now: DateTime<Utc>) -> Vec<Notification> {
        let mut list = Vec::new();

        let headlines = self.news.latest_news(None).await;
        for (index, item) in headlines.iter().take(NEWS_COUNT).enumerate() {
            list.push(self.news_notification(item, index, now).await);
        }

        let market = self.prices.bitcoin_market_data().await;
        list.push(self.market_insight(&market, now).await);

        let current = market.current_price.usd;
        let previous = self
            .last_price
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(current);
        if let Some(previous) = previous {
            list.extend(price_crossings(previous, current, now));
        }

        debug!(count = list.len(), "notifications generated");
        sort_and_limit(list)
    }

    async fn news_notification(&self, item: &NewsItem, index: usize, now: DateTime<Utc>) -> Notification {
        let Some(writer) = &self.writer else {
            return fallback_news(item, index, now);
        };

        let prompt = format!(
            "Turn this Bitcoin headline into a notification.\nHeadline: {}\nSummary: {}",
            item.title, item.description
        );
        match writer.complete_json::<Drafted>(WRITER_PROMPT, &prompt, 0.3).await {
            Ok(d) => Notification {
                id: stable_id("news", &item.url),
                kind: NotificationKind::News,
                title: d.title,
                message: d.message,
                timestamp: news_timestamp(index, now),
                read: false,
                priority: d.priority,
                data: Some(json!({ "source": item.source, "url": item.url })),
            },
            Err(e) => {
                warn!(error = %e, "news notification drafting failed");
                fallback_news(item, index, now)
            }
        }
    }

    async fn market_insight(&self, market: &BitcoinMarketData, now: DateTime<Utc>) -> Notification {
        let Some(writer) = &self.writer else {
            return fallback_insight(market, now);
        };

        let prompt = format!(
            "Write one market insight for Bitcoin holders.\nPrice: ${:.0}\n24h change: {:.2}%\n\
             24h high: ${:.0}\n24h low: ${:.0}\nVolume: ${:.0}",
            market.current_price.usd,
            market.price_change_percentage_24h,
            market.high_24h.usd,
            market.low_24h.usd,
            market.total_volume.usd,
        );
        match writer.complete_json::<Drafted>(WRITER_PROMPT, &prompt, 0.5).await {
            Ok(d) => Notification {
                id: insight_id(now),
                kind: NotificationKind::Market,
                title: d.title,
                message: d.message,
                timestamp: now,
                read: false,
                priority: d.priority,
                data: Some(json!({ "source": "ai" })),
            },
            Err(e) => {
                warn!(error = %e, "market insight drafting failed");
                fallback_insight(market, now)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cryptocompare::FALLBACK_PRICE;
    use chrono::TimeZone;
    use crate::test_support::{http_client, unreachable_base_url};

    fn note(id: &str, priority: Priority, minutes_ago: i64) -> Notification {
        Notification {
            id: id.into(),
            kind: NotificationKind::System,
            title: id.into(),
            message: String::new(),
            timestamp: Utc::now() - TimeDelta::minutes(minutes_ago),
            read: false,
            priority,
            data: None,
        }
    }

    async fn offline_service() -> NotificationService {
        let prices = PriceClient::with_base_url(http_client(), unreachable_base_url().await);
        let news = NewsClient::new(http_client(), None);
        NotificationService::new(Arc::new(prices), Arc::new(news), None)
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(105_000), "105,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn ordering_priority_then_newest() {
        let sorted = sort_and_limit(vec![
            note("old-medium", Priority::Medium, 30),
            note("low", Priority::Low, 0),
            note("high", Priority::High, 60),
            note("new-medium", Priority::Medium, 5),
        ]);
        let ids: Vec<_> = sorted.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "new-medium", "old-medium", "low"]);
    }

    #[test]
    fn keeps_at_most_ten() {
        let many = (0..14).map(|i| note(&format!("n{i}"), Priority::Low, i)).collect();
        let sorted = sort_and_limit(many);
        assert_eq!(sorted.len(), 10);
        assert_eq!(sorted[0].id, "n0");
    }

    #[test]
    fn crossings_in_both_directions() {
        let now = Utc::now();
        let up = price_crossings(99_000.0, 106_000.0, now);
        assert_eq!(up.len(), 2);
        assert_eq!(up[0].message, "Bitcoin crossed above $100,000 (6.00%)");
        assert_eq!(up[0].priority, Priority::High);
        assert_eq!(up[1].message, "Bitcoin crossed above $105,000 (0.95%)");
        assert_eq!(up[1].priority, Priority::Medium);

        let down = price_crossings(111_000.0, 104_000.0, now);
        let messages: Vec<_> = down.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Bitcoin dropped below $105,000 (-0.95%)",
                "Bitcoin dropped below $110,000 (-5.45%)",
            ]
        );
        assert_eq!(down[1].priority, Priority::High);

        assert!(price_crossings(101_000.0, 104_000.0, now).is_empty());
    }

    #[test]
    fn long_headlines_are_truncated() {
        let now = Utc::now();
        let mut item = crate::news::sample_news(now).remove(0);
        item.title = "x".repeat(150);
        let n = fallback_news(&item, 2, now);
        assert_eq!(n.message.len(), 123);
        assert!(n.message.ends_with("..."));
        assert_eq!(n.timestamp, now - TimeDelta::minutes(30));
    }

    #[tokio::test]
    async fn offline_generation_uses_fallbacks() {
        let svc = offline_service().await;
        let list = svc.all_notifications().await;

        assert_eq!(list.len(), 4);
        assert_eq!(list.iter().filter(|n| n.kind == NotificationKind::News).count(), 3);
        let insight = list.iter().find(|n| n.kind == NotificationKind::Market).unwrap();
        assert_eq!(insight.priority, Priority::Medium);
        assert!(insight.message.contains(&group_thousands(FALLBACK_PRICE.round() as u64)));
    }

    #[tokio::test]
    async fn removal_and_clear_all() {
        let svc = offline_service().await;
        // Fixed clock so rebuilt notifications get the same ids.
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 59, 30).unwrap();
        svc.cache.insert((), svc.generate_at(at).await);

        let before = svc.filtered_notifications().await;
        assert_eq!(before.len(), 4);
        let victim = before[0].id.clone();

        svc.remove(&victim);
        let after = svc.filtered_notifications().await;
        assert_eq!(after.len(), before.len() - 1);
        assert!(after.iter().all(|n| n.id != victim));
        assert!(svc.all_notifications().await.iter().all(|n| n.id != victim));

        svc.clear_all();
        assert!(svc.filtered_notifications().await.is_empty());

        // A rebuild after expiry must not resurrect removed ids.
        let rebuilt = svc.generate_at(at).await;
        let mut ids: Vec<_> = rebuilt.iter().map(|n| n.id.clone()).collect();
        let mut expected: Vec<_> = before.iter().map(|n| n.id.clone()).collect();
        ids.sort();
        expected.sort();
        assert_eq!(ids, expected);
        assert!(ids.contains(&"market_2026030112".to_string()));

        svc.cache.insert((), rebuilt);
        assert!(svc.filtered_notifications().await.is_empty());
    }
}
