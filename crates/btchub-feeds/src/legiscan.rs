use std::collections::HashMap;
use std::time::Duration;

use btchub_types::legislation::{BillCategory, LegislationBill};
use btchub_types::models::Priority;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::error::{FeedError, fetch_json};

pub const DEFAULT_BASE_URL: &str = "https://api.legiscan.com";

const SERVICE: &str = "legiscan";
const TTL: Duration = Duration::from_secs(6 * 60 * 60);
const TIMEOUT: Duration = Duration::from_secs(10);

const SEARCH_TERMS: &[&str] = &[
    "cryptocurrency",
    "bitcoin",
    "digital asset",
    "stablecoin",
    "blockchain",
];
const MAX_BILLS: usize = 15;
const SEARCH_PAUSE: Duration = Duration::from_millis(200);
const DETAIL_PAUSE: Duration = Duration::from_millis(150);

const HIGH_PRIORITY_TERMS: &[&str] = &[
    "bitcoin",
    "cryptocurrency",
    "digital asset",
    "stablecoin",
    "cftc",
    "sec",
    "market structure",
];
const MEDIUM_PRIORITY_TERMS: &[&str] = &["blockchain", "crypto", "virtual currency", "token"];

// -- Heuristics --

pub fn status_label(status: i64) -> String {
    match status {
        1 => "Introduced".into(),
        2 => "Engrossed".into(),
        3 => "Enrolled".into(),
        4 => "Passed".into(),
        5 => "Vetoed".into(),
        6 => "Failed".into(),
        other => format!("Status {other}"),
    }
}

pub fn categorize(title: &str, description: &str) -> BillCategory {
    let text = format!("{title} {description}").to_lowercase();
    let has = |terms: &[&str]| terms.iter().any(|t| text.contains(t));

    if has(&["stablecoin", "stable coin"]) {
        BillCategory::Stablecoin
    } else if has(&["tax", "irs", "reporting"]) {
        BillCategory::Taxation
    } else if has(&["enforcement", "compliance", "penalty"]) {
        BillCategory::Enforcement
    } else if has(&["innovation", "sandbox", "reserve", "etf"]) {
        BillCategory::Innovation
    } else {
        BillCategory::Regulation
    }
}

/// Rough odds of advancing, from the bill status and its action history.
pub fn passage_chance(status: i64, actions: &[&str]) -> u8 {
    match status {
        4 => return 100,
        5 | 6 => return 0,
        _ => {}
    }

    let history = actions
        .iter()
        .map(|a| a.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut chance: i32 = 30;
    if history.contains("passed house") || history.contains("passed senate") {
        chance += 25;
    }
    if history.contains("committee") && history.contains("reported") {
        chance += 15;
    }
    if history.contains("bipartisan") {
        chance += 10;
    }
    if history.contains("referred to") {
        chance -= 5;
    }
    chance.clamp(5, 95) as u8
}

pub fn priority(title: &str, description: &str) -> Priority {
    let text = format!("{title} {description}").to_lowercase();
    if HIGH_PRIORITY_TERMS.iter().any(|t| text.contains(t)) {
        Priority::High
    } else if MEDIUM_PRIORITY_TERMS.iter().any(|t| text.contains(t)) {
        Priority::Medium
    } else {
        Priority::Low
    }
}

pub fn next_steps(status: i64, last_action: &str) -> &'static str {
    match status {
        4 => return "Signed into law; implementation underway",
        5 => return "Veto override vote possible",
        6 => return "Bill failed; may be reintroduced next session",
        _ => {}
    }

    let action = last_action.to_lowercase();
    if action.contains("introduced") {
        "Awaiting committee assignment"
    } else if action.contains("referred to committee") {
        "Committee review and hearings expected"
    } else if action.contains("reported") && action.contains("committee") {
        "Floor vote scheduling pending"
    } else if action.contains("passed house") {
        "Senate consideration pending"
    } else if action.contains("passed senate") {
        "Conference committee or House vote pending"
    } else {
        "Awaiting next legislative action"
    }
}

// -- Wire format --

#[derive(Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    searchresult: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct SearchHit {
    bill_id: i64,
    #[serde(default)]
    last_action_date: String,
    #[serde(default)]
    last_action: String,
    #[serde(default)]
    title: String,
}

#[derive(Deserialize)]
struct BillResponse {
    status: String,
    bill: Option<BillDetail>,
}

#[derive(Deserialize)]
struct BillDetail {
    bill_number: String,
    title: String,
    #[serde(default)]
    description: String,
    status: i64,
    #[serde(default)]
    history: Vec<HistoryEntry>,
    #[serde(default)]
    sponsors: Vec<Sponsor>,
}

#[derive(Deserialize)]
struct HistoryEntry {
    action: String,
}

#[derive(Deserialize)]
struct Sponsor {
    name: String,
    #[serde(default)]
    party: String,
}

fn to_bill(hit: &SearchHit, detail: BillDetail) -> LegislationBill {
    let sponsor = if detail.sponsors.is_empty() {
        "Unknown".to_string()
    } else {
        detail
            .sponsors
            .iter()
            .map(|s| format!("{} ({})", s.name, s.party))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let last_action = detail
        .history
        .last()
        .map(|h| h.action.clone())
        .unwrap_or_else(|| hit.last_action.clone());
    let actions: Vec<&str> = detail.history.iter().map(|h| h.action.as_str()).collect();
    let steps = next_steps(detail.status, &last_action);
    let description = if detail.description.is_empty() {
        hit.title.clone()
    } else {
        detail.description.clone()
    };

    LegislationBill {
        id: format!("legiscan_{}", hit.bill_id),
        bill_name: detail.title.chars().take(100).collect(),
        bill_number: detail.bill_number.clone(),
        current_status: status_label(detail.status),
        next_steps: steps.to_string(),
        passage_chance: passage_chance(detail.status, &actions),
        whats_next: format!("Last action: {last_action}. {steps}"),
        last_action: format!("{}: {last_action}", hit.last_action_date),
        sponsor,
        category: categorize(&detail.title, &detail.description),
        priority: priority(&detail.title, &detail.description),
        description,
    }
}

/// Federal crypto bills tracked on LegiScan.
///
/// Without an API key every call yields an empty list.
pub struct LegiScanClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    search_pause: Duration,
    detail_pause: Duration,
    cache: TtlCache<(), Vec<LegislationBill>>,
}

impl LegiScanClient {
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
            search_pause: SEARCH_PAUSE,
            detail_pause: DETAIL_PAUSE,
            cache: TtlCache::new("legiscan", TTL),
        }
    }

    pub fn with_pauses(mut self, search: Duration, detail: Duration) -> Self {
        self.search_pause = search;
        self.detail_pause = detail;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub async fn crypto_bills(&self) -> Vec<LegislationBill> {
        let Some(key) = self.api_key.as_deref() else {
            debug!("legiscan not configured");
            return Vec::new();
        };

        self.cache
            .get_or_refresh((), || self.crawl(key))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "legiscan crawl failed");
                Vec::new()
            })
    }

    async fn crawl(&self, key: &str) -> Result<Vec<LegislationBill>, FeedError> {
        let mut hits: HashMap<i64, SearchHit> = HashMap::new();
        let mut failures = 0;

        for (i, term) in SEARCH_TERMS.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.search_pause).await;
            }
            match self.search(key, term).await {
                Ok(found) => {
                    for hit in found {
                        hits.insert(hit.bill_id, hit);
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!(term, error = %e, "legiscan search failed");
                }
            }
        }

        if failures == SEARCH_TERMS.len() {
            return Err(FeedError::format(SERVICE, "every search failed"));
        }
        info!(count = hits.len(), "unique crypto bills found");

        let mut recent: Vec<SearchHit> = hits.into_values().collect();
        // ISO dates sort lexically.
        recent.sort_by(|a, b| b.last_action_date.cmp(&a.last_action_date));
        recent.truncate(MAX_BILLS);

        let mut bills = Vec::with_capacity(recent.len());
        for (i, hit) in recent.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.detail_pause).await;
            }
            match self.bill(key, hit.bill_id).await {
                Ok(detail) => bills.push(to_bill(hit, detail)),
                Err(e) => warn!(bill_id = hit.bill_id, error = %e, "bill detail failed"),
            }
        }

        info!(count = bills.len(), "processed legiscan bills");
        Ok(bills)
    }

    async fn search(&self, key: &str, term: &str) -> Result<Vec<SearchHit>, FeedError> {
        let resp: SearchResponse = fetch_json(
            SERVICE,
            self.http
                .get(format!("{}/", self.base_url))
                .query(&[
                    ("key", key),
                    ("op", "search"),
                    ("query", term),
                    ("state", "US"),
                    ("year", "2"),
                ])
                .timeout(TIMEOUT),
        )
        .await?;

        if resp.status != "OK" {
            return Err(FeedError::format(SERVICE, format!("search status {}", resp.status)));
        }

        Ok(resp
            .searchresult
            .into_iter()
            .filter(|(k, _)| k != "summary")
            .filter_map(|(_, v)| serde_json::from_value::<SearchHit>(v).ok())
            .collect())
    }

    async fn bill(&self, key: &str, bill_id: i64) -> Result<BillDetail, FeedError> {
        let resp: BillResponse = fetch_json(
            SERVICE,
            self.http
                .get(format!("{}/", self.base_url))
                .query(&[("key", key), ("op", "getBill")])
                .query(&[("id", bill_id)])
                .timeout(TIMEOUT),
        )
        .await?;

        match resp.bill {
            Some(bill) if resp.status == "OK" => Ok(bill),
            _ => Err(FeedError::format(SERVICE, format!("getBill status {}", resp.status))),
        }
    }
}
