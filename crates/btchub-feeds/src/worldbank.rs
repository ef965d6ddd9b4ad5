use std::time::Duration;

use btchub_types::models::{EconomicIndicator, GlobalEconomicData, IndicatorPoint, KeyMetrics};
use chrono::{SecondsFormat, Utc};
use futures_util::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::error::{FeedError, fetch_json};

pub const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";

const SERVICE: &str = "worldbank";
const TTL: Duration = Duration::from_secs(24 * 60 * 60);
const TIMEOUT: Duration = Duration::from_secs(10);
/// Most recent yearly values requested per series.
const YEARS: u32 = 20;

/// `(country, indicator, name, description)` for the dashboard bundle.
type Series = (&'static str, &'static str, &'static str, &'static str);

const US_SERIES: [Series; 7] = [
    ("USA", "NY.GDP.MKTP.CD", "US GDP", "United States Gross Domestic Product (current US$)"),
    ("USA", "NY.GDP.MKTP.KD.ZG", "US GDP Growth", "United States GDP growth rate (annual %)"),
    ("USA", "FP.CPI.TOTL.ZG", "US Inflation", "United States consumer price inflation (annual %)"),
    ("USA", "SL.UEM.TOTL.ZS", "US Unemployment", "United States unemployment rate (% of labor force)"),
    ("USA", "FR.INR.RINR", "US Interest Rate", "United States real interest rate (%)"),
    ("USA", "FM.LBL.BMNY.GD.ZS", "US Money Supply", "United States broad money (% of GDP)"),
    ("USA", "GC.DOD.TOTL.GD.ZS", "US Government Debt", "United States central government debt (% of GDP)"),
];

const GLOBAL_SERIES: [Series; 3] = [
    ("WLD", "NY.GDP.MKTP.CD", "Global GDP", "World Gross Domestic Product (current US$)"),
    ("WLD", "FP.CPI.TOTL.ZG", "Global Inflation", "World consumer price inflation (annual %)"),
    ("WLD", "NE.TRD.GNFS.ZS", "Global Trade", "World trade as percentage of GDP"),
];

#[derive(Debug, Clone, Deserialize)]
struct Observation {
    indicator: Labeled,
    country: Named,
    date: String,
    value: Option<f64>,
    #[serde(default)]
    unit: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Labeled {
    id: String,
    value: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Named {
    value: String,
}

/// Country and indicator codes are alphanumeric with dots or underscores,
/// e.g. `USA` and `FP.CPI.TOTL.ZG`.
pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= 32
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
}

fn unit_for(indicator: &str, reported: &str) -> String {
    if indicator.contains("NY.GDP.MKTP.CD") {
        "USD".into()
    } else if indicator.contains(".ZG") || indicator.contains(".ZS") || indicator.contains("FR.INR") {
        "%".into()
    } else {
        reported.into()
    }
}

fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

fn year(date: &str) -> i32 {
    date.parse().unwrap_or(0)
}

pub struct WorldBankClient {
    http: reqwest::Client,
    base_url: String,
    cache: TtlCache<(String, String), Vec<Observation>>,
}

impl WorldBankClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            cache: TtlCache::new("worldbank", TTL),
        }
    }

    /// Latest observation with its change against the prior year, in percent.
    pub async fn indicator(&self, country: &str, indicator: &str) -> Option<EconomicIndicator> {
        let mut series = self.observations(country, indicator).await;
        series.sort_by_key(|o| std::cmp::Reverse(year(&o.date)));

        let mut iter = series.into_iter();
        let latest = iter.next()?;
        let value = latest.value?;
        let change = iter.next().and_then(|prev| prev.value).map(|p| percent_change(value, p));

        Some(EconomicIndicator {
            unit: unit_for(&latest.indicator.id, &latest.unit),
            id: latest.indicator.id,
            name: latest.indicator.value,
            country: latest.country.value,
            value: Some(value),
            date: latest.date,
            change,
            description: String::new(),
        })
    }

    /// US and world indicators fetched concurrently, relabeled for display.
    pub async fn economic_data(&self) -> GlobalEconomicData {
        let (mut us, global) = futures_util::join!(self.labeled(&US_SERIES), self.labeled(&GLOBAL_SERIES));

        // Indices into US_SERIES.
        let key_metrics = KeyMetrics {
            usgdp: us[0].clone(),
            inflation: us[2].clone(),
            unemployment: us[3].clone(),
            money_supply: us[5].take(),
        };
        let us_indicators: Vec<_> = us.into_iter().flatten().collect();
        let global_indicators: Vec<_> = global.into_iter().flatten().collect();
        debug!(
            us = us_indicators.len(),
            global = global_indicators.len(),
            "world bank economic data"
        );

        GlobalEconomicData {
            last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            us_indicators,
            global_indicators,
            key_metrics,
        }
    }

    async fn labeled(&self, series: &[Series]) -> Vec<Option<EconomicIndicator>> {
        join_all(series.iter().map(|&(country, code, name, description)| async move {
            let mut ind = self.indicator(country, code).await?;
            ind.name = name.into();
            ind.description = description.into();
            Some(ind)
        }))
        .await
    }

    /// Yearly values, oldest first.
    pub async fn timeseries(&self, country: &str, indicator: &str) -> Vec<IndicatorPoint> {
        let mut points: Vec<IndicatorPoint> = self
            .observations(country, indicator)
            .await
            .into_iter()
            .filter_map(|o| {
                o.value.map(|value| IndicatorPoint {
                    date: o.date,
                    value,
                })
            })
            .collect();
        points.sort_by_key(|p| year(&p.date));
        points
    }

    async fn observations(&self, country: &str, indicator: &str) -> Vec<Observation> {
        let key = (country.to_ascii_uppercase(), indicator.to_ascii_uppercase());
        self.cache
            .get_or_refresh(key, || self.fetch(country, indicator))
            .await
            .unwrap_or_else(|e| {
                warn!(country, indicator, error = %e, "world bank data unavailable");
                Vec::new()
            })
    }

    async fn fetch(&self, country: &str, indicator: &str) -> Result<Vec<Observation>, FeedError> {
        // Responses are `[paging, observations]`, or `[{"message": ...}]` on bad codes.
        let body: Vec<Value> = fetch_json(
            SERVICE,
            self.http
                .get(format!("{}/country/{country}/indicator/{indicator}", self.base_url))
                .query(&[("format", "json")])
                .query(&[("mrv", YEARS)])
                .timeout(TIMEOUT),
        )
        .await?;

        let observations = match body.into_iter().nth(1) {
            Some(Value::Array(rows)) => rows,
            Some(Value::Null) | None => {
                return Err(FeedError::format(SERVICE, "no observations"));
            }
            Some(other) => {
                return Err(FeedError::format(SERVICE, format!("unexpected payload {other}")));
            }
        };

        let parsed: Vec<Observation> = observations
            .into_iter()
            .filter_map(|row| serde_json::from_value::<Observation>(row).ok())
            .filter(|o| o.value.is_some())
            .collect();
        debug!(country, indicator, count = parsed.len(), "world bank observations");
        Ok(parsed)
    }
}
