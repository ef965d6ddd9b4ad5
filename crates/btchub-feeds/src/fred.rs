//! US liquidity tracker backed by FRED series observations.
//!
//! Each series is reduced to its latest value and the observation closest to
//! one year earlier. Dollar series are normalized to billions.

use std::convert::Infallible;
use std::time::Duration;

use btchub_types::liquidity::{
    DerivedMetric, Frequency, LiquidityCategory, LiquidityData, LiquidityIndicator, LiquiditySignal,
    LiquiditySummary, RawUnit,
};
use chrono::{NaiveDate, SecondsFormat, Utc};
use futures_util::future::join_all;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::error::{FeedError, fetch_json};

pub const DEFAULT_BASE_URL: &str = "https://api.stlouisfed.org/fred";

const SERVICE: &str = "fred";
const TTL: Duration = Duration::from_secs(10 * 60);
const TIMEOUT: Duration = Duration::from_secs(15);

/// Net liquidity below this many billions is flagged.
const NET_LIQUIDITY_FLOOR: f64 = 2000.0;
const NET_LIQUIDITY_HIGH: f64 = 5000.0;

struct SeriesConfig {
    id: &'static str,
    name: &'static str,
    short_name: &'static str,
    frequency: Frequency,
    raw_unit: RawUnit,
    description: &'static str,
    anomaly_threshold: f64,
    category: LiquidityCategory,
}

#[allow(clippy::too_many_arguments)]
const fn series(
    id: &'static str,
    name: &'static str,
    short_name: &'static str,
    frequency: Frequency,
    raw_unit: RawUnit,
    anomaly_threshold: f64,
    category: LiquidityCategory,
    description: &'static str,
) -> SeriesConfig {
    SeriesConfig {
        id,
        name,
        short_name,
        frequency,
        raw_unit,
        description,
        anomaly_threshold,
        category,
    }
}

// Listed in display order.
static SERIES: [SeriesConfig; 13] = {
    use Frequency::*;
    use LiquidityCategory::*;
    use RawUnit::*;
    [
        series("M2SL", "M2 Money Stock", "M2", Monthly, Billions, 5.0, Core,
            "Broad money supply (cash + deposits + near-monies). YoY spikes >10% often precede inflation or asset bubbles."),
        series("M1SL", "M1 Money Stock", "M1", Monthly, Billions, 5.0, Core,
            "Narrowest measure (cash + checking). Watch for velocity traps or sudden contractions signaling credit crunches."),
        series("RRPONTSYD", "Overnight Reverse Repo (RRP)", "RRP", Daily, Billions, 10.0, Core,
            "Fed's \"parking lot\" for excess cash. Jumps >$2T indicate liquidity hoarding, sterilizing money supply growth."),
        series("WTREGEN", "Treasury General Account (TGA)", "TGA", Weekly, Millions, 15.0, Core,
            "Government's \"checking account\" at Fed. Drawdowns inject reserves and builds drain them, key for QT/QE pivots."),
        series("WALCL", "Fed Total Assets (Balance Sheet)", "Fed BS", Weekly, Millions, 5.0, Core,
            "Fed's full firepower. Expansions >$1T/quarter signal monetization, correlating with M2 surges and risk-on rallies."),
        series("WRESBAL", "Bank Reserve Balances", "Reserves", Weekly, Millions, 10.0, Core,
            "Bank excess reserves. Floods here (>$3T) mute rate signals, but rapid drains can spike interbank rates."),
        series("CURRCIR", "Currency in Circulation", "Currency", Monthly, Billions, 5.0, Core,
            "Physical dollars abroad/hoarded. Steady climbs amid digital shifts signal de-dollarization fears."),
        series("BOGMBASE", "Monetary Base", "M0", Monthly, Billions, 5.0, Core,
            "High-powered money (reserves + currency). Divergences from M2 highlight multiplier breakdowns."),
        series("M2V", "Velocity of M2 Money Stock", "M2 Velocity", Quarterly, Index, 5.0, Velocity,
            "Money circulation speed. Plunges signal hoarding/trapped liquidity, amplifying debasement risks without growth."),
        series("M1V", "Velocity of M1 Money Stock", "M1 Velocity", Quarterly, Index, 5.0, Velocity,
            "Transaction money velocity. Divergences from M2V highlight credit freezes or digital payment shifts."),
        series("FEDFUNDS", "Effective Federal Funds Rate", "Fed Funds", Monthly, Percent, 20.0, Policy,
            "Policy barometer. Spikes correlate with reserve crunches; overlay with Reserves for irregularity alerts."),
        series("TREAST", "Treasury Securities Held by Fed", "Fed Treasuries", Weekly, Millions, 5.0, FedHoldings,
            "Balance sheet breakdown. Surges indicate QE monetization, inflating base irregularly. Track vs Fed BS for asset mix."),
        series("WSHOMCB", "Mortgage-Backed Securities Held by Fed", "Fed MBS", Weekly, Millions, 5.0, FedHoldings,
            "QE relic. Runoffs drain liquidity subtly. Anomalies presage housing/credit distortions."),
    ]
};

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Reading {
    value: f64,
    previous: f64,
    date: String,
}

pub fn observation_limit(frequency: Frequency) -> u32 {
    match frequency {
        Frequency::Daily => 400,
        Frequency::Weekly => 80,
        Frequency::Monthly => 24,
        Frequency::Quarterly => 12,
    }
}

fn to_billions(raw: f64, unit: RawUnit) -> f64 {
    match unit {
        RawUnit::Millions => raw / 1000.0,
        RawUnit::Billions | RawUnit::Percent | RawUnit::Index => raw,
    }
}

/// `value` is in billions for dollar units.
pub fn display_value(value: f64, unit: RawUnit) -> String {
    match unit {
        RawUnit::Percent => format!("{value:.2}%"),
        RawUnit::Index => format!("{value:.2}"),
        _ if value >= 1000.0 => format!("${:.2}T", value / 1000.0),
        _ if value >= 1.0 => format!("${value:.2}B"),
        _ => format!("${:.2}M", value * 1000.0),
    }
}

fn display_unit(unit: RawUnit) -> &'static str {
    match unit {
        RawUnit::Percent => "%",
        RawUnit::Index => "Index",
        RawUnit::Billions | RawUnit::Millions => "Billions USD",
    }
}

/// Latest observation and its year-ago comparator. Falls back to the oldest
/// observation when nothing lands near one year back, provided it is at least
/// nine months old.
fn yoy_reading(observations: Vec<RawObservation>, frequency: Frequency) -> Option<Reading> {
    let mut valid: Vec<(NaiveDate, f64, String)> = observations
        .into_iter()
        .filter_map(|o| {
            let value = o.value.parse::<f64>().ok().filter(|v| v.is_finite())?;
            let date = NaiveDate::parse_from_str(&o.date, "%Y-%m-%d").ok()?;
            Some((date, value, o.date))
        })
        .collect();
    if valid.len() < 2 {
        return None;
    }
    valid.sort_by(|a, b| b.0.cmp(&a.0));

    let tolerance = if frequency == Frequency::Quarterly { 45 } else { 30 };
    let (latest_date, value, date) = valid[0].clone();
    let days_back = |d: NaiveDate| (latest_date - d).num_days().abs();

    let previous = match valid.iter().find(|(d, ..)| (days_back(*d) - 365).abs() <= tolerance) {
        Some((_, previous, _)) => *previous,
        None => {
            let (oldest, previous, _) = valid.last()?;
            if days_back(*oldest) < 270 {
                return None;
            }
            *previous
        }
    };
    if previous == 0.0 {
        return None;
    }

    Some(Reading {
        value,
        previous,
        date,
    })
}

fn indicator(config: &SeriesConfig, reading: Reading) -> LiquidityIndicator {
    let value = to_billions(reading.value, config.raw_unit);
    let previous = to_billions(reading.previous, config.raw_unit);
    let yoy_change_percent = (value - previous) / previous * 100.0;

    LiquidityIndicator {
        series_id: config.id.into(),
        name: config.name.into(),
        short_name: config.short_name.into(),
        value,
        display_value: display_value(value, config.raw_unit),
        previous_value: previous,
        yoy_change: value - previous,
        yoy_change_percent,
        date: reading.date,
        frequency: config.frequency,
        unit: display_unit(config.raw_unit).into(),
        raw_unit: config.raw_unit,
        description: config.description.into(),
        is_anomaly: yoy_change_percent.abs() > config.anomaly_threshold,
        anomaly_threshold: config.anomaly_threshold,
        category: config.category,
    }
}

fn find<'a>(indicators: &'a [LiquidityIndicator], id: &str) -> Option<&'a LiquidityIndicator> {
    indicators.iter().find(|i| i.series_id == id)
}

fn derived_metrics(indicators: &[LiquidityIndicator]) -> Vec<DerivedMetric> {
    let fed = find(indicators, "WALCL");
    let tga = find(indicators, "WTREGEN");
    let rrp = find(indicators, "RRPONTSYD");
    let m2 = find(indicators, "M2SL");
    let m0 = find(indicators, "BOGMBASE");
    let reserves = find(indicators, "WRESBAL");

    let mut derived = Vec::new();

    if let (Some(fed), Some(tga), Some(rrp)) = (fed, tga, rrp) {
        let value = fed.value - tga.value - rrp.value;
        derived.push(DerivedMetric {
            id: "net_liquidity".into(),
            name: "Net Liquidity Proxy".into(),
            short_name: "Net Liq".into(),
            value,
            display_value: display_value(value, RawUnit::Billions),
            description: "Fed BS - TGA - RRP. Effective reserves measure. Low levels (<$2T) precede risk-off moves."
                .into(),
            is_anomaly: value < NET_LIQUIDITY_FLOOR,
            anomaly_threshold: NET_LIQUIDITY_FLOOR,
            formula: "Fed Total Assets - TGA - RRP".into(),
        });
    }

    if let (Some(m2), Some(m0)) = (m2, m0.filter(|m0| m0.value > 0.0)) {
        let value = m2.value / m0.value;
        derived.push(DerivedMetric {
            id: "debasement_ratio".into(),
            name: "Money Multiplier (Debasement Ratio)".into(),
            short_name: "M2/M0".into(),
            value,
            display_value: format!("{value:.2}x"),
            description: "M2 / M0. Rising multiplier shows credit amplification. High values (>4.5x) signal excess leverage."
                .into(),
            is_anomaly: !(3.5..=4.5).contains(&value),
            anomaly_threshold: 4.5,
            formula: "M2 Money Stock / Monetary Base".into(),
        });
    }

    if let (Some(reserves), Some(fed)) = (reserves, fed.filter(|fed| fed.value > 0.0)) {
        let value = reserves.value / fed.value * 100.0;
        derived.push(DerivedMetric {
            id: "reserve_ratio".into(),
            name: "Reserve to Fed Assets Ratio".into(),
            short_name: "Rsv/Fed".into(),
            value,
            display_value: format!("{value:.1}%"),
            description: "Bank reserves as % of Fed BS. Drops below 30% signal tightening stress.".into(),
            is_anomaly: !(30.0..=50.0).contains(&value),
            anomaly_threshold: 30.0,
            formula: "Bank Reserves / Fed Total Assets".into(),
        });
    }

    derived
}

/// Majority of bullish over bearish reasons decides; a tie is neutral.
fn overall_signal(indicators: &[LiquidityIndicator], derived: &[DerivedMetric]) -> (LiquiditySignal, Vec<String>) {
    let yoy = |id| find(indicators, id).map(|i| i.yoy_change_percent);
    let m2 = yoy("M2SL");
    let fed = yoy("WALCL");
    let rrp = yoy("RRPONTSYD");
    let net = derived.iter().find(|d| d.id == "net_liquidity");

    let mut bullish = Vec::new();
    if let Some(m2) = m2.filter(|&p| p > 3.0) {
        bullish.push(format!("M2 expanding +{m2:.1}% YoY"));
    }
    if let Some(fed) = fed.filter(|&p| p > 5.0) {
        bullish.push(format!("Fed BS expanding +{fed:.1}% YoY"));
    }
    if let Some(rrp) = rrp.filter(|&p| p < -20.0) {
        bullish.push(format!("RRP draining {rrp:.0}% (liquidity release)"));
    }
    if let Some(net) = net.filter(|n| n.value > NET_LIQUIDITY_HIGH) {
        bullish.push(format!("Net Liquidity high at {}", net.display_value));
    }

    let mut bearish = Vec::new();
    if let Some(m2) = m2.filter(|&p| p < -2.0) {
        bearish.push(format!("M2 contracting {m2:.1}% YoY"));
    }
    if let Some(fed) = fed.filter(|&p| p < -3.0) {
        bearish.push(format!("Fed BS contracting {fed:.1}% YoY (QT)"));
    }
    if let Some(net) = net.filter(|n| n.value < NET_LIQUIDITY_FLOOR) {
        bearish.push(format!("Net Liquidity dangerously low at {}", net.display_value));
    }

    let signal = match bullish.len().cmp(&bearish.len()) {
        std::cmp::Ordering::Greater => LiquiditySignal::Bullish,
        std::cmp::Ordering::Less => LiquiditySignal::Bearish,
        std::cmp::Ordering::Equal => LiquiditySignal::Neutral,
    };
    bullish.extend(bearish);
    (signal, bullish)
}

fn assemble(indicators: Vec<LiquidityIndicator>) -> LiquidityData {
    let derived_metrics = derived_metrics(&indicators);
    let (overall_signal, signal_reasons) = overall_signal(&indicators, &derived_metrics);
    let anomalies: Vec<_> = indicators.iter().filter(|i| i.is_anomaly).cloned().collect();

    LiquidityData {
        summary: LiquiditySummary {
            total_indicators: indicators.len(),
            anomaly_count: anomalies.len(),
            overall_signal,
            signal_reasons,
            last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        },
        indicators,
        derived_metrics,
        anomalies,
    }
}

pub struct LiquidityClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cache: TtlCache<(), LiquidityData>,
}

impl LiquidityClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
            cache: TtlCache::new("liquidity", TTL),
        }
    }

    /// Series that fail to load are left out; with no API key the tracker is
    /// empty and neutral.
    pub async fn liquidity(&self) -> LiquidityData {
        match self
            .cache
            .get_or_refresh((), || async { Ok::<_, Infallible>(self.build().await) })
            .await
        {
            Ok(data) => data,
            Err(never) => match never {},
        }
    }

    async fn build(&self) -> LiquidityData {
        let Some(key) = self.api_key.as_deref() else {
            debug!("FRED_API_KEY not set, liquidity tracker disabled");
            return assemble(Vec::new());
        };

        let readings = join_all(SERIES.iter().map(|config| async move {
            match self.fetch(key, config).await {
                Ok(observations) => yoy_reading(observations, config.frequency)
                    .map(|reading| indicator(config, reading)),
                Err(e) => {
                    warn!(series = config.id, error = %e, "liquidity series unavailable");
                    None
                }
            }
        }))
        .await;

        let data = assemble(readings.into_iter().flatten().collect());
        info!(
            indicators = data.indicators.len(),
            derived = data.derived_metrics.len(),
            anomalies = data.anomalies.len(),
            "liquidity data refreshed"
        );
        data
    }

    async fn fetch(&self, key: &str, config: &SeriesConfig) -> Result<Vec<RawObservation>, FeedError> {
        let limit = observation_limit(config.frequency).to_string();
        let body: ObservationsResponse = fetch_json(
            SERVICE,
            self.http
                .get(format!("{}/series/observations", self.base_url))
                .query(&[
                    ("series_id", config.id),
                    ("api_key", key),
                    ("file_type", "json"),
                    ("limit", limit.as_str()),
                    ("sort_order", "desc"),
                ])
                .timeout(TIMEOUT),
        )
        .await?;
        Ok(body.observations)
    }
}
