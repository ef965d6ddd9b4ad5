//! Money-supply and Fed balance sheet indicators for the liquidity tracker.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

/// Unit the upstream series is published in. Dollar amounts are reported in
/// billions after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawUnit {
    Billions,
    Millions,
    Percent,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityCategory {
    Core,
    Velocity,
    Policy,
    FedHoldings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiquiditySignal {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityIndicator {
    pub series_id: String,
    pub name: String,
    pub short_name: String,
    pub value: f64,
    pub display_value: String,
    /// Observation roughly one year before `date`.
    pub previous_value: f64,
    pub yoy_change: f64,
    pub yoy_change_percent: f64,
    pub date: String,
    pub frequency: Frequency,
    pub unit: String,
    pub raw_unit: RawUnit,
    pub description: String,
    pub is_anomaly: bool,
    /// Absolute YoY percent beyond which the reading is flagged.
    pub anomaly_threshold: f64,
    pub category: LiquidityCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetric {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub value: f64,
    pub display_value: String,
    pub description: String,
    pub is_anomaly: bool,
    pub anomaly_threshold: f64,
    pub formula: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquiditySummary {
    pub total_indicators: usize,
    pub anomaly_count: usize,
    pub overall_signal: LiquiditySignal,
    pub signal_reasons: Vec<String>,
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityData {
    pub indicators: Vec<LiquidityIndicator>,
    pub derived_metrics: Vec<DerivedMetric>,
    pub anomalies: Vec<LiquidityIndicator>,
    pub summary: LiquiditySummary,
}
