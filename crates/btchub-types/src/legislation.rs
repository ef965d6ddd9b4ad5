use serde::{Deserialize, Serialize};

use crate::models::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillCategory {
    Regulation,
    Taxation,
    Stablecoin,
    Innovation,
    Enforcement,
    Privacy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegislationBill {
    pub id: String,
    pub bill_name: String,
    pub bill_number: String,
    pub description: String,
    pub current_status: String,
    pub next_steps: String,
    /// 0..=100
    pub passage_chance: u8,
    pub whats_next: String,
    #[serde(default)]
    pub last_action: String,
    #[serde(default)]
    pub sponsor: String,
    pub category: BillCategory,
    pub priority: Priority,
}

impl LegislationBill {
    /// Bill number with whitespace and dots removed, upper-cased, so that
    /// "H.R. 4763" and "HR4763" compare equal.
    pub fn normalized_number(&self) -> String {
        self.bill_number
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '.')
            .flat_map(char::to_uppercase)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegislationData {
    pub bills: Vec<LegislationBill>,
    #[serde(default)]
    pub last_updated: String,
    pub summary: String,
    pub next_major_event: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalystCategory {
    Policy,
    Regulatory,
    Market,
    Legal,
    Defi,
    Etf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoCatalyst {
    pub id: String,
    pub event: String,
    pub description: String,
    pub probability: u8,
    pub next_steps: Vec<String>,
    pub category: CatalystCategory,
    pub impact: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalystsData {
    pub catalysts: Vec<CryptoCatalyst>,
    pub last_updated: String,
    pub market_impact: String,
    pub risk_factors: String,
}
