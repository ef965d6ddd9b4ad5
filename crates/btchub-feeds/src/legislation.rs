//! Crypto legislation tracker.
//!
//! Bills come from two sources: the LegiScan crawl (authoritative status
//! data) and an LLM-written narrative that also supplies the landscape
//! summary. An admin upload replaces both until the process restarts.

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use btchub_types::legislation::{
    BillCategory, CatalystCategory, CatalystsData, CryptoCatalyst, LegislationBill, LegislationData,
};
use btchub_types::models::Priority;
use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::TtlCache;
use crate::legiscan::LegiScanClient;
use crate::llm::ChatClient;

const TTL: Duration = Duration::from_secs(24 * 60 * 60);

const ANALYST_PROMPT: &str = "You are a legislative analyst with real-time access to current US \
Congressional data. Focus on bills that are actually active and moving through Congress. Always \
respond with valid JSON.";

const LANDSCAPE_PROMPT: &str = r#"What is the current status of each US crypto related bill in Congress? For each bill give the name, next steps, % chance of passing the next phase, and what's next.

Respond in JSON with this structure:
{
  "bills": [
    {
      "id": "unique_id",
      "billName": "Clear, descriptive name",
      "billNumber": "Official bill number (H.R. or S.)",
      "description": "What the bill does",
      "currentStatus": "Current stage in the legislative process",
      "nextSteps": "What needs to happen next",
      "passageChance": 0-100,
      "whatsNext": "Timeline and next actions",
      "lastAction": "Most recent congressional action",
      "sponsor": "Primary sponsor name and party",
      "category": "regulation|taxation|stablecoin|innovation|enforcement|privacy",
      "priority": "high|medium|low"
    }
  ],
  "summary": "2-3 sentence overview of the crypto legislative landscape",
  "nextMajorEvent": "Next significant date or event to watch"
}

Cover stablecoin regulation, market structure, tax clarification, innovation and sandbox, enforcement, custody and CBDC bills. Base passage chances on committee status, bipartisan support and agency positions."#;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UploadError {
    #[error("admin uploads are disabled")]
    Disabled,

    #[error("invalid admin password")]
    WrongPassword,

    #[error("bills array required")]
    NoBills,

    #[error("bill {index}: missing required field {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("bill {index}: passage chance {value} is above 100")]
    ChanceOutOfRange { index: usize, value: u8 },
}

fn password_matches(given: &str, expected: &str) -> bool {
    constant_time_eq::constant_time_eq(given.as_bytes(), expected.as_bytes())
}

/// LegiScan bills first, then narrative bills whose normalized number is
/// not already present.
pub fn merge_bills(live: Vec<LegislationBill>, narrative: Vec<LegislationBill>) -> Vec<LegislationBill> {
    let mut seen = HashSet::new();
    live.into_iter()
        .chain(narrative)
        .filter(|bill| seen.insert(bill.normalized_number()))
        .collect()
}

fn validate_upload(data: &LegislationData) -> Result<(), UploadError> {
    if data.bills.is_empty() {
        return Err(UploadError::NoBills);
    }
    for (index, bill) in data.bills.iter().enumerate() {
        let required = [
            ("billName", &bill.bill_name),
            ("billNumber", &bill.bill_number),
            ("description", &bill.description),
            ("currentStatus", &bill.current_status),
            ("nextSteps", &bill.next_steps),
            ("whatsNext", &bill.whats_next),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(UploadError::MissingField { index, field: *field });
        }
        if bill.passage_chance > 100 {
            return Err(UploadError::ChanceOutOfRange {
                index,
                value: bill.passage_chance,
            });
        }
    }
    Ok(())
}

pub struct LegislationService {
    legiscan: LegiScanClient,
    analyst: Option<ChatClient>,
    admin_password: Option<String>,
    cache: TtlCache<(), LegislationData>,
    admin_override: RwLock<Option<LegislationData>>,
}

impl LegislationService {
    pub fn new(
        legiscan: LegiScanClient,
        analyst: Option<ChatClient>,
        admin_password: Option<String>,
    ) -> Self {
        Self {
            legiscan,
            analyst,
            admin_password,
            cache: TtlCache::new("legislation", TTL),
            admin_override: RwLock::new(None),
        }
    }

    pub async fn data(&self) -> LegislationData {
        if let Some(uploaded) = self.uploaded() {
            return uploaded;
        }

        match self
            .cache
            .get_or_refresh((), || async { Ok::<_, Infallible>(self.build().await) })
            .await
        {
            Ok(data) => data,
            Err(never) => match never {},
        }
    }

    /// Drop cached LegiScan and narrative data and rebuild.
    pub async fn refresh(&self) -> LegislationData {
        self.legiscan.clear_cache();
        self.cache.clear();
        self.data().await
    }

    pub fn admin_upload(
        &self,
        password: &str,
        mut data: LegislationData,
    ) -> Result<LegislationData, UploadError> {
        let expected = self.admin_password.as_deref().ok_or(UploadError::Disabled)?;
        if !password_matches(password, expected) {
            return Err(UploadError::WrongPassword);
        }
        validate_upload(&data)?;

        data.last_updated = Utc::now().to_rfc3339();
        info!(bills = data.bills.len(), "admin legislation upload accepted");

        let mut slot = self
            .admin_override
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(data.clone());
        Ok(data)
    }

    fn uploaded(&self) -> Option<LegislationData> {
        self.admin_override
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn build(&self) -> LegislationData {
        let narrative = self.narrative().await;
        let live = self.legiscan.crypto_bills().await;
        let live_count = live.len();

        let bills = merge_bills(live, narrative.bills);
        info!(live = live_count, total = bills.len(), "legislation rebuilt");

        LegislationData {
            bills,
            last_updated: Utc::now().to_rfc3339(),
            summary: narrative.summary,
            next_major_event: narrative.next_major_event,
        }
    }

    async fn narrative(&self) -> LegislationData {
        let Some(analyst) = &self.analyst else {
            return fallback_legislation();
        };
        match analyst
            .complete_json::<LegislationData>(ANALYST_PROMPT, LANDSCAPE_PROMPT, 0.1)
            .await
        {
            Ok(data) if !data.bills.is_empty() => data,
            Ok(_) => {
                warn!("legislation analysis returned no bills, using fallback");
                fallback_legislation()
            }
            Err(e) => {
                warn!(error = %e, "legislation analysis failed, using fallback");
                fallback_legislation()
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn bill(
    id: &str,
    name: &str,
    number: &str,
    description: &str,
    status: &str,
    next: &str,
    chance: u8,
    whats_next: &str,
    last_action: &str,
    sponsor: &str,
    category: BillCategory,
    priority: Priority,
) -> LegislationBill {
    LegislationBill {
        id: id.into(),
        bill_name: name.into(),
        bill_number: number.into(),
        description: description.into(),
        current_status: status.into(),
        next_steps: next.into(),
        passage_chance: chance,
        whats_next: whats_next.into(),
        last_action: last_action.into(),
        sponsor: sponsor.into(),
        category,
        priority,
    }
}

/// Hand-maintained snapshot served when no analysis is available.
pub fn fallback_legislation() -> LegislationData {
    LegislationData {
        bills: vec![
            bill(
                "genius_act_2025",
                "GENIUS Act (Guiding and Establishing National Innovation for U.S. Stablecoins)",
                "S. 2664",
                "Comprehensive stablecoin regulatory framework with 1:1 reserve backing and Federal Reserve/OCC oversight",
                "Signed into law on July 18, 2025, implementation underway",
                "Ongoing regulatory implementation with initial regulations expected by Q4 2025",
                100,
                "Federal Reserve and OCC issuing initial guidance for stablecoin issuers.",
                "Signed into law, the first major U.S. crypto legislation",
                "Sen. Bill Hagerty (R-TN) & Sen. Kirsten Gillibrand (D-NY)",
                BillCategory::Stablecoin,
                Priority::High,
            ),
            bill(
                "clarity_act_2025",
                "CLARITY Act (Digital Asset Market Clarity Act)",
                "H.R. 4763",
                "Defines SEC and CFTC jurisdictions for digital assets, building on the FIT21 framework",
                "Passed House 294-134 on July 16, 2025, in Senate for consideration",
                "Senate Banking Committee hearing",
                65,
                "Senate progress slowed by the August recess and open Democratic concerns.",
                "Sent to Senate after bipartisan House passage",
                "Rep. French Hill (R-AR) & Rep. Glenn Thompson (R-PA)",
                BillCategory::Regulation,
                Priority::High,
            ),
            bill(
                "anti_cbdc_surveillance_2025",
                "Anti-CBDC Surveillance State Act",
                "H.R. 5403",
                "Prohibits the Federal Reserve from issuing a central bank digital currency",
                "Passed House 219-210 on July 16, 2025, in Senate for consideration",
                "Senate Banking Committee hearing",
                55,
                "Attached to the NDAA to improve Senate prospects; no Senate counterpart bill.",
                "Sent to Senate after narrow House passage",
                "Rep. Tom Emmer (R-MN)",
                BillCategory::Privacy,
                Priority::High,
            ),
            bill(
                "stable_act_2025",
                "STABLE Act",
                "H.R. 1234",
                "House stablecoin bill overlapping with the enacted GENIUS Act",
                "House committee stage, conferencing with GENIUS Act",
                "Reconciliation with the GENIUS Act",
                45,
                "Negotiations continue to reconcile with the enacted GENIUS Act.",
                "Committee conferencing to address overlap",
                "Rep. French Hill (R-AR)",
                BillCategory::Stablecoin,
                Priority::Medium,
            ),
            bill(
                "hjres25_defi_broker_repeal_2025",
                "H.J.Res.25 (Repeal of IRS DeFi Broker Rule)",
                "H.J.Res. 25",
                "Congressional Review Act resolution repealing DeFi broker reporting requirements",
                "Passed House, stalled in Senate",
                "No Senate date scheduled",
                35,
                "Senate action remains stalled behind competing priorities.",
                "House passage",
                "Rep. Mike Flood (R-NE)",
                BillCategory::Taxation,
                Priority::Low,
            ),
        ],
        last_updated: Utc::now().to_rfc3339(),
        summary: "The GENIUS Act became the first major U.S. crypto law in July 2025 and is now in \
                  implementation. The CLARITY and Anti-CBDC Acts passed the House and await Senate action."
            .into(),
        next_major_event: "Senate Banking Committee hearings on the CLARITY Act and Anti-CBDC \
                           Surveillance State Act"
            .into(),
    }
}

#[allow(clippy::too_many_arguments)]
fn catalyst(
    id: &str,
    event: &str,
    description: &str,
    probability: u8,
    next_steps: &[&str],
    category: CatalystCategory,
    impact: Priority,
    due_date: &str,
) -> CryptoCatalyst {
    CryptoCatalyst {
        id: id.into(),
        event: event.into(),
        description: description.into(),
        probability,
        next_steps: next_steps.iter().map(|s| s.to_string()).collect(),
        category,
        impact,
        due_date: Some(due_date.into()),
    }
}

/// Upcoming market-moving events. Static, edited by hand.
pub fn crypto_catalysts() -> CatalystsData {
    CatalystsData {
        catalysts: vec![
            catalyst(
                "white_house_crypto_policy_impact",
                "White House Crypto Policy Report Impact",
                "The White House crypto policy report addresses regulatory clarity, consumer protection, stablecoin reform, a potential CBDC ban and DeFi integration. Follow-up regulatory actions may come next.",
                100,
                &[
                    "Monitor whitehouse.gov and sec.gov for regulatory follow-ups",
                    "Check CoinDesk and Bloomberg for market reactions",
                ],
                CatalystCategory::Policy,
                Priority::High,
                "August 15, 2025",
            ),
            catalyst(
                "solana_spot_etf_approval",
                "Solana Spot ETF Approval",
                "The SEC is reviewing several Solana ETF filings, with accelerated reviews suggesting action ahead of the October deadline.",
                85,
                &[
                    "Monitor sec.gov for S-1 filing updates",
                    "Check CoinDesk and Bloomberg for approval news",
                ],
                CatalystCategory::Etf,
                Priority::High,
                "August 20, 2025",
            ),
            catalyst(
                "genius_act_implementation",
                "GENIUS Act Implementation",
                "The GENIUS Act requires full reserves and federal licenses for stablecoin issuers. Expect issuer announcements and corporate stablecoin launches.",
                100,
                &[
                    "Track stablecoin issuer announcements",
                    "Monitor corporate stablecoin launches",
                ],
                CatalystCategory::Regulatory,
                Priority::Medium,
                "August 31, 2025",
            ),
            catalyst(
                "clarity_act_senate_progress",
                "CLARITY Act Senate Progress",
                "The House-passed CLARITY Act classifies digital assets as securities or commodities and shifts oversight to the CFTC. Senate action is pending.",
                60,
                &[
                    "Follow Senate Banking Committee statements",
                    "Check Reuters or CNBC for vote updates",
                ],
                CatalystCategory::Regulatory,
                Priority::High,
                "August 25, 2025",
            ),
            catalyst(
                "fomc_meeting_impact",
                "FOMC Meeting Follow-through",
                "A dovish rate outlook supported crypto markets. New economic data may extend or reverse the move.",
                100,
                &[
                    "Check federalreserve.gov for new statements",
                    "Watch crypto equities such as COIN and MSTR",
                ],
                CatalystCategory::Market,
                Priority::Medium,
                "August 5, 2025",
            ),
            catalyst(
                "defi_protocol_launches",
                "DeFi Protocol Launches & Token Unlocks",
                "New DeFi protocol launches and scheduled token unlocks continue to drive sector interest.",
                85,
                &[
                    "Track new listings on CoinMarketCap",
                    "Monitor unlock schedules on CoinGecko",
                ],
                CatalystCategory::Defi,
                Priority::Medium,
                "August 15, 2025",
            ),
            catalyst(
                "bitcoin_strategic_reserve_developments",
                "Bitcoin Strategic Reserve Developments",
                "The Strategic Bitcoin Reserve holds seized BTC. Treasury updates or expansion strategies could follow.",
                55,
                &[
                    "Check whitehouse.gov and treasury.gov for reserve announcements",
                    "Review CoinDesk for policy updates",
                ],
                CatalystCategory::Policy,
                Priority::High,
                "August 31, 2025",
            ),
        ],
        last_updated: "August 1, 2025".into(),
        market_impact: "Positive outcomes such as ETF approvals could drive 5-20% crypto rallies; \
                        restrictive policies may cause 5-10% dips."
            .into(),
        risk_factors: "Verify social media claims against primary sources. Regulatory delays or \
                       lawsuits may push back ETF approvals."
            .into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;

    fn live(number: &str, chance: u8) -> LegislationBill {
        let mut b = fallback_legislation().bills[1].clone();
        b.id = format!("legiscan_{number}");
        b.bill_number = number.into();
        b.passage_chance = chance;
        b
    }

    fn service(admin_password: Option<&str>) -> LegislationService {
        LegislationService::new(
            LegiScanClient::new(Client::new(), None),
            None,
            admin_password.map(str::to_string),
        )
    }

    #[test]
    fn merge_prefers_live_and_drops_duplicates() {
        let narrative = fallback_legislation().bills;
        let merged = merge_bills(vec![live("HR 4763", 70), live("S.9", 10)], narrative);

        assert_eq!(merged[0].id, "legiscan_HR 4763");
        assert_eq!(merged[0].passage_chance, 70);
        assert_eq!(merged.len(), 6);

        let mut numbers: Vec<_> = merged.iter().map(|b| b.normalized_number()).collect();
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), merged.len());
        assert!(!merged.iter().any(|b| b.id == "clarity_act_2025"));
    }

    #[tokio::test]
    async fn unconfigured_sources_serve_fallback() {
        let svc = service(None);
        let data = svc.data().await;
        assert_eq!(data.bills.len(), 5);
        assert_eq!(data.bills[0].bill_number, "S. 2664");
    }

    #[tokio::test]
    async fn admin_upload_takes_precedence() {
        let svc = service(Some("hunter2"));
        let mut upload = fallback_legislation();
        upload.bills.truncate(1);
        upload.summary = "uploaded".into();

        let stored = svc.admin_upload("hunter2", upload).unwrap();
        assert!(!stored.last_updated.is_empty());

        assert_eq!(svc.data().await.summary, "uploaded");
        assert_eq!(svc.refresh().await.bills.len(), 1);
    }

    #[test]
    fn password_check_is_exact() {
        assert!(password_matches("hunter2", "hunter2"));
        assert!(!password_matches("hunter", "hunter2"));
        assert!(!password_matches("hunter22", "hunter2"));
        assert!(!password_matches("Hunter2", "hunter2"));
        assert!(!password_matches("", "hunter2"));
    }

    #[test]
    fn admin_upload_rejections() {
        let svc = service(Some("hunter2"));
        assert_eq!(
            svc.admin_upload("nope", fallback_legislation()).unwrap_err(),
            UploadError::WrongPassword
        );

        let mut missing = fallback_legislation();
        missing.bills[2].whats_next = "  ".into();
        assert_eq!(
            svc.admin_upload("hunter2", missing).unwrap_err(),
            UploadError::MissingField {
                index: 2,
                field: "whatsNext"
            }
        );

        let mut empty = fallback_legislation();
        empty.bills.clear();
        assert_eq!(svc.admin_upload("hunter2", empty).unwrap_err(), UploadError::NoBills);

        assert_eq!(
            service(None).admin_upload("", fallback_legislation()).unwrap_err(),
            UploadError::Disabled
        );
    }

    #[test]
    fn catalysts_are_populated() {
        let data = crypto_catalysts();
        assert!(data.catalysts.len() >= 5);
        assert!(data.catalysts.iter().all(|c| c.probability <= 100 && !c.next_steps.is_empty()));
    }
}
