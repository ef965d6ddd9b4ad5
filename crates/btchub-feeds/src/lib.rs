//! Upstream data sources for BitcoinHub.
//!
//! Every client owns a [`cache::TtlCache`] and degrades to built-in data or
//! an empty list when its upstream is down, so route handlers never see a
//! transport error. Clients take a shared [`reqwest::Client`] built with
//! [`http_client`].

pub mod cache;
pub mod cryptocompare;
pub mod error;
pub mod fred;
pub mod legiscan;
pub mod legislation;
pub mod llm;
pub mod news;
pub mod notifications;
pub mod social;
pub mod worldbank;

#[cfg(test)]
mod test_support;

pub use cache::{Cache, MemoryCache, TtlCache};
pub use cryptocompare::PriceClient;
pub use error::FeedError;
pub use fred::LiquidityClient;
pub use legiscan::LegiScanClient;
pub use legislation::{LegislationService, UploadError};
pub use llm::ChatClient;
pub use news::NewsClient;
pub use notifications::NotificationService;
pub use social::{RedditClient, TwitterClient};
pub use worldbank::WorldBankClient;

const USER_AGENT: &str = "BitcoinHub/1.0";

/// Shared outbound client. Per-request timeouts are set by each source.
pub fn http_client() -> Result<reqwest::Client, FeedError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|source| FeedError::Request {
            service: "http",
            source,
        })
}
