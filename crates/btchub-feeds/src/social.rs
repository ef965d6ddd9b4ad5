use std::time::Duration;

use btchub_types::models::{SocialPost, Tweet, TweetAuthor, TweetMetrics};
use chrono::DateTime;
use serde::Deserialize;
use tracing::{info, warn};

use crate::cache::TtlCache;
use crate::error::{FeedError, fetch_json};

pub const REDDIT_BASE_URL: &str = "https://www.reddit.com";
pub const TWITTER_BASE_URL: &str = "https://api.twitter.com/2";

pub const DEFAULT_TWITTER_ACCOUNT: &str = "HodlMyBeer21";

const TTL: Duration = Duration::from_secs(5 * 60);
const TIMEOUT: Duration = Duration::from_secs(10);
const SUBREDDIT: &str = "Bitcoin";
const REDDIT_LIMIT: u32 = 25;
const TWEET_LIMIT: u32 = 5;

// -- Reddit --

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Deserialize)]
struct Child {
    data: RedditPost,
}

#[derive(Deserialize)]
struct RedditPost {
    id: String,
    title: String,
    author: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    permalink: String,
    created_utc: f64,
    link_flair_text: Option<String>,
    #[serde(default)]
    stickied: bool,
}

pub struct RedditClient {
    http: reqwest::Client,
    base_url: String,
    cache: TtlCache<(), Vec<SocialPost>>,
}

impl RedditClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, REDDIT_BASE_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            cache: TtlCache::new("reddit", TTL),
        }
    }

    /// Hot r/Bitcoin posts, pinned posts excluded. Empty when Reddit is down.
    pub async fn hot_posts(&self) -> Vec<SocialPost> {
        self.cache
            .get_or_refresh((), || self.fetch())
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "reddit unavailable");
                Vec::new()
            })
    }

    async fn fetch(&self) -> Result<Vec<SocialPost>, FeedError> {
        let listing: Listing = fetch_json(
            "reddit",
            self.http
                .get(format!("{}/r/{SUBREDDIT}/hot.json", self.base_url))
                .query(&[("limit", REDDIT_LIMIT)])
                .timeout(TIMEOUT),
        )
        .await?;

        let posts = listing
            .data
            .children
            .into_iter()
            .map(|c| c.data)
            .filter(|p| !p.stickied)
            .map(|p| SocialPost {
                url: format!("https://www.reddit.com{}", p.permalink),
                created_at: DateTime::from_timestamp(p.created_utc as i64, 0).unwrap_or_default(),
                id: p.id,
                title: p.title,
                author: p.author,
                score: p.score,
                num_comments: p.num_comments,
                flair: p.link_flair_text,
            })
            .collect();
        Ok(posts)
    }
}

// -- Twitter --

#[derive(Deserialize)]
struct UserLookup {
    data: Option<TwitterUser>,
}

#[derive(Deserialize)]
struct TwitterUser {
    id: String,
    name: String,
    username: String,
    #[serde(default)]
    profile_image_url: String,
    #[serde(default)]
    verified: bool,
}

#[derive(Deserialize)]
struct Timeline {
    #[serde(default)]
    data: Vec<RawTweet>,
}

#[derive(Deserialize)]
struct RawTweet {
    id: String,
    text: String,
    #[serde(default)]
    created_at: String,
    public_metrics: PublicMetrics,
}

#[derive(Deserialize)]
struct PublicMetrics {
    like_count: u64,
    retweet_count: u64,
    reply_count: u64,
    quote_count: u64,
}

pub struct TwitterClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
    account: String,
    cache: TtlCache<(), Vec<Tweet>>,
}

impl TwitterClient {
    pub fn new(http: reqwest::Client, bearer_token: Option<String>) -> Self {
        Self::with_base_url(http, TWITTER_BASE_URL, bearer_token)
    }

    pub fn with_base_url(
        http: reqwest::Client,
        base_url: impl Into<String>,
        bearer_token: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            bearer_token,
            account: DEFAULT_TWITTER_ACCOUNT.to_string(),
            cache: TtlCache::new("tweets", TTL),
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    /// Recent original tweets of the configured account; `refresh` drops
    /// the cached timeline first.
    pub async fn tweets(&self, refresh: bool) -> Vec<Tweet> {
        if refresh {
            self.cache.clear();
        }
        match self.cache.get_or_refresh((), || self.fetch()).await {
            Ok(tweets) => tweets,
            Err(FeedError::NotConfigured(_)) => Vec::new(),
            Err(e) => {
                warn!(account = %self.account, error = %e, "twitter unavailable");
                Vec::new()
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<Tweet>, FeedError> {
        let token = self
            .bearer_token
            .as_deref()
            .ok_or(FeedError::NotConfigured("TWITTER_BEARER_TOKEN"))?;

        let lookup: UserLookup = fetch_json(
            "twitter",
            self.http
                .get(format!("{}/users/by/username/{}", self.base_url, self.account))
                .query(&[("user.fields", "name,username,profile_image_url,verified")])
                .bearer_auth(token)
                .timeout(TIMEOUT),
        )
        .await?;
        let user = lookup
            .data
            .ok_or_else(|| FeedError::format("twitter", format!("user @{} not found", self.account)))?;

        let timeline: Timeline = fetch_json(
            "twitter",
            self.http
                .get(format!("{}/users/{}/tweets", self.base_url, user.id))
                .query(&[
                    ("tweet.fields", "created_at,public_metrics,entities"),
                    ("exclude", "retweets,replies"),
                ])
                .query(&[("max_results", TWEET_LIMIT)])
                .bearer_auth(token)
                .timeout(TIMEOUT),
        )
        .await?;

        let tweets: Vec<Tweet> = timeline
            .data
            .into_iter()
            .map(|t| Tweet {
                url: format!("https://twitter.com/{}/status/{}", user.username, t.id),
                id: t.id,
                text: t.text,
                created_at: t.created_at,
                author: TweetAuthor {
                    name: user.name.clone(),
                    username: user.username.clone(),
                    profile_image_url: user.profile_image_url.clone(),
                    verified: user.verified,
                },
                metrics: TweetMetrics {
                    likes: t.public_metrics.like_count,
                    retweets: t.public_metrics.retweet_count,
                    replies: t.public_metrics.reply_count,
                    quotes: t.public_metrics.quote_count,
                },
            })
            .collect();

        info!(account = %self.account, count = tweets.len(), "fetched tweets");
        Ok(tweets)
    }
}
