use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use rand::Rng;
use tracing::warn;

/// Runtime settings, read from the environment (and `.env` via dotenvy).
/// Missing API keys are not errors: the matching features serve fallback data.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub admin_username: String,
    pub admin_password: Option<String>,
    pub openai_api_key: Option<String>,
    pub xai_api_key: Option<String>,
    pub legiscan_api_key: Option<String>,
    pub news_api_key: Option<String>,
    pub twitter_bearer_token: Option<String>,
    pub fred_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("BTCHUB_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("BTCHUB_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("BTCHUB_PORT must be a port number")?;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid listen address {host}:{port}"))?;

        let jwt_secret = get("SESSION_SECRET").unwrap_or_else(|| {
            warn!("SESSION_SECRET not set; sessions will not survive a restart");
            random_secret()
        });

        let admin_password = get("ADMIN_PASSWORD");
        if admin_password.is_none() {
            warn!("ADMIN_PASSWORD not set; admin login and legislation uploads are disabled");
        }

        Ok(Self {
            db_path: get("DATABASE_URL").unwrap_or_else(|| "btchub.db".into()).into(),
            jwt_secret,
            addr,
            upload_dir: get("BTCHUB_UPLOAD_DIR")
                .unwrap_or_else(|| "static/uploads".into())
                .into(),
            admin_username: get("ADMIN_USERNAME").unwrap_or_else(|| "HodlMyBeer21".into()),
            admin_password,
            openai_api_key: get("OPENAI_API_KEY"),
            xai_api_key: get("XAI_API_KEY"),
            legiscan_api_key: get("LEGISCAN_API_KEY"),
            news_api_key: get("NEWS_API_KEY"),
            twitter_bearer_token: get("TWITTER_BEARER_TOKEN"),
            fred_api_key: get("FRED_API_KEY"),
        })
    }
}

fn random_secret() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
