use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("{service} request failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned HTTP {status}")]
    Status {
        service: &'static str,
        status: StatusCode,
    },

    #[error("unexpected {service} response: {detail}")]
    Format {
        service: &'static str,
        detail: String,
    },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl FeedError {
    pub(crate) fn format(service: &'static str, detail: impl Into<String>) -> Self {
        FeedError::Format {
            service,
            detail: detail.into(),
        }
    }
}

/// Send `req` and decode a 2xx JSON body.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    service: &'static str,
    req: reqwest::RequestBuilder,
) -> Result<T, FeedError> {
    let resp = req
        .send()
        .await
        .map_err(|source| FeedError::Request { service, source })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FeedError::Status { service, status });
    }

    resp.json::<T>()
        .await
        .map_err(|source| FeedError::Request { service, source })
}
