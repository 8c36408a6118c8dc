use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::{fmt::Debug, time::Duration};

use crate::error::FetchError;

/// A single parameterized GET returning a JSON body.
///
/// Implementations perform no retries; retrying is a caller decision.
#[async_trait]
pub trait Fetcher: Send + Sync + Debug {
    async fn request(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<Value, FetchError>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn request(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<Value, FetchError> {
        let res = self
            .http
            .get(endpoint)
            .query(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = res.status();
        let body = res.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            tracing::debug!(%status, endpoint, "request failed");
            return Err(classify_status(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| FetchError::UnknownServer {
            status: Some(status.as_u16()),
            detail: format!("response body is not JSON: {e}"),
        })
    }
}

fn classify_transport(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::NetworkUnreachable(err.to_string())
    }
}

fn classify_status(status: StatusCode, body: &str) -> FetchError {
    match status {
        StatusCode::NOT_FOUND => FetchError::NotFound,
        StatusCode::UNAUTHORIZED => FetchError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited,
        other => FetchError::UnknownServer {
            status: Some(other.as_u16()),
            detail: truncate_body(body),
        },
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
