use std::error::Error as StdError;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;

use crate::{FailureKind, FetchError, FetchMetadata, FetchOutput};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Skip TLS certificate verification. Self-signed, expired and
    /// mismatched certificates are all accepted while this is set.
    pub accept_invalid_certs: bool,
    /// Treat non-2xx responses as failures instead of parsing their body.
    pub error_for_status: bool,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            accept_invalid_certs: true,
            error_for_status: false,
            redirect_limit: 10,
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError>;
}

/// HTTP fetcher backed by a single pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = build_client(&settings)?;
        Ok(Self { client, settings })
    }

    fn too_large(&self, actual: u64) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            format!(
                "response too large: {actual} bytes exceeds limit of {}",
                self.settings.max_bytes
            ),
        )
    }
}

fn build_client(settings: &FetchSettings) -> Result<reqwest::Client, FetchError> {
    if settings.accept_invalid_certs {
        engine_warn!("TLS certificate verification is disabled for outbound requests");
    }

    let redirect_limit = settings.redirect_limit;
    let policy = reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > redirect_limit {
            attempt.error("redirect limit exceeded")
        } else {
            attempt.follow()
        }
    });

    reqwest::Client::builder()
        .user_agent(settings.user_agent.clone())
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(policy)
        .danger_accept_invalid_certs(settings.accept_invalid_certs)
        .build()
        .map_err(|err| FetchError::new(FailureKind::Network, describe_error(&err)))
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|err| {
            FetchError::new(FailureKind::InvalidUrl, format!("invalid url {url:?}: {err}"))
        })?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            if self.settings.error_for_status {
                return Err(FetchError::new(
                    FailureKind::HttpStatus(status.as_u16()),
                    format!("http status {status} for url {final_url}"),
                ));
            }
            engine_debug!("{final_url} answered {status}, parsing body anyway");
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        let metadata = FetchMetadata {
            final_url,
            status: status.as_u16(),
            content_type,
            byte_len: bytes.len() as u64,
        };

        Ok(FetchOutput { bytes, metadata })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    let message = describe_error(&err);
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, message);
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, message);
    }
    FetchError::new(FailureKind::Network, message)
}

/// Flattens an error and its sources into one line. `reqwest` keeps the
/// useful part (DNS, connection refused, TLS) in the source chain.
fn describe_error(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
