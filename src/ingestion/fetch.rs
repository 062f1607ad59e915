use std::time::Duration;

use bytes::{Bytes, BytesMut};
use reqwest::{Client, Response};
use thiserror::Error;

use super::parse;
use super::types::RawFeed;

pub const USER_AGENT: &str = concat!("gator/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Bodies larger than this are refused rather than buffered.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    BadStatus(u16),
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("feed parsing error: {0}")]
    Parse(#[from] rss::Error),
}

/// Anything that can turn a feed url into a decoded document.
pub trait FeedSource {
    async fn fetch(&self, url: &str) -> Result<RawFeed, FetchError>;
}

/// One bounded-time GET per call. Retrying is the scheduler's business.
pub struct Fetcher {
    client: Client,
    max_body: usize,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, max_body: MAX_BODY_BYTES })
    }
}

impl FeedSource for Fetcher {
    async fn fetch(&self, url: &str) -> Result<RawFeed, FetchError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus(status.as_u16()));
        }
        let xml = read_capped(resp, self.max_body).await?;
        let channel = parse::parse_channel(&xml)?;
        Ok(parse::raw_feed(&channel))
    }
}

// Trust a declared Content-Length only to refuse early; chunked bodies are counted as they stream.
async fn read_capped(mut resp: Response, limit: usize) -> Result<Bytes, FetchError> {
    if resp.content_length().is_some_and(|n| n > limit as u64) {
        return Err(FetchError::TooLarge { limit });
    }
    let mut buf = BytesMut::new();
    while let Some(chunk) = resp.chunk().await? {
        if buf.len() + chunk.len() > limit {
            return Err(FetchError::TooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}
