//! Refreshing the cached usage totals from the external metering source.
//!
//! Refreshes are single-flight: concurrent callers wait for the refresh in
//! progress and reuse its result instead of issuing another upstream call.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use url::Url;

use crate::error::{CoreError, Result};
use crate::records::UsageTotals;
use crate::repository::Repository;

/// Cumulative totals as reported by the metering endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReading {
    pub tokens: u64,
    pub lines_of_code: u64,
}

impl UsageReading {
    pub fn at(self, fetched_at: DateTime<Utc>) -> UsageTotals {
        UsageTotals {
            tokens: self.tokens,
            lines_of_code: self.lines_of_code,
            fetched_at,
        }
    }
}

/// Somewhere cumulative usage totals can be fetched from.
pub trait UsageSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<UsageReading>> + Send;
}

/// Fetches `{"tokens": .., "linesOfCode": ..}` from an HTTP endpoint.
pub struct HttpUsageSource {
    url: Url,
    bearer: Option<String>,
    http_client: Client,
}

impl HttpUsageSource {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            bearer: None,
            http_client: Client::new(),
        }
    }

    /// Send a bearer token with every request.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl UsageSource for HttpUsageSource {
    async fn fetch(&self) -> Result<UsageReading> {
        let mut request = self.http_client.get(self.url.clone());
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }
        let reading = request
            .send()
            .await?
            .error_for_status()?
            .json::<UsageReading>()
            .await?;
        Ok(reading)
    }
}

/// Single-flight refresh of the stored usage totals.
pub struct UsageRefresher<S> {
    source: S,
    repo: Arc<Repository>,
    /// Held for the duration of a refresh; remembers the last result.
    last: Mutex<Option<UsageTotals>>,
}

impl<S: UsageSource> UsageRefresher<S> {
    pub fn new(source: S, repo: Arc<Repository>) -> Self {
        Self {
            source,
            repo,
            last: Mutex::new(None),
        }
    }

    /// Fetch fresh totals and store them (never lowering either axis).
    ///
    /// A caller that had to wait for another refresh gets that refresh's
    /// result. On upstream failure the stored totals are left untouched.
    pub async fn refresh(&self) -> Result<UsageTotals> {
        let requested_at = Utc::now();
        let mut last = self.last.lock().await;
        if let Some(done) = *last {
            if done.fetched_at >= requested_at {
                return Ok(done);
            }
        }

        let reading = match self.source.fetch().await {
            Ok(reading) => reading,
            Err(err) => {
                warn!(error = %err, "usage refresh failed, keeping cached totals");
                return Err(match err {
                    CoreError::Upstream(_) => err,
                    other => CoreError::Upstream(other.to_string()),
                });
            }
        };
        let stored = self.repo.store_usage_totals(reading.at(Utc::now()))?;
        info!(tokens = stored.tokens, lines = stored.lines_of_code, "usage totals refreshed");
        *last = Some(stored);
        Ok(stored)
    }
}
