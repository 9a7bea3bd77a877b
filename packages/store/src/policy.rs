//! Timeout and retry policy for remote calls.
//!
//! Every call is raced against a timer; the losing future is dropped, which cancels
//! the request. Reads that are safe to repeat (session lookup, listing, image-URL
//! lookup) get `read_retries` extra attempts after a transient failure. Mutations are
//! never repeated, so a retry can never insert a row twice.

use std::future::Future;
use std::pin::pin;
use std::time::Duration;

use api::config::RequestsConfig;
use api::{ApiError, ApiResult};
use futures::future::{select, Either};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestPolicy {
    pub timeout: Duration,
    pub read_retries: u32,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self::from(&RequestsConfig::default())
    }
}

impl From<&RequestsConfig> for RequestPolicy {
    fn from(config: &RequestsConfig) -> Self {
        Self {
            timeout: config.timeout(),
            read_retries: config.read_retries,
        }
    }
}

impl RequestPolicy {
    /// Run a non-idempotent call once, bounded by the timeout.
    pub async fn mutation<T>(&self, call: impl Future<Output = ApiResult<T>>) -> ApiResult<T> {
        with_timeout(self.timeout, call).await
    }

    /// Run an idempotent call, retrying transient failures.
    pub async fn read<T, F, Fut>(&self, what: &str, mut call: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match with_timeout(self.timeout, call()).await {
                Err(e) if e.is_retryable() && attempt < self.read_retries => {
                    attempt += 1;
                    tracing::warn!("{} failed ({}), retrying (attempt {})", what, e, attempt + 1);
                }
                result => return result,
            }
        }
    }
}

/// Resolve `call`, or fail with [`ApiError::Timeout`] once `limit` elapses.
pub async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = ApiResult<T>>,
) -> ApiResult<T> {
    let call = pin!(call);
    let timer = pin!(sleep(limit));
    match select(call, timer).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => Err(ApiError::Timeout(limit)),
    }
}

async fn sleep(duration: Duration) {
    #[cfg(target_arch = "wasm32")]
    gloo_timers::future::sleep(duration).await;
    #[cfg(not(target_arch = "wasm32"))]
    tokio::time::sleep(duration).await;
}
