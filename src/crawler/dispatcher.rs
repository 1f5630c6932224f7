//! Bounded-concurrency fetch dispatcher
//!
//! This module handles:
//! - FIFO admission of outbound fetches, at most `max_parallel` in flight
//! - Failure classification (4xx permanent, everything else non-2xx transient)
//! - Retry by re-enqueueing, with exponential backoff and a retry cap
//! - Per-request timeouts
//! - Feeding fetch durations into the throughput estimator

use crate::config::CrawlerConfig;
use crate::crawler::estimator::ThroughputEstimator;
use crate::crawler::transport::{Transport, TransportResponse};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;

/// Default number of concurrent fetches
pub const DEFAULT_MAX_PARALLEL: usize = 5;

/// Successful (2xx) fetch
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

/// Terminal fetch failures surfaced to the caller
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    ClientError { url: String, status: u16 },

    #[error("Gave up on {url} after {attempts} attempts: {last_error}")]
    RetryExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::ClientError { url, .. } | Self::RetryExhausted { url, .. } => url,
        }
    }
}

/// Retry schedule for transient failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`,
    /// capped at `max_delay`
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Tunables of a [`FetchDispatcher`]
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub max_parallel: usize,
    pub max_samples: usize,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
            max_samples: super::estimator::DEFAULT_MAX_SAMPLES,
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&CrawlerConfig> for DispatcherSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_parallel: config.max_parallel_requests as usize,
            max_samples: config.max_samples as usize,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base_delay: Duration::from_millis(config.retry_base_delay_ms),
                max_delay: Duration::from_millis(config.retry_max_delay_ms),
            },
        }
    }
}

/// Outcome of a single transport attempt
enum Attempt {
    Success(FetchResult),
    Permanent(FetchError),
    Transient(String),
}

/// Increments a counter for as long as the gauge is alive
struct Gauge<'a>(&'a AtomicUsize);

impl<'a> Gauge<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Gauge<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Single bounded-concurrency queue for every outbound fetch
///
/// Callers suspend in [`submit`](Self::submit) until their fetch completes.
/// Waiting callers are admitted in FIFO order as permits free up, so
/// concurrency converges to `min(max_parallel, queued + active)` without a
/// scheduler task: each completion hands its permit to the oldest waiter.
pub struct FetchDispatcher {
    transport: Arc<dyn Transport>,
    permits: Semaphore,
    max_parallel: usize,
    active: AtomicUsize,
    queued: AtomicUsize,
    attempts: AtomicU64,
    estimator: Mutex<ThroughputEstimator>,
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl FetchDispatcher {
    pub fn new(transport: Arc<dyn Transport>, settings: DispatcherSettings) -> Self {
        let max_parallel = settings.max_parallel.max(1);
        Self {
            transport,
            permits: Semaphore::new(max_parallel),
            max_parallel,
            active: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
            attempts: AtomicU64::new(0),
            estimator: Mutex::new(ThroughputEstimator::new(settings.max_samples)),
            request_timeout: settings.request_timeout,
            retry: settings.retry,
        }
    }

    /// Fetches `url`, retrying transient failures
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResult)` - A 2xx response
    /// * `Err(FetchError::ClientError)` - A 4xx response; never retried
    /// * `Err(FetchError::RetryExhausted)` - Transient failures outlasted the
    ///   retry policy
    pub async fn submit(&self, url: &str) -> Result<FetchResult, FetchError> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let reason = match self.attempt(url).await {
                Attempt::Success(result) => return Ok(result),
                Attempt::Permanent(e) => return Err(e),
                Attempt::Transient(reason) => reason,
            };

            if attempt > self.retry.max_retries {
                tracing::error!("xxx {} ({}), giving up after {} attempts", url, reason, attempt);
                return Err(FetchError::RetryExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    last_error: reason,
                });
            }

            let delay = self.retry.backoff(attempt);
            tracing::warn!(
                "xxx {} ({}), retrying in {:?} (attempt {}/{})",
                url,
                reason,
                delay,
                attempt,
                self.retry.max_retries + 1
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Waits for admission and issues one transport call
    async fn attempt(&self, url: &str) -> Attempt {
        tracing::trace!("+++ {}", url);

        let permit = {
            let _waiting = Gauge::enter(&self.queued);
            self.permits.acquire().await
        };
        // The semaphore is owned by the dispatcher and never closed
        let Ok(_permit) = permit else {
            return Attempt::Transient("admission queue closed".to_string());
        };

        let started = Instant::now();
        let outcome = {
            let _active = Gauge::enter(&self.active);
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("Requests: {} Queue: {}", self.in_flight(), self.queued());
            tracing::trace!("--> {}", url);

            tokio::time::timeout(self.request_timeout, self.transport.get(url)).await
        };
        self.record_sample(started.elapsed());
        tracing::trace!("<-- {}", url);

        match outcome {
            Err(_) => Attempt::Transient(format!("timed out after {:?}", self.request_timeout)),
            Ok(Err(e)) => Attempt::Transient(e.to_string()),
            Ok(Ok(response)) => classify(url, response),
        }
    }

    fn record_sample(&self, elapsed: Duration) {
        self.estimator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record(elapsed);
    }

    /// Estimated time to drain in-flight and queued fetches plus `pending`
    /// future ones. None until the first fetch has completed.
    pub fn estimate_remaining(&self, pending: usize) -> Option<Duration> {
        let outstanding = self.in_flight() + self.queued() + pending;
        self.estimator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .estimate(outstanding)
    }

    /// Number of transport calls currently in flight
    pub fn in_flight(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Number of callers waiting for admission
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Total number of transport calls issued so far, retries included
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }
}

/// Classifies a received response
fn classify(url: &str, response: TransportResponse) -> Attempt {
    match response.status {
        200..=299 => Attempt::Success(FetchResult {
            status: response.status,
            body: response.body,
        }),
        status @ 400..=499 => {
            tracing::warn!("xxx {} (HTTP {})", url, status);
            Attempt::Permanent(FetchError::ClientError {
                url: url.to_string(),
                status,
            })
        }
        status => Attempt::Transient(format!("HTTP {}", status)),
    }
}
