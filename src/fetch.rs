//! Bounded-concurrency page fetching.
//!
//! At most `limit` requests are in flight at once across the whole run, and
//! at most `limit` against any single host. Permits are held only while a
//! request is in flight and its body is being read; the politeness pause
//! taken by callers afterwards does not occupy a slot.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::Client;
use tokio::sync::Semaphore;
use url::Url;

use crate::types::{CancelFlag, IngestError};

pub const USER_AGENT: &str = "webglean-ingest/0.1 (+https://github.com/webglean/webglean)";

/// Issues page requests under a global in-flight cap and a per-host cap.
pub struct Fetcher {
    client: Client,
    global: Semaphore,
    per_host: Mutex<HashMap<String, Arc<Semaphore>>>,
    limit: usize,
    cancel: CancelFlag,
    metrics: Arc<FetchMetrics>,
}

impl Fetcher {
    /// Builds a fetcher with the given in-flight limit and per-request timeout.
    pub fn new(limit: usize, timeout: Duration, cancel: CancelFlag) -> Result<Self, IngestError> {
        let limit = limit.max(1);
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            global: Semaphore::new(limit),
            per_host: Mutex::new(HashMap::new()),
            limit,
            cancel,
            metrics: Arc::new(FetchMetrics::default()),
        })
    }

    /// Counters observed during the run, shared with the pipeline summary.
    pub fn metrics(&self) -> Arc<FetchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Fetches one page and returns its body text.
    ///
    /// Failures are tagged with the URL and never affect other in-flight
    /// fetches. Returns [`IngestError::Interrupted`] without issuing the
    /// request when the run has been cancelled.
    pub async fn fetch(&self, url: &str) -> Result<String, IngestError> {
        let host = self.host_semaphore(url);
        let _host_permit = host
            .acquire_owned()
            .await
            .expect("per-host fetch semaphore closed");
        let _global_permit = self
            .global
            .acquire()
            .await
            .expect("global fetch semaphore closed");

        if self.cancel.is_cancelled() {
            return Err(IngestError::Interrupted);
        }

        self.metrics.enter();
        let result = self.fetch_inner(url).await;
        self.metrics.exit();
        match &result {
            Ok(_) => self.metrics.record_fetched(),
            Err(_) => self.metrics.record_fetch_error(),
        }
        result
    }

    async fn fetch_inner(&self, url: &str) -> Result<String, IngestError> {
        let tag = |err: reqwest::Error| IngestError::Fetch {
            url: url.to_string(),
            message: err.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(tag)?;
        let response = response.error_for_status().map_err(tag)?;
        response.text().await.map_err(tag)
    }

    /// Semaphore for the URL's host, created on first use. URLs without a
    /// parseable host share one bucket; they fail at request time anyway.
    fn host_semaphore(&self, url: &str) -> Arc<Semaphore> {
        let host = Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_string))
            .unwrap_or_default();

        let mut hosts = self.per_host.lock();
        Arc::clone(
            hosts
                .entry(host)
                .or_insert_with(|| Arc::new(Semaphore::new(self.limit))),
        )
    }
}

/// In-flight accounting plus success/failure counters for one run.
#[derive(Debug, Default)]
pub struct FetchMetrics {
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    pages_fetched: AtomicUsize,
    fetch_errors: AtomicUsize,
}

impl FetchMetrics {
    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::AcqRel);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    fn record_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    fn record_fetch_error(&self) {
        self.fetch_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Highest number of simultaneously in-flight fetches observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Acquire)
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched.load(Ordering::Relaxed)
    }

    pub fn fetch_errors(&self) -> usize {
        self.fetch_errors.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_semaphores_are_reused_per_host() {
        let fetcher = Fetcher::new(2, Duration::from_secs(1), CancelFlag::new()).unwrap();
        let a1 = fetcher.host_semaphore("http://a.test/x");
        let a2 = fetcher.host_semaphore("http://a.test/y");
        let b = fetcher.host_semaphore("http://b.test/");

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(a1.available_permits(), 2);
    }

    #[test]
    fn metrics_track_peak() {
        let metrics = FetchMetrics::default();
        metrics.enter();
        metrics.enter();
        metrics.exit();
        metrics.enter();
        assert_eq!(metrics.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn cancelled_fetcher_refuses_new_requests() {
        let cancel = CancelFlag::new();
        let fetcher = Fetcher::new(1, Duration::from_secs(1), cancel.clone()).unwrap();
        cancel.cancel();

        let err = fetcher.fetch("http://unreachable.test/").await.unwrap_err();
        assert!(matches!(err, IngestError::Interrupted));
        assert_eq!(fetcher.metrics().fetch_errors(), 0);
    }
}
