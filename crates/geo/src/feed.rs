//! Channel-fed location source.
//!
//! Whatever produces readings (device GPS callback, replayed track, test)
//! pushes them in; one-shot requests and watches are served from the feed
//! with the staleness and timeout policy of [`LocationOptions`].

use crate::position::{Fix, Position};
use crate::source::{LocationError, LocationOptions, LocationSource, Result};
use crate::watch::LocationWatch;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Number of readings buffered per subscriber before old ones are skipped.
pub const DEFAULT_FEED_CAPACITY: usize = 64;

/// Buffered readings between the watch task and its consumer.
const WATCH_BUFFER: usize = 16;

/// Something the backend reports.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Fix(Fix),
    PermissionDenied,
    Unavailable(String),
}

struct FeedInner {
    tx: broadcast::Sender<FeedEvent>,
    last_fix: Mutex<Option<Fix>>,
}

/// Location source backed by a broadcast feed of readings.
#[derive(Clone)]
pub struct FeedLocationSource {
    inner: Arc<FeedInner>,
}

impl Default for FeedLocationSource {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }
}

impl FeedLocationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(FeedInner {
                tx,
                last_fix: Mutex::new(None),
            }),
        }
    }

    /// Push a reading captured now.
    pub fn push(&self, position: Position) {
        self.push_fix(Fix::now(position));
    }

    pub fn push_fix(&self, fix: Fix) {
        *self
            .inner
            .last_fix
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(fix);
        // No subscribers is fine: the reading is still cached.
        let _ = self.inner.tx.send(FeedEvent::Fix(fix));
    }

    pub fn deny_permission(&self) {
        let _ = self.inner.tx.send(FeedEvent::PermissionDenied);
    }

    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self.inner.tx.send(FeedEvent::Unavailable(reason.into()));
    }

    pub fn last_fix(&self) -> Option<Fix> {
        *self
            .inner
            .last_fix
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live subscribers (one-shot waits and watches).
    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }

    fn fresh_cached(&self, options: &LocationOptions) -> Option<Fix> {
        let fix = self.last_fix()?;
        let age_ms = fix.age_ms(chrono::Utc::now().timestamp_millis());
        if options.maximum_age.is_zero() || age_ms > options.maximum_age.as_millis() as u64 {
            tracing::trace!(age_ms, "cached fix too old, waiting for a new one");
            return None;
        }
        Some(fix)
    }
}

async fn next_fix(rx: &mut broadcast::Receiver<FeedEvent>) -> Result<Position> {
    loop {
        match rx.recv().await {
            Ok(FeedEvent::Fix(fix)) => return Ok(fix.position),
            Ok(FeedEvent::PermissionDenied) => return Err(LocationError::PermissionDenied),
            Ok(FeedEvent::Unavailable(reason)) => return Err(LocationError::Unavailable(reason)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "location feed lagged, skipping old readings");
            }
            Err(broadcast::error::RecvError::Closed) => {
                return Err(LocationError::Unavailable("location feed closed".to_string()));
            }
        }
    }
}

#[async_trait]
impl LocationSource for FeedLocationSource {
    async fn current_position(&self, options: &LocationOptions) -> Result<Position> {
        // Subscribe before looking at the cache so a reading pushed in between is not lost.
        let mut rx = self.inner.tx.subscribe();
        if let Some(fix) = self.fresh_cached(options) {
            return Ok(fix.position);
        }

        match tokio::time::timeout(options.timeout, next_fix(&mut rx)).await {
            Ok(result) => result,
            Err(_) => Err(LocationError::Timeout(options.timeout)),
        }
    }

    fn watch_position(&self, options: LocationOptions) -> LocationWatch {
        let mut feed = self.inner.tx.subscribe();
        let cached = self.fresh_cached(&options);
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            tracing::debug!(
                timeout = ?options.timeout,
                maximum_age = ?options.maximum_age,
                high_accuracy = options.high_accuracy,
                "location watch started"
            );

            if let Some(fix) = cached {
                if tx.send(Ok(fix.position)).await.is_err() {
                    return;
                }
            }

            loop {
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    next = tokio::time::timeout(options.timeout, next_fix(&mut feed)) => next,
                };

                match next {
                    Ok(Ok(position)) => {
                        if tx.send(Ok(position)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "location watch failed");
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                    Err(_) => {
                        tracing::warn!(timeout = ?options.timeout, "location watch timed out");
                        let _ = tx.send(Err(LocationError::Timeout(options.timeout))).await;
                        break;
                    }
                }
            }

            tracing::debug!("location watch stopped");
        });

        LocationWatch::new(rx, cancel)
    }
}

impl std::fmt::Debug for FeedLocationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedLocationSource")
            .field("last_fix", &self.last_fix())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
