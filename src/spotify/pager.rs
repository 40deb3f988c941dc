//! Cursor-following pagination over Spotify collection endpoints.
//!
//! A [`Paginator`] turns any [`PageSource`] into a lazy sequence of raw JSON
//! records. Rate limiting, transient failures and cancellation are handled
//! here so that callers only ever see records or a final [`BackupError`].

use std::{collections::VecDeque, fmt, future::Future, sync::Arc, time::Duration};

use futures::Stream;
use serde_json::Value;
use tokio::{sync::Mutex, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{BackupError, FetchError},
    warning,
};

/// Resume position inside a remote collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// The first page of the collection.
    First,
    /// A `next` URL returned by the previous page.
    Next(String),
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::First => write!(f, "first page"),
            Cursor::Next(url) => write!(f, "{url}"),
        }
    }
}

/// One batch of records plus the pointer to the next batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub next: Option<String>,
    pub total: Option<u64>,
}

impl Page {
    /// Reads a Spotify paging object.
    ///
    /// `envelope` names the key the paging object is nested under, which is
    /// `artists` for the followed-artists endpoint and absent everywhere else.
    pub fn from_json(mut body: Value, envelope: Option<&str>) -> Result<Self, FetchError> {
        let mut paging = match envelope {
            Some(key) => body.get_mut(key).map(Value::take).unwrap_or(Value::Null),
            None => body,
        };

        let items = match paging.get_mut("items").map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(FetchError::Malformed(
                    "paging object without an items array".to_string(),
                ));
            }
        };

        Ok(Page {
            items,
            next: paging["next"].as_str().map(str::to_string),
            total: paging["total"].as_u64(),
        })
    }
}

/// Anything that can fetch a page of a collection for a cursor.
pub trait PageSource {
    fn fetch(&self, cursor: &Cursor) -> impl Future<Output = Result<Page, FetchError>> + Send;
}

impl<S: PageSource> PageSource for &S {
    fn fetch(&self, cursor: &Cursor) -> impl Future<Output = Result<Page, FetchError>> + Send {
        (**self).fetch(cursor)
    }
}

/// How often and how long to retry failed requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Wait before the first retry; doubled for every further retry.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Wait used when a 429 response carries no `Retry-After` header.
    pub rate_limit_fallback: Duration,
    /// Longest `Retry-After` that is honoured before giving up.
    pub max_rate_limit_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            rate_limit_fallback: Duration::from_secs(5),
            max_rate_limit_wait: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `retry` (starting at 1).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Rate-limit budget shared by every request of a run.
///
/// A 429 on one section closes the gate until the server's retry instant, so
/// concurrently running sections wait instead of retrying on their own.
#[derive(Debug, Default)]
pub struct RateLimitGate {
    blocked_until: Mutex<Option<Instant>>,
}

impl RateLimitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the gate for at least `wait` from now.
    pub async fn block_for(&self, wait: Duration) {
        let until = Instant::now() + wait;
        let mut blocked = self.blocked_until.lock().await;
        if blocked.is_none_or(|current| current < until) {
            *blocked = Some(until);
        }
    }

    /// Waits until the gate is open or the run is cancelled.
    pub async fn wait_open(&self, cancel: &CancellationToken) -> Result<(), BackupError> {
        loop {
            let until = *self.blocked_until.lock().await;
            match until {
                Some(until) if until > Instant::now() => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(BackupError::Cancelled),
                        _ = tokio::time::sleep_until(until) => {}
                    }
                }
                _ => return Ok(()),
            }
        }
    }
}

/// Retry settings, rate-limit gate and cancellation shared by all paginators
/// of one run.
#[derive(Debug, Clone, Default)]
pub struct PagerContext {
    pub policy: RetryPolicy,
    pub gate: Arc<RateLimitGate>,
    pub cancel: CancellationToken,
}

impl PagerContext {
    pub fn new(policy: RetryPolicy, cancel: CancellationToken) -> Self {
        PagerContext {
            policy,
            gate: Arc::new(RateLimitGate::new()),
            cancel,
        }
    }

    async fn pause(&self, wait: Duration) -> Result<(), BackupError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(BackupError::Cancelled),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }
}

/// Runs `op` until it succeeds, applying the rate-limit and retry rules.
///
/// `cursor` only labels the errors; the operation itself decides what it
/// fetches.
pub async fn with_retry<T, F, Fut>(
    ctx: &PagerContext,
    cursor: &Cursor,
    mut op: F,
) -> Result<T, BackupError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut retries = 0;

    loop {
        if ctx.cancel.is_cancelled() {
            return Err(BackupError::Cancelled);
        }
        ctx.gate.wait_open(&ctx.cancel).await?;

        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        match err {
            FetchError::RateLimited { retry_after } => {
                let wait = retry_after.unwrap_or(ctx.policy.rate_limit_fallback);
                if wait > ctx.policy.max_rate_limit_wait {
                    warning!(
                        "Retry after has reached an abnormal high of {} seconds. Try again later.",
                        wait.as_secs()
                    );
                    return Err(BackupError::FetchFailed {
                        cursor: cursor.clone(),
                        reason: format!("rate limited for {}s", wait.as_secs()),
                    });
                }
                ctx.gate.block_for(wait).await;
            }
            FetchError::Unauthorized { status } => return Err(BackupError::Auth { status }),
            FetchError::NotFound => {
                return Err(BackupError::Unavailable {
                    cursor: cursor.clone(),
                });
            }
            FetchError::Rejected { .. } => {
                return Err(BackupError::FetchFailed {
                    cursor: cursor.clone(),
                    reason: err.to_string(),
                });
            }
            FetchError::Transient(_) | FetchError::Malformed(_) => {
                retries += 1;
                if retries > ctx.policy.max_retries {
                    return Err(BackupError::FetchFailed {
                        cursor: cursor.clone(),
                        reason: err.to_string(),
                    });
                }
                let wait = ctx.policy.backoff(retries);
                warning!(
                    "Request for {} failed ({}), retrying in {}ms ({}/{})",
                    cursor,
                    err,
                    wait.as_millis(),
                    retries,
                    ctx.policy.max_retries
                );
                ctx.pause(wait).await?;
            }
        }
    }
}

/// Lazy, finite sequence of the records of one collection.
pub struct Paginator<S> {
    source: S,
    ctx: PagerContext,
    cursor: Option<Cursor>,
    buffer: VecDeque<Value>,
    fetched: usize,
    total: Option<u64>,
}

impl<S: PageSource> Paginator<S> {
    pub fn new(source: S, ctx: PagerContext) -> Self {
        Paginator {
            source,
            ctx,
            cursor: Some(Cursor::First),
            buffer: VecDeque::new(),
            fetched: 0,
            total: None,
        }
    }

    /// Number of records handed out so far.
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    /// Collection size as reported by the server, once a page was loaded.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Returns true once every record of the last loaded page was handed out.
    pub fn page_drained(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the next record, loading the next page when needed.
    ///
    /// After an error the sequence ends.
    pub async fn next_record(&mut self) -> Option<Result<Value, BackupError>> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                self.fetched += 1;
                return Some(Ok(record));
            }

            let cursor = self.cursor.take()?;
            let source = &self.source;
            match with_retry(&self.ctx, &cursor, || source.fetch(&cursor)).await {
                Ok(page) => {
                    if page.total.is_some() {
                        self.total = page.total;
                    }
                    self.buffer.extend(page.items);
                    self.cursor = page.next.map(Cursor::Next);
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }

    /// Drains the whole collection.
    pub async fn collect_all(mut self) -> Result<Vec<Value>, BackupError> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record().await {
            records.push(record?);
        }
        Ok(records)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Value, BackupError>> {
        futures::stream::unfold(self, |mut pager| async move {
            pager.next_record().await.map(|record| (record, pager))
        })
    }
}
