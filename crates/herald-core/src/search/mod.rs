pub mod normalize;
pub mod safety;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use herald_store::Store;
use herald_types::api::{SearchRequest, SearchResponse};
use herald_types::config::ConfigHandle;
use herald_types::models::{MessageRecord, ViewerCapabilities};
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::ratelimit::{RateLimits, SearchRateLimiter};
use crate::redact::redact;
use crate::run_blocking;

const WORKER_POOL_SIZE: usize = 10;
const MAX_QUERY_LEN: usize = 1000;
const COMPILE_TIMEOUT: Duration = Duration::from_secs(2);
const MATCH_TIMEOUT: Duration = Duration::from_millis(100);

/// Rate-limited, parallel, two-mode search over the message corpus within a
/// time window. Candidates come from the feed index's score range, so the
/// scan is bounded by the window, not by total corpus size.
pub struct SearchEngine {
    store: Arc<Store>,
    config: ConfigHandle,
    limiter: SearchRateLimiter,
}

enum Matcher {
    /// Simple mode: normalized literal tokens, AND semantics.
    Tokens(Vec<String>),
    /// Advanced mode: a validated, compile-bounded regex run against the
    /// raw text/author with a per-candidate timeout.
    Pattern(Arc<Regex>),
}

impl Matcher {
    fn matches(&self, record: &MessageRecord) -> bool {
        match self {
            Matcher::Tokens(tokens) => {
                normalize::matches_all_tokens(tokens, &record.text, &record.author)
            }
            Matcher::Pattern(re) => {
                match_with_timeout(re, &record.text, &record.author, MATCH_TIMEOUT)
            }
        }
    }
}

impl SearchEngine {
    pub fn new(store: Arc<Store>, config: ConfigHandle) -> Self {
        Self {
            store,
            config,
            limiter: SearchRateLimiter::new(),
        }
    }

    pub async fn search(
        &self,
        request: SearchRequest,
        caps: &ViewerCapabilities,
        cancel: CancellationToken,
    ) -> Result<SearchResponse> {
        let started = Instant::now();
        let config = self.config.current();

        let Some(user) = caps.identity.clone().filter(|id| !id.is_empty()) else {
            return Err(CoreError::Forbidden("search requires a signed-in user".into()));
        };

        // All validation happens before any store access.
        if request.query.is_empty() {
            return Err(CoreError::InvalidQuery("query cannot be empty".into()));
        }
        if request.query.len() > MAX_QUERY_LEN {
            return Err(CoreError::InvalidQuery(format!(
                "query too long (max {MAX_QUERY_LEN} characters)"
            )));
        }

        let limit = if request.limit <= 0 || request.limit > 100 {
            20
        } else {
            request.limit as usize
        };
        let offset = request.offset.max(0) as usize;
        let days_back = if request.days_back <= 0 {
            config.search_days_back_default
        } else {
            request.days_back.min(config.search_days_back_max)
        };

        // The rate limit protects the scan stage, the expensive part.
        self.limiter.check(
            &user,
            &RateLimits {
                per_second: config.max_searches_per_second,
                per_minute: config.max_searches_per_minute,
                per_hour: config.max_searches_per_hour,
            },
        )?;

        let matcher = match request.mode.as_str() {
            "advanced" => {
                safety::validate_pattern(&request.query).map_err(CoreError::InvalidQuery)?;
                Matcher::Pattern(Arc::new(
                    compile_with_timeout(request.query.clone()).await?,
                ))
            }
            // anything else falls back to simple mode
            _ => {
                let tokens = normalize::tokens(&request.query);
                if tokens.is_empty() {
                    return Err(CoreError::InvalidQuery("query cannot be empty".into()));
                }
                Matcher::Tokens(tokens)
            }
        };

        let min_ts = (Utc::now() - chrono::Duration::days(days_back)).timestamp_millis();
        let store = self.store.clone();
        let candidates = run_blocking(move || store.search_candidates(min_ts)).await?;

        let mut matched = self
            .scan(candidates, matcher, caps.elevated(), cancel)
            .await;

        // Newest first; the sort is stable, so scan insertion order breaks
        // the (unexpected) timestamp ties.
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total = matched.len();
        let results: Vec<MessageRecord> = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|record| redact(record, caps, &config))
            .collect();
        let has_more = offset + results.len() < total;

        Ok(SearchResponse {
            results,
            total,
            query: request.query,
            has_more,
            took_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Fan candidate IDs out to a fixed-size worker pool. Each worker
    /// fetches, filters, and matches independently; a single candidate's
    /// failure never fails the search. Workers poll the cancellation token
    /// before every unit of work.
    async fn scan(
        &self,
        candidates: Vec<i64>,
        matcher: Matcher,
        include_deleted: bool,
        cancel: CancellationToken,
    ) -> Vec<MessageRecord> {
        let (tx, rx) = crossbeam_channel::unbounded();
        for id in candidates {
            let _ = tx.send(id);
        }
        drop(tx);

        let matcher = Arc::new(matcher);
        let matched = Arc::new(Mutex::new(Vec::new()));

        let mut workers = Vec::with_capacity(WORKER_POOL_SIZE);
        for _ in 0..WORKER_POOL_SIZE {
            let rx = rx.clone();
            let store = self.store.clone();
            let matcher = matcher.clone();
            let matched = matched.clone();
            let cancel = cancel.clone();

            workers.push(tokio::task::spawn_blocking(move || {
                while let Ok(id) = rx.recv() {
                    if cancel.is_cancelled() {
                        return;
                    }

                    let record = match store.get_message(id) {
                        Ok(Some(record)) => record,
                        Ok(None) => continue,
                        Err(err) => {
                            warn!("search worker failed to load message {id}: {err:#}");
                            continue;
                        }
                    };

                    if record.deleted && !include_deleted {
                        continue;
                    }
                    if record.is_thread_reply() {
                        continue;
                    }
                    if !matcher.matches(&record) {
                        continue;
                    }

                    if let Ok(mut matched) = matched.lock() {
                        matched.push(record);
                    }
                }
            }));
        }

        for worker in workers {
            if let Err(err) = worker.await {
                warn!("search worker panicked: {err}");
            }
        }

        let mut guard = matched
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *guard)
    }
}

/// Compile on a background task with a hard timeout; an abandoned attempt
/// keeps running but its result is dropped.
async fn compile_with_timeout(pattern: String) -> Result<Regex> {
    let attempt = tokio::task::spawn_blocking(move || Regex::new(&pattern));
    match tokio::time::timeout(COMPILE_TIMEOUT, attempt).await {
        Err(_) => Err(CoreError::InvalidQuery(
            "pattern compilation timed out".into(),
        )),
        Ok(Err(join)) => Err(CoreError::Store(anyhow::anyhow!(
            "regex compilation task failed: {join}"
        ))),
        Ok(Ok(Err(err))) => Err(CoreError::InvalidQuery(format!("invalid pattern: {err}"))),
        Ok(Ok(Ok(re))) => Ok(re),
    }
}

/// Match with a per-candidate deadline. Timing out counts as a non-match for
/// this candidate only — it fails open to "no match", never to an error.
fn match_with_timeout(re: &Arc<Regex>, text: &str, author: &str, timeout: Duration) -> bool {
    let (tx, rx) = std::sync::mpsc::channel();
    let re = re.clone();
    let text = text.to_string();
    let author = author.to_string();

    std::thread::spawn(move || {
        let _ = tx.send(re.is_match(&text) || re.is_match(&author));
    });

    rx.recv_timeout(timeout).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_timeout_fails_open_to_no_match() {
        let re = Arc::new(Regex::new("needle").unwrap());
        assert!(match_with_timeout(&re, "hay needle hay", "", MATCH_TIMEOUT));
        assert!(!match_with_timeout(&re, "just hay", "", MATCH_TIMEOUT));
        // a zero deadline expires before the match thread reports
        assert!(!match_with_timeout(
            &re,
            "hay needle hay",
            "",
            Duration::ZERO
        ));
    }

    #[tokio::test]
    async fn bounded_repetition_compiles_and_matches() {
        let re = compile_with_timeout("a{1,2}".into()).await.unwrap();
        assert!(re.is_match("aa"));
    }

    #[tokio::test]
    async fn broken_patterns_abort_with_invalid_query() {
        let err = compile_with_timeout("(unclosed".into()).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuery(_)));
    }
}
