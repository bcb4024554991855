use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::config::EngineConfig;
use crate::error::{AdapterError, PredictError};
use crate::fetch::{Activation, FetchRequest, SourceAdapter};
use crate::models::RawEvidence;
use crate::query::{EnhancedQuery, Topic};
use crate::reputation::{is_blacklisted_url, is_spam};
use crate::similarity::normalize_title;

#[derive(Debug, Clone, PartialEq)]
pub enum AdapterOutcome {
    Ok,
    Failed(String),
    TimedOut,
}

/// What one adapter call contributed, for logging and diagnostics.
#[derive(Debug, Clone)]
pub struct AdapterReport {
    pub provider: String,
    pub outcome: AdapterOutcome,
    pub records: usize,
    pub elapsed: Duration,
}

pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    per_adapter_limit: usize,
    default_timeout: Duration,
    min_title_chars: usize,
}

impl Aggregator {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, config: &EngineConfig) -> Self {
        Self {
            adapters,
            per_adapter_limit: config.per_adapter_limit,
            default_timeout: config.adapter_timeout(),
            min_title_chars: config.min_title_chars,
        }
    }

    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Always-on adapters, plus financial ones for finance and crypto topics.
    pub fn applicable(&self, topic: Topic) -> Vec<Arc<dyn SourceAdapter>> {
        self.adapters
            .iter()
            .filter(|a| match a.activation() {
                Activation::Always => true,
                Activation::FinancialOnly => topic.is_financial(),
            })
            .cloned()
            .collect()
    }

    /// Fan out to every applicable adapter concurrently and wait for all of them.
    /// Results are merged in registration order, never completion order.
    pub async fn collect(&self, query: &EnhancedQuery) -> (Vec<RawEvidence>, Vec<AdapterReport>) {
        let adapters = self.applicable(query.topic);
        debug!(
            "Fan-out starting - adapters={}, topic={}, query={}",
            adapters.len(),
            query.topic,
            query.enhanced
        );

        let tasks = adapters.iter().map(|adapter| {
            let budget = adapter.timeout(self.default_timeout);
            async move {
                let start = Instant::now();
                let req = FetchRequest {
                    query: &query.enhanced,
                    limit: self.per_adapter_limit,
                    topic: query.topic,
                    tickers: &query.tickers,
                };
                let result = match tokio::time::timeout(budget, adapter.fetch(&req)).await {
                    Ok(r) => r,
                    Err(_) => Err(AdapterError::Timeout(budget)),
                };
                (adapter.name().to_string(), result, start.elapsed())
            }
        });
        let results = join_all(tasks).await;

        let mut records = Vec::new();
        let mut reports = Vec::with_capacity(results.len());
        for (provider, result, elapsed) in results {
            let report = match result {
                Ok(batch) => {
                    if batch.is_empty() {
                        debug!("Adapter returned no results - provider={}", provider);
                    } else {
                        info!(
                            "Adapter completed - provider={}, duration={:.2}s, records={}",
                            provider,
                            elapsed.as_secs_f32(),
                            batch.len()
                        );
                    }
                    let n = batch.len();
                    records.extend(batch);
                    AdapterReport {
                        provider,
                        outcome: AdapterOutcome::Ok,
                        records: n,
                        elapsed,
                    }
                }
                Err(AdapterError::Timeout(budget)) => {
                    warn!("Adapter timed out - provider={}, budget={}s", provider, budget.as_secs());
                    AdapterReport {
                        provider,
                        outcome: AdapterOutcome::TimedOut,
                        records: 0,
                        elapsed,
                    }
                }
                Err(e) => {
                    warn!("Adapter failed - provider={}, error={}", provider, e);
                    AdapterReport {
                        provider,
                        outcome: AdapterOutcome::Failed(e.to_string()),
                        records: 0,
                        elapsed,
                    }
                }
            };
            reports.push(report);
        }

        (records, reports)
    }

    /// Collect, filter and deduplicate. An empty result is the one fatal outcome here.
    pub async fn aggregate(&self, query: &EnhancedQuery) -> Result<Vec<RawEvidence>, PredictError> {
        let start = Instant::now();
        let (raw, reports) = self.collect(query).await;
        let failed = reports.iter().filter(|r| r.outcome != AdapterOutcome::Ok).count();
        let raw_count = raw.len();

        let cleaned = clean(raw, self.min_title_chars);
        info!(
            "Aggregation completed - duration={:.2}s, adapters={}, failed={}, raw={}, kept={}",
            start.elapsed().as_secs_f32(),
            reports.len(),
            failed,
            raw_count,
            cleaned.len()
        );

        if cleaned.is_empty() {
            return Err(PredictError::EmptyEvidence {
                query: query.original.clone(),
            });
        }
        Ok(cleaned)
    }
}

fn is_usable(rec: &RawEvidence, min_title_chars: usize) -> bool {
    let title = rec.title.trim();
    if title.is_empty() || title.chars().count() < min_title_chars {
        return false;
    }
    if is_spam(title) || is_spam(&rec.body) {
        return false;
    }
    !rec.url.as_deref().is_some_and(is_blacklisted_url)
}

/// Drop short, spammy and blacklisted records, then deduplicate.
pub fn clean(records: Vec<RawEvidence>, min_title_chars: usize) -> Vec<RawEvidence> {
    let before = records.len();
    let usable: Vec<RawEvidence> = records
        .into_iter()
        .filter(|r| is_usable(r, min_title_chars))
        .collect();
    let filtered = before - usable.len();
    let deduped = dedup(usable);
    debug!(
        "Cleaning - filtered={}, duplicates={}, retained={}",
        filtered,
        before - filtered - deduped.len(),
        deduped.len()
    );
    deduped
}

/// First-seen wins. Two records collide on the normalized title or on an identical URL.
pub fn dedup(records: Vec<RawEvidence>) -> Vec<RawEvidence> {
    let mut seen_titles: HashSet<u64> = HashSet::new();
    let mut seen_urls: HashSet<u64> = HashSet::new();

    records
        .into_iter()
        .filter(|r| {
            let title_key = xxh3_64(normalize_title(&r.title).as_bytes());
            let url_key = r
                .url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(|u| xxh3_64(u.as_bytes()));

            let dup = seen_titles.contains(&title_key)
                || url_key.is_some_and(|k| seen_urls.contains(&k));
            // only kept records claim keys
            if !dup {
                seen_titles.insert(title_key);
                if let Some(k) = url_key {
                    seen_urls.insert(k);
                }
            }
            !dup
        })
        .collect()
}
