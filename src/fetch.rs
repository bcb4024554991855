use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::api_types::*;
use crate::error::AdapterError;
use crate::models::{RawEvidence, Sentiment};
use crate::query::Topic;

/// When the aggregator should call an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Always,
    /// Only for finance and crypto queries.
    FinancialOnly,
}

#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub query: &'a str,
    pub limit: usize,
    pub topic: Topic,
    /// Ticker hints; only financial adapters look at these.
    pub tickers: &'a [String],
}

/// One external evidence provider.
///
/// `Ok(vec![])` means the provider answered with nothing; `Err` means the call itself
/// failed. The aggregator logs the two differently.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn activation(&self) -> Activation {
        Activation::Always
    }

    /// Per-call timeout, given the configured default.
    fn timeout(&self, default: Duration) -> Duration {
        default
    }

    async fn fetch(&self, req: &FetchRequest<'_>) -> Result<Vec<RawEvidence>, AdapterError>;
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

async fn get_json<T: serde::de::DeserializeOwned>(client: &Client, url: Url) -> Result<T, AdapterError> {
    let resp = client.get(url).send().await?.error_for_status()?;
    Ok(resp.json::<T>().await?)
}

/* ------------------------------- NewsAPI ---------------------------------- */

pub struct NewsApi {
    client: Client,
    api_key: String,
}

impl NewsApi {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }
}

pub fn news_api_records(resp: NewsApiResponse, limit: usize) -> Result<Vec<RawEvidence>, AdapterError> {
    if resp.status != "ok" {
        return Err(AdapterError::Decode(
            resp.message.unwrap_or_else(|| format!("status={}", resp.status)),
        ));
    }
    Ok(resp
        .articles
        .into_iter()
        .filter_map(|a| {
            let title = a.title.filter(|t| !t.trim().is_empty())?;
            let mut rec = RawEvidence::new("NewsAPI", title).with_body(a.description.unwrap_or_default());
            rec.url = a.url;
            rec.publisher = a.source.name;
            rec.published_at = a.published_at.as_deref().and_then(parse_rfc3339);
            Some(rec)
        })
        .take(limit)
        .collect())
}

#[async_trait]
impl SourceAdapter for NewsApi {
    fn name(&self) -> &str {
        "NewsAPI"
    }

    async fn fetch(&self, req: &FetchRequest<'_>) -> Result<Vec<RawEvidence>, AdapterError> {
        let from = (Utc::now() - chrono::Duration::days(30)).format("%Y-%m-%d").to_string();
        let page_size = req.limit.clamp(1, 100).to_string();
        let url = Url::parse_with_params(
            "https://newsapi.org/v2/everything",
            &[
                ("q", req.query),
                ("from", from.as_str()),
                ("language", "en"),
                ("sortBy", "relevancy"),
                ("pageSize", page_size.as_str()),
                ("apiKey", self.api_key.as_str()),
            ],
        )?;
        let resp: NewsApiResponse = get_json(&self.client, url).await?;
        news_api_records(resp, req.limit)
    }
}

/* -------------------------------- Reddit ---------------------------------- */

pub struct RedditSearch {
    client: Client,
}

impl RedditSearch {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Communities searched for a topic; empty means a site-wide search.
pub fn subreddits_for(topic: Topic, query: &str) -> &'static [&'static str] {
    let lowered = query.to_lowercase();
    if lowered.contains("polymarket") || lowered.contains("prediction market") {
        return &["Polymarket", "PredictionMarkets", "sportsbook"];
    }
    match topic {
        Topic::Election | Topic::Politics => &["politics", "PoliticalDiscussion", "neutralpolitics"],
        Topic::Crypto => &["CryptoCurrency", "Bitcoin", "ethereum"],
        Topic::Finance => &["wallstreetbets", "stocks", "investing"],
        Topic::Economy => &["economics", "Economy", "investing"],
        Topic::Technology => &["technology", "tech", "artificial"],
        Topic::Climate | Topic::Health | Topic::General => &[],
    }
}

pub fn reddit_search_url(req: &FetchRequest<'_>) -> Result<Url, url::ParseError> {
    let limit = req.limit.clamp(1, 100).to_string();
    let mut params = vec![
        ("q", req.query),
        ("limit", limit.as_str()),
        ("t", "month"),
        ("sort", "relevance"),
    ];
    let subs = subreddits_for(req.topic, req.query);
    let base = if subs.is_empty() {
        "https://www.reddit.com/search.json".to_string()
    } else {
        params.push(("restrict_sr", "1"));
        format!("https://www.reddit.com/r/{}/search.json", subs.join("+"))
    };
    Url::parse_with_params(&base, &params)
}

pub fn reddit_records(listing: RedditListing, limit: usize) -> Vec<RawEvidence> {
    listing
        .data
        .children
        .into_iter()
        .map(|c| c.data)
        .take(limit)
        .map(|p| {
            let body = if p.selftext.trim().is_empty() {
                format!("{} comments, score {}", p.num_comments, p.score)
            } else {
                p.selftext.chars().take(300).collect()
            };
            let community = if p.subreddit.is_empty() {
                "Reddit".to_string()
            } else {
                format!("Reddit r/{}", p.subreddit)
            };
            let mut rec = RawEvidence::new("Reddit", p.title)
                .with_body(body)
                .with_publisher(community)
                .with_engagement(p.score);
            if !p.permalink.is_empty() {
                rec.url = Some(format!("https://www.reddit.com{}", p.permalink));
            }
            rec.published_at = p.created_utc.and_then(|t| from_unix(t as i64));
            rec
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for RedditSearch {
    fn name(&self) -> &str {
        "Reddit"
    }

    // public search endpoint is slow under load
    fn timeout(&self, default: Duration) -> Duration {
        default + Duration::from_secs(5)
    }

    async fn fetch(&self, req: &FetchRequest<'_>) -> Result<Vec<RawEvidence>, AdapterError> {
        let url = reddit_search_url(req)?;
        debug!("Reddit search - url={}", url.path());
        let listing: RedditListing = get_json(&self.client, url).await?;
        Ok(reddit_records(listing, req.limit))
    }
}

/* ---------------------------- Google Search ------------------------------- */

pub struct GoogleSearch {
    client: Client,
    api_key: String,
    cse_id: String,
}

impl GoogleSearch {
    pub fn new(client: Client, api_key: impl Into<String>, cse_id: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            cse_id: cse_id.into(),
        }
    }
}

pub fn google_records(resp: GoogleSearchResponse, limit: usize) -> Vec<RawEvidence> {
    resp.items
        .into_iter()
        .take(limit)
        .map(|item| {
            let mut rec = RawEvidence::new("Google", item.title).with_body(item.snippet);
            rec.url = item.link;
            rec.publisher = item.display_link;
            rec
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for GoogleSearch {
    fn name(&self) -> &str {
        "Google"
    }

    async fn fetch(&self, req: &FetchRequest<'_>) -> Result<Vec<RawEvidence>, AdapterError> {
        // the API returns at most 10 per request
        let num = req.limit.clamp(1, 10).to_string();
        let url = Url::parse_with_params(
            "https://www.googleapis.com/customsearch/v1",
            &[
                ("q", req.query),
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("num", num.as_str()),
            ],
        )?;
        let resp: GoogleSearchResponse = get_json(&self.client, url).await?;
        Ok(google_records(resp, req.limit))
    }
}

/* ---------------------------- Yahoo Finance ------------------------------- */

pub struct YahooFinance {
    client: Client,
}

impl YahooFinance {
    pub const MAX_TICKERS: usize = 3;

    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

pub fn yahoo_records(resp: YahooSearchResponse, limit: usize) -> Vec<RawEvidence> {
    resp.news
        .into_iter()
        .take(limit)
        .map(|n| {
            let mut rec = RawEvidence::new("Yahoo Finance", n.title);
            rec.url = n.link;
            rec.publisher = n.publisher;
            rec.published_at = n.provider_publish_time.and_then(from_unix);
            rec
        })
        .collect()
}

fn human_money(v: f64) -> String {
    let abs = v.abs();
    if abs >= 1e12 {
        format!("${:.2}T", v / 1e12)
    } else if abs >= 1e9 {
        format!("${:.2}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("${:.2}M", v / 1e6)
    } else {
        format!("${:.0}", v)
    }
}

/// One "<TICKER> Stock Information" record per quote: price, day change and market cap.
pub fn yahoo_quote_records(resp: YahooQuoteResponse) -> Vec<RawEvidence> {
    resp.quote_response
        .result
        .into_iter()
        .map(|q| {
            let price = q
                .regular_market_price
                .map_or_else(|| "N/A".to_string(), |p| format!("${p:.2}"));
            let change = q
                .regular_market_change_percent
                .map_or_else(|| "N/A".to_string(), |c| format!("{c:+.2}%"));
            let cap = q.market_cap.map_or_else(|| "N/A".to_string(), human_money);
            let mut body = format!("Current: {price}, Day Change: {change}, Market Cap: {cap}");
            if let Some(name) = q.short_name.filter(|n| !n.trim().is_empty()) {
                body = format!("{name} - {body}");
            }
            RawEvidence::new("Yahoo Finance", format!("{} Stock Information", q.symbol))
                .with_body(body)
                .with_url(format!("https://finance.yahoo.com/quote/{}", q.symbol))
                .with_sentiment(Sentiment::Neutral)
        })
        .collect()
}

impl YahooFinance {
    async fn quotes(&self, tickers: &[&str]) -> Result<Vec<RawEvidence>, AdapterError> {
        let symbols = tickers.join(",");
        let url = Url::parse_with_params(
            "https://query1.finance.yahoo.com/v7/finance/quote",
            &[("symbols", symbols.as_str())],
        )?;
        let resp: YahooQuoteResponse = get_json(&self.client, url).await?;
        Ok(yahoo_quote_records(resp))
    }
}

#[async_trait]
impl SourceAdapter for YahooFinance {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    fn activation(&self) -> Activation {
        Activation::FinancialOnly
    }

    async fn fetch(&self, req: &FetchRequest<'_>) -> Result<Vec<RawEvidence>, AdapterError> {
        let start = std::time::Instant::now();
        let tickers: Vec<&str> = req.tickers.iter().take(Self::MAX_TICKERS).map(String::as_str).collect();
        let terms: Vec<&str> = if tickers.is_empty() {
            vec![req.query]
        } else {
            tickers.clone()
        };

        let mut out = Vec::new();
        if !tickers.is_empty() {
            // quote lookups are best-effort; news still counts without them
            match self.quotes(&tickers).await {
                Ok(quotes) => out.extend(quotes),
                Err(e) => warn!("Yahoo Finance quote lookup failed - tickers={:?}, error={}", tickers, e),
            }
        }

        let per_term = (req.limit / terms.len()).max(1);
        let news_count = per_term.to_string();
        for term in &terms {
            debug!("Yahoo Finance search - term={}", term);
            let url = Url::parse_with_params(
                "https://query1.finance.yahoo.com/v1/finance/search",
                &[("q", *term), ("newsCount", news_count.as_str()), ("quotesCount", "0")],
            )?;
            let resp: YahooSearchResponse = get_json(&self.client, url).await?;
            out.extend(yahoo_records(resp, per_term));
        }
        out.truncate(req.limit);

        info!(
            "Yahoo Finance fetch completed - duration={:.2}s, terms={}, records={}",
            start.elapsed().as_secs_f32(),
            terms.len(),
            out.len()
        );
        Ok(out)
    }
}
