use serde::Deserialize;

/* NewsAPI /v2/everything */
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsApiResponse {
    pub status: String,                  // "ok" | "error"
    #[serde(default)]
    pub message: Option<String>,         // only on errors
    #[serde(default)]
    pub articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsApiArticle {
    #[serde(default)]
    pub source: NewsApiSource,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,    // RFC 3339
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsApiSource {
    #[serde(default)]
    pub name: Option<String>,
}

/* Reddit /search.json */
#[derive(Debug, Clone, Deserialize)]
pub struct RedditListing {
    pub data: RedditListingData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditListingData {
    #[serde(default)]
    pub children: Vec<RedditChild>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditChild {
    pub data: RedditPost,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditPost {
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub permalink: String,               // "/r/x/comments/..."
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub num_comments: u64,
    #[serde(default)]
    pub created_utc: Option<f64>,        // unix seconds
}

/* Google Custom Search v1 */
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSearchResponse {
    #[serde(default)]
    pub items: Vec<GoogleSearchItem>,    // absent when nothing matched
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSearchItem {
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub display_link: Option<String>,    // "www.reuters.com"
}

/* Yahoo Finance /v1/finance/search */
#[derive(Debug, Clone, Deserialize)]
pub struct YahooSearchResponse {
    #[serde(default)]
    pub news: Vec<YahooNewsItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooNewsItem {
    pub title: String,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub provider_publish_time: Option<i64>, // unix seconds
}

/* Yahoo Finance /v7/finance/quote */
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteResponse {
    pub quote_response: YahooQuoteResult,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YahooQuoteResult {
    #[serde(default)]
    pub result: Vec<YahooQuote>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuote {
    pub symbol: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub regular_market_price: Option<f64>,
    #[serde(default)]
    pub regular_market_change_percent: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
}
