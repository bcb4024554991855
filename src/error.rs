use std::time::Duration;
use thiserror::Error;

/// Failures that end a query. Adapter and verdict-parse problems never show up here.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error(
        "No usable evidence found for \"{query}\". Try broadening the query or using more general terms."
    )]
    EmptyEvidence { query: String },

    #[error("Reasoning service failed: {0}")]
    Reasoning(#[from] ReasoningError),

    #[error("Reasoning service timed out after {}s", .0.as_secs())]
    ReasoningTimeout(Duration),

    #[error("Query exceeded its deadline of {}s", .0.as_secs())]
    DeadlineExceeded(Duration),

    #[error("Request composition failed: {0}")]
    Compose(#[from] serde_json::Error),
}

impl PredictError {
    /// True when the caller should report the failure as their own fault (bad query)
    /// rather than a server-side problem.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::EmptyQuery | Self::EmptyEvidence { .. })
    }
}

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

#[derive(Error, Debug)]
pub enum ReasoningError {
    #[error("{0}")]
    Backend(String),

    #[error("Empty response")]
    EmptyResponse,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The judgment did not open with a recognized verdict token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no recognized verdict token at start of \"{excerpt}\"")]
pub struct VerdictParseError {
    pub excerpt: String,
}

pub type Result<T> = std::result::Result<T, PredictError>;
