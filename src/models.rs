use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::query::Topic;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvidence {
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub url: Option<String>,
    pub provider: String,              // adapter identity, e.g. "NewsAPI"
    pub publisher: Option<String>,     // outlet discovered by generic adapters
    pub published_at: Option<DateTime<Utc>>,
    pub engagement: Option<f64>,       // upvotes etc., only where the provider exposes it
    #[serde(default)]
    pub sentiment: Option<Sentiment>,  // filled by the provider or at scoring time
}

impl RawEvidence {
    pub fn new(provider: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: String::new(),
            url: None,
            provider: provider.into(),
            publisher: None,
            published_at: None,
            engagement: None,
            sentiment: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn with_engagement(mut self, engagement: f64) -> Self {
        self.engagement = Some(engagement);
        self
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    /// Name used for the reputation lookup: the outlet when known, else the adapter.
    pub fn reputation_key(&self) -> &str {
        self.publisher
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(&self.provider)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEvidence {
    #[serde(flatten)]
    pub raw: RawEvidence,
    pub reputation_tier: u8,      // 1 = highest trust
    pub reputation_badge: String,
    pub relevance_score: f32,     // [0, 100]
    pub recency_score: u8,        // [0, 100]
    pub quality_score: u8,        // [0, 100]
}

/// Ranked, deduplicated, size-bounded evidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceSet {
    items: Vec<ScoredEvidence>,
}

impl EvidenceSet {
    /// Callers go through `select::select_evidence`, which enforces ordering and the cap.
    pub(crate) fn from_ranked(items: Vec<ScoredEvidence>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[ScoredEvidence] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn top(&self, n: usize) -> &[ScoredEvidence] {
        &self.items[..n.min(self.items.len())]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityMetrics {
    pub source_count: usize,
    pub platforms_used: usize,
    pub platform_breakdown: BTreeMap<String, usize>, // provider -> count
    pub avg_quality_score: f32,
    pub avg_relevance_score: f32,
    pub confidence_boost: u8, // [0, 30]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningOutcome {
    pub verdict_text: String,
    pub key_factors: Vec<String>,
    pub caveats: Vec<String>,
    pub evidence_strength: i32, // [-10, 40]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectionalLabel {
    Yes,
    No,
    HighlyLikely,
    Likely,
    Unlikely,
    Undetermined,
}

impl DirectionalLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::HighlyLikely => "HIGHLY LIKELY",
            Self::Likely => "LIKELY",
            Self::Unlikely => "UNLIKELY",
            Self::Undetermined => "UNDETERMINED",
        }
    }
}

impl fmt::Display for DirectionalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalVerdict {
    pub label: DirectionalLabel,
    pub confidence_score: u8, // [0, 100]
    pub verdict_text: String,
    pub data_quality: DataQualityMetrics,
    pub key_factors: Vec<String>,
    pub caveats: Vec<String>,
    pub evidence: Vec<ScoredEvidence>, // display prefix of the evidence set
}

/// Everything the persistence layer receives for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub query: String,
    pub enhanced_query: String,
    pub topic: Topic,
    pub created_at: DateTime<Utc>,
    pub evidence: EvidenceSet,
    pub verdict: FinalVerdict,
}
