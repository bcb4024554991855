use serde::Serialize;
use tracing::{debug, warn};

use crate::budget::{approx_tokens, truncate_chars};
use crate::config::EngineConfig;
use crate::error::PredictError;
use crate::models::{DataQualityMetrics, EvidenceSet, ScoredEvidence};

/// Snippet length used once the payload is over budget.
const SHORT_SNIPPET_CHARS: usize = 100;
const MAX_TITLE_CHARS: usize = 300;
const MAX_SOURCE_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningRequest {
    pub prompt: String,
    pub evidence_count: usize,
    pub approx_tokens: usize,
}

fn render_evidence(items: &[ScoredEvidence], snippet_chars: usize) -> String {
    let mut out = String::new();
    for (i, e) in items.iter().enumerate() {
        let source = match e.raw.publisher.as_deref() {
            Some(p) if p != e.raw.provider => format!("{} via {}", p, e.raw.provider),
            _ => e.raw.provider.clone(),
        };
        out.push_str(&format!("[{}] {}\n", i + 1, truncate_chars(&e.raw.title, MAX_TITLE_CHARS)));
        out.push_str(&format!(
            "    Source: {} | Reputation: {} | Quality: {}/100",
            truncate_chars(&source, MAX_SOURCE_CHARS),
            e.reputation_badge,
            e.quality_score
        ));
        if let Some(sentiment) = e.raw.sentiment {
            out.push_str(&format!(" | Sentiment: {}", sentiment));
        }
        out.push('\n');
        let snippet = truncate_chars(&e.raw.body, snippet_chars);
        if !snippet.is_empty() {
            out.push_str(&format!("    {}\n", snippet));
        }
    }
    out
}

fn user_prediction(query: &str, evidence: &str, metrics_json: &str, boost: u8) -> String {
    format!(r#"Forecast the answer to the question below using ONLY the evidence provided.

QUESTION:
<{query}>

EVIDENCE ({count_hint}):
{evidence}
DATA QUALITY METRICS:
<{metrics}>

CONFIDENCE CONTRACT:
- The final confidence is computed as 40 + {boost} (data-quality boost) + evidence_strength.
- evidence_strength is an integer in [-10, 40]: how strongly the evidence supports your verdict.
- Weak, conflicting or stale evidence belongs near 0 or below; overwhelming, consistent evidence near 40.

OUTPUT (strict JSON, no prose outside it):
{{
  "verdict": "<one of YES | NO | HIGHLY LIKELY | LIKELY | UNLIKELY>, then one sentence",
  "key_factors": ["...", "..."],
  "caveats": ["..."],
  "evidence_strength": 0
}}

CONSTRAINTS:
- "verdict" MUST begin with exactly one of: YES, NO, HIGHLY LIKELY, LIKELY, UNLIKELY.
- Do not hedge: avoid "maybe", "possibly", "it depends", "uncertain".
- 2–5 key factors, 1–3 caveats, each under 25 words.
- Cite evidence by its [number]."#,
        query = query,
        count_hint = "numbered, highest quality first",
        evidence = evidence,
        metrics = metrics_json,
        boost = boost,
    )
}

/// Build the judgment prompt within the token budget. The query is cut to
/// `max_query_chars`; then snippets shrink, the lowest-ranked evidence is dropped down to
/// one item, and finally snippets are left out altogether.
pub fn compose_request(
    query: &str,
    set: &EvidenceSet,
    metrics: &DataQualityMetrics,
    config: &EngineConfig,
) -> Result<ReasoningRequest, PredictError> {
    let metrics_json = serde_json::to_string_pretty(metrics)?;
    let boost = metrics.confidence_boost;
    let budget = config.request_token_budget;

    let query = truncate_chars(query, config.max_query_chars);
    let mut count = set.len().min(config.request_evidence_cap);
    let mut snippet_chars = config.snippet_chars;
    let build = |count: usize, snippet_chars: usize| {
        let evidence = render_evidence(set.top(count), snippet_chars);
        user_prediction(&query, &evidence, &metrics_json, boost)
    };

    let mut prompt = build(count, snippet_chars);
    if approx_tokens(&prompt) > budget && snippet_chars > SHORT_SNIPPET_CHARS {
        snippet_chars = SHORT_SNIPPET_CHARS;
        prompt = build(count, snippet_chars);
    }
    while approx_tokens(&prompt) > budget && count > 1 {
        count -= 1;
        prompt = build(count, snippet_chars);
    }
    if approx_tokens(&prompt) > budget && snippet_chars > 0 {
        snippet_chars = 0;
        prompt = build(count, snippet_chars);
    }

    let tokens = approx_tokens(&prompt);
    if tokens > budget {
        warn!("Reasoning request over budget - approx_tokens={}, budget={}", tokens, budget);
    }
    debug!(
        "Reasoning request composed - evidence={}, snippet_chars={}, approx_tokens={}",
        count, snippet_chars, tokens
    );
    Ok(ReasoningRequest {
        prompt,
        evidence_count: count,
        approx_tokens: tokens,
    })
}
