use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::VerdictParseError;
use crate::models::{DataQualityMetrics, DirectionalLabel, EvidenceSet, FinalVerdict, ReasoningOutcome};
use crate::out_models::JudgmentPayload;

pub const BASE_CONFIDENCE: i32 = 40;
pub const NEUTRAL_CONFIDENCE: u8 = 50;
pub const STRENGTH_MIN: i32 = -10;
pub const STRENGTH_MAX: i32 = 40;

pub const PARSE_FAILURE_CAVEAT: &str =
    "The reasoning response did not open with a recognized verdict; confidence was set to a neutral 50.";

// Leading markdown/quote noise and an optional "Verdict:" label are tolerated.
static VERDICT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^[\s*_#>"'`:-]*(?:(?:final\s+)?verdict\s*[:-]\s*[\s*_"'`]*)?(highly\s+likely|unlikely|likely|yes|no)\b"#,
    )
    .expect("verdict pattern is valid")
});

pub fn parse_verdict_token(text: &str) -> Result<DirectionalLabel, VerdictParseError> {
    let Some(caps) = VERDICT_TOKEN.captures(text) else {
        return Err(VerdictParseError {
            excerpt: text.trim().chars().take(60).collect(),
        });
    };
    let token = caps[1].split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
    Ok(match token.as_str() {
        "YES" => DirectionalLabel::Yes,
        "NO" => DirectionalLabel::No,
        "HIGHLY LIKELY" => DirectionalLabel::HighlyLikely,
        "LIKELY" => DirectionalLabel::Likely,
        _ => DirectionalLabel::Unlikely,
    })
}

/// First `{` to last `}`, if that span parses as a judgment object.
fn extract_payload(response: &str) -> Option<JudgmentPayload> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

fn clamp_strength(v: f64) -> i32 {
    (v.round() as i64).clamp(STRENGTH_MIN as i64, STRENGTH_MAX as i64) as i32
}

/// Prefer an explicit strength; otherwise back it out of a reported overall confidence.
fn resolve_strength(payload: &JudgmentPayload, boost: u8) -> i32 {
    if let Some(s) = payload.evidence_strength {
        return clamp_strength(s);
    }
    if let Some(c) = payload.confidence_score {
        return clamp_strength(c - BASE_CONFIDENCE as f64 - boost as f64);
    }
    0
}

/// Validate the raw judgment text. Never fails: anything unusable falls back to defaults.
pub fn parse_outcome(response: &str, boost: u8) -> ReasoningOutcome {
    match extract_payload(response) {
        Some(payload) => {
            let verdict_text = payload
                .verdict
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| response.trim().to_string());
            let evidence_strength = resolve_strength(&payload, boost);
            ReasoningOutcome {
                verdict_text,
                key_factors: payload.key_factors,
                caveats: payload.caveats,
                evidence_strength,
            }
        }
        None => {
            debug!("Judgment had no structured fields - using raw text");
            ReasoningOutcome {
                verdict_text: response.trim().to_string(),
                ..Default::default()
            }
        }
    }
}

pub fn final_confidence(boost: u8, strength: i32) -> u8 {
    (BASE_CONFIDENCE + boost as i32 + strength).clamp(0, 100) as u8
}

pub fn compose_verdict(
    outcome: ReasoningOutcome,
    metrics: DataQualityMetrics,
    evidence: &EvidenceSet,
    display_evidence: usize,
) -> FinalVerdict {
    let ReasoningOutcome {
        verdict_text,
        key_factors,
        mut caveats,
        evidence_strength,
    } = outcome;

    let (label, confidence_score) = match parse_verdict_token(&verdict_text) {
        Ok(label) => (label, final_confidence(metrics.confidence_boost, evidence_strength)),
        Err(e) => {
            warn!("Verdict parse failed - {}", e);
            caveats.push(PARSE_FAILURE_CAVEAT.to_string());
            (DirectionalLabel::Undetermined, NEUTRAL_CONFIDENCE)
        }
    };
    debug!(
        "Verdict composed - label={}, confidence={}, boost={}, strength={}",
        label, confidence_score, metrics.confidence_boost, evidence_strength
    );

    FinalVerdict {
        label,
        confidence_score,
        verdict_text,
        data_quality: metrics,
        key_factors,
        caveats,
        evidence: evidence.top(display_evidence).to_vec(),
    }
}
