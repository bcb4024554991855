use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

use crate::models::{RawEvidence, ScoredEvidence};
use crate::reputation::{tier_for, Tier};
use crate::sentiment::classify;
use crate::similarity::{relevance_score, word_set};

pub const NEUTRAL_RECENCY: u8 = 50;

pub fn recency_score(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u8 {
    let Some(at) = published_at else {
        return NEUTRAL_RECENCY;
    };
    let age = (now - at).max(Duration::zero());
    if age <= Duration::days(1) {
        100
    } else if age <= Duration::days(7) {
        75
    } else if age <= Duration::days(30) {
        50
    } else {
        25
    }
}

/// 50% reputation, 30% relevance, 20% recency; each share capped before summing.
pub fn quality_score(tier: Tier, relevance: f32, recency: u8) -> u8 {
    let reputation = (0.5 * tier.score() as f32).clamp(0.0, 50.0);
    let relevance = (0.3 * relevance).clamp(0.0, 30.0);
    let recency = (0.2 * recency as f32).clamp(0.0, 20.0);
    (reputation + relevance + recency).round().clamp(0.0, 100.0) as u8
}

pub fn score_record(mut raw: RawEvidence, query_words: &BTreeSet<String>, now: DateTime<Utc>) -> ScoredEvidence {
    if raw.sentiment.is_none() {
        raw.sentiment = Some(classify(&format!("{} {}", raw.title, raw.body)));
    }
    let tier = tier_for(raw.reputation_key());
    let relevance = relevance_score(query_words, &raw.title, &raw.body);
    let recency = recency_score(raw.published_at, now);
    let quality = quality_score(tier, relevance, recency);

    ScoredEvidence {
        reputation_tier: tier.level(),
        reputation_badge: tier.badge().to_string(),
        relevance_score: relevance,
        recency_score: recency,
        quality_score: quality,
        raw,
    }
}

/// Scores every record independently; output order matches input order.
pub fn score_all(records: Vec<RawEvidence>, query: &str, now: DateTime<Utc>) -> Vec<ScoredEvidence> {
    let query_words = word_set(query);
    debug!(
        "Scoring evidence - records={}, query_words={}",
        records.len(),
        query_words.len()
    );
    records
        .into_par_iter()
        .map(|raw| score_record(raw, &query_words, now))
        .collect()
}
