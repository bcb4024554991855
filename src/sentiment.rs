use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::models::Sentiment;

/// Polarity beyond this (either sign) is no longer neutral.
pub const NEUTRAL_BAND: f32 = 0.1;

const POSITIVE: &[&str] = &[
    "gain", "gains", "rise", "rises", "rising", "rally", "rallies", "surge", "surges", "soar",
    "soars", "jump", "jumps", "beat", "beats", "boost", "boosts", "growth", "grow", "grows",
    "strong", "stronger", "record", "win", "wins", "won", "victory", "pass", "passes", "passed",
    "approve", "approves", "approved", "success", "successful", "improve", "improves",
    "improved", "optimism", "optimistic", "bullish", "upbeat", "positive", "good", "great",
    "best", "support", "supports", "recover", "recovery", "lead", "leads", "ahead", "agree",
    "agreement", "deal", "breakthrough", "confident", "confidence", "cool", "cools", "ease",
    "eases", "easing", "stable", "steady", "safe", "hope", "hopes",
];

const NEGATIVE: &[&str] = &[
    "fall", "falls", "fell", "drop", "drops", "plunge", "plunges", "slump", "slumps", "crash",
    "crashes", "slide", "slides", "loss", "losses", "lose", "loses", "lost", "miss", "misses",
    "weak", "weaker", "decline", "declines", "fail", "fails", "failed", "failure", "reject",
    "rejects", "rejected", "block", "blocks", "blocked", "defeat", "defeated", "crisis", "risk",
    "risks", "fear", "fears", "worry", "worries", "concern", "concerns", "bearish", "negative",
    "bad", "worst", "warn", "warns", "warning", "threat", "threatens", "cut", "cuts", "layoffs",
    "recession", "inflation", "default", "scandal", "collapse", "collapses", "delay", "delays",
    "delayed", "stall", "stalls", "stalled", "uncertain", "uncertainty", "trouble", "lawsuit",
];

const NEGATORS: &[&str] = &["not", "no", "never", "without", "hardly", "isn't", "won't", "didn't", "doesn't"];

static POSITIVE_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| POSITIVE.iter().copied().collect());
static NEGATIVE_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| NEGATIVE.iter().copied().collect());

/// Lexicon polarity in [-1.0, 1.0]. A negator directly before a cue word flips it.
pub fn polarity(text: &str) -> f32 {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .collect();

    let (mut pos, mut neg) = (0u32, 0u32);
    for (i, tok) in tokens.iter().enumerate() {
        let sign: i8 = if POSITIVE_SET.contains(*tok) {
            1
        } else if NEGATIVE_SET.contains(*tok) {
            -1
        } else {
            continue;
        };
        let negated = i > 0 && NEGATORS.contains(&tokens[i - 1]);
        if (sign > 0) != negated {
            pos += 1;
        } else {
            neg += 1;
        }
    }

    let hits = pos + neg;
    if hits == 0 {
        return 0.0;
    }
    (pos as f32 - neg as f32) / hits as f32
}

pub fn classify(text: &str) -> Sentiment {
    let p = polarity(text);
    if p > NEUTRAL_BAND {
        Sentiment::Positive
    } else if p < -NEUTRAL_BAND {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}
