use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

/// Lower-cased, NFC-normalized alphanumeric words.
pub fn word_set<S: AsRef<str>>(s: S) -> BTreeSet<String> {
    let normalized: String = s.as_ref().nfc().collect::<String>().to_lowercase();
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collapse runs of whitespace and lower-case; used as the dedup key for titles.
pub fn normalize_title(title: &str) -> String {
    title
        .nfc()
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Query/record overlap in [0, 100]. Title hits count double.
pub fn relevance_score(query_words: &BTreeSet<String>, title: &str, body: &str) -> f32 {
    let title_words = word_set(title);
    let body_words = word_set(body);

    let title_overlap = query_words.intersection(&title_words).count();
    let body_overlap = query_words.intersection(&body_words).count();

    let denom = (query_words.len() * 3).max(1) as f32;
    let raw = (title_overlap * 2 + body_overlap) as f32 / denom * 100.0;
    raw.min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_set_splits_and_lowercases() {
        let words = word_set("Fed's  rate-cut, BTC!");
        let expected: BTreeSet<String> = ["fed", "s", "rate", "cut", "btc"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(words, expected);
    }

    #[test]
    fn test_normalize_title_collapses_whitespace() {
        assert_eq!(
            normalize_title("  Senate   Passes\tBudget Bill "),
            "senate passes budget bill"
        );
    }

    #[test]
    fn test_relevance_counts_title_double() {
        let q = word_set("bitcoin etf approval");
        // all three in title: (3*2 + 0) / 9 = 66.7
        let title_only = relevance_score(&q, "Bitcoin ETF approval expected", "");
        assert!((title_only - 66.666).abs() < 0.01);
        // all three in title and body: (6 + 3) / 9 = 100
        let both = relevance_score(&q, "Bitcoin ETF approval", "bitcoin etf approval soon");
        assert!((both - 100.0).abs() < f32::EPSILON);
        // body only: 3 / 9
        let body_only = relevance_score(&q, "Markets today", "bitcoin etf approval");
        assert!((body_only - 33.333).abs() < 0.01);
    }

    #[test]
    fn test_relevance_empty_query_is_zero() {
        let q = BTreeSet::new();
        assert_eq!(relevance_score(&q, "Anything at all here", "body"), 0.0);
    }
}
